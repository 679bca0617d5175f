//! Argument tokenization.
//!
//! The text that follows a matched command keyword is split into positional
//! tokens. Whitespace separates tokens; single or double quotes group
//! whitespace into one token, and a backslash escapes the next character
//! inside double quotes.
//!
//! Unbalanced quoting never fails a dispatch. [`tokenize`] falls back to a
//! plain whitespace split so the command still runs with degraded arguments.

use std::ops::Index;

/// Quote-aware split. Returns `None` when a quote is left open.
pub fn shell_split(input: &str) -> Option<Vec<String>> {
    let mut args = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut in_single_quote = false;
    let mut in_double_quote = false;
    let mut escape_next = false;

    for ch in input.chars() {
        if escape_next {
            current.push(ch);
            escape_next = false;
            continue;
        }

        match ch {
            '\\' if in_double_quote => {
                escape_next = true;
            }
            '\'' if !in_double_quote => {
                in_single_quote = !in_single_quote;
                in_token = true;
            }
            '"' if !in_single_quote => {
                in_double_quote = !in_double_quote;
                in_token = true;
            }
            c if c.is_whitespace() && !in_single_quote && !in_double_quote => {
                if in_token {
                    args.push(std::mem::take(&mut current));
                    in_token = false;
                }
            }
            _ => {
                current.push(ch);
                in_token = true;
            }
        }
    }

    if in_single_quote || in_double_quote || escape_next {
        return None;
    }

    if in_token {
        args.push(current);
    }

    Some(args)
}

/// Splits `input` into tokens, falling back to a whitespace split on
/// malformed quoting.
pub fn tokenize(input: &str) -> Vec<String> {
    shell_split(input)
        .unwrap_or_else(|| input.split_whitespace().map(str::to_string).collect())
}

/// Positional arguments of one command invocation.
///
/// Every accessor is bounds-checked and yields `""` when out of range.
///
/// ```rust
/// use ferrule_framework::Args;
///
/// let args = Args::parse(r#"add "buy milk" today"#);
/// assert_eq!(args.get(1), "buy milk");
/// assert_eq!(args.after(), "buy milk today");
/// assert_eq!(args.get(9), "");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Args {
    tokens: Vec<String>,
}

impl Args {
    /// Tokenizes `input` (see [`tokenize`]).
    pub fn parse(input: &str) -> Self {
        Self {
            tokens: tokenize(input),
        }
    }

    /// Token at position `n`, or `""`.
    pub fn get(&self, n: usize) -> &str {
        self.tokens.get(n).map(String::as_str).unwrap_or("")
    }

    /// Everything from position 1 onward, space-joined.
    pub fn after(&self) -> String {
        self.after_n(1)
    }

    /// Everything from position `n` onward, space-joined, or `""`.
    pub fn after_n(&self, n: usize) -> String {
        self.tokens.get(n..).map(|rest| rest.join(" ")).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.tokens.iter().map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.tokens
    }
}

impl From<Vec<String>> for Args {
    fn from(tokens: Vec<String>) -> Self {
        Self { tokens }
    }
}

impl Index<usize> for Args {
    type Output = str;

    /// Same as [`Args::get`]: out-of-range indices yield `""`.
    fn index(&self, n: usize) -> &str {
        self.get(n)
    }
}
