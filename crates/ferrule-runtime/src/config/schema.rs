//! Configuration schema definitions.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use ferrule_framework::DispatcherConfig;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct FerruleConfig {
    /// Addressing, access and command policy.
    #[serde(default)]
    pub bot: BotSettings,

    /// Module selection and per-module settings.
    #[serde(default)]
    pub modules: ModulesConfig,

    /// Key-value store backend.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Logging output.
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Process lifecycle.
    #[serde(default)]
    pub runtime: RuntimeSettings,
}

// =============================================================================
// Bot
// =============================================================================

/// How the bot is addressed and who may administer it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BotSettings {
    /// Global command prefix.
    #[serde(default = "default_prefix")]
    pub prefix: String,

    /// Only react to the connected account's own messages.
    #[serde(default)]
    pub self_bot: bool,

    /// Global admin user ids.
    #[serde(default)]
    pub admins: Vec<String>,

    /// Commands disabled at startup, by name.
    #[serde(default)]
    pub disabled_commands: Vec<String>,

    /// When non-empty, the only commands enabled at startup.
    #[serde(default)]
    pub whitelist_commands: Vec<String>,

    /// Reply with a help hint to a message that only mentions the bot.
    #[serde(default = "default_true")]
    pub help_hint: bool,
}

impl Default for BotSettings {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            self_bot: false,
            admins: Vec::new(),
            disabled_commands: Vec::new(),
            whitelist_commands: Vec::new(),
            help_hint: true,
        }
    }
}

impl BotSettings {
    /// The dispatcher's view of these settings.
    pub fn dispatcher_config(&self) -> DispatcherConfig {
        DispatcherConfig {
            prefix: self.prefix.clone(),
            self_bot: self.self_bot,
            admins: self.admins.clone(),
            help_hint: self.help_hint,
        }
    }
}

fn default_prefix() -> String {
    "!".to_string()
}

fn default_true() -> bool {
    true
}

// =============================================================================
// Modules
// =============================================================================

/// Which modules load, and the settings block each one receives.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ModulesConfig {
    /// Turns `list` from a skip list into an allow list.
    #[serde(default)]
    pub inverted: bool,

    /// Module names to skip (or, when inverted, the only ones to load).
    #[serde(default)]
    pub list: Vec<String>,

    /// Per-module settings, keyed by module name.
    #[serde(default)]
    pub settings: BTreeMap<String, Value>,
}

impl ModulesConfig {
    /// Returns `true` if the module called `name` should be loaded.
    pub fn is_selected(&self, name: &str) -> bool {
        self.list.iter().any(|m| m == name) == self.inverted
    }

    /// The settings block for `name`, or `Null`.
    pub fn settings_for(&self, name: &str) -> Value {
        self.settings.get(name).cloned().unwrap_or(Value::Null)
    }
}

// =============================================================================
// Storage
// =============================================================================

/// Store backend kind.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// Process-local map, lost on exit.
    #[default]
    Memory,
    /// A single JSON document on disk.
    Json,
}

/// Store configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct StorageConfig {
    #[serde(default)]
    pub backend: StorageBackend,

    /// File path of the `json` backend.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,
}

// =============================================================================
// Logging
// =============================================================================

/// Log line layout.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Compact,
    Full,
    Pretty,
    /// Requires the `json-log` feature; falls back to `full` without it.
    Json,
}

/// Log destination.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stdout,
    Stderr,
    File,
}

/// Log file rotation period.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogRotation {
    #[default]
    Never,
    Hourly,
    Daily,
}

/// Span lifecycle events to log.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct SpanEventConfig {
    #[serde(default)]
    pub new: bool,
    #[serde(default)]
    pub enter: bool,
    #[serde(default)]
    pub exit: bool,
    #[serde(default)]
    pub close: bool,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Base level: trace, debug, info, warn or error.
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default)]
    pub format: LogFormat,

    #[serde(default)]
    pub output: LogOutput,

    /// Log file for the `file` output.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_path: Option<PathBuf>,

    #[serde(default)]
    pub rotation: LogRotation,

    /// Rotated files to keep; `0` keeps all of them.
    #[serde(default = "default_max_files")]
    pub max_files: usize,

    #[serde(default)]
    pub thread_ids: bool,

    /// Include source file and line.
    #[serde(default)]
    pub file_location: bool,

    #[serde(default)]
    pub span_events: SpanEventConfig,

    /// Per-target levels, e.g. `ferrule_framework = "debug"`.
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            output: LogOutput::default(),
            file_path: None,
            rotation: LogRotation::default(),
            max_files: default_max_files(),
            thread_ids: false,
            file_location: false,
            span_events: SpanEventConfig::default(),
            filters: BTreeMap::new(),
        }
    }
}

impl LoggingConfig {
    /// The base level, or `None` if `level` is not a valid level name.
    pub fn tracing_level(&self) -> Option<tracing::Level> {
        self.level.parse().ok()
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_max_files() -> usize {
    5
}

// =============================================================================
// Runtime
// =============================================================================

/// Process lifecycle settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RuntimeSettings {
    /// How long shutdown waits for in-flight handlers, in milliseconds.
    #[serde(default = "default_shutdown_grace_ms")]
    pub shutdown_grace_ms: u64,
}

impl Default for RuntimeSettings {
    fn default() -> Self {
        Self {
            shutdown_grace_ms: default_shutdown_grace_ms(),
        }
    }
}

impl RuntimeSettings {
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_millis(self.shutdown_grace_ms)
    }
}

fn default_shutdown_grace_ms() -> u64 {
    5000
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_selection() {
        let mut modules = ModulesConfig {
            list: vec!["admin".into()],
            ..Default::default()
        };
        assert!(modules.is_selected("help"));
        assert!(!modules.is_selected("admin"));

        modules.inverted = true;
        assert!(!modules.is_selected("help"));
        assert!(modules.is_selected("admin"));
    }

    #[test]
    fn test_settings_for_missing_module_is_null() {
        let mut modules = ModulesConfig::default();
        modules
            .settings
            .insert("notes".into(), serde_json::json!({ "max_notes": 3 }));
        assert_eq!(modules.settings_for("notes")["max_notes"], 3);
        assert!(modules.settings_for("help").is_null());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: FerruleConfig =
            serde_json::from_str(r#"{ "bot": { "prefix": "?" }, "storage": { "backend": "json" } }"#)
                .unwrap();
        assert_eq!(config.bot.prefix, "?");
        assert!(config.bot.help_hint);
        assert_eq!(config.storage.backend, StorageBackend::Json);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.runtime.shutdown_grace(), Duration::from_secs(5));
    }

    #[test]
    fn test_dispatcher_config() {
        let bot = BotSettings {
            prefix: "$".into(),
            admins: vec!["1".into()],
            help_hint: false,
            ..Default::default()
        };
        let dispatcher = bot.dispatcher_config();
        assert_eq!(dispatcher.prefix, "$");
        assert_eq!(dispatcher.admins, vec!["1"]);
        assert!(!dispatcher.help_hint);
        assert!(!dispatcher.self_bot);
    }

    #[test]
    fn test_tracing_level() {
        let mut logging = LoggingConfig::default();
        assert_eq!(logging.tracing_level(), Some(tracing::Level::INFO));
        logging.level = "verbose".into();
        assert_eq!(logging.tracing_level(), None);
    }
}
