//! Help listings.
//!
//! Route metadata (name, description, category) exists only for these
//! listings. Two views are provided:
//!
//! - [`group_by_category`]: flat groups of routes, categories in alphabetical
//!   order and routes in registration order inside each category.
//! - [`listing`]: the router tree, top-level entries grouped by category and
//!   sub-router children indented one level deeper. Disabled routes and
//!   disabled sub-routers are left out.

use std::collections::BTreeMap;
use std::sync::Arc;

use ferrule_core::Embed;

use crate::route::Route;
use crate::router::{Entry, Router, Subrouter};

/// Label shown for routes without a category.
pub const UNDEFINED_CATEGORY: &str = "undefined";

const INDENT: &str = "  ";

fn category_label(category: &str) -> &str {
    if category.is_empty() {
        UNDEFINED_CATEGORY
    } else {
        category
    }
}

/// Routes sharing a category.
#[derive(Debug, Clone)]
pub struct CategoryGroup {
    pub category: String,
    pub routes: Vec<Arc<Route>>,
}

/// Groups `routes` by category label, alphabetically.
pub fn group_by_category(routes: impl IntoIterator<Item = Arc<Route>>) -> Vec<CategoryGroup> {
    let mut groups: BTreeMap<String, Vec<Arc<Route>>> = BTreeMap::new();
    for route in routes {
        let label = category_label(&route.category()).to_string();
        groups.entry(label).or_default().push(route);
    }
    groups
        .into_iter()
        .map(|(category, routes)| CategoryGroup { category, routes })
        .collect()
}

/// One category of the rendered help tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelpSection {
    pub category: String,
    /// Pre-indented lines.
    pub lines: Vec<String>,
}

fn route_line(depth: usize, route: &Route) -> String {
    let meta = route.meta();
    let indent = INDENT.repeat(depth);
    if meta.description.is_empty() {
        format!("{indent}{}", meta.name)
    } else {
        format!("{indent}{} - {}", meta.name, meta.description)
    }
}

fn subrouter_lines(depth: usize, sub: &Subrouter, out: &mut Vec<String>) {
    if sub.is_disabled() {
        return;
    }
    match sub.route() {
        Some(route) if !route.is_disabled() => out.push(route_line(depth, &route)),
        _ => out.push(format!("{}{}", INDENT.repeat(depth), sub.gate().source())),
    }
    router_lines(depth + 1, sub.router(), out);
}

fn router_lines(depth: usize, router: &Router, out: &mut Vec<String>) {
    for entry in router.entries() {
        match entry {
            Entry::Route(route) if !route.is_disabled() => out.push(route_line(depth, &route)),
            Entry::Route(_) => {}
            Entry::Subrouter(sub) => subrouter_lines(depth, &sub, out),
        }
    }
}

/// Renders the router tree into per-category sections.
pub fn listing(router: &Router) -> Vec<HelpSection> {
    let mut sections: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for entry in router.entries() {
        let (category, lines) = match entry {
            Entry::Route(route) => {
                if route.is_disabled() {
                    continue;
                }
                (route.category(), vec![route_line(0, &route)])
            }
            Entry::Subrouter(sub) => {
                let mut lines = Vec::new();
                subrouter_lines(0, &sub, &mut lines);
                (sub.category().to_string(), lines)
            }
        };
        if lines.is_empty() {
            continue;
        }
        sections
            .entry(category_label(&category).to_string())
            .or_default()
            .extend(lines);
    }

    sections
        .into_iter()
        .map(|(category, lines)| HelpSection { category, lines })
        .collect()
}

/// Plain-text rendering of `sections`.
pub fn render_text(sections: &[HelpSection]) -> String {
    let mut out = String::new();
    for section in sections {
        out.push_str(&format!("[{}]\n", section.category));
        for line in &section.lines {
            out.push_str(INDENT);
            out.push_str(line);
            out.push('\n');
        }
    }
    out
}

/// Embed rendering of `sections`, one field per category.
pub fn render_embed(sections: &[HelpSection], prefix: &str) -> Embed {
    let embed = Embed::new()
        .title("Commands")
        .footer(format!("Type {prefix}help <command> for details"));
    sections.iter().fold(embed, |embed, section| {
        embed.field(&section.category, section.lines.join("\n"), false)
    })
}
