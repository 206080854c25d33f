//! Flattens a settings document into scope-tagged rules.

use crate::settings::{ProjectConfig, Scope, SettingsDocument};

use super::{Behavior, Rule, ToolRule};

/// Rules declared by one document, in declaration order: allowed tools,
/// denied tools, ignore patterns, denied ignore patterns.
pub fn extract_rules(scope: Scope, doc: &SettingsDocument) -> Vec<Rule> {
    let tools = |behavior: Behavior, entries: &[String]| {
        entries
            .iter()
            .map(move |entry| Rule::tool(behavior, scope, ToolRule::parse(entry)))
            .collect::<Vec<_>>()
    };
    let patterns = |behavior: Behavior, entries: &[String]| {
        entries
            .iter()
            .map(move |p| Rule::ignore_pattern(behavior, scope, p.as_str()))
            .collect::<Vec<_>>()
    };

    let mut rules = tools(Behavior::Allow, &doc.allowed_tools);
    rules.extend(tools(Behavior::Deny, &doc.denied_tools));
    rules.extend(patterns(Behavior::Allow, &doc.ignore_patterns));
    rules.extend(patterns(Behavior::Deny, &doc.denied_ignore_patterns));
    rules
}

/// Rules from a document's `projects[route_key]` entry, attributed to the
/// document's scope. Only user and policy documents carry project entries.
pub fn extract_project_rules(scope: Scope, project: &ProjectConfig) -> Vec<Rule> {
    project
        .allowed_tools
        .iter()
        .map(|entry| Rule::tool(Behavior::Allow, scope, ToolRule::parse(entry)))
        .chain(
            project
                .ignore_patterns
                .iter()
                .map(|p| Rule::ignore_pattern(Behavior::Allow, scope, p.as_str())),
        )
        .collect()
}
