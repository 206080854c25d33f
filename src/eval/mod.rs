pub mod decision;
pub mod extract;

pub use decision::{Behavior, ResolvedDecision, Rule, RuleTarget, ToolRule};
pub use extract::{extract_project_rules, extract_rules};

use std::collections::HashSet;

use log::debug;

use crate::settings::{Scope, SettingsDocument};

/// Every rule from a set of scopes, ordered by ascending scope precedence
/// and, within a scope, by declaration order.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    rules: Vec<Rule>,
}

impl RuleSet {
    /// Build from arbitrary rules. Scope order is imposed with a stable sort,
    /// so intra-scope declaration order is preserved.
    pub fn new(mut rules: Vec<Rule>) -> Self {
        rules.sort_by_key(|r| r.source);
        Self { rules }
    }

    pub fn from_documents<'a>(
        documents: impl IntoIterator<Item = (Scope, &'a SettingsDocument)>,
    ) -> Self {
        let rules = documents
            .into_iter()
            .flat_map(|(scope, doc)| extract_rules(scope, doc))
            .collect();
        Self::new(rules)
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// Decide a request for `tool_name` with optional `rule_content`, looking
    /// only at rules from `scopes`.
    ///
    /// The last eligible rule in precedence order wins, so policy overrides
    /// local, local overrides project, project overrides user, and later
    /// declarations override earlier ones within a scope. No eligible rule
    /// means denied.
    pub fn resolve(
        &self,
        tool_name: &str,
        rule_content: Option<&str>,
        scopes: &[Scope],
    ) -> ResolvedDecision {
        let matched = self
            .rules
            .iter()
            .rev()
            .filter(|rule| scopes.contains(&rule.source))
            .find(|rule| match &rule.target {
                RuleTarget::Tool(tool) => tool.matches(tool_name, rule_content),
                RuleTarget::IgnorePattern { .. } => false,
            })
            .cloned();

        let decision = ResolvedDecision {
            allowed: matched
                .as_ref()
                .is_some_and(|rule| rule.behavior == Behavior::Allow),
            matched_rule: matched,
        };
        debug!(
            "resolve {tool_name}{} -> {}: {}",
            rule_content.map(|c| format!(":{c}")).unwrap_or_default(),
            decision.behavior().label(),
            decision.reason()
        );
        decision
    }
}

/// The effective ignore set for `base_patterns`.
///
/// A pattern is dropped iff a `local` deny rule targets exactly that pattern.
/// Survivors are deduplicated, keeping first occurrence.
pub fn filter_ignore_patterns(base_patterns: &[String], rules: &[Rule]) -> Vec<RuleTarget> {
    if base_patterns.is_empty() {
        return Vec::new();
    }

    let unignored: HashSet<&str> = rules
        .iter()
        .filter(|r| r.source == Scope::Local && r.behavior == Behavior::Deny)
        .filter_map(|r| match &r.target {
            RuleTarget::IgnorePattern { pattern } => Some(pattern.as_str()),
            RuleTarget::Tool(_) => None,
        })
        .collect();

    let mut seen = HashSet::new();
    base_patterns
        .iter()
        .filter(|p| !unignored.contains(p.as_str()))
        .filter(|p| seen.insert(p.as_str()))
        .map(|p| RuleTarget::ignore_pattern(p.as_str()))
        .collect()
}

/// `base_tools` minus entries a `local` allow rule already grants verbatim.
/// Survivors are deduplicated, keeping first occurrence.
pub fn filter_allowed_tools(base_tools: &[String], rules: &[Rule]) -> Vec<String> {
    if base_tools.is_empty() {
        return Vec::new();
    }

    let covered: HashSet<&ToolRule> = rules
        .iter()
        .filter(|r| r.source == Scope::Local && r.behavior == Behavior::Allow)
        .filter_map(|r| match &r.target {
            RuleTarget::Tool(tool) => Some(tool),
            RuleTarget::IgnorePattern { .. } => None,
        })
        .collect();

    let mut seen = HashSet::new();
    base_tools
        .iter()
        .filter(|entry| !covered.contains(&ToolRule::parse(entry)))
        .filter(|entry| seen.insert(entry.as_str()))
        .cloned()
        .collect()
}
