use std::fmt;

use serde::Serialize;

use crate::settings::Scope;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Behavior {
    Allow,
    Deny,
}

impl Behavior {
    pub fn as_str(self) -> &'static str {
        match self {
            Behavior::Allow => "allow",
            Behavior::Deny => "deny",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Behavior::Allow => "ALLOW",
            Behavior::Deny => "DENY",
        }
    }
}

/// A tool, optionally narrowed to one piece of rule content
/// (e.g. `bash` or `bash:npm test`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolRule {
    pub tool_name: String,
    pub rule_content: Option<String>,
}

impl ToolRule {
    pub fn new(tool_name: impl Into<String>, rule_content: Option<&str>) -> Self {
        Self {
            tool_name: tool_name.into(),
            rule_content: rule_content.map(str::to_string),
        }
    }

    /// Split a `tool` or `tool:content` entry on its first `:`.
    pub fn parse(entry: &str) -> Self {
        match entry.split_once(':') {
            Some((tool, content)) => Self::new(tool, Some(content)),
            None => Self::new(entry, None),
        }
    }

    /// Whether this rule applies to a request for `tool_name` / `rule_content`.
    /// A rule without content matches any content; a rule with content only
    /// matches that exact content.
    pub fn matches(&self, tool_name: &str, rule_content: Option<&str>) -> bool {
        if self.tool_name != tool_name {
            return false;
        }
        match &self.rule_content {
            None => true,
            Some(content) => rule_content == Some(content.as_str()),
        }
    }
}

impl fmt::Display for ToolRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.rule_content {
            Some(content) => write!(f, "{}:{}", self.tool_name, content),
            None => f.write_str(&self.tool_name),
        }
    }
}

/// What a rule is about. Ignore patterns are their own variant so they can
/// never be confused with a tool of the same name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum RuleTarget {
    Tool(ToolRule),
    IgnorePattern { pattern: String },
}

impl RuleTarget {
    pub fn ignore_pattern(pattern: impl Into<String>) -> Self {
        RuleTarget::IgnorePattern {
            pattern: pattern.into(),
        }
    }
}

impl fmt::Display for RuleTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RuleTarget::Tool(tool) => tool.fmt(f),
            RuleTarget::IgnorePattern { pattern } => write!(f, "ignore:{pattern}"),
        }
    }
}

/// A single allow/deny statement attributed to exactly one scope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub behavior: Behavior,
    pub source: Scope,
    pub target: RuleTarget,
}

impl Rule {
    pub fn tool(behavior: Behavior, source: Scope, tool: ToolRule) -> Self {
        Self {
            behavior,
            source,
            target: RuleTarget::Tool(tool),
        }
    }

    pub fn ignore_pattern(behavior: Behavior, source: Scope, pattern: impl Into<String>) -> Self {
        Self {
            behavior,
            source,
            target: RuleTarget::ignore_pattern(pattern),
        }
    }
}

impl fmt::Display for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.behavior.as_str(),
            self.target,
            self.source.source_name()
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResolvedDecision {
    pub allowed: bool,
    pub matched_rule: Option<Rule>,
}

impl ResolvedDecision {
    pub fn behavior(&self) -> Behavior {
        if self.allowed {
            Behavior::Allow
        } else {
            Behavior::Deny
        }
    }

    pub fn reason(&self) -> String {
        match &self.matched_rule {
            Some(rule) => format!("matched {rule}"),
            None => "no matching rule".into(),
        }
    }
}
