use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::Scope;

/// One scope's persisted settings file.
///
/// Unknown top-level keys are kept in `extra` so a read-merge-write cycle
/// never drops fields written by a newer version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsDocument {
    /// Tools (or `tool:content` composites) approved without prompting.
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    /// Tools (or `tool:content` composites) refused outright.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied_tools: Vec<String>,
    /// Glob-like patterns excluded from file-oriented tools.
    #[serde(default)]
    pub ignore_patterns: Vec<String>,
    /// Patterns this scope refuses to ignore. Only honoured from `local`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub denied_ignore_patterns: Vec<String>,
    /// Per-project configuration, keyed by route key. User and policy scope only.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub projects: BTreeMap<String, ProjectConfig>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub verbose: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub preferred_notif_channel: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub editor_mode: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auto_updater_status: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Settings scoped to one project, stored inside the user document.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectConfig {
    #[serde(default)]
    pub allowed_tools: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ignore_patterns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dont_crawl_directory: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_architect_tool: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_trust_dialog_accepted: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub has_completed_project_onboarding: Option<bool>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl SettingsDocument {
    /// The document a scope has when its file is missing, and what a
    /// corrupt file is reset to.
    pub fn default_for(scope: Scope) -> Self {
        match scope {
            Scope::User => Self {
                theme: Some("dark".into()),
                verbose: Some(false),
                preferred_notif_channel: Some("auto".into()),
                ..Self::default()
            },
            Scope::Project | Scope::Local | Scope::Policy => Self::default(),
        }
    }

    /// The document as a JSON object, for shallow merging.
    pub fn to_json_map(&self) -> serde_json::Result<Map<String, Value>> {
        match serde_json::to_value(self)? {
            Value::Object(map) => Ok(map),
            // A struct with named fields always serializes to an object.
            _ => Ok(Map::new()),
        }
    }

    /// Pretty JSON with two-space indentation and sorted keys.
    pub fn to_pretty_json(&self) -> serde_json::Result<String> {
        let map = self.to_json_map()?;
        serde_json::to_string_pretty(&Value::Object(map))
    }
}

/// Push `entry` unless it is already present. Returns whether it was added.
pub fn push_unique(list: &mut Vec<String>, entry: &str) -> bool {
    if list.iter().any(|e| e == entry) {
        return false;
    }
    list.push(entry.to_string());
    true
}
