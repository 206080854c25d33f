//! Typed config keys.
//!
//! Global keys live at the top level of the user document. Project keys live
//! in the user document under `projects[route_key]`. Each key set is a closed
//! enum: an unknown name fails at parse time with the list of valid keys.

use std::str::FromStr;

use serde_json::Value;

use crate::error::{InvalidConfigKeyError, Result};

use super::{ProjectConfig, SettingsDocument, SettingsPatch};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalConfigKey {
    Theme,
    Verbose,
    PreferredNotifChannel,
    EditorMode,
    AutoUpdaterStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProjectConfigKey {
    AllowedTools,
    IgnorePatterns,
    DontCrawlDirectory,
    EnableArchitectTool,
    HasTrustDialogAccepted,
    HasCompletedProjectOnboarding,
}

/// A config key together with the scope it belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKey {
    Global(GlobalConfigKey),
    Project(ProjectConfigKey),
}

impl ConfigKey {
    /// Parse `key` against the global or project key set.
    pub fn parse(key: &str, global: bool) -> std::result::Result<Self, InvalidConfigKeyError> {
        if global {
            key.parse().map(ConfigKey::Global)
        } else {
            key.parse().map(ConfigKey::Project)
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ConfigKey::Global(k) => k.as_str(),
            ConfigKey::Project(k) => k.as_str(),
        }
    }
}

impl GlobalConfigKey {
    pub const ALL: [GlobalConfigKey; 5] = [
        GlobalConfigKey::Theme,
        GlobalConfigKey::Verbose,
        GlobalConfigKey::PreferredNotifChannel,
        GlobalConfigKey::EditorMode,
        GlobalConfigKey::AutoUpdaterStatus,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            GlobalConfigKey::Theme => "theme",
            GlobalConfigKey::Verbose => "verbose",
            GlobalConfigKey::PreferredNotifChannel => "preferredNotifChannel",
            GlobalConfigKey::EditorMode => "editorMode",
            GlobalConfigKey::AutoUpdaterStatus => "autoUpdaterStatus",
        }
    }

    /// The stored value, or the built-in default when unset.
    pub fn get(self, doc: &SettingsDocument) -> Value {
        match self {
            GlobalConfigKey::Theme => doc.theme.as_deref().unwrap_or("dark").into(),
            GlobalConfigKey::Verbose => doc.verbose.unwrap_or(false).into(),
            GlobalConfigKey::PreferredNotifChannel => {
                doc.preferred_notif_channel.as_deref().unwrap_or("auto").into()
            }
            GlobalConfigKey::EditorMode => doc.editor_mode.as_deref().unwrap_or("normal").into(),
            GlobalConfigKey::AutoUpdaterStatus => doc
                .auto_updater_status
                .as_deref()
                .unwrap_or("not_configured")
                .into(),
        }
    }

    /// A patch storing `value` under this key, rejecting values of the wrong type.
    pub fn patch(self, value: Value) -> Result<SettingsPatch> {
        let patch = SettingsPatch::new();
        Ok(match self {
            GlobalConfigKey::Verbose => {
                patch.set(self.as_str(), serde_json::from_value::<bool>(value)?)
            }
            _ => patch.set(self.as_str(), serde_json::from_value::<String>(value)?),
        })
    }
}

impl ProjectConfigKey {
    pub const ALL: [ProjectConfigKey; 6] = [
        ProjectConfigKey::AllowedTools,
        ProjectConfigKey::IgnorePatterns,
        ProjectConfigKey::DontCrawlDirectory,
        ProjectConfigKey::EnableArchitectTool,
        ProjectConfigKey::HasTrustDialogAccepted,
        ProjectConfigKey::HasCompletedProjectOnboarding,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            ProjectConfigKey::AllowedTools => "allowedTools",
            ProjectConfigKey::IgnorePatterns => "ignorePatterns",
            ProjectConfigKey::DontCrawlDirectory => "dontCrawlDirectory",
            ProjectConfigKey::EnableArchitectTool => "enableArchitectTool",
            ProjectConfigKey::HasTrustDialogAccepted => "hasTrustDialogAccepted",
            ProjectConfigKey::HasCompletedProjectOnboarding => "hasCompletedProjectOnboarding",
        }
    }

    pub fn get(self, project: &ProjectConfig) -> Value {
        match self {
            ProjectConfigKey::AllowedTools => project.allowed_tools.clone().into(),
            ProjectConfigKey::IgnorePatterns => project.ignore_patterns.clone().into(),
            ProjectConfigKey::DontCrawlDirectory => {
                project.dont_crawl_directory.unwrap_or(false).into()
            }
            ProjectConfigKey::EnableArchitectTool => {
                project.enable_architect_tool.unwrap_or(false).into()
            }
            ProjectConfigKey::HasTrustDialogAccepted => {
                project.has_trust_dialog_accepted.unwrap_or(false).into()
            }
            ProjectConfigKey::HasCompletedProjectOnboarding => {
                project.has_completed_project_onboarding.unwrap_or(false).into()
            }
        }
    }

    /// Store `value` into `project`, rejecting values of the wrong type.
    pub fn set(self, project: &mut ProjectConfig, value: Value) -> Result<()> {
        match self {
            ProjectConfigKey::AllowedTools => project.allowed_tools = serde_json::from_value(value)?,
            ProjectConfigKey::IgnorePatterns => {
                project.ignore_patterns = serde_json::from_value(value)?
            }
            ProjectConfigKey::DontCrawlDirectory => {
                project.dont_crawl_directory = Some(serde_json::from_value(value)?)
            }
            ProjectConfigKey::EnableArchitectTool => {
                project.enable_architect_tool = Some(serde_json::from_value(value)?)
            }
            ProjectConfigKey::HasTrustDialogAccepted => {
                project.has_trust_dialog_accepted = Some(serde_json::from_value(value)?)
            }
            ProjectConfigKey::HasCompletedProjectOnboarding => {
                project.has_completed_project_onboarding = Some(serde_json::from_value(value)?)
            }
        }
        Ok(())
    }
}

impl FromStr for GlobalConfigKey {
    type Err = InvalidConfigKeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InvalidConfigKeyError {
                key: s.to_string(),
                scope: "global",
                valid_keys: Self::ALL.iter().map(|k| k.as_str()).collect(),
            })
    }
}

impl FromStr for ProjectConfigKey {
    type Err = InvalidConfigKeyError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| InvalidConfigKeyError {
                key: s.to_string(),
                scope: "project",
                valid_keys: Self::ALL.iter().map(|k| k.as_str()).collect(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_sets_differ_by_scope() {
        assert_eq!(
            ConfigKey::parse("theme", true).unwrap(),
            ConfigKey::Global(GlobalConfigKey::Theme)
        );
        assert!(ConfigKey::parse("theme", false).is_err());
        assert_eq!(
            ConfigKey::parse("allowedTools", false).unwrap(),
            ConfigKey::Project(ProjectConfigKey::AllowedTools)
        );
        assert!(ConfigKey::parse("allowedTools", true).is_err());
    }

    #[test]
    fn unknown_key_lists_valid_keys() {
        let err = ConfigKey::parse("colour", true).unwrap_err();
        assert_eq!(err.key, "colour");
        assert_eq!(err.scope, "global");
        assert!(err.valid_keys.contains(&"theme"));
        assert!(err.to_string().contains("Valid keys are: theme, verbose"));
    }

    #[test]
    fn names_round_trip() {
        for key in GlobalConfigKey::ALL {
            assert_eq!(key.as_str().parse::<GlobalConfigKey>().unwrap(), key);
        }
        for key in ProjectConfigKey::ALL {
            assert_eq!(key.as_str().parse::<ProjectConfigKey>().unwrap(), key);
        }
    }

    #[test]
    fn global_defaults_when_unset() {
        let doc = SettingsDocument::default();
        assert_eq!(GlobalConfigKey::Theme.get(&doc), Value::from("dark"));
        assert_eq!(GlobalConfigKey::Verbose.get(&doc), Value::from(false));
        assert_eq!(GlobalConfigKey::EditorMode.get(&doc), Value::from("normal"));
    }

    #[test]
    fn global_patch_checks_types() {
        assert!(GlobalConfigKey::Verbose.patch(Value::from(true)).is_ok());
        assert!(GlobalConfigKey::Verbose.patch(Value::from("yes")).is_err());
        assert_eq!(
            GlobalConfigKey::Theme.patch(Value::from("light")).unwrap(),
            SettingsPatch::new().set("theme", "light")
        );
    }

    #[test]
    fn project_set_checks_types() {
        let mut project = ProjectConfig::default();
        ProjectConfigKey::HasTrustDialogAccepted
            .set(&mut project, Value::from(true))
            .unwrap();
        assert_eq!(project.has_trust_dialog_accepted, Some(true));
        assert!(
            ProjectConfigKey::AllowedTools
                .set(&mut project, Value::from("bash"))
                .is_err()
        );
        assert_eq!(
            ProjectConfigKey::HasTrustDialogAccepted.get(&project),
            Value::from(true)
        );
    }
}
