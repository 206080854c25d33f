//! Settings file location discovery.
//!
//! - User: `<config dir>/scopegate/settings.json`
//! - Project: `<root>/.scopegate/settings.json`
//! - Local: `<root>/.scopegate/settings.local.json`
//! - Policy: `/etc/scopegate/managed-settings.json`

use std::path::{Path, PathBuf};

use crate::config::{Config, expand_path};

use super::Scope;

#[derive(Debug, Clone)]
pub struct ScopePaths {
    pub user_dir: PathBuf,
    pub project_root: Option<PathBuf>,
    pub policy_file: PathBuf,
    pub app_dir: String,
    pub settings_file: String,
    pub local_settings_file: String,
    pub ignore_file: String,
}

impl ScopePaths {
    /// Resolve locations from configuration, discovering the project root
    /// upwards from `cwd`.
    pub fn from_config(config: &Config, cwd: impl AsRef<Path>) -> Self {
        let app_dir = config.paths.app_dir.clone();
        let project_root = find_project_root(cwd.as_ref(), &app_dir);
        Self {
            user_dir: config.user_dir(),
            project_root,
            policy_file: expand_path(&config.paths.policy_file),
            app_dir,
            settings_file: config.paths.settings_file.clone(),
            local_settings_file: config.paths.local_settings_file.clone(),
            ignore_file: config.paths.ignore_file.clone(),
        }
    }

    /// Explicit locations with default file names. Used by tests and embedders
    /// that manage their own directories.
    pub fn new(
        user_dir: impl Into<PathBuf>,
        project_root: Option<PathBuf>,
        policy_file: impl Into<PathBuf>,
    ) -> Self {
        let config = Config::default_config();
        Self {
            user_dir: user_dir.into(),
            project_root,
            policy_file: policy_file.into(),
            app_dir: config.paths.app_dir,
            settings_file: config.paths.settings_file,
            local_settings_file: config.paths.local_settings_file,
            ignore_file: config.paths.ignore_file,
        }
    }

    /// The settings file for `scope`, or `None` for project/local scopes
    /// outside any project.
    pub fn path_for(&self, scope: Scope) -> Option<PathBuf> {
        match scope {
            Scope::User => Some(self.user_dir.join(&self.settings_file)),
            Scope::Project => self
                .project_root
                .as_ref()
                .map(|root| root.join(&self.app_dir).join(&self.settings_file)),
            Scope::Local => self
                .project_root
                .as_ref()
                .map(|root| root.join(&self.app_dir).join(&self.local_settings_file)),
            Scope::Policy => Some(self.policy_file.clone()),
        }
    }

    /// The local settings file relative to the project root, with `/`
    /// separators, as it should appear in an ignore file.
    pub fn local_ignore_entry(&self) -> String {
        format!("{}/{}", self.app_dir, self.local_settings_file)
    }

    /// The ignore file that local settings are registered in.
    pub fn ignore_file_path(&self) -> Option<PathBuf> {
        self.project_root
            .as_ref()
            .map(|root| root.join(&self.ignore_file))
    }

    /// Stable key identifying the current project inside `projects` maps.
    pub fn route_key(&self) -> Option<String> {
        self.project_root
            .as_ref()
            .map(|root| root.to_string_lossy().into_owned())
    }
}

/// Walk up from `start` to the nearest directory holding `app_dir` or `.git`.
fn find_project_root(start: &Path, app_dir: &str) -> Option<PathBuf> {
    let mut current = if start.is_absolute() {
        start.to_path_buf()
    } else {
        std::env::current_dir().ok()?.join(start)
    };

    loop {
        if current.join(app_dir).is_dir() || current.join(".git").exists() {
            return Some(current);
        }
        if !current.pop() {
            return None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn scope_paths_layout() {
        let paths = ScopePaths::new(
            "/home/u/.config/scopegate",
            Some(PathBuf::from("/repo")),
            "/etc/scopegate/managed-settings.json",
        );
        assert_eq!(
            paths.path_for(Scope::User).unwrap(),
            PathBuf::from("/home/u/.config/scopegate/settings.json")
        );
        assert_eq!(
            paths.path_for(Scope::Project).unwrap(),
            PathBuf::from("/repo/.scopegate/settings.json")
        );
        assert_eq!(
            paths.path_for(Scope::Local).unwrap(),
            PathBuf::from("/repo/.scopegate/settings.local.json")
        );
        assert_eq!(
            paths.path_for(Scope::Policy).unwrap(),
            PathBuf::from("/etc/scopegate/managed-settings.json")
        );
        assert_eq!(paths.local_ignore_entry(), ".scopegate/settings.local.json");
        assert_eq!(paths.route_key().as_deref(), Some("/repo"));
    }

    #[test]
    fn no_project_root_means_no_project_paths() {
        let paths = ScopePaths::new("/u", None, "/etc/p.json");
        assert!(paths.path_for(Scope::Project).is_none());
        assert!(paths.path_for(Scope::Local).is_none());
        assert!(paths.ignore_file_path().is_none());
        assert!(paths.path_for(Scope::User).is_some());
    }

    #[test]
    fn discovers_root_from_app_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".scopegate")).unwrap();
        let nested = temp.path().join("src/deep");
        fs::create_dir_all(&nested).unwrap();

        let paths = ScopePaths::from_config(&Config::default_config(), &nested);
        assert_eq!(paths.project_root, Some(temp.path().to_path_buf()));
    }

    #[test]
    fn discovers_root_from_git_dir() {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();

        let paths = ScopePaths::from_config(&Config::default_config(), temp.path());
        assert_eq!(paths.project_root, Some(temp.path().to_path_buf()));
    }
}
