//! Persists a mutation to exactly one scope.
//!
//! Every save re-reads the scope file, shallow-merges the patch over it,
//! and replaces the file. Writing `local` also registers the file in the
//! project's ignore file.

use std::io::Write;
use std::path::Path;

use log::{debug, info};
use serde_json::{Map, Value};
use tempfile::NamedTempFile;

use crate::error::{Result, SettingsError};

use super::lock::{LockOptions, SettingsLock};
use super::{Scope, ScopePaths, SettingsDocument, SettingsStore};

/// Top-level keys to overwrite in a settings document. Arrays and objects
/// are replaced wholesale, never concatenated.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SettingsPatch(Map<String, Value>);

impl SettingsPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    pub fn allowed_tools(self, tools: Vec<String>) -> Self {
        self.set("allowedTools", tools)
    }

    pub fn denied_tools(self, tools: Vec<String>) -> Self {
        self.set("deniedTools", tools)
    }

    pub fn ignore_patterns(self, patterns: Vec<String>) -> Self {
        self.set("ignorePatterns", patterns)
    }

    pub fn denied_ignore_patterns(self, patterns: Vec<String>) -> Self {
        self.set("deniedIgnorePatterns", patterns)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Shallow merge: patch keys win.
    fn apply(&self, base: &mut Map<String, Value>) {
        for (key, value) in &self.0 {
            base.insert(key.clone(), value.clone());
        }
    }
}

impl From<Map<String, Value>> for SettingsPatch {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

#[derive(Debug, Clone, Default)]
pub struct SettingsWriter {
    lock: LockOptions,
}

impl SettingsWriter {
    pub fn new(lock: LockOptions) -> Self {
        Self { lock }
    }

    /// Merge `patch` into `scope`'s file. A no-op for `policy`.
    pub fn save(&self, store: &mut SettingsStore, scope: Scope, patch: &SettingsPatch) -> Result<()> {
        self.modify(store, scope, |current| {
            let mut merged = current.to_json_map()?;
            patch.apply(&mut merged);
            // Round-trip through the typed document so a bad patch fails here,
            // not on the next read.
            Ok(Some(serde_json::from_value(Value::Object(merged))?))
        })?;
        Ok(())
    }

    /// Edit `scope`'s document in place under the lock. `edit` sees the copy
    /// just read from disk and returns whether it changed anything; nothing
    /// is written when it returns false. Returns whether the file was written.
    pub fn update<F>(&self, store: &mut SettingsStore, scope: Scope, edit: F) -> Result<bool>
    where
        F: FnOnce(&mut SettingsDocument) -> Result<bool>,
    {
        self.modify(store, scope, |mut current| {
            Ok(edit(&mut current)?.then_some(current))
        })
    }

    fn modify<F>(&self, store: &mut SettingsStore, scope: Scope, change: F) -> Result<bool>
    where
        F: FnOnce(SettingsDocument) -> Result<Option<SettingsDocument>>,
    {
        if scope.is_read_only() {
            debug!("ignoring write to read-only {scope} settings");
            return Ok(false);
        }

        let path = store
            .paths()
            .path_for(scope)
            .ok_or(SettingsError::NoLocation(scope))?;
        ensure_parent_dir(&path)?;

        let _lock = SettingsLock::acquire(&path, &self.lock)?;

        // The on-disk copy is authoritative, not whatever we cached.
        store.invalidate(scope);
        let current = store.get(scope)?;
        let Some(document) = change(current)? else {
            return Ok(false);
        };
        write_document(&path, &document)?;
        store.invalidate(scope);
        info!("saved {scope} settings to {}", path.display());

        if scope == Scope::Local {
            ensure_ignored(store.paths())?;
        }
        Ok(true)
    }
}

/// Create the settings directory itself. Ancestors must already exist.
fn ensure_parent_dir(path: &Path) -> Result<()> {
    let Some(dir) = path.parent() else {
        return Ok(());
    };
    if dir.as_os_str().is_empty() {
        return Ok(());
    }
    match std::fs::create_dir(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(SettingsError::io(dir, e)),
    }
}

/// Replace `path` with `document` as pretty JSON via a temp file + rename.
pub(crate) fn write_document(path: &Path, document: &SettingsDocument) -> Result<()> {
    let content = document.to_pretty_json()?;
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let mut tmp = NamedTempFile::new_in(dir).map_err(|e| SettingsError::io(dir, e))?;
    tmp.write_all(content.as_bytes())
        .map_err(|e| SettingsError::io(tmp.path(), e))?;
    tmp.persist(path)
        .map_err(|e| SettingsError::io(path, e.error))?;
    Ok(())
}

/// Append the local settings file to the project ignore file unless it is
/// already listed.
fn ensure_ignored(paths: &ScopePaths) -> Result<()> {
    let Some(ignore_path) = paths.ignore_file_path() else {
        return Ok(());
    };
    let entry = paths.local_ignore_entry();

    let existing = match std::fs::read_to_string(&ignore_path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
        Err(e) => return Err(SettingsError::io(&ignore_path, e)),
    };
    if is_listed(&existing, &entry) {
        return Ok(());
    }

    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&ignore_path)
        .map_err(|e| SettingsError::io(&ignore_path, e))?;
    let separator = if existing.is_empty() || existing.ends_with('\n') {
        ""
    } else {
        "\n"
    };
    writeln!(file, "{separator}{entry}").map_err(|e| SettingsError::io(&ignore_path, e))?;
    info!("added {entry} to {}", ignore_path.display());
    Ok(())
}

fn is_listed(ignore_file: &str, entry: &str) -> bool {
    ignore_file.lines().map(str::trim).any(|line| {
        line == entry || line.strip_prefix('/') == Some(entry)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::path::PathBuf;
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        store: SettingsStore,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let root = temp.path().join("repo");
            fs::create_dir(&root).unwrap();
            let store = SettingsStore::new(ScopePaths::new(
                temp.path().join("user"),
                Some(root),
                temp.path().join("policy.json"),
            ));
            Self { temp, store }
        }

        fn path(&self, rel: &str) -> PathBuf {
            self.temp.path().join(rel)
        }
    }

    fn writer() -> SettingsWriter {
        SettingsWriter::new(LockOptions::default())
    }

    #[test]
    fn creates_settings_dir_and_file() {
        let mut fx = Fixture::new();
        let patch = SettingsPatch::new().allowed_tools(vec!["bash".into()]);
        writer().save(&mut fx.store, Scope::Project, &patch).unwrap();

        let content = fs::read_to_string(fx.path("repo/.scopegate/settings.json")).unwrap();
        assert_eq!(
            content,
            "{\n  \"allowedTools\": [\n    \"bash\"\n  ],\n  \"ignorePatterns\": []\n}"
        );
    }

    #[test]
    fn patch_keys_win_and_others_survive() {
        let mut fx = Fixture::new();
        fs::create_dir(fx.path("repo/.scopegate")).unwrap();
        fs::write(
            fx.path("repo/.scopegate/settings.json"),
            r#"{"allowedTools": ["bash", "edit"], "ignorePatterns": ["*.log"], "custom": {"a": 1}}"#,
        )
        .unwrap();

        let patch = SettingsPatch::new().allowed_tools(vec!["read".into()]);
        writer().save(&mut fx.store, Scope::Project, &patch).unwrap();

        let doc = fx.store.get(Scope::Project).unwrap();
        assert_eq!(doc.allowed_tools, vec!["read"]);
        assert_eq!(doc.ignore_patterns, vec!["*.log"]);
        assert!(doc.extra.contains_key("custom"));
    }

    #[test]
    fn saving_twice_is_idempotent() {
        let mut fx = Fixture::new();
        let patch = SettingsPatch::new().allowed_tools(vec!["bash".into()]);
        writer().save(&mut fx.store, Scope::Local, &patch).unwrap();
        let once = fs::read_to_string(fx.path("repo/.scopegate/settings.local.json")).unwrap();
        writer().save(&mut fx.store, Scope::Local, &patch).unwrap();
        let twice = fs::read_to_string(fx.path("repo/.scopegate/settings.local.json")).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn policy_is_never_written() {
        let mut fx = Fixture::new();
        fs::write(fx.path("policy.json"), r#"{"allowedTools": ["bash"]}"#).unwrap();
        let patch = SettingsPatch::new().allowed_tools(vec!["everything".into()]);
        writer().save(&mut fx.store, Scope::Policy, &patch).unwrap();
        assert_eq!(
            fs::read_to_string(fx.path("policy.json")).unwrap(),
            r#"{"allowedTools": ["bash"]}"#
        );
    }

    #[test]
    fn local_write_registers_ignore_entry_once() {
        let mut fx = Fixture::new();
        fs::write(fx.path("repo/.gitignore"), "target").unwrap();
        let patch = SettingsPatch::new().allowed_tools(vec!["bash".into()]);
        writer().save(&mut fx.store, Scope::Local, &patch).unwrap();
        writer().save(&mut fx.store, Scope::Local, &patch).unwrap();

        let ignore = fs::read_to_string(fx.path("repo/.gitignore")).unwrap();
        assert_eq!(ignore, "target\n.scopegate/settings.local.json\n");
    }

    #[test]
    fn project_write_leaves_ignore_file_alone() {
        let mut fx = Fixture::new();
        let patch = SettingsPatch::new().allowed_tools(vec!["bash".into()]);
        writer().save(&mut fx.store, Scope::Project, &patch).unwrap();
        assert!(!fx.path("repo/.gitignore").exists());
    }

    #[test]
    fn project_write_without_root_fails() {
        let temp = TempDir::new().unwrap();
        let mut store = SettingsStore::new(ScopePaths::new(
            temp.path().join("user"),
            None,
            temp.path().join("policy.json"),
        ));
        let err = writer()
            .save(&mut store, Scope::Project, &SettingsPatch::new())
            .unwrap_err();
        assert!(matches!(err, SettingsError::NoLocation(Scope::Project)));
    }

    #[test]
    fn ill_typed_patch_is_rejected_before_writing() {
        let mut fx = Fixture::new();
        let patch = SettingsPatch::new().set("allowedTools", "bash");
        assert!(writer().save(&mut fx.store, Scope::Project, &patch).is_err());
        assert!(!fx.path("repo/.scopegate/settings.json").exists());
    }

    #[test]
    fn write_into_corrupt_file_reports_corruption() {
        let mut fx = Fixture::new();
        fs::create_dir(fx.path("repo/.scopegate")).unwrap();
        fs::write(fx.path("repo/.scopegate/settings.json"), "{{{").unwrap();
        let err = writer()
            .save(&mut fx.store, Scope::Project, &SettingsPatch::new())
            .unwrap_err();
        assert!(err.as_corruption().is_some());
    }

    #[test]
    fn update_edits_fresh_copy() {
        let mut fx = Fixture::new();
        // Prime the cache, then change the file behind the store's back.
        let patch = SettingsPatch::new().allowed_tools(vec!["bash".into()]);
        writer().save(&mut fx.store, Scope::Project, &patch).unwrap();
        fx.store.get(Scope::Project).unwrap();
        fs::write(
            fx.path("repo/.scopegate/settings.json"),
            r#"{"allowedTools": ["bash", "edit"]}"#,
        )
        .unwrap();

        let written = writer()
            .update(&mut fx.store, Scope::Project, |doc| {
                doc.allowed_tools.push("read".into());
                Ok(true)
            })
            .unwrap();
        assert!(written);
        assert_eq!(
            fx.store.get(Scope::Project).unwrap().allowed_tools,
            vec!["bash", "edit", "read"]
        );
    }

    #[test]
    fn update_without_change_writes_nothing() {
        let mut fx = Fixture::new();
        let written = writer()
            .update(&mut fx.store, Scope::Local, |_| Ok(false))
            .unwrap();
        assert!(!written);
        assert!(!fx.path("repo/.scopegate/settings.local.json").exists());
        assert!(!fx.path("repo/.gitignore").exists());
    }

    #[test]
    fn update_on_policy_skips_the_edit() {
        let mut fx = Fixture::new();
        let written = writer()
            .update(&mut fx.store, Scope::Policy, |_| panic!("policy is never edited"))
            .unwrap();
        assert!(!written);
    }

    #[test]
    fn existing_settings_dir_is_not_an_error() {
        let fx = Fixture::new();
        let target = fx.path("repo/.scopegate/settings.json");
        ensure_parent_dir(&target).unwrap();
        ensure_parent_dir(&target).unwrap();
        assert!(fx.path("repo/.scopegate").is_dir());
    }

    #[test]
    fn is_listed_accepts_rooted_entries() {
        assert!(is_listed("/.scopegate/settings.local.json\n", ".scopegate/settings.local.json"));
        assert!(is_listed("  .scopegate/settings.local.json  ", ".scopegate/settings.local.json"));
        assert!(!is_listed(".scopegate/\n", ".scopegate/settings.local.json"));
    }
}
