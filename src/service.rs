//! Query and mutation surface consumed by the tool-execution path.

use std::path::Path;

use serde_json::Value;

use crate::config::Config;
use crate::error::{Result, SettingsError};
use crate::eval::{
    self, ResolvedDecision, Rule, RuleSet, RuleTarget, extract_project_rules, extract_rules,
};
use crate::logging;
use crate::settings::{
    ConfigKey, LockOptions, ProjectConfig, Scope, ScopePaths, SettingsDocument, SettingsPatch,
    SettingsStore, SettingsWriter, push_unique,
};

/// Answers permission questions from the current on-disk settings and
/// applies settings mutations.
#[derive(Debug)]
pub struct PermissionService {
    store: SettingsStore,
    writer: SettingsWriter,
}

impl PermissionService {
    pub fn new(store: SettingsStore, writer: SettingsWriter) -> Self {
        Self { store, writer }
    }

    /// Build from engine configuration, discovering the project from `cwd`.
    pub fn from_config(config: &Config, cwd: impl AsRef<Path>) -> Self {
        Self::new(
            SettingsStore::new(ScopePaths::from_config(config, cwd)),
            SettingsWriter::new(LockOptions::from_config(&config.writer)),
        )
    }

    pub fn store(&self) -> &SettingsStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut SettingsStore {
        &mut self.store
    }

    /// All rules from `scopes`, in precedence order. A user or policy
    /// document's entry for the current project contributes to its scope.
    pub fn rules(&mut self, scopes: &[Scope]) -> Result<RuleSet> {
        let route_key = self.store.paths().route_key();
        let mut rules = Vec::new();
        for (scope, doc) in self.store.get_many(scopes)? {
            rules.extend(extract_rules(scope, &doc));
            if let Some(project) = route_key.as_ref().and_then(|k| doc.projects.get(k)) {
                rules.extend(extract_project_rules(scope, project));
            }
        }
        Ok(RuleSet::new(rules))
    }

    /// Decide a tool request. `scopes` defaults to every scope.
    pub fn resolve(
        &mut self,
        tool_name: &str,
        rule_content: Option<&str>,
        scopes: Option<&[Scope]>,
    ) -> Result<ResolvedDecision> {
        let scopes = scopes.unwrap_or(&Scope::ALL);
        let decision = self.rules(scopes)?.resolve(tool_name, rule_content, scopes);
        logging::log_decision(tool_name, rule_content, &decision);
        Ok(decision)
    }

    pub fn is_tool_allowed(
        &mut self,
        tool_name: &str,
        rule_content: Option<&str>,
        scopes: Option<&[Scope]>,
    ) -> Result<bool> {
        Ok(self.resolve(tool_name, rule_content, scopes)?.allowed)
    }

    pub fn filter_ignore_patterns(&self, base_patterns: &[String], rules: &[Rule]) -> Vec<RuleTarget> {
        eval::filter_ignore_patterns(base_patterns, rules)
    }

    pub fn filter_allowed_tools(&self, base_tools: &[String], rules: &[Rule]) -> Vec<String> {
        eval::filter_allowed_tools(base_tools, rules)
    }

    /// `scope`'s declared ignore patterns after local un-ignores.
    pub fn effective_ignore_patterns(&mut self, scope: Scope) -> Result<Vec<RuleTarget>> {
        let doc = self.store.get(scope)?;
        let rules = self.rules(&Scope::ALL)?;
        Ok(eval::filter_ignore_patterns(&doc.ignore_patterns, rules.rules()))
    }

    /// `scope`'s declared allowed tools minus those local settings already grant.
    pub fn effective_allowed_tools(&mut self, scope: Scope) -> Result<Vec<String>> {
        let doc = self.store.get(scope)?;
        let rules = self.rules(&Scope::ALL)?;
        Ok(eval::filter_allowed_tools(&doc.allowed_tools, rules.rules()))
    }

    /// Merge `patch` into `scope`'s settings file. A no-op for policy.
    pub fn save_settings(&mut self, scope: Scope, patch: &SettingsPatch) -> Result<()> {
        self.writer.save(&mut self.store, scope, patch)
    }

    /// Append `entry` to `scope`'s allowed tools. Returns false if already
    /// present or `scope` is read-only.
    pub fn allow_tool(&mut self, scope: Scope, entry: &str) -> Result<bool> {
        self.writer.update(&mut self.store, scope, |doc| {
            Ok(push_unique(&mut doc.allowed_tools, entry))
        })
    }

    /// Append `entry` to `scope`'s denied tools. Returns false if already
    /// present or `scope` is read-only.
    pub fn deny_tool(&mut self, scope: Scope, entry: &str) -> Result<bool> {
        self.writer.update(&mut self.store, scope, |doc| {
            Ok(push_unique(&mut doc.denied_tools, entry))
        })
    }

    /// Read a config value: global keys from the user document, project
    /// keys from the user document's entry for the current project.
    pub fn get_config_value(&mut self, key: ConfigKey) -> Result<Value> {
        let user = self.store.get(Scope::User)?;
        Ok(match key {
            ConfigKey::Global(k) => k.get(&user),
            ConfigKey::Project(k) => k.get(&self.project_config(&user)),
        })
    }

    /// Write a config value through the settings writer.
    pub fn set_config_value(&mut self, key: ConfigKey, value: Value) -> Result<()> {
        match key {
            ConfigKey::Global(k) => self.save_settings(Scope::User, &k.patch(value)?),
            ConfigKey::Project(k) => {
                let route_key = self
                    .store
                    .paths()
                    .route_key()
                    .ok_or(SettingsError::NoLocation(Scope::Project))?;
                self.writer.update(&mut self.store, Scope::User, |user| {
                    let project = user.projects.entry(route_key).or_default();
                    k.set(project, value)?;
                    Ok(true)
                })?;
                Ok(())
            }
        }
    }

    fn project_config(&self, user: &SettingsDocument) -> ProjectConfig {
        self.store
            .paths()
            .route_key()
            .and_then(|k| user.projects.get(&k).cloned())
            .unwrap_or_default()
    }
}
