use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Embedded default configuration.
const DEFAULT_CONFIG: &str = include_str!("../config.default.toml");

// ── Final (merged) config types ──

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub writer: WriterConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct PathsConfig {
    #[serde(default)]
    pub app_dir: String,
    #[serde(default)]
    pub settings_file: String,
    #[serde(default)]
    pub local_settings_file: String,
    #[serde(default)]
    pub policy_file: String,
    #[serde(default)]
    pub ignore_file: String,
    /// Overrides the user settings directory. `~` and `$VAR` are expanded.
    #[serde(default)]
    pub user_dir: Option<String>,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct WriterConfig {
    #[serde(default)]
    pub lock: bool,
    #[serde(default)]
    pub lock_retries: u32,
    #[serde(default)]
    pub lock_retry_ms: u64,
    #[serde(default)]
    pub stale_lock_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Default)]
pub struct LoggingConfig {
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub level: String,
}

// ── Overlay types (user config that merges with defaults) ──

#[derive(Debug, Deserialize, Default)]
struct ConfigOverlay {
    #[serde(default)]
    paths: PathsOverlay,
    #[serde(default)]
    writer: WriterOverlay,
    #[serde(default)]
    logging: LoggingOverlay,
}

#[derive(Debug, Deserialize, Default)]
struct PathsOverlay {
    app_dir: Option<String>,
    settings_file: Option<String>,
    local_settings_file: Option<String>,
    policy_file: Option<String>,
    ignore_file: Option<String>,
    user_dir: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct WriterOverlay {
    lock: Option<bool>,
    lock_retries: Option<u32>,
    lock_retry_ms: Option<u64>,
    stale_lock_secs: Option<u64>,
}

#[derive(Debug, Deserialize, Default)]
struct LoggingOverlay {
    verbose: Option<bool>,
    level: Option<String>,
}

// ── Merge logic ──

fn merge_scalar<T>(base: &mut T, value: Option<T>) {
    if let Some(v) = value {
        *base = v;
    }
}

/// Expand `~` and environment variables; fall back to the raw string.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(raw),
    }
}

impl Config {
    /// Load the default embedded configuration.
    pub fn default_config() -> Self {
        toml::from_str(DEFAULT_CONFIG).expect("embedded default config must parse")
    }

    /// Load configuration with resolution order:
    /// 1. Start with embedded defaults
    /// 2. Merge user overlay from ~/.config/scopegate/config.toml (if exists)
    ///
    /// Scalars in the overlay override; absent keys keep their defaults.
    pub fn load() -> Self {
        let mut config = Self::default_config();
        if let Some(overlay) = Self::load_overlay() {
            config.apply_overlay(overlay);
        }
        config
    }

    /// Try to load user overlay from ~/.config/scopegate/config.toml.
    fn load_overlay() -> Option<ConfigOverlay> {
        let path = dirs::config_dir()?.join("scopegate/config.toml");
        let content = std::fs::read_to_string(path).ok()?;
        match toml::from_str(&content) {
            Ok(overlay) => Some(overlay),
            Err(e) => {
                eprintln!("scopegate: config parse error: {e}");
                None
            }
        }
    }

    /// Apply an overlay on top of this config (merge semantics).
    fn apply_overlay(&mut self, overlay: ConfigOverlay) {
        let p = overlay.paths;
        merge_scalar(&mut self.paths.app_dir, p.app_dir);
        merge_scalar(&mut self.paths.settings_file, p.settings_file);
        merge_scalar(&mut self.paths.local_settings_file, p.local_settings_file);
        merge_scalar(&mut self.paths.policy_file, p.policy_file);
        merge_scalar(&mut self.paths.ignore_file, p.ignore_file);
        if p.user_dir.is_some() {
            self.paths.user_dir = p.user_dir;
        }

        let w = overlay.writer;
        merge_scalar(&mut self.writer.lock, w.lock);
        merge_scalar(&mut self.writer.lock_retries, w.lock_retries);
        merge_scalar(&mut self.writer.lock_retry_ms, w.lock_retry_ms);
        merge_scalar(&mut self.writer.stale_lock_secs, w.stale_lock_secs);

        let l = overlay.logging;
        merge_scalar(&mut self.logging.verbose, l.verbose);
        merge_scalar(&mut self.logging.level, l.level);
    }

    /// The user settings directory: the configured override, or
    /// `<platform config dir>/scopegate`.
    pub fn user_dir(&self) -> PathBuf {
        match &self.paths.user_dir {
            Some(raw) => expand_path(raw),
            None => dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("scopegate"),
        }
    }

    /// Apply an overlay from a TOML string. Used for testing.
    #[cfg(test)]
    fn apply_overlay_str(&mut self, toml_str: &str) {
        let overlay: ConfigOverlay = toml::from_str(toml_str).unwrap();
        self.apply_overlay(overlay);
    }
}
