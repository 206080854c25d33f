//! Per-scope settings documents: locations, cached reads, and writes.

pub mod document;
pub mod keys;
pub mod lock;
pub mod locations;
pub mod scope;
pub mod store;
pub mod writer;

pub use document::{ProjectConfig, SettingsDocument, push_unique};
pub use keys::{ConfigKey, GlobalConfigKey, ProjectConfigKey};
pub use lock::LockOptions;
pub use locations::ScopePaths;
pub use scope::Scope;
pub use store::SettingsStore;
pub use writer::{SettingsPatch, SettingsWriter};
