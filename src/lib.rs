//! scopegate: layered tool-permission and settings resolution.
//!
//! Decides whether a tool invocation is allowed by merging allow/deny rules
//! from four settings scopes with fixed precedence: `user < project < local
//! < policy`. The last matching rule in precedence order wins; no match is a
//! denial. This crate is a decision oracle only: it enforces nothing.
//!
//! # Architecture
//!
//! - **[`settings`]**: Scope files: locations, mtime-cached reads, read-merge-write persistence.
//! - **[`eval`]**: Rules: extraction from documents, resolution, ignore/allow list filters.
//! - **[`service`]**: [`PermissionService`]: the query and mutation surface.
//! - **[`recovery`]**: Reset-or-exit flow for corrupt settings files.
//! - **[`config`]**: Engine configuration: embedded defaults + user overlay merge.
//! - **[`logging`]**: Logger setup and decision records.

/// Engine configuration types, loading, and overlay merge logic.
pub mod config;
/// Error taxonomy.
pub mod error;
/// Rule types, extraction, and resolution.
pub mod eval;
/// Logger setup and decision logging.
pub mod logging;
/// Corrupt settings recovery.
pub mod recovery;
/// Permission queries and settings mutations over an injected store.
pub mod service;
/// Per-scope settings documents.
pub mod settings;

pub use error::{CorruptionError, InvalidConfigKeyError, Result, SettingsError};
pub use service::PermissionService;
pub use settings::Scope;
