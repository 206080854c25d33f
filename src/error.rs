//! Error taxonomy for settings resolution and persistence.
//!
//! A denied permission is never an error: it is a `false` decision. Errors
//! here are either recoverable (`Corrupt`, routed to [`crate::recovery`]),
//! user-facing (`InvalidKey`), or fatal filesystem conditions.

use std::path::PathBuf;

use thiserror::Error;

use crate::settings::{Scope, SettingsDocument};

pub type Result<T> = std::result::Result<T, SettingsError>;

/// A scope file exists but does not hold a well-formed settings object.
#[derive(Debug, Clone, Error)]
#[error("{scope} settings at {} are not valid JSON: {message}", .path.display())]
pub struct CorruptionError {
    pub scope: Scope,
    pub path: PathBuf,
    /// Parser message, verbatim.
    pub message: String,
    /// What the file is reset to if the user chooses to recover.
    pub default_document: SettingsDocument,
}

/// A config key was requested that is not valid for the given scope.
#[derive(Debug, Clone, Error)]
#[error(
    "'{key}' is not a valid {scope} config key. Valid keys are: {}",
    .valid_keys.join(", ")
)]
pub struct InvalidConfigKeyError {
    pub key: String,
    pub scope: &'static str,
    pub valid_keys: Vec<&'static str>,
}

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error(transparent)]
    Corrupt(#[from] CorruptionError),

    #[error(transparent)]
    InvalidKey(#[from] InvalidConfigKeyError),

    #[error("no {0} settings location: not inside a project")]
    NoLocation(Scope),

    #[error("timed out waiting for settings lock {}", .0.display())]
    LockTimeout(PathBuf),

    #[error("{}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings data: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("recovery prompt failed: {0}")]
    Prompt(String),
}

impl SettingsError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SettingsError::Io {
            path: path.into(),
            source,
        }
    }

    /// The corruption details, if this error should be routed to recovery.
    pub fn as_corruption(&self) -> Option<&CorruptionError> {
        match self {
            SettingsError::Corrupt(e) => Some(e),
            _ => None,
        }
    }
}
