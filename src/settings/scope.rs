use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A configuration layer. Ordering is ascending precedence:
/// `User < Project < Local < Policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    /// Global per-user defaults.
    User,
    /// Checked into the repository.
    Project,
    /// Machine-specific, excluded from version control.
    Local,
    /// Administrator-managed. Never written by this crate.
    Policy,
}

impl Scope {
    /// All scopes in ascending precedence.
    pub const ALL: [Scope; 4] = [Scope::User, Scope::Project, Scope::Local, Scope::Policy];

    pub fn as_str(self) -> &'static str {
        match self {
            Scope::User => "user",
            Scope::Project => "project",
            Scope::Local => "local",
            Scope::Policy => "policy",
        }
    }

    /// Name used when a rule's origin is reported (e.g. `localSettings`).
    pub fn source_name(self) -> &'static str {
        match self {
            Scope::User => "userSettings",
            Scope::Project => "projectSettings",
            Scope::Local => "localSettings",
            Scope::Policy => "policySettings",
        }
    }

    pub fn is_read_only(self) -> bool {
        self == Scope::Policy
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Scope {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" | "global" | "userSettings" => Ok(Scope::User),
            "project" | "projectSettings" => Ok(Scope::Project),
            "local" | "localSettings" => Ok(Scope::Local),
            "policy" | "policySettings" => Ok(Scope::Policy),
            other => Err(format!("unknown scope: {other}")),
        }
    }
}
