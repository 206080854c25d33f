//! Interactive recovery from a corrupt settings file.
//!
//! Reset overwrites the file with its scope's default document. Exit leaves
//! the file untouched for manual inspection; the binary then terminates.

use dialoguer::{Select, theme::ColorfulTheme};
use log::{info, warn};

use crate::error::{CorruptionError, Result, SettingsError};
use crate::settings::SettingsStore;
use crate::settings::writer::write_document;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryChoice {
    Reset,
    Exit,
}

/// Asks the user how to handle a corrupt file.
pub trait RecoveryPrompt {
    fn choose(&mut self, error: &CorruptionError) -> Result<RecoveryChoice>;
}

/// Arrow-key selection on the terminal.
pub struct TerminalPrompt;

impl RecoveryPrompt for TerminalPrompt {
    fn choose(&mut self, error: &CorruptionError) -> Result<RecoveryChoice> {
        eprintln!(
            "The {} settings file at {} contains invalid JSON.\n  {}",
            error.scope,
            error.path.display(),
            error.message
        );
        let items = ["Reset with default configuration", "Exit and fix manually"];
        let selection = Select::with_theme(&ColorfulTheme::default())
            .with_prompt("How would you like to proceed?")
            .items(&items)
            .default(1)
            .interact()
            .map_err(|e| SettingsError::Prompt(e.to_string()))?;

        Ok(if selection == 0 {
            RecoveryChoice::Reset
        } else {
            RecoveryChoice::Exit
        })
    }
}

/// Run the recovery flow for `error`.
///
/// Policy files are never rewritten, so their corruption always resolves
/// to [`RecoveryChoice::Exit`] without prompting.
pub fn recover(
    store: &mut SettingsStore,
    error: &CorruptionError,
    prompt: &mut dyn RecoveryPrompt,
) -> Result<RecoveryChoice> {
    if error.scope.is_read_only() {
        warn!(
            "{} settings at {} are corrupt and read-only",
            error.scope,
            error.path.display()
        );
        return Ok(RecoveryChoice::Exit);
    }

    let choice = prompt.choose(error)?;
    match choice {
        RecoveryChoice::Reset => {
            write_document(&error.path, &error.default_document)?;
            store.invalidate(error.scope);
            info!("reset {} settings at {}", error.scope, error.path.display());
        }
        RecoveryChoice::Exit => {
            warn!("left corrupt {} settings at {}", error.scope, error.path.display());
        }
    }
    Ok(choice)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::{Scope, ScopePaths, SettingsDocument};
    use std::fs;
    use tempfile::TempDir;

    struct Scripted(RecoveryChoice, usize);

    impl RecoveryPrompt for Scripted {
        fn choose(&mut self, _error: &CorruptionError) -> Result<RecoveryChoice> {
            self.1 += 1;
            Ok(self.0)
        }
    }

    fn corrupt_user_store(temp: &TempDir) -> (SettingsStore, CorruptionError) {
        let user_dir = temp.path().join("user");
        fs::create_dir(&user_dir).unwrap();
        fs::write(user_dir.join("settings.json"), "{\"theme\": ").unwrap();
        let mut store = SettingsStore::new(ScopePaths::new(
            &user_dir,
            None,
            temp.path().join("policy.json"),
        ));
        let err = store.get(Scope::User).unwrap_err();
        let corruption = err.as_corruption().cloned().unwrap();
        (store, corruption)
    }

    #[test]
    fn reset_restores_default_document() {
        let temp = TempDir::new().unwrap();
        let (mut store, corruption) = corrupt_user_store(&temp);
        let mut prompt = Scripted(RecoveryChoice::Reset, 0);

        let choice = recover(&mut store, &corruption, &mut prompt).unwrap();
        assert_eq!(choice, RecoveryChoice::Reset);

        let content = fs::read_to_string(&corruption.path).unwrap();
        let parsed: SettingsDocument = serde_json::from_str(&content).unwrap();
        assert_eq!(parsed, SettingsDocument::default_for(Scope::User));
        assert_eq!(store.get(Scope::User).unwrap(), parsed);
    }

    #[test]
    fn exit_leaves_file_untouched() {
        let temp = TempDir::new().unwrap();
        let (mut store, corruption) = corrupt_user_store(&temp);
        let mut prompt = Scripted(RecoveryChoice::Exit, 0);

        let choice = recover(&mut store, &corruption, &mut prompt).unwrap();
        assert_eq!(choice, RecoveryChoice::Exit);
        assert_eq!(fs::read_to_string(&corruption.path).unwrap(), "{\"theme\": ");
        assert!(store.get(Scope::User).is_err());
    }

    #[test]
    fn corrupt_policy_exits_without_prompting() {
        let temp = TempDir::new().unwrap();
        let policy = temp.path().join("policy.json");
        fs::write(&policy, "nope").unwrap();
        let mut store = SettingsStore::new(ScopePaths::new(temp.path(), None, &policy));
        let err = store.get(Scope::Policy).unwrap_err();
        let mut prompt = Scripted(RecoveryChoice::Reset, 0);

        let choice = recover(&mut store, err.as_corruption().unwrap(), &mut prompt).unwrap();
        assert_eq!(choice, RecoveryChoice::Exit);
        assert_eq!(prompt.1, 0);
        assert_eq!(fs::read_to_string(&policy).unwrap(), "nope");
    }
}
