//! Advisory lock around a settings file's read-merge-write cycle.
//!
//! The lock is a sibling `<file>.lock` created exclusively and holding a
//! token unique to its holder. Only writers that go through
//! [`SettingsLock::acquire`] respect it.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use log::{debug, warn};

use crate::config::WriterConfig;
use crate::error::{Result, SettingsError};

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    pub enabled: bool,
    pub retries: u32,
    pub retry_delay: Duration,
    /// A lock file older than this is assumed abandoned and removed.
    pub stale_after: Duration,
}

impl LockOptions {
    pub fn from_config(config: &WriterConfig) -> Self {
        Self {
            enabled: config.lock,
            retries: config.lock_retries,
            retry_delay: Duration::from_millis(config.lock_retry_ms),
            stale_after: Duration::from_secs(config.stale_lock_secs),
        }
    }

    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }
}

impl Default for LockOptions {
    fn default() -> Self {
        Self {
            enabled: true,
            retries: 50,
            retry_delay: Duration::from_millis(20),
            stale_after: Duration::from_secs(30),
        }
    }
}

/// Held lock. Removes the lock file on drop, unless it has since been
/// replaced by another holder's.
#[derive(Debug)]
pub struct SettingsLock {
    held: Option<(PathBuf, String)>,
}

impl SettingsLock {
    /// Lock `target`, waiting up to `retries * retry_delay`.
    pub fn acquire(target: &Path, options: &LockOptions) -> Result<Self> {
        if !options.enabled {
            return Ok(Self { held: None });
        }

        let path = lock_path(target);
        let token = new_token();
        for attempt in 0..=options.retries {
            match try_create(&path, &token) {
                Ok(()) => return Ok(Self { held: Some((path, token)) }),
                Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                    if let Some(stale) = stale_token(&path, options.stale_after)
                        && remove_if_held_by(&path, &stale)
                    {
                        warn!("removed stale settings lock {} ({stale})", path.display());
                        continue;
                    }
                    debug!("settings lock busy (attempt {attempt}): {}", path.display());
                    std::thread::sleep(options.retry_delay);
                }
                Err(e) => return Err(SettingsError::io(&path, e)),
            }
        }
        Err(SettingsError::LockTimeout(path))
    }
}

impl Drop for SettingsLock {
    fn drop(&mut self) {
        if let Some((path, token)) = self.held.take()
            && !remove_if_held_by(&path, &token)
        {
            warn!("settings lock {} was taken over by another writer", path.display());
        }
    }
}

fn lock_path(target: &Path) -> PathBuf {
    let mut name = target.file_name().unwrap_or_default().to_os_string();
    name.push(".lock");
    target.with_file_name(name)
}

/// `<pid>:<nanos>:<seq>`, unique per acquisition even across threads.
fn new_token() -> String {
    static SEQ: AtomicU64 = AtomicU64::new(0);
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_nanos();
    format!(
        "{}:{nanos}:{}",
        std::process::id(),
        SEQ.fetch_add(1, Ordering::Relaxed)
    )
}

fn try_create(path: &Path, token: &str) -> std::io::Result<()> {
    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    if let Err(e) = file.write_all(token.as_bytes()) {
        drop(file);
        let _ = std::fs::remove_file(path);
        return Err(e);
    }
    Ok(())
}

fn read_token(path: &Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
}

/// The token of the lock at `path` if it is older than `stale_after`.
fn stale_token(path: &Path, stale_after: Duration) -> Option<String> {
    let age = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|mtime| SystemTime::now().duration_since(mtime).ok())?;
    if age > stale_after {
        read_token(path)
    } else {
        None
    }
}

/// Remove the lock at `path` only if it still carries `token`.
fn remove_if_held_by(path: &Path, token: &str) -> bool {
    if read_token(path).as_deref() != Some(token) {
        return false;
    }
    std::fs::remove_file(path).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fast() -> LockOptions {
        LockOptions {
            enabled: true,
            retries: 2,
            retry_delay: Duration::from_millis(1),
            stale_after: Duration::from_secs(60),
        }
    }

    #[test]
    fn lock_file_lives_next_to_target() {
        assert_eq!(
            lock_path(Path::new("/repo/.scopegate/settings.json")),
            PathBuf::from("/repo/.scopegate/settings.json.lock")
        );
    }

    #[test]
    fn acquire_and_release() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("settings.json");
        {
            let _lock = SettingsLock::acquire(&target, &fast()).unwrap();
            assert!(lock_path(&target).exists());
        }
        assert!(!lock_path(&target).exists());
    }

    #[test]
    fn held_lock_times_out() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("settings.json");
        let _held = SettingsLock::acquire(&target, &fast()).unwrap();
        let err = SettingsLock::acquire(&target, &fast()).unwrap_err();
        assert!(matches!(err, SettingsError::LockTimeout(_)));
    }

    #[test]
    fn stale_lock_is_broken() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("settings.json");
        std::fs::write(lock_path(&target), "12345").unwrap();
        let options = LockOptions {
            stale_after: Duration::ZERO,
            ..fast()
        };
        std::thread::sleep(Duration::from_millis(10));
        assert!(SettingsLock::acquire(&target, &options).is_ok());
    }

    #[test]
    fn stale_lock_replaced_meanwhile_is_kept() {
        let temp = TempDir::new().unwrap();
        let lock = temp.path().join("settings.json.lock");
        std::fs::write(&lock, "1:1:0").unwrap();
        // Another waiter broke the stale lock and now holds a fresh one.
        std::fs::write(&lock, "2:2:0").unwrap();
        assert!(!remove_if_held_by(&lock, "1:1:0"));
        assert!(lock.exists());
        assert!(remove_if_held_by(&lock, "2:2:0"));
        assert!(!lock.exists());
    }

    #[test]
    fn drop_leaves_a_lock_someone_else_holds() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("settings.json");
        let held = SettingsLock::acquire(&target, &fast()).unwrap();
        std::fs::write(lock_path(&target), "other:0:0").unwrap();
        drop(held);
        assert_eq!(
            std::fs::read_to_string(lock_path(&target)).unwrap(),
            "other:0:0"
        );
    }

    #[test]
    fn tokens_are_unique() {
        assert_ne!(new_token(), new_token());
        assert!(new_token().starts_with(&format!("{}:", std::process::id())));
    }

    #[test]
    fn disabled_lock_touches_nothing() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("settings.json");
        let _lock = SettingsLock::acquire(&target, &LockOptions::disabled()).unwrap();
        assert!(!lock_path(&target).exists());
    }
}
