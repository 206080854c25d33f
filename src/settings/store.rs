//! Per-scope document cache keyed on file modification time.

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::Path;
use std::time::SystemTime;

use log::debug;

use crate::error::{CorruptionError, Result, SettingsError};

use super::{Scope, ScopePaths, SettingsDocument};

#[derive(Debug, Clone)]
struct CachedDocument {
    document: SettingsDocument,
    mtime: SystemTime,
    len: u64,
}

/// What is currently on disk for each scope.
///
/// Holds no global state: each store is an independent instance, so callers
/// (and tests) inject their own.
#[derive(Debug)]
pub struct SettingsStore {
    paths: ScopePaths,
    cache: HashMap<Scope, CachedDocument>,
}

impl SettingsStore {
    pub fn new(paths: ScopePaths) -> Self {
        Self {
            paths,
            cache: HashMap::new(),
        }
    }

    pub fn paths(&self) -> &ScopePaths {
        &self.paths
    }

    /// The current document for `scope`.
    ///
    /// Returns the cached parse while the file's modification time and
    /// length are unchanged; any difference, forwards or backwards, re-reads. A missing file (or one that vanishes mid-read) yields
    /// the scope's default document. A present but unparsable file yields
    /// [`SettingsError::Corrupt`].
    pub fn get(&mut self, scope: Scope) -> Result<SettingsDocument> {
        let Some(path) = self.paths.path_for(scope) else {
            return Ok(SettingsDocument::default_for(scope));
        };

        let (mtime, len) = match std::fs::metadata(&path) {
            Ok(meta) => (
                meta.modified().map_err(|e| SettingsError::io(&path, e))?,
                meta.len(),
            ),
            Err(e) if e.kind() == ErrorKind::NotFound => {
                self.cache.remove(&scope);
                return Ok(SettingsDocument::default_for(scope));
            }
            Err(e) => return Err(SettingsError::io(&path, e)),
        };

        if let Some(cached) = self.cache.get(&scope)
            && cached.mtime == mtime
            && cached.len == len
        {
            return Ok(cached.document.clone());
        }

        let Some(document) = read_document(scope, &path)? else {
            self.cache.remove(&scope);
            return Ok(SettingsDocument::default_for(scope));
        };
        debug!("loaded {scope} settings from {}", path.display());
        self.cache.insert(
            scope,
            CachedDocument {
                document: document.clone(),
                mtime,
                len,
            },
        );
        Ok(document)
    }

    /// Drop the cached copy for `scope`; the next `get` re-reads the file.
    pub fn invalidate(&mut self, scope: Scope) {
        self.cache.remove(&scope);
    }

    /// Documents for every scope in `scopes`, ascending precedence, each
    /// tagged with its scope.
    pub fn get_many(&mut self, scopes: &[Scope]) -> Result<Vec<(Scope, SettingsDocument)>> {
        let mut ordered = scopes.to_vec();
        ordered.sort();
        ordered.dedup();
        ordered
            .into_iter()
            .map(|scope| self.get(scope).map(|doc| (scope, doc)))
            .collect()
    }
}

/// Read and parse one scope file. `Ok(None)` if the file disappeared.
fn read_document(scope: Scope, path: &Path) -> Result<Option<SettingsDocument>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(SettingsError::io(path, e)),
    };

    serde_json::from_str(&content).map(Some).map_err(|e| {
        SettingsError::Corrupt(CorruptionError {
            scope,
            path: path.to_path_buf(),
            message: e.to_string(),
            default_document: SettingsDocument::default_for(scope),
        })
    })
}
