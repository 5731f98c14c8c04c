//! Durable storage for the cached profile and token record
//!
//! Values are JSON strings keyed by name. Reads and writes are synchronous;
//! the coordinator only ever touches two small keys.

use super::types::{AuthError, AuthResult};
use etcetera::{choose_base_strategy, BaseStrategy};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Storage key of the cached profile
pub const PROFILE_KEY: &str = "terra.profile";

/// Storage key of the cached token record
pub const TOKEN_KEY: &str = "terra.token";

/// Key/value persistence surviving process restarts
pub trait AuthStorage: Send + Sync {
    fn get(&self, key: &str) -> AuthResult<Option<String>>;

    fn set(&self, key: &str, value: &str) -> AuthResult<()>;

    /// Remove a key. Removing a missing key succeeds.
    fn delete(&self, key: &str) -> AuthResult<()>;
}

/// Default directory for persisted auth state (e.g. `~/.local/share/terra/auth`)
pub fn default_storage_dir() -> AuthResult<PathBuf> {
    let strategy = choose_base_strategy().map_err(|e| {
        AuthError::Storage(format!("Failed to determine base directories: {e}"))
    })?;
    Ok(strategy.data_dir().join("terra").join("auth"))
}

/// One JSON file per key inside a directory
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Storage rooted at [`default_storage_dir`]
    pub fn with_default_dir() -> AuthResult<Self> {
        Ok(Self::new(default_storage_dir()?))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl AuthStorage for FileStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);
        // Replace atomically via rename.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        debug!("Persisted {} to {}", key, path.display());
        Ok(())
    }

    fn delete(&self, key: &str) -> AuthResult<()> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage.
///
/// Clones share the same map, so a second coordinator built from a clone
/// sees what the first one persisted, as after a page reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }
}

impl AuthStorage for MemoryStorage {
    fn get(&self, key: &str) -> AuthResult<Option<String>> {
        Ok(self.entries.lock().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AuthResult<()> {
        self.entries.lock().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> AuthResult<()> {
        self.entries.lock().remove(key);
        Ok(())
    }
}
