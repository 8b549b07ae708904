//! Durable key-value port for session state.
//!
//! # Design
//! The facade never touches a concrete store. It is handed an
//! `Arc<dyn SessionStore>` at construction: `MemoryStore` for tests and
//! short-lived processes, `FileStore` when the session must survive a
//! restart. Both are synchronous; writes complete before the call returns.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use crate::error::StoreError;

/// Key holding the bearer token.
pub const AUTH_TOKEN_KEY: &str = "authToken";
/// Key holding the signed-in user's role.
pub const USER_ROLE_KEY: &str = "userRole";
/// Key holding the signed-in user's organization id, empty when none.
pub const ORGANIZATION_ID_KEY: &str = "organizationId";
/// Profile key written on signup.
pub const BUSINESS_TYPE_KEY: &str = "businessType";
/// Profile key written on signup.
pub const ORGANIZATION_NAME_KEY: &str = "organizationName";

/// Keys removed on logout.
pub const SESSION_KEYS: [&str; 3] = [AUTH_TOKEN_KEY, USER_ROLE_KEY, ORGANIZATION_ID_KEY];

pub trait SessionStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StoreError>;
}

type Entries = BTreeMap<String, String>;

fn lock(entries: &Mutex<Entries>) -> MutexGuard<'_, Entries> {
    // A poisoned map is still a valid map.
    entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Process-local store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Entries>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        lock(&self.entries).insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        lock(&self.entries).remove(key);
        Ok(())
    }
}

/// Store persisted as a single JSON object in a file.
///
/// The whole file is rewritten on every mutation. A missing file reads as an
/// empty store and is created on the first write.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: Mutex<Entries>,
}

impl FileStore {
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) if raw.trim().is_empty() => Entries::new(),
            Ok(raw) => serde_json::from_str(&raw)?,
            Err(err) if err.kind() == ErrorKind::NotFound => Entries::new(),
            Err(err) => return Err(err.into()),
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &Entries) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let raw = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, raw)?;
        Ok(())
    }
}

impl SessionStore for FileStore {
    fn get(&self, key: &str) -> Option<String> {
        lock(&self.entries).get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        entries.insert(key.to_string(), value.to_string());
        self.flush(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = lock(&self.entries);
        if entries.remove(key).is_none() {
            return Ok(());
        }
        self.flush(&entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_set_get_remove() {
        let store = MemoryStore::new();
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);
        store.set(AUTH_TOKEN_KEY, "abc").unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY).as_deref(), Some("abc"));
        store.remove(AUTH_TOKEN_KEY).unwrap();
        store.remove(AUTH_TOKEN_KEY).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let store = FileStore::open(&path).unwrap();
        store.set(AUTH_TOKEN_KEY, "tok").unwrap();
        store.set(USER_ROLE_KEY, "Admin").unwrap();
        drop(store);

        let reopened = FileStore::open(&path).unwrap();
        assert_eq!(reopened.get(AUTH_TOKEN_KEY).as_deref(), Some("tok"));
        assert_eq!(reopened.get(USER_ROLE_KEY).as_deref(), Some("Admin"));

        reopened.remove(USER_ROLE_KEY).unwrap();
        let again = FileStore::open(&path).unwrap();
        assert_eq!(again.get(USER_ROLE_KEY), None);
    }

    #[test]
    fn file_store_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("absent.json")).unwrap();
        assert_eq!(store.get(AUTH_TOKEN_KEY), None);
        assert!(!store.path().exists());
    }

    #[test]
    fn file_store_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.json");
        fs::write(&path, "not json").unwrap();
        assert!(matches!(FileStore::open(&path), Err(StoreError::Format(_))));
    }
}
