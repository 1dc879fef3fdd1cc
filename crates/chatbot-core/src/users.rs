//! Flat-file credential store
//!
//! A single JSON object mapping username to password. Passwords are kept in
//! plaintext and compared with plain string equality: this store has no
//! security properties and should not guard anything that matters.
//! The whole file is rewritten on every change and there is no locking, so
//! two processes registering at once can overwrite each other.

use std::collections::BTreeMap;
use std::fs;
use std::io::ErrorKind;
use std::path::PathBuf;

use anyhow::{Context, Result};
use thiserror::Error;

/// User-visible validation failures from login and signup
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,
    #[error("Username already exists.")]
    UsernameTaken,
    #[error("Could not save account: {0}")]
    Storage(String),
}

#[derive(Debug)]
pub struct UserStore {
    path: PathBuf,
    users: BTreeMap<String, String>,
}

impl UserStore {
    /// Read the store at `path`. A missing file is a first run, not an error.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let users = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .with_context(|| format!("Credential file {} is not a JSON object", path.display()))?,
            Err(e) if e.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => {
                return Err(e).with_context(|| format!("Could not read {}", path.display()))
            }
        };

        tracing::info!(path = %path.display(), users = users.len(), "loaded credential store");
        Ok(Self { path, users })
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string(&self.users)?;
        fs::write(&self.path, content)
            .with_context(|| format!("Could not write {}", self.path.display()))?;
        Ok(())
    }

    pub fn authenticate(&self, username: &str, password: &str) -> bool {
        self.users
            .get(username)
            .is_some_and(|stored| stored == password)
    }

    /// Insert a new account and persist the whole store. Fails without
    /// touching the store when the username is already present.
    pub fn register(&mut self, username: &str, password: &str) -> Result<(), AuthError> {
        if self.users.contains_key(username) {
            return Err(AuthError::UsernameTaken);
        }

        self.users.insert(username.to_string(), password.to_string());
        if let Err(e) = self.save() {
            self.users.remove(username);
            return Err(AuthError::Storage(e.to_string()));
        }

        tracing::info!(username, "registered new account");
        Ok(())
    }

    pub fn contains(&self, username: &str) -> bool {
        self.users.contains_key(username)
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = UserStore::load(dir.path().join("users.json")).unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn test_register_persists_whole_mapping() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let mut store = UserStore::load(&path).unwrap();
        store.register("ana@example.com", "hunter2").unwrap();
        store.register("bo", "pw").unwrap();

        let raw: BTreeMap<String, String> =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw.len(), 2);
        assert_eq!(raw["ana@example.com"], "hunter2");

        let reloaded = UserStore::load(&path).unwrap();
        assert!(reloaded.authenticate("bo", "pw"));
    }

    #[test]
    fn test_duplicate_registration_does_not_mutate() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");

        let mut store = UserStore::load(&path).unwrap();
        store.register("ana", "first").unwrap();
        let before = fs::read_to_string(&path).unwrap();

        assert_eq!(store.register("ana", "second"), Err(AuthError::UsernameTaken));
        assert!(store.authenticate("ana", "first"));
        assert!(!store.authenticate("ana", "second"));
        assert_eq!(fs::read_to_string(&path).unwrap(), before);
    }

    #[test]
    fn test_authenticate_exact_match_only() {
        let dir = TempDir::new().unwrap();
        let mut store = UserStore::load(dir.path().join("users.json")).unwrap();
        store.register("ana", "Secret").unwrap();

        assert!(store.authenticate("ana", "Secret"));
        assert!(!store.authenticate("ana", "secret"));
        assert!(!store.authenticate("ana", "Secret "));
        assert!(!store.authenticate("nobody", "Secret"));
    }

    #[test]
    fn test_reads_existing_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, r#"{"x@y.z": "abc"}"#).unwrap();

        let store = UserStore::load(&path).unwrap();
        assert_eq!(store.len(), 1);
        assert!(store.contains("x@y.z"));
        assert!(store.authenticate("x@y.z", "abc"));
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("users.json");
        fs::write(&path, "[1, 2, 3]").unwrap();

        assert!(UserStore::load(&path).is_err());
    }
}
