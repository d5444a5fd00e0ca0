//! File-backed session persistence.
//!
//! Stores the bearer token and the signed-in user record as two files under
//! the application state directory, named after the configured storage keys.
//! The two entries are written and removed together: a token without a
//! parseable user record (or the reverse) is treated as corrupt state and
//! discarded on load.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use crate::auth::User;

/// A persisted session: the bearer token and the user it authenticates.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredSession {
    pub token: String,
    pub user: User,
}

/// Durable key-value store for the current session.
///
/// One instance per application; the HTTP client reads the token from here
/// when no per-call token is supplied, and the session manager owns the
/// save/clear lifecycle.
#[derive(Debug, Clone)]
pub struct SessionStore {
    dir: PathBuf,
    token_key: String,
    user_key: String,
}

impl SessionStore {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// the first `save`.
    pub fn new(dir: impl Into<PathBuf>, token_key: &str, user_key: &str) -> Self {
        Self {
            dir: dir.into(),
            token_key: token_key.to_string(),
            user_key: user_key.to_string(),
        }
    }

    fn token_path(&self) -> PathBuf {
        self.dir.join(&self.token_key)
    }

    fn user_path(&self) -> PathBuf {
        self.dir.join(&self.user_key)
    }

    /// Persist both halves of the session, overwriting any prior values.
    pub fn save(&self, token: &str, user: &User) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("creating session dir {}", self.dir.display()))?;
        fs::write(self.token_path(), token).context("writing session token")?;
        let json = serde_json::to_string(user).context("serializing user record")?;
        fs::write(self.user_path(), json).context("writing user record")?;
        tracing::debug!(dir = %self.dir.display(), "session persisted");
        Ok(())
    }

    /// Load the persisted session.
    ///
    /// Returns `None` unless the token is present and the user record parses;
    /// any partially-present or unparseable state is removed before
    /// returning, so the store never reports half a session.
    pub fn load(&self) -> Option<StoredSession> {
        let token = fs::read_to_string(self.token_path())
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty());
        let user = fs::read_to_string(self.user_path())
            .ok()
            .and_then(|raw| serde_json::from_str::<User>(&raw).ok());

        match (token, user) {
            (Some(token), Some(user)) => Some(StoredSession { token, user }),
            (token, user) => {
                if token.is_some() || user.is_some() {
                    tracing::warn!("partial or corrupt session state found; clearing");
                }
                self.clear();
                None
            }
        }
    }

    /// The persisted bearer token, if any.
    ///
    /// This is the read path the HTTP client uses for header injection; it
    /// deliberately does not validate the user half.
    pub fn token(&self) -> Option<String> {
        fs::read_to_string(self.token_path())
            .ok()
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    }

    /// Remove both keys unconditionally. Best-effort and idempotent.
    pub fn clear(&self) {
        remove_if_present(&self.token_path());
        remove_if_present(&self.user_path());
    }
}

fn remove_if_present(path: &Path) {
    if let Err(err) = fs::remove_file(path) {
        if err.kind() != std::io::ErrorKind::NotFound {
            tracing::debug!(path = %path.display(), error = %err, "failed to remove session file");
        }
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::Role;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, SessionStore) {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path(), "choirAuthToken", "choirUser");
        (tmp, store)
    }

    fn test_user() -> User {
        User {
            id: "u-1".into(),
            name: "Grace".into(),
            role: Role::Admin,
            email: Some("grace@example.org".into()),
        }
    }

    #[test]
    fn save_then_load_round_trips() {
        let (_tmp, store) = test_store();
        let user = test_user();

        store.save("tok-123", &user).unwrap();
        let session = store.load().unwrap();
        assert_eq!(session.token, "tok-123");
        assert_eq!(session.user, user);
    }

    #[test]
    fn load_without_saved_session_is_none() {
        let (_tmp, store) = test_store();
        assert!(store.load().is_none());
    }

    #[test]
    fn token_without_user_is_cleared() {
        let (tmp, store) = test_store();
        fs::write(tmp.path().join("choirAuthToken"), "orphan-token").unwrap();

        assert!(store.load().is_none());
        // Defensive cleanup removed the orphan half.
        assert!(!tmp.path().join("choirAuthToken").exists());
        assert!(store.token().is_none());
    }

    #[test]
    fn user_without_token_is_cleared() {
        let (tmp, store) = test_store();
        let json = serde_json::to_string(&test_user()).unwrap();
        fs::write(tmp.path().join("choirUser"), json).unwrap();

        assert!(store.load().is_none());
        assert!(!tmp.path().join("choirUser").exists());
    }

    #[test]
    fn corrupt_user_record_is_treated_as_absent() {
        let (tmp, store) = test_store();
        fs::write(tmp.path().join("choirAuthToken"), "tok").unwrap();
        fs::write(tmp.path().join("choirUser"), "{not json").unwrap();

        assert!(store.load().is_none());
        assert!(!tmp.path().join("choirAuthToken").exists());
        assert!(!tmp.path().join("choirUser").exists());
    }

    #[test]
    fn clear_is_idempotent() {
        let (_tmp, store) = test_store();
        store.save("tok", &test_user()).unwrap();

        store.clear();
        store.clear();
        assert!(store.load().is_none());
        assert!(store.token().is_none());
    }

    #[test]
    fn save_overwrites_previous_session() {
        let (_tmp, store) = test_store();
        store.save("old-token", &test_user()).unwrap();

        let mut updated = test_user();
        updated.name = "Grace M.".into();
        store.save("new-token", &updated).unwrap();

        let session = store.load().unwrap();
        assert_eq!(session.token, "new-token");
        assert_eq!(session.user.name, "Grace M.");
    }

    #[test]
    fn custom_key_names_are_respected() {
        let tmp = TempDir::new().unwrap();
        let store = SessionStore::new(tmp.path(), "tokenA", "userA");
        store.save("tok", &test_user()).unwrap();

        assert!(tmp.path().join("tokenA").exists());
        assert!(tmp.path().join("userA").exists());
    }
}
