use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::models::UserProfile;

use super::SessionError;

/// Session file name in cache directory
const SESSION_FILE: &str = "session.json";

/// Scratch file the session is written to before being renamed into place
const SESSION_TMP_FILE: &str = "session.json.tmp";

/// A signed-in user: bearer token plus profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

impl Session {
    /// Build a session, refusing partial state.
    pub fn new(token: impl Into<String>, user: UserProfile) -> Result<Self, SessionError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(SessionError::CorruptedSession("empty token".to_string()));
        }
        if user.is_empty() {
            return Err(SessionError::CorruptedSession("empty user profile".to_string()));
        }
        Ok(Self { token, user })
    }
}

/// What gets persisted: exactly two entries, written and removed together.
#[derive(Debug, Serialize, Deserialize)]
struct PersistedSession {
    token: Option<String>,
    user: Option<UserProfile>,
    #[serde(default)]
    saved_at: Option<DateTime<Utc>>,
}

/// Raw storage for the serialized session record.
///
/// Implementations only move bytes; validation lives in `SessionStore`.
pub trait SessionPersistence: Send + Sync {
    fn read(&self) -> Result<Option<String>, SessionError>;
    fn write(&self, contents: &str) -> Result<(), SessionError>;
    fn remove(&self) -> Result<(), SessionError>;
}

/// Session record stored as JSON in the cache directory.
pub struct FileSessionPersistence {
    path: PathBuf,
}

impl FileSessionPersistence {
    pub fn new(cache_dir: impl AsRef<Path>) -> Self {
        Self {
            path: cache_dir.as_ref().join(SESSION_FILE),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionPersistence for FileSessionPersistence {
    fn read(&self) -> Result<Option<String>, SessionError> {
        match std::fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&self, contents: &str) -> Result<(), SessionError> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        // Rename is atomic, so readers never observe half a record
        let tmp = self.path.with_file_name(SESSION_TMP_FILE);
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Process-local storage, used by tests and the `memory` session backend.
#[derive(Default)]
pub struct MemorySessionPersistence {
    contents: Mutex<Option<String>>,
}

impl MemorySessionPersistence {
    /// Start with the given raw record, as if left behind by an earlier run.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            contents: Mutex::new(Some(contents.into())),
        }
    }

    pub fn contents(&self) -> Option<String> {
        self.contents
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl SessionPersistence for MemorySessionPersistence {
    fn read(&self) -> Result<Option<String>, SessionError> {
        Ok(self.contents())
    }

    fn write(&self, contents: &str) -> Result<(), SessionError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = Some(contents.to_string());
        Ok(())
    }

    fn remove(&self) -> Result<(), SessionError> {
        *self.contents.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

/// Shared handle to the current session.
///
/// Clone is cheap; all clones see the same snapshot. Reads are synchronous
/// and always reflect the latest completed `save`/`clear`.
#[derive(Clone)]
pub struct SessionStore {
    current: Arc<RwLock<Option<Session>>>,
    persistence: Arc<dyn SessionPersistence>,
}

impl SessionStore {
    pub fn new(persistence: Arc<dyn SessionPersistence>) -> Self {
        Self {
            current: Arc::new(RwLock::new(None)),
            persistence,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(MemorySessionPersistence::default()))
    }

    /// Rehydrate from persisted storage.
    ///
    /// Malformed or partial records are discarded and reported as no session.
    pub fn load(&self) -> Option<Session> {
        let loaded = match self.read_persisted() {
            Ok(session) => session,
            Err(SessionError::CorruptedSession(reason)) => {
                warn!(reason = %reason, "Discarding corrupted persisted session");
                if let Err(e) = self.persistence.remove() {
                    warn!(error = %e, "Failed to remove corrupted session");
                }
                None
            }
            Err(e) => {
                warn!(error = %e, "Failed to read persisted session");
                None
            }
        };
        debug!(restored = loaded.is_some(), "Session loaded");
        self.replace(loaded.clone());
        loaded
    }

    fn read_persisted(&self) -> Result<Option<Session>, SessionError> {
        let Some(contents) = self.persistence.read()? else {
            return Ok(None);
        };
        let record: PersistedSession = serde_json::from_str(&contents)
            .map_err(|e| SessionError::CorruptedSession(e.to_string()))?;
        match (record.token, record.user) {
            (Some(token), Some(user)) => Session::new(token, user).map(Some),
            (Some(_), None) => Err(SessionError::CorruptedSession(
                "token without user".to_string(),
            )),
            (None, Some(_)) => Err(SessionError::CorruptedSession(
                "user without token".to_string(),
            )),
            (None, None) => Err(SessionError::CorruptedSession("empty record".to_string())),
        }
    }

    /// Store token and profile together.
    ///
    /// The in-memory snapshot is updated even if persisting fails; the
    /// session then simply won't survive a restart.
    pub(crate) fn save(&self, token: &str, user: UserProfile) -> Result<Session, SessionError> {
        let session = Session::new(token, user)?;
        let record = PersistedSession {
            token: Some(session.token.clone()),
            user: Some(session.user.clone()),
            saved_at: Some(Utc::now()),
        };
        match serde_json::to_string_pretty(&record) {
            Ok(contents) => {
                if let Err(e) = self.persistence.write(&contents) {
                    warn!(error = %e, "Failed to persist session");
                }
            }
            Err(e) => warn!(error = %e, "Failed to serialize session"),
        }
        self.replace(Some(session.clone()));
        info!(user_id = %session.user.user_id, "Session saved");
        Ok(session)
    }

    /// Drop the session everywhere. Safe to call when already empty.
    pub(crate) fn clear(&self) {
        self.replace(None);
        if let Err(e) = self.persistence.remove() {
            warn!(error = %e, "Failed to remove persisted session");
        }
        debug!("Session cleared");
    }

    pub fn current(&self) -> Option<Session> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Get the bearer token if a session exists
    pub fn token(&self) -> Option<String> {
        self.current().map(|s| s.token)
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.current().map(|s| s.user)
    }

    pub fn is_authenticated(&self) -> bool {
        self.current()
            .map(|s| !s.token.trim().is_empty() && !s.user.is_empty())
            .unwrap_or(false)
    }

    fn replace(&self, session: Option<Session>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = session;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(id: &str, name: &str) -> UserProfile {
        UserProfile {
            user_id: id.to_string(),
            display_name: name.to_string(),
            email: Some(format!("{}@example.com", id)),
        }
    }

    #[test]
    fn test_save_then_clear_sequence() {
        let store = SessionStore::in_memory();
        assert!(!store.is_authenticated());

        store.save("t1", user("1", "Ann")).expect("valid session");
        assert!(store.is_authenticated());

        store.clear();
        assert!(!store.is_authenticated());

        store.save("t2", user("2", "Bob")).expect("valid session");
        assert!(store.is_authenticated());
        assert_eq!(store.token().as_deref(), Some("t2"));
        assert_eq!(store.current_user().map(|u| u.display_name), Some("Bob".to_string()));
    }

    #[test]
    fn test_save_rejects_partial_state() {
        let store = SessionStore::in_memory();
        store.save("t1", user("1", "Ann")).expect("valid session");

        assert!(store.save("", user("2", "Bob")).is_err());
        assert!(store.save("t3", user("", "Nobody")).is_err());

        // A rejected save leaves the previous session untouched
        assert_eq!(store.token().as_deref(), Some("t1"));
    }

    #[test]
    fn test_clear_is_idempotent() {
        let persistence = Arc::new(MemorySessionPersistence::default());
        let store = SessionStore::new(persistence.clone());
        store.save("t1", user("1", "Ann")).expect("valid session");

        store.clear();
        let after_once = (store.current(), persistence.contents());
        store.clear();
        let after_twice = (store.current(), persistence.contents());

        assert_eq!(after_once, after_twice);
        assert_eq!(after_twice, (None, None));
    }

    #[test]
    fn test_round_trip_across_restart() {
        let dir = tempfile::tempdir().expect("tempdir");
        let first = SessionStore::new(Arc::new(FileSessionPersistence::new(dir.path())));
        first.save("abc", user("1", "Ann")).expect("valid session");

        // Simulated restart: a fresh store over the same directory
        let second = SessionStore::new(Arc::new(FileSessionPersistence::new(dir.path())));
        assert!(second.current().is_none());
        let loaded = second.load().expect("session restored");

        assert_eq!(loaded, Session::new("abc", user("1", "Ann")).expect("valid session"));
        assert!(second.is_authenticated());
    }

    #[test]
    fn test_file_write_leaves_no_scratch_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let persistence = FileSessionPersistence::new(dir.path());
        persistence.write("{}").expect("write");
        assert!(persistence.path().exists());
        assert!(!dir.path().join(SESSION_TMP_FILE).exists());
    }

    #[test]
    fn test_load_discards_malformed_record() {
        let persistence = Arc::new(MemorySessionPersistence::with_contents("{not json"));
        let store = SessionStore::new(persistence.clone());

        assert!(store.load().is_none());
        assert!(!store.is_authenticated());
        assert_eq!(persistence.contents(), None);
    }

    #[test]
    fn test_load_discards_token_without_user() {
        let persistence = Arc::new(MemorySessionPersistence::with_contents(
            r#"{"token":"abc","user":null}"#,
        ));
        let store = SessionStore::new(persistence.clone());

        assert!(store.load().is_none());
        assert_eq!(persistence.contents(), None);
    }

    #[test]
    fn test_load_discards_user_without_token() {
        let persistence = Arc::new(MemorySessionPersistence::with_contents(
            r#"{"user":{"userId":"1","displayName":"Ann","email":null}}"#,
        ));
        let store = SessionStore::new(persistence.clone());

        assert!(store.load().is_none());
        assert_eq!(persistence.contents(), None);
    }

    #[test]
    fn test_load_discards_blank_token() {
        let persistence = Arc::new(MemorySessionPersistence::with_contents(
            r#"{"token":"","user":{"userId":"1","displayName":"Ann"}}"#,
        ));
        let store = SessionStore::new(persistence);
        assert!(store.load().is_none());
    }

    #[test]
    fn test_load_without_record_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let store = SessionStore::new(Arc::new(FileSessionPersistence::new(dir.path())));
        assert!(store.load().is_none());
    }

    #[test]
    fn test_clones_share_snapshot() {
        let store = SessionStore::in_memory();
        let view = store.clone();
        store.save("abc", user("1", "Ann")).expect("valid session");
        assert!(view.is_authenticated());
        store.clear();
        assert!(!view.is_authenticated());
    }
}
