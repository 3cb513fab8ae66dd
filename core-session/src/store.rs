//! Session Persistence
//!
//! [`SessionStore`] serializes the session to JSON and keeps it under a
//! fixed key in a [`PreferenceStore`]. The preference store is the platform
//! seam; production code uses the file-backed implementation from
//! [`file_store`](crate::file_store), tests substitute an in-memory map.
//!
//! Corrupted payloads are deleted on read so a bad write cannot wedge the
//! app into a half signed-in state; the caller sees them as
//! [`SessionError::Corrupted`] once and `None` afterwards.

use crate::error::{Result, SessionError};
use crate::types::Session;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Storage key for the persisted session.
const SESSION_KEY: &str = "session";

/// Small key/value persistence abstraction.
///
/// Values are opaque bytes; keys are short identifiers. Operations are
/// idempotent: removing a missing key succeeds.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: &[u8]) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// Persists the [`Session`] as JSON in a preference store.
#[derive(Clone)]
pub struct SessionStore {
    prefs: Arc<dyn PreferenceStore>,
}

impl SessionStore {
    /// Create a new session store
    pub fn new(prefs: Arc<dyn PreferenceStore>) -> Self {
        Self { prefs }
    }

    /// Persist a session, overwriting any previous one.
    pub async fn save(&self, session: &Session) -> Result<()> {
        let json = serde_json::to_vec(session)
            .map_err(|e| SessionError::Serialization(e.to_string()))?;

        self.prefs.set(SESSION_KEY, &json).await?;

        info!(email = %session.email, "Session persisted");
        Ok(())
    }

    /// Load the persisted session, if any.
    ///
    /// A corrupted payload is deleted and reported as
    /// [`SessionError::Corrupted`].
    pub async fn load(&self) -> Result<Option<Session>> {
        let Some(data) = self.prefs.get(SESSION_KEY).await? else {
            debug!("No persisted session");
            return Ok(None);
        };

        match serde_json::from_slice::<Session>(&data) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                warn!(error = %e, "Persisted session corrupted, deleting");
                if let Err(delete_err) = self.prefs.remove(SESSION_KEY).await {
                    warn!(error = %delete_err, "Failed to delete corrupted session");
                }
                Err(SessionError::Corrupted(e.to_string()))
            }
        }
    }

    /// Remove the persisted session. Idempotent.
    pub async fn clear(&self) -> Result<()> {
        self.prefs.remove(SESSION_KEY).await?;
        info!("Session cleared");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tokio::sync::Mutex;

    /// In-memory preference store for testing
    #[derive(Default)]
    struct MemoryPreferenceStore {
        data: Mutex<HashMap<String, Vec<u8>>>,
    }

    #[async_trait]
    impl PreferenceStore for MemoryPreferenceStore {
        async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
            Ok(self.data.lock().await.get(key).cloned())
        }

        async fn set(&self, key: &str, value: &[u8]) -> Result<()> {
            self.data.lock().await.insert(key.to_string(), value.to_vec());
            Ok(())
        }

        async fn remove(&self, key: &str) -> Result<()> {
            self.data.lock().await.remove(key);
            Ok(())
        }
    }

    fn store() -> SessionStore {
        SessionStore::new(Arc::new(MemoryPreferenceStore::default()))
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let store = store();
        let session = Session::new("user@example.com", "tok-1");

        store.save(&session).await.unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded, session);
    }

    #[tokio::test]
    async fn test_load_without_session() {
        let store = store();
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_clear_is_idempotent() {
        let store = store();
        let session = Session::new("user@example.com", "tok-1");

        store.save(&session).await.unwrap();
        store.clear().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_corrupted_payload_is_deleted() {
        let prefs = Arc::new(MemoryPreferenceStore::default());
        prefs.set(SESSION_KEY, b"{not json").await.unwrap();
        let store = SessionStore::new(prefs.clone());

        let err = store.load().await.unwrap_err();
        assert!(matches!(err, SessionError::Corrupted(_)));

        // Deleted on first read, gone on the second
        assert!(store.load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_save_overwrites_previous_session() {
        let store = store();

        store
            .save(&Session::new("first@example.com", "tok-1"))
            .await
            .unwrap();
        store
            .save(&Session::new("second@example.com", "tok-2"))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap().unwrap();
        assert_eq!(loaded.email, "second@example.com");
    }
}
