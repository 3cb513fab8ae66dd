//! # Session Manager
//!
//! High-level orchestrator for account operations: signing up, exchanging
//! credentials for a bearer token, persisting the resulting session, and
//! clearing it on logout. State changes are mirrored onto the event bus so
//! screens react without polling.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use core_session::{SessionManager, SessionStore, FilePreferenceStore};
//! use std::sync::Arc;
//!
//! let manager = SessionManager::new(api, SessionStore::new(prefs), event_bus);
//!
//! let session = manager.login("user@example.com", "password").await?;
//! let token = manager.require_token().await?;
//! manager.logout().await?;
//! ```

use crate::error::{Result, SessionError};
use crate::store::SessionStore;
use crate::types::Session;
use core_api::{ApiError, StoryApi};
use core_runtime::events::{CoreEvent, EventBus, SessionEvent};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{info, instrument, warn};

/// Orchestrates login/signup/logout and keeps the in-memory session in sync
/// with the persisted one.
pub struct SessionManager {
    api: Arc<dyn StoryApi>,
    store: SessionStore,
    event_bus: EventBus,
    current: Arc<RwLock<Option<Session>>>,
}

impl SessionManager {
    /// Creates a new session manager.
    pub fn new(api: Arc<dyn StoryApi>, store: SessionStore, event_bus: EventBus) -> Self {
        Self {
            api,
            store,
            event_bus,
            current: Arc::new(RwLock::new(None)),
        }
    }

    /// Load the persisted session into memory, typically at startup.
    ///
    /// A corrupted persisted session has already been deleted by the store;
    /// it degrades to "signed out" rather than failing startup.
    pub async fn restore(&self) -> Result<Option<Session>> {
        let session = match self.store.load().await {
            Ok(session) => session,
            Err(SessionError::Corrupted(reason)) => {
                warn!(reason = %reason, "Discarded corrupted session, starting signed out");
                None
            }
            Err(e) => return Err(e),
        };

        *self.current.write().await = session.clone();
        Ok(session)
    }

    /// Exchange credentials for a bearer token and persist the session.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::SigningIn {
                email: email.to_string(),
            }))
            .ok();

        let login_result = match self.api.login(email, password).await {
            Ok(result) => result,
            Err(e) => {
                self.emit_error(&e);
                return Err(e.into());
            }
        };

        let session = Session::new(email, login_result.token);
        self.store.save(&session).await?;
        *self.current.write().await = Some(session.clone());

        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedIn {
                email: email.to_string(),
            }))
            .ok();

        info!(email = %email, "Signed in");
        Ok(session)
    }

    /// Register a new account.
    ///
    /// Registration does not sign the user in; the account still goes
    /// through [`login`](Self::login) afterwards.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<()> {
        match self.api.register(name, email, password).await {
            Ok(_) => {
                self.event_bus
                    .emit(CoreEvent::Session(SessionEvent::Registered {
                        email: email.to_string(),
                    }))
                    .ok();
                info!(email = %email, "Account registered");
                Ok(())
            }
            Err(e) => {
                self.emit_error(&e);
                Err(e.into())
            }
        }
    }

    /// Clear the persisted and in-memory session.
    ///
    /// Requests already issued with the old token are not retroactively
    /// invalidated; there is no revocation channel.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        self.store.clear().await?;
        *self.current.write().await = None;

        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::SignedOut))
            .ok();

        info!("Signed out");
        Ok(())
    }

    /// The current in-memory session, if any.
    pub async fn current_session(&self) -> Option<Session> {
        self.current.read().await.clone()
    }

    /// The bearer token for authenticated calls.
    ///
    /// # Errors
    ///
    /// [`SessionError::NotAuthenticated`] when no usable session is present.
    pub async fn require_token(&self) -> Result<String> {
        let guard = self.current.read().await;
        match guard.as_ref() {
            Some(session) if session.is_authenticated() => Ok(session.token.clone()),
            _ => Err(SessionError::NotAuthenticated),
        }
    }

    fn emit_error(&self, error: &ApiError) {
        self.event_bus
            .emit(CoreEvent::Session(SessionEvent::SessionError {
                message: error.user_message().to_string(),
                recoverable: matches!(error, ApiError::Network(_)),
            }))
            .ok();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PreferenceStore;
    use async_trait::async_trait;
    use core_api::{
        DetailResponse, LocationMode, LoginResult, PhotoPart, RegisterResponse, Story,
        UploadResponse,
    };
    use std::collections::HashMap;
    use tokio::sync::Mutex;

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

    /// StoryApi mock: scripted login/register outcomes, everything else
    /// unreachable in these tests.
    struct MockStoryApi {
        login_result: core_api::Result<LoginResult>,
        register_result: core_api::Result<RegisterResponse>,
    }

    impl MockStoryApi {
        fn login_ok(token: &str) -> Self {
            Self {
                login_result: Ok(LoginResult {
                    user_id: "u-1".to_string(),
                    name: "Alex".to_string(),
                    token: token.to_string(),
                }),
                register_result: Ok(RegisterResponse {
                    error: false,
                    message: Some("User created".to_string()),
                }),
            }
        }

        fn login_err(error: ApiError) -> Self {
            Self {
                login_result: Err(error),
                register_result: Ok(RegisterResponse {
                    error: false,
                    message: None,
                }),
            }
        }
    }

    fn clone_result<T: Clone>(result: &core_api::Result<T>) -> core_api::Result<T> {
        match result {
            Ok(v) => Ok(v.clone()),
            Err(ApiError::Network(m)) => Err(ApiError::Network(m.clone())),
            Err(ApiError::Decode(m)) => Err(ApiError::Decode(m.clone())),
            Err(ApiError::Server { status, message }) => Err(ApiError::Server {
                status: *status,
                message: message.clone(),
            }),
            Err(ApiError::InvalidRequest { field, message }) => Err(ApiError::InvalidRequest {
                field: field.clone(),
                message: message.clone(),
            }),
        }
    }

    #[async_trait]
    impl StoryApi for MockStoryApi {
        async fn register(
            &self,
            _name: &str,
            _email: &str,
            _password: &str,
        ) -> core_api::Result<RegisterResponse> {
            clone_result(&self.register_result)
        }

        async fn login(&self, _email: &str, _password: &str) -> core_api::Result<LoginResult> {
            clone_result(&self.login_result)
        }

        async fn stories(
            &self,
            _token: &str,
            _page: u32,
            _size: u32,
            _location: LocationMode,
        ) -> core_api::Result<Vec<Story>> {
            unreachable!("not exercised by session tests")
        }

        async fn story_detail(&self, _token: &str, _id: &str) -> core_api::Result<Story> {
            unreachable!("not exercised by session tests")
        }

        async fn upload_story(
            &self,
            _token: &str,
            _photo: PhotoPart,
            _description: &str,
            _coordinates: Option<(f64, f64)>,
        ) -> core_api::Result<UploadResponse> {
            unreachable!("not exercised by session tests")
        }

        async fn stories_with_location(&self, _token: &str) -> core_api::Result<Vec<Story>> {
            unreachable!("not exercised by session tests")
        }
    }

    fn manager(api: MockStoryApi) -> (SessionManager, EventBus, Arc<MemoryPreferenceStore>) {
        let prefs = Arc::new(MemoryPreferenceStore::default());
        let event_bus = EventBus::new(16);
        let manager = SessionManager::new(
            Arc::new(api),
            SessionStore::new(prefs.clone()),
            event_bus.clone(),
        );
        (manager, event_bus, prefs)
    }

    #[tokio::test]
    async fn test_login_persists_session_and_emits_events() {
        let (manager, event_bus, _) = manager(MockStoryApi::login_ok("tok-1"));
        let mut events = event_bus.subscribe();

        let session = manager.login("user@example.com", "hunter2").await.unwrap();
        assert_eq!(session.token, "tok-1");
        assert!(session.is_login);

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::SigningIn {
                email: "user@example.com".to_string()
            })
        );
        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::SignedIn {
                email: "user@example.com".to_string()
            })
        );

        assert_eq!(manager.require_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_login_failure_leaves_no_session() {
        let (manager, event_bus, _) = manager(MockStoryApi::login_err(ApiError::Server {
            status: 401,
            message: "Invalid password".to_string(),
        }));
        let mut events = event_bus.subscribe();

        let err = manager.login("user@example.com", "wrong").await.unwrap_err();
        assert!(matches!(err, SessionError::Api(ApiError::Server { .. })));

        // SigningIn then SessionError, never SignedIn
        events.recv().await.unwrap();
        match events.recv().await.unwrap() {
            CoreEvent::Session(SessionEvent::SessionError {
                message,
                recoverable,
            }) => {
                assert_eq!(message, "Invalid password");
                assert!(!recoverable);
            }
            other => panic!("Expected session error event, got {:?}", other),
        }

        assert!(manager.current_session().await.is_none());
        assert!(matches!(
            manager.require_token().await,
            Err(SessionError::NotAuthenticated)
        ));
    }

    #[tokio::test]
    async fn test_network_failure_is_recoverable() {
        let (manager, event_bus, _) =
            manager(MockStoryApi::login_err(ApiError::Network("offline".into())));
        let mut events = event_bus.subscribe();

        manager.login("user@example.com", "pw").await.unwrap_err();

        events.recv().await.unwrap();
        match events.recv().await.unwrap() {
            CoreEvent::Session(SessionEvent::SessionError { recoverable, .. }) => {
                assert!(recoverable)
            }
            other => panic!("Expected session error event, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_signup_does_not_sign_in() {
        let (manager, event_bus, _) = manager(MockStoryApi::login_ok("tok-1"));
        let mut events = event_bus.subscribe();

        manager
            .signup("Alex", "user@example.com", "hunter2")
            .await
            .unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::Registered {
                email: "user@example.com".to_string()
            })
        );
        assert!(manager.current_session().await.is_none());
    }

    #[tokio::test]
    async fn test_logout_clears_everything() {
        let (manager, event_bus, prefs) = manager(MockStoryApi::login_ok("tok-1"));

        manager.login("user@example.com", "pw").await.unwrap();
        let mut events = event_bus.subscribe();
        manager.logout().await.unwrap();

        assert_eq!(
            events.recv().await.unwrap(),
            CoreEvent::Session(SessionEvent::SignedOut)
        );
        assert!(manager.current_session().await.is_none());
        assert!(prefs.get("session").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_restore_picks_up_persisted_session() {
        let prefs = Arc::new(MemoryPreferenceStore::default());
        let store = SessionStore::new(prefs.clone());
        store
            .save(&Session::new("user@example.com", "tok-1"))
            .await
            .unwrap();

        let manager = SessionManager::new(
            Arc::new(MockStoryApi::login_ok("unused")),
            store,
            EventBus::new(16),
        );

        let restored = manager.restore().await.unwrap().unwrap();
        assert_eq!(restored.email, "user@example.com");
        assert_eq!(manager.require_token().await.unwrap(), "tok-1");
    }

    #[tokio::test]
    async fn test_restore_recovers_from_corruption() {
        let prefs = Arc::new(MemoryPreferenceStore::default());
        prefs.set("session", b"{garbage").await.unwrap();

        let manager = SessionManager::new(
            Arc::new(MockStoryApi::login_ok("unused")),
            SessionStore::new(prefs),
            EventBus::new(16),
        );

        assert!(manager.restore().await.unwrap().is_none());
    }
}
