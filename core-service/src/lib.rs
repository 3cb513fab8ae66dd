//! Core service façade and bootstrap helpers.
//!
//! This crate wires the transport, cache, session, and paging modules into
//! the use-case surface the screens consume: signing in and out, the paged
//! story feed, story details, publishing a story, and the geo-tagged story
//! list for the map view. Hosts construct a [`StoryService`] from a
//! [`ServiceConfig`] (or inject their own transport and pool through
//! [`StoryService::with_components`]) and talk to it exclusively; no screen
//! reaches around the façade into the modules.

pub mod config;
pub mod error;

pub use config::ServiceConfig;
pub use error::{Result, ServiceError};

use core_api::{
    PhotoPart, ReqwestHttpClient, Story, StoryApi, StoryApiClient, UploadResponse,
};
use core_cache::{
    create_pool, SqliteRemoteKeyRepository, SqliteStoryRepository, StoryRecord, StoryRepository,
    StoryStore,
};
use core_paging::{diff_by_key, record_from_story, EditOp, PagedSnapshot, PagingCoordinator};
use core_runtime::events::{CoreEvent, EventBus, FeedEvent, NetworkEvent, Receiver};
use core_runtime::network::{NetworkStateHandle, NetworkStatus};
use core_session::{
    FilePreferenceStore, PreferenceStore, Session, SessionManager, SessionStore,
};
use sqlx::SqlitePool;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Primary façade exposed to host applications.
pub struct StoryService {
    api: Arc<dyn StoryApi>,
    session: Arc<SessionManager>,
    coordinator: Arc<PagingCoordinator>,
    stories: Arc<dyn StoryRepository>,
    event_bus: EventBus,
    network: NetworkStateHandle,
}

impl StoryService {
    /// Bootstrap the service from configuration: reqwest transport, SQLite
    /// pool with migrations, file-backed preferences, and a restored
    /// session.
    pub async fn bootstrap(config: ServiceConfig) -> Result<Self> {
        let http_client = Arc::new(ReqwestHttpClient::with_timeout(config.api.timeout));
        let api: Arc<dyn StoryApi> = Arc::new(StoryApiClient::new(http_client, config.api.clone()));

        let pool = create_pool(config.database.clone()).await?;
        let prefs: Arc<dyn PreferenceStore> =
            Arc::new(FilePreferenceStore::new(config.preferences_dir()));

        let service = Self::with_components(api, pool, prefs, &config);
        service.session.restore().await?;

        info!(data_dir = %config.data_dir().display(), "Story service ready");
        Ok(service)
    }

    /// Assemble the service from explicit components.
    ///
    /// Used by tests and by hosts that bring their own transport or pool.
    pub fn with_components(
        api: Arc<dyn StoryApi>,
        pool: SqlitePool,
        prefs: Arc<dyn PreferenceStore>,
        config: &ServiceConfig,
    ) -> Self {
        let event_bus = EventBus::new(config.event_buffer);

        let session = Arc::new(SessionManager::new(
            api.clone(),
            SessionStore::new(prefs),
            event_bus.clone(),
        ));

        let stories: Arc<dyn StoryRepository> = Arc::new(SqliteStoryRepository::new(pool.clone()));
        let coordinator = Arc::new(PagingCoordinator::new(
            api.clone(),
            session.clone(),
            StoryStore::new(pool.clone()),
            stories.clone(),
            Arc::new(SqliteRemoteKeyRepository::new(pool)),
            config.paging.clone(),
            event_bus.clone(),
        ));

        Self {
            api,
            session,
            coordinator,
            stories,
            event_bus,
            network: NetworkStateHandle::default(),
        }
    }

    // ------------------------------------------------------------------
    // Events & connectivity
    // ------------------------------------------------------------------

    /// The event bus shared by all modules.
    pub fn events(&self) -> EventBus {
        self.event_bus.clone()
    }

    /// Subscribe to core events.
    pub fn subscribe_events(&self) -> Receiver<CoreEvent> {
        self.event_bus.subscribe()
    }

    /// Observable connectivity state.
    pub fn network(&self) -> NetworkStateHandle {
        self.network.clone()
    }

    /// Report a connectivity change observed by the host.
    pub fn report_network_status(&self, status: NetworkStatus) {
        self.network.set(status);
        self.event_bus
            .emit(CoreEvent::Network(NetworkEvent::StatusChanged { status }))
            .ok();
    }

    // ------------------------------------------------------------------
    // Session
    // ------------------------------------------------------------------

    /// Sign in and persist the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        Ok(self.session.login(email, password).await?)
    }

    /// Register a new account (does not sign in).
    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<()> {
        Ok(self.session.signup(name, email, password).await?)
    }

    /// Sign out and clear the persisted session.
    pub async fn logout(&self) -> Result<()> {
        Ok(self.session.logout().await?)
    }

    /// The current session, if signed in.
    pub async fn current_session(&self) -> Option<Session> {
        self.session.current_session().await
    }

    // ------------------------------------------------------------------
    // Story feed
    // ------------------------------------------------------------------

    /// The paging coordinator driving the story feed.
    ///
    /// Screens subscribe to its snapshots and call
    /// `initialize`/`load_more`/`refresh` as the list scrolls.
    pub fn feed(&self) -> Arc<PagingCoordinator> {
        self.coordinator.clone()
    }

    /// Minimal edit script between two feed snapshots, for list renderers
    /// that patch rather than rebuild.
    pub fn diff_feed(old: &PagedSnapshot, new: &PagedSnapshot) -> Vec<EditOp<StoryRecord>> {
        diff_by_key(
            &old.items,
            &new.items,
            |story| story.id.clone(),
            |a, b| a == b,
        )
    }

    // ------------------------------------------------------------------
    // Stories
    // ------------------------------------------------------------------

    /// Fetch one story.
    ///
    /// Falls back to the cached copy when the network is unreachable, so a
    /// story opened from the cached feed still renders offline.
    #[instrument(skip(self))]
    pub async fn story_detail(&self, id: &str) -> Result<StoryRecord> {
        let token = self.session.require_token().await?;

        match self.api.story_detail(&token, id).await {
            Ok(story) => Ok(record_from_story(story)),
            Err(core_api::ApiError::Network(reason)) => {
                match self.stories.find_by_id(id).await? {
                    Some(cached) => {
                        warn!(id = id, reason = %reason, "Serving story detail from cache");
                        Ok(cached)
                    }
                    None => Err(core_api::ApiError::Network(reason).into()),
                }
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Upload a new story, then refresh the feed so it shows up.
    #[instrument(skip(self, photo, description))]
    pub async fn publish_story(
        &self,
        photo: PhotoPart,
        description: &str,
        coordinates: Option<(f64, f64)>,
    ) -> Result<UploadResponse> {
        let token = self.session.require_token().await?;

        let response = self
            .api
            .upload_story(&token, photo, description, coordinates)
            .await?;

        self.event_bus
            .emit(CoreEvent::Feed(FeedEvent::StoryPublished {
                with_location: coordinates.is_some(),
            }))
            .ok();

        // Best effort: the upload succeeded even if the follow-up refresh
        // does not.
        if let Err(e) = self.coordinator.refresh().await {
            warn!(error = %e, "Feed refresh after publish failed");
        }

        Ok(response)
    }

    /// All geo-tagged stories, for the map view.
    pub async fn stories_with_location(&self) -> Result<Vec<Story>> {
        let token = self.session.require_token().await?;
        Ok(self.api.stories_with_location(&token).await?)
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Tear down: cancel in-flight feed loads. Their results are discarded
    /// without touching the cache.
    pub fn shutdown(&self) {
        self.coordinator.cancel();
    }
}
