//! # Paging Coordinator
//!
//! Mediates between the remote story feed and the local cache.
//!
//! ## Overview
//!
//! The coordinator owns the paged view of the feed. Consumers subscribe to
//! a continuously updated [`PagedSnapshot`] and drive loading with three
//! operations:
//! - [`initialize`](PagingCoordinator::initialize): resume from cache, or
//!   fetch page 1 when the cache is empty
//! - [`load_more`](PagingCoordinator::load_more): fetch the page after the
//!   loaded window
//! - [`refresh`](PagingCoordinator::refresh): discard the cache and reload
//!   from page 1, superseding anything in flight
//!
//! ## Workflow
//!
//! 1. Resolve the bearer token from the session
//! 2. Fetch the target page from the remote source
//! 3. Merge the page and its continuation keys into the cache in one
//!    transaction (replace-on-conflict by story id)
//! 4. Advance `next_key`: `page + 1`, or `None` on an empty page (the
//!    empty page is the only end-of-stream signal)
//! 5. Publish the updated snapshot and a feed event
//!
//! A failed fetch leaves the cache and the published snapshot untouched;
//! the coordinator parks in `Error` until the consumer re-triggers the same
//! gap. Cancellation discards the fetch result without mutating anything.
//! Concurrent requests for the same gap coalesce onto the in-flight fetch
//! instead of issuing a duplicate call.

use crate::error::{PagingError, Result};
use crate::snapshot::PagedSnapshot;
use crate::state::LoadPhase;
use core_api::{LocationMode, Story, StoryApi};
use core_cache::{
    PageRequest, RemoteKey, RemoteKeyRepository, StoryRecord, StoryRepository, StoryStore,
};
use core_runtime::events::{CoreEvent, EventBus, FeedEvent};
use core_session::SessionManager;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, instrument, warn};

/// First page of the feed (the service is 1-based).
pub const INITIAL_PAGE: u32 = 1;

/// Paging coordinator configuration.
#[derive(Debug, Clone)]
pub struct PagingConfig {
    /// Page size requested from the remote source.
    pub page_size: u32,
    /// Location filter forwarded to the remote source.
    pub location: LocationMode,
}

impl PagingConfig {
    /// Set the page size
    pub fn page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Set the location filter
    pub fn location(mut self, location: LocationMode) -> Self {
        self.location = location;
        self
    }
}

impl Default for PagingConfig {
    fn default() -> Self {
        Self {
            page_size: 5,
            location: LocationMode::Any,
        }
    }
}

/// What a load request resolved to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadOutcome {
    /// A page was fetched and merged into the cache.
    Applied {
        /// 1-based page index that was applied.
        page: u32,
        /// Number of items the page carried.
        item_count: usize,
        /// Whether this page ended the feed (empty page).
        end_of_feed: bool,
    },
    /// Nothing to fetch: the end of the feed was already observed.
    EndOfFeed,
    /// Nothing to fetch: the window already starts at page 1.
    StartOfFeed,
    /// An identical request was already in flight; this one awaited it
    /// instead of issuing a duplicate call.
    Coalesced,
    /// A refresh claimed the key range mid-flight; the fetched result was
    /// discarded without touching the cache.
    Superseded,
}

/// Gap a fetch is aimed at: direction plus page key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LoadRequest {
    Initial { page: u32 },
    Append { page: u32 },
    Prepend { page: u32 },
}

impl LoadRequest {
    fn page(&self) -> u32 {
        match self {
            LoadRequest::Initial { page }
            | LoadRequest::Append { page }
            | LoadRequest::Prepend { page } => *page,
        }
    }

    fn phase(&self) -> LoadPhase {
        match self {
            LoadRequest::Initial { .. } => LoadPhase::LoadingInitial,
            LoadRequest::Append { .. } => LoadPhase::LoadingAppend,
            LoadRequest::Prepend { .. } => LoadPhase::LoadingPrepend,
        }
    }

    fn is_refresh(&self) -> bool {
        matches!(self, LoadRequest::Initial { .. })
    }
}

/// In-flight fetch registration.
struct Flight {
    request: LoadRequest,
    generation: u64,
    done: watch::Receiver<bool>,
}

/// How a load request relates to the flight slot it found.
enum FlightSlot {
    /// The slot was free; this request owns the fetch.
    Owned(u64, watch::Sender<bool>),
    /// An identical request is in flight; await it and coalesce.
    Shared(watch::Receiver<bool>),
    /// A different request holds the slot; await it and re-evaluate.
    Busy(watch::Receiver<bool>),
}

/// Mutable coordinator state behind one lock.
struct Inner {
    phase: LoadPhase,
    prev_key: Option<u32>,
    next_key: Option<u32>,
    /// Initial content established (first load or cache resume).
    primed: bool,
    /// Bumped by refresh; a flight whose generation is stale discards its
    /// result.
    generation: u64,
    inflight: Option<Flight>,
}

/// Remote-backed paged view of the story feed.
pub struct PagingCoordinator {
    api: Arc<dyn StoryApi>,
    session: Arc<SessionManager>,
    store: StoryStore,
    stories: Arc<dyn StoryRepository>,
    keys: Arc<dyn RemoteKeyRepository>,
    config: PagingConfig,
    event_bus: EventBus,
    cancellation: CancellationToken,
    snapshot_tx: watch::Sender<PagedSnapshot>,
    inner: Arc<Mutex<Inner>>,
}

impl PagingCoordinator {
    /// Create a new paging coordinator.
    pub fn new(
        api: Arc<dyn StoryApi>,
        session: Arc<SessionManager>,
        store: StoryStore,
        stories: Arc<dyn StoryRepository>,
        keys: Arc<dyn RemoteKeyRepository>,
        config: PagingConfig,
        event_bus: EventBus,
    ) -> Self {
        let (snapshot_tx, _) = watch::channel(PagedSnapshot::empty());

        Self {
            api,
            session,
            store,
            stories,
            keys,
            config,
            event_bus,
            cancellation: CancellationToken::new(),
            snapshot_tx,
            inner: Arc::new(Mutex::new(Inner {
                phase: LoadPhase::Idle,
                prev_key: None,
                next_key: None,
                primed: false,
                generation: 0,
                inflight: None,
            })),
        }
    }

    /// Subscribe to snapshot updates.
    ///
    /// The receiver immediately holds the current snapshot, then observes
    /// every change.
    pub fn subscribe(&self) -> watch::Receiver<PagedSnapshot> {
        self.snapshot_tx.subscribe()
    }

    /// The currently published snapshot.
    pub fn snapshot(&self) -> PagedSnapshot {
        self.snapshot_tx.borrow().clone()
    }

    /// Current phase of the load state machine.
    pub async fn phase(&self) -> LoadPhase {
        self.inner.lock().await.phase.clone()
    }

    /// Token observing coordinator cancellation.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancellation.clone()
    }

    /// Cancel the coordinator: in-flight fetch results are discarded
    /// without touching the cache or the published snapshot.
    pub fn cancel(&self) {
        self.cancellation.cancel();
    }

    /// Establish initial content: resume from a non-empty cache (restoring
    /// the persisted continuation key), or fetch page 1.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> Result<()> {
        {
            let mut inner = self.inner.lock().await;
            if inner.primed {
                return Ok(());
            }

            let cached = self.stories.count().await?;
            if cached > 0 {
                inner.primed = true;
                inner.prev_key = None;
                inner.next_key = self.keys.latest().await?.and_then(|k| k.next_key);

                let snapshot = self.build_snapshot(inner.prev_key, inner.next_key).await?;
                self.snapshot_tx.send_replace(snapshot);

                info!(cached, next_key = ?inner.next_key, "Resumed feed from cache");
                return Ok(());
            }
        }

        self.load_more().await.map(|_| ())
    }

    /// Fetch the page after the loaded window.
    ///
    /// On an unprimed feed this is the initial load of page 1. Returns
    /// [`LoadOutcome::EndOfFeed`] without a remote call once an empty page
    /// was observed, and [`LoadOutcome::Coalesced`] when an identical
    /// request is already in flight.
    pub async fn load_more(&self) -> Result<LoadOutcome> {
        loop {
            let (target, flight) = {
                let mut inner = self.inner.lock().await;
                Self::drop_stale_flight(&mut inner);

                let target = if !inner.primed {
                    LoadRequest::Initial { page: INITIAL_PAGE }
                } else {
                    match inner.next_key {
                        Some(page) => LoadRequest::Append { page },
                        None => return Ok(LoadOutcome::EndOfFeed),
                    }
                };

                match &inner.inflight {
                    Some(flight) if flight.request == target => {
                        (target, FlightSlot::Shared(flight.done.clone()))
                    }
                    Some(flight) => (target, FlightSlot::Busy(flight.done.clone())),
                    None => {
                        let (gen, done_tx) = self.register_flight(&mut inner, target);
                        (target, FlightSlot::Owned(gen, done_tx))
                    }
                }
            };

            match flight {
                FlightSlot::Busy(done) => {
                    // A different load owns the slot; wait it out and
                    // re-evaluate the gap.
                    Self::await_done(done).await;
                    continue;
                }
                FlightSlot::Shared(done) => {
                    Self::await_done(done).await;
                    debug!(page = target.page(), "Coalesced onto in-flight load");
                    return Ok(LoadOutcome::Coalesced);
                }
                FlightSlot::Owned(generation, done_tx) => {
                    return self.run_load(target, generation, done_tx).await;
                }
            }
        }
    }

    /// Fetch the page before the loaded window.
    ///
    /// The window grows from page 1, so in steady state this reports
    /// [`LoadOutcome::StartOfFeed`] without issuing a call.
    pub async fn load_previous(&self) -> Result<LoadOutcome> {
        loop {
            let (target, flight) = {
                let mut inner = self.inner.lock().await;
                Self::drop_stale_flight(&mut inner);

                if !inner.primed {
                    return Ok(LoadOutcome::StartOfFeed);
                }
                let target = match inner.prev_key {
                    Some(page) => LoadRequest::Prepend { page },
                    None => return Ok(LoadOutcome::StartOfFeed),
                };

                match &inner.inflight {
                    Some(flight) if flight.request == target => {
                        (target, FlightSlot::Shared(flight.done.clone()))
                    }
                    Some(flight) => (target, FlightSlot::Busy(flight.done.clone())),
                    None => {
                        let (gen, done_tx) = self.register_flight(&mut inner, target);
                        (target, FlightSlot::Owned(gen, done_tx))
                    }
                }
            };

            match flight {
                FlightSlot::Busy(done) => {
                    Self::await_done(done).await;
                    continue;
                }
                FlightSlot::Shared(done) => {
                    Self::await_done(done).await;
                    return Ok(LoadOutcome::Coalesced);
                }
                FlightSlot::Owned(generation, done_tx) => {
                    return self.run_load(target, generation, done_tx).await;
                }
            }
        }
    }

    /// Force a reload from page 1, regardless of current state.
    ///
    /// The cache is cleared and rewritten in the same transaction as the
    /// incoming page; any in-flight load is superseded and its result
    /// discarded (at most one authoritative outcome per key).
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> Result<LoadOutcome> {
        let target = LoadRequest::Initial { page: INITIAL_PAGE };
        let (generation, done_tx) = {
            let mut inner = self.inner.lock().await;
            inner.generation += 1;
            self.register_flight(&mut inner, target)
        };
        self.run_load(target, generation, done_tx).await
    }

    /// A flight whose sender vanished (its driving task was dropped) can
    /// never resolve; free the slot so the gap stays loadable.
    fn drop_stale_flight(inner: &mut Inner) {
        if inner
            .inflight
            .as_ref()
            .is_some_and(|f| f.done.has_changed().is_err() && !*f.done.borrow())
        {
            warn!("Discarding abandoned in-flight load");
            inner.inflight = None;
            if inner.phase.is_loading() {
                inner.phase = LoadPhase::Idle;
            }
        }
    }

    /// Put a flight into the slot; returns its generation and the sender
    /// that resolves the waiters.
    fn register_flight(
        &self,
        inner: &mut Inner,
        request: LoadRequest,
    ) -> (u64, watch::Sender<bool>) {
        let next_phase = request.phase();
        if !inner.phase.can_transition(&next_phase) {
            warn!(from = %inner.phase, to = %next_phase, "Unexpected load state transition");
        }
        inner.phase = next_phase;

        let (done_tx, done_rx) = watch::channel(false);
        inner.inflight = Some(Flight {
            request,
            generation: inner.generation,
            done: done_rx,
        });
        (inner.generation, done_tx)
    }

    async fn await_done(mut done: watch::Receiver<bool>) {
        while !*done.borrow() {
            if done.changed().await.is_err() {
                break;
            }
        }
    }

    /// Execute one registered load and resolve its waiters.
    async fn run_load(
        &self,
        request: LoadRequest,
        generation: u64,
        done_tx: watch::Sender<bool>,
    ) -> Result<LoadOutcome> {
        let page = request.page();
        self.event_bus
            .emit(CoreEvent::Feed(FeedEvent::LoadStarted {
                page,
                refresh: request.is_refresh(),
            }))
            .ok();

        let result = self.fetch_and_apply(request, generation).await;

        {
            let mut inner = self.inner.lock().await;
            let ours = inner
                .inflight
                .as_ref()
                .is_some_and(|f| f.generation == generation && f.request == request);
            if ours {
                inner.inflight = None;
            }
        }
        let _ = done_tx.send(true);

        match &result {
            Ok(LoadOutcome::Applied {
                page,
                item_count,
                end_of_feed,
            }) => {
                self.event_bus
                    .emit(CoreEvent::Feed(FeedEvent::PageApplied {
                        page: *page,
                        item_count: *item_count,
                        end_of_feed: *end_of_feed,
                    }))
                    .ok();
            }
            Ok(LoadOutcome::Superseded) => {
                debug!(page, "Load superseded by refresh, result discarded");
            }
            Ok(_) => {}
            Err(PagingError::Cancelled) => {
                self.event_bus
                    .emit(CoreEvent::Feed(FeedEvent::LoadCancelled { page }))
                    .ok();
            }
            Err(e) => {
                self.event_bus
                    .emit(CoreEvent::Feed(FeedEvent::LoadFailed {
                        page,
                        message: e.user_message(),
                    }))
                    .ok();
            }
        }

        result
    }

    async fn fetch_and_apply(&self, request: LoadRequest, generation: u64) -> Result<LoadOutcome> {
        let page = request.page();

        let token = match self.session.require_token().await {
            Ok(token) => token,
            Err(e) => {
                self.resolve_failure(request, generation, e.to_string()).await;
                return Err(e.into());
            }
        };

        let fetch = self
            .api
            .stories(&token, page, self.config.page_size, self.config.location);
        let fetched = tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                self.resolve_cancelled(request, generation).await;
                return Err(PagingError::Cancelled);
            }
            result = fetch => result,
        };

        let stories = match fetched {
            Ok(stories) => stories,
            Err(e) => {
                self.resolve_failure(request, generation, e.user_message().to_string())
                    .await;
                return Err(e.into());
            }
        };

        // Teardown between fetch completion and application: discard.
        if self.cancellation.is_cancelled() {
            self.resolve_cancelled(request, generation).await;
            return Err(PagingError::Cancelled);
        }

        let mut inner = self.inner.lock().await;
        if inner.generation != generation {
            return Ok(LoadOutcome::Superseded);
        }

        let item_count = stories.len();
        let end_of_feed = stories.is_empty();
        let prev_key = if page == INITIAL_PAGE {
            None
        } else {
            Some(page - 1)
        };
        let next_key = if end_of_feed { None } else { Some(page + 1) };

        let records: Vec<StoryRecord> = stories.into_iter().map(record_from_story).collect();
        let keys: Vec<RemoteKey> = records
            .iter()
            .map(|record| RemoteKey {
                story_id: record.id.clone(),
                prev_key,
                next_key,
            })
            .collect();

        // An empty append leaves the cache untouched; a refresh always
        // rewrites it so the cache reflects only the latest remote state.
        let write_result = if request.is_refresh() {
            self.store.apply_remote_page(true, &records, &keys).await
        } else if end_of_feed {
            Ok(())
        } else {
            self.store.apply_remote_page(false, &records, &keys).await
        };
        if let Err(e) = write_result {
            inner.phase = LoadPhase::Error {
                message: e.to_string(),
            };
            return Err(e.into());
        }

        match request {
            LoadRequest::Initial { .. } => {
                inner.prev_key = None;
                inner.next_key = next_key;
            }
            LoadRequest::Append { .. } => {
                inner.next_key = next_key;
            }
            LoadRequest::Prepend { .. } => {
                inner.prev_key = if end_of_feed { None } else { prev_key };
            }
        }
        inner.primed = true;

        match self.build_snapshot(inner.prev_key, inner.next_key).await {
            Ok(snapshot) => {
                inner.phase = LoadPhase::Idle;
                self.snapshot_tx.send_replace(snapshot);
            }
            Err(e) => {
                inner.phase = LoadPhase::Error {
                    message: e.user_message(),
                };
                return Err(e);
            }
        }

        info!(page, item_count, end_of_feed, "Applied feed page");
        Ok(LoadOutcome::Applied {
            page,
            item_count,
            end_of_feed,
        })
    }

    /// Park in `Error` unless a refresh already took over the slot.
    async fn resolve_failure(&self, request: LoadRequest, generation: u64, message: String) {
        let mut inner = self.inner.lock().await;
        if inner.generation == generation && inner.phase == request.phase() {
            warn!(page = request.page(), message = %message, "Feed load failed");
            inner.phase = LoadPhase::Error { message };
        }
    }

    /// Return to `Idle` without mutating cache or snapshot.
    async fn resolve_cancelled(&self, request: LoadRequest, generation: u64) {
        let mut inner = self.inner.lock().await;
        if inner.generation == generation && inner.phase == request.phase() {
            debug!(page = request.page(), "Feed load cancelled");
            inner.phase = LoadPhase::Idle;
        }
    }

    async fn build_snapshot(
        &self,
        prev_key: Option<u32>,
        next_key: Option<u32>,
    ) -> Result<PagedSnapshot> {
        let count = self.stories.count().await?;
        let items = self
            .stories
            .read_page(PageRequest::new(0, count.max(0) as u32))
            .await?;

        Ok(PagedSnapshot {
            items,
            prev_key,
            next_key,
        })
    }
}

/// Convert a wire story into its cached representation.
pub fn record_from_story(story: Story) -> StoryRecord {
    StoryRecord {
        id: story.id,
        name: story.name,
        description: story.description,
        photo_url: story.photo_url,
        created_at: story.created_at,
        lat: story.lat,
        lon: story.lon,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = PagingConfig::default();
        assert_eq!(config.page_size, 5);
        assert_eq!(config.location, LocationMode::Any);
    }

    #[test]
    fn test_config_builder() {
        let config = PagingConfig::default()
            .page_size(20)
            .location(LocationMode::Required);
        assert_eq!(config.page_size, 20);
        assert_eq!(config.location, LocationMode::Required);
    }

    #[test]
    fn test_load_request_phases() {
        assert_eq!(
            LoadRequest::Initial { page: 1 }.phase(),
            LoadPhase::LoadingInitial
        );
        assert_eq!(
            LoadRequest::Append { page: 2 }.phase(),
            LoadPhase::LoadingAppend
        );
        assert_eq!(
            LoadRequest::Prepend { page: 1 }.phase(),
            LoadPhase::LoadingPrepend
        );
        assert!(LoadRequest::Initial { page: 1 }.is_refresh());
        assert!(!LoadRequest::Append { page: 2 }.is_refresh());
    }

    #[test]
    fn test_record_conversion_preserves_fields() {
        let story = Story {
            id: "s1".to_string(),
            name: "Alex".to_string(),
            description: "pier".to_string(),
            photo_url: Some("https://cdn.example.com/1.jpg".to_string()),
            created_at: "2024-11-20T10:00:00Z".to_string(),
            lat: Some(-6.2),
            lon: Some(106.8),
        };

        let record = record_from_story(story);
        assert_eq!(record.id, "s1");
        assert_eq!(record.photo_url.as_deref(), Some("https://cdn.example.com/1.jpg"));
        assert_eq!(record.lat, Some(-6.2));
    }
}
