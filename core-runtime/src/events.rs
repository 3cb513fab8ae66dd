//! # Event Bus System
//!
//! Provides an event-driven architecture for the story client core using
//! `tokio::sync::broadcast`. This module enables decoupled communication
//! between core modules through typed events.
//!
//! ## Overview
//!
//! The event bus system consists of:
//! - **Event Types**: Strongly-typed enum hierarchies for each domain
//! - **EventBus**: Central broadcast channel for publishing events
//! - **EventStream**: Wrapper for consuming events with filtering
//!
//! Modules emit events (sign-in completed, a feed page landed, connectivity
//! changed) and any number of subscribers observe them independently. This
//! replaces the ambient mutable flags the UI used to poll.
//!
//! ## Usage
//!
//! ```rust
//! use core_runtime::events::{EventBus, CoreEvent, SessionEvent};
//!
//! let event_bus = EventBus::new(100);
//! let event = CoreEvent::Session(SessionEvent::SignedIn {
//!     email: "user@example.com".to_string(),
//! });
//!
//! event_bus.emit(event).ok();
//! ```
//!
//! ## Error Handling
//!
//! The bus uses `tokio::sync::broadcast`, which can produce two errors on
//! the receiving side:
//!
//! - **`RecvError::Lagged(n)`**: subscriber was too slow and missed `n`
//!   events. Non-fatal; the subscriber keeps receiving new events.
//! - **`RecvError::Closed`**: all senders have been dropped (shutdown).

use serde::{Deserialize, Serialize};
use std::fmt;
use tokio::sync::broadcast;

// Re-export commonly used types
pub use tokio::sync::broadcast::error::{RecvError, SendError};
pub use tokio::sync::broadcast::Receiver;

use crate::network::NetworkStatus;

/// Default buffer size for the event bus channel.
///
/// Subscribers that fall behind by more than this receive `RecvError::Lagged`.
pub const DEFAULT_EVENT_BUFFER_SIZE: usize = 100;

// ============================================================================
// Core Event Types
// ============================================================================

/// Top-level event enum encompassing all event categories.
///
/// This is the main event type published and received through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "payload")]
pub enum CoreEvent {
    /// Session lifecycle events
    Session(SessionEvent),
    /// Story feed loading events
    Feed(FeedEvent),
    /// Connectivity events
    Network(NetworkEvent),
}

impl CoreEvent {
    /// Returns a human-readable description of the event.
    pub fn description(&self) -> &str {
        match self {
            CoreEvent::Session(e) => e.description(),
            CoreEvent::Feed(e) => e.description(),
            CoreEvent::Network(e) => e.description(),
        }
    }

    /// Returns the severity level of the event.
    pub fn severity(&self) -> EventSeverity {
        match self {
            CoreEvent::Session(SessionEvent::SessionError { .. }) => EventSeverity::Error,
            CoreEvent::Feed(FeedEvent::LoadFailed { .. }) => EventSeverity::Error,
            CoreEvent::Network(NetworkEvent::StatusChanged {
                status: NetworkStatus::Disconnected,
            }) => EventSeverity::Warning,
            CoreEvent::Session(SessionEvent::SignedIn { .. }) => EventSeverity::Info,
            CoreEvent::Feed(FeedEvent::StoryPublished { .. }) => EventSeverity::Info,
            _ => EventSeverity::Debug,
        }
    }
}

/// Event severity levels for filtering and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventSeverity {
    /// Debug-level events (verbose)
    Debug,
    /// Informational events
    Info,
    /// Warning events
    Warning,
    /// Error events
    Error,
}

// ============================================================================
// Session Events
// ============================================================================

/// Events related to the authenticated session.
///
/// Payloads carry the account email only; the bearer token never travels
/// through the event bus.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum SessionEvent {
    /// Credential exchange with the remote service is in progress.
    SigningIn {
        /// Email the sign-in was requested for.
        email: String,
    },
    /// A session was established and persisted.
    SignedIn {
        /// Email of the signed-in account.
        email: String,
    },
    /// A new account was registered (the user still has to sign in).
    Registered {
        /// Email of the registered account.
        email: String,
    },
    /// The session was cleared.
    SignedOut,
    /// Sign-in, sign-up, or session persistence failed.
    SessionError {
        /// Human-readable error message.
        message: String,
        /// Whether retrying the operation can succeed.
        recoverable: bool,
    },
}

impl SessionEvent {
    fn description(&self) -> &str {
        match self {
            SessionEvent::SigningIn { .. } => "Sign-in in progress",
            SessionEvent::SignedIn { .. } => "User signed in successfully",
            SessionEvent::Registered { .. } => "Account registered",
            SessionEvent::SignedOut => "User signed out",
            SessionEvent::SessionError { .. } => "Session error",
        }
    }
}

// ============================================================================
// Feed Events
// ============================================================================

/// Events related to loading the paged story feed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "event")]
pub enum FeedEvent {
    /// A page fetch was issued against the remote service.
    LoadStarted {
        /// 1-based page index being fetched.
        page: u32,
        /// Whether this load replaces the cache (refresh) or extends it.
        refresh: bool,
    },
    /// A fetched page was merged into the local store.
    PageApplied {
        /// 1-based page index that was applied.
        page: u32,
        /// Number of items the page carried.
        item_count: usize,
        /// Whether this page terminated the feed (empty page).
        end_of_feed: bool,
    },
    /// A page fetch failed; the store and snapshot are unchanged.
    LoadFailed {
        /// 1-based page index that failed.
        page: u32,
        /// Human-readable error message.
        message: String,
    },
    /// A page fetch was abandoned because the consumer went away.
    LoadCancelled {
        /// 1-based page index whose result was discarded.
        page: u32,
    },
    /// A new story was uploaded successfully.
    StoryPublished {
        /// Whether the story carried coordinates.
        with_location: bool,
    },
}

impl FeedEvent {
    fn description(&self) -> &str {
        match self {
            FeedEvent::LoadStarted { .. } => "Feed page load started",
            FeedEvent::PageApplied { .. } => "Feed page applied",
            FeedEvent::LoadFailed { .. } => "Feed page load failed",
            FeedEvent::LoadCancelled { .. } => "Feed page load cancelled",
            FeedEvent::StoryPublished { .. } => "Story published",
        }
    }
}

// ============================================================================
// Network Events
// ============================================================================

/// Connectivity change notifications.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "event")]
pub enum NetworkEvent {
    /// The observed connectivity status changed.
    StatusChanged {
        /// New status.
        status: NetworkStatus,
    },
}

impl NetworkEvent {
    fn description(&self) -> &str {
        match self {
            NetworkEvent::StatusChanged { .. } => "Network status changed",
        }
    }
}

// ============================================================================
// Event Bus
// ============================================================================

/// Central broadcast channel for publishing [`CoreEvent`]s.
///
/// The bus is cheap to clone and fully thread-safe; share it across tasks
/// with `Arc` or by cloning.
#[derive(Clone)]
pub struct EventBus {
    sender: broadcast::Sender<CoreEvent>,
}

impl EventBus {
    /// Creates a new event bus with the specified buffer size.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Creates a new event bus with the default buffer size.
    #[allow(clippy::should_implement_trait)]
    pub fn default() -> Self {
        Self::new(DEFAULT_EVENT_BUFFER_SIZE)
    }

    /// Publishes an event to all subscribers.
    ///
    /// Returns the number of subscribers that received the event, or an
    /// error when there are no active subscribers. Emitting into an empty
    /// bus is not a failure mode callers need to handle; `.ok()` is fine.
    pub fn emit(&self, event: CoreEvent) -> Result<usize, SendError<CoreEvent>> {
        self.sender.send(event)
    }

    /// Creates a new subscriber to receive events.
    ///
    /// Each call creates an independent receiver that will receive all
    /// future events. Past events are not replayed.
    pub fn subscribe(&self) -> Receiver<CoreEvent> {
        self.sender.subscribe()
    }

    /// Returns the number of active subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Event Stream Wrapper
// ============================================================================

/// Type alias for event filter functions.
type EventFilter = Box<dyn Fn(&CoreEvent) -> bool + Send + Sync>;

/// A wrapper around `broadcast::Receiver` with filtering capabilities.
///
/// ```rust
/// use core_runtime::events::{EventBus, EventStream, CoreEvent};
///
/// let event_bus = EventBus::new(100);
/// let stream = EventStream::new(event_bus.subscribe())
///     .filter(|event| matches!(event, CoreEvent::Session(_)));
/// ```
pub struct EventStream {
    receiver: Receiver<CoreEvent>,
    filter: Option<EventFilter>,
}

impl EventStream {
    /// Creates a new event stream from a receiver.
    pub fn new(receiver: Receiver<CoreEvent>) -> Self {
        Self {
            receiver,
            filter: None,
        }
    }

    /// Adds a filter function to this stream.
    ///
    /// Only events that match the filter will be returned by `recv()`.
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&CoreEvent) -> bool + Send + Sync + 'static,
    {
        self.filter = Some(Box::new(predicate));
        self
    }

    /// Receives the next event that passes the filter (if any).
    ///
    /// # Errors
    ///
    /// Returns `RecvError::Lagged(n)` if the subscriber fell behind by `n`
    /// events, `RecvError::Closed` if all senders have been dropped.
    pub async fn recv(&mut self) -> Result<CoreEvent, RecvError> {
        loop {
            let event = self.receiver.recv().await?;

            let Some(filter) = &self.filter else {
                return Ok(event);
            };

            if filter(&event) {
                return Ok(event);
            }
        }
    }

    /// Attempts to receive an event without blocking.
    ///
    /// Returns `None` if no matching events are currently available.
    pub fn try_recv(&mut self) -> Option<Result<CoreEvent, RecvError>> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    let Some(filter) = &self.filter else {
                        return Some(Ok(event));
                    };

                    if filter(&event) {
                        return Some(Ok(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => return None,
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    return Some(Err(RecvError::Lagged(n)))
                }
                Err(broadcast::error::TryRecvError::Closed) => return Some(Err(RecvError::Closed)),
            }
        }
    }
}

impl fmt::Debug for EventStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventStream")
            .field("has_filter", &self.filter.is_some())
            .finish()
    }
}

// ============================================================================
// Tests
// ============================================================================
