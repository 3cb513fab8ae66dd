//! Load state machine for the paging coordinator.
//!
//! ```text
//!            ┌──────────────── refresh ────────────────┐
//!            v                                          │
//! Idle ─> LoadingInitial ─> Idle ─> LoadingAppend ──> Idle
//!            │                          │
//!            └────────> Error <─────────┘
//!                        │ (retry)
//!                        └─> Loading*
//! ```
//!
//! `Error` is terminal for the failed request only: the next consumer
//! request transitions back into a loading phase and re-attempts the same
//! gap. `refresh()` may enter `LoadingInitial` from any phase, superseding
//! whatever was in flight.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of the paging coordinator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum LoadPhase {
    /// Nothing in flight.
    #[default]
    Idle,
    /// First page (or a forced refresh) is being fetched.
    LoadingInitial,
    /// The page after the loaded window is being fetched.
    LoadingAppend,
    /// The page before the loaded window is being fetched.
    LoadingPrepend,
    /// The last request failed; the gap may be retried.
    Error {
        /// Human-readable failure message.
        message: String,
    },
}

impl LoadPhase {
    /// Whether a fetch is currently in flight.
    pub fn is_loading(&self) -> bool {
        matches!(
            self,
            LoadPhase::LoadingInitial | LoadPhase::LoadingAppend | LoadPhase::LoadingPrepend
        )
    }

    /// Whether the last request failed.
    pub fn is_error(&self) -> bool {
        matches!(self, LoadPhase::Error { .. })
    }

    /// Whether the machine allows moving to `next`.
    ///
    /// Loading phases are entered from `Idle` or `Error` (retry);
    /// `LoadingInitial` is additionally reachable from any phase because a
    /// refresh supersedes in-flight loads. Loading phases resolve to `Idle`
    /// or `Error`.
    pub fn can_transition(&self, next: &LoadPhase) -> bool {
        match (self, next) {
            // Refresh wins from anywhere.
            (_, LoadPhase::LoadingInitial) => true,
            (LoadPhase::Idle | LoadPhase::Error { .. }, LoadPhase::LoadingAppend) => true,
            (LoadPhase::Idle | LoadPhase::Error { .. }, LoadPhase::LoadingPrepend) => true,
            (phase, LoadPhase::Idle) => phase.is_loading(),
            (phase, LoadPhase::Error { .. }) => phase.is_loading(),
            _ => false,
        }
    }
}

impl fmt::Display for LoadPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LoadPhase::Idle => write!(f, "idle"),
            LoadPhase::LoadingInitial => write!(f, "loading_initial"),
            LoadPhase::LoadingAppend => write!(f, "loading_append"),
            LoadPhase::LoadingPrepend => write!(f, "loading_prepend"),
            LoadPhase::Error { .. } => write!(f, "error"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn error() -> LoadPhase {
        LoadPhase::Error {
            message: "boom".to_string(),
        }
    }

    #[test]
    fn test_initial_load_from_idle() {
        assert!(LoadPhase::Idle.can_transition(&LoadPhase::LoadingInitial));
        assert!(LoadPhase::Idle.can_transition(&LoadPhase::LoadingAppend));
        assert!(LoadPhase::Idle.can_transition(&LoadPhase::LoadingPrepend));
    }

    #[test]
    fn test_loading_resolves_to_idle_or_error() {
        assert!(LoadPhase::LoadingAppend.can_transition(&LoadPhase::Idle));
        assert!(LoadPhase::LoadingAppend.can_transition(&error()));
        assert!(LoadPhase::LoadingInitial.can_transition(&LoadPhase::Idle));
        assert!(!LoadPhase::Idle.can_transition(&error()));
    }

    #[test]
    fn test_error_allows_retry() {
        assert!(error().can_transition(&LoadPhase::LoadingAppend));
        assert!(error().can_transition(&LoadPhase::LoadingInitial));
        assert!(!error().can_transition(&LoadPhase::Idle));
    }

    #[test]
    fn test_refresh_supersedes_inflight_loads() {
        assert!(LoadPhase::LoadingAppend.can_transition(&LoadPhase::LoadingInitial));
        assert!(LoadPhase::LoadingPrepend.can_transition(&LoadPhase::LoadingInitial));
    }

    #[test]
    fn test_no_direct_append_while_appending() {
        assert!(!LoadPhase::LoadingAppend.can_transition(&LoadPhase::LoadingAppend));
        assert!(!LoadPhase::LoadingInitial.can_transition(&LoadPhase::LoadingPrepend));
    }
}
