//! # Paging Module
//!
//! Incremental synchronization between the remote story feed and the local
//! cache.
//!
//! ## Overview
//!
//! This module manages the remote-backed paged view of the story feed:
//! - **Load State Machine** (`state`): validated phases of the feed
//!   (`Idle`, `LoadingInitial`, `LoadingAppend`, `LoadingPrepend`, `Error`)
//! - **Paging Coordinator** (`coordinator`): decides when to fetch, merges
//!   pages into the cache, and publishes continuously updated snapshots
//! - **Diff Engine** (`diff`): minimal edit scripts between successive
//!   snapshots for efficient list patching
//! - **Snapshots** (`snapshot`): the materialized, ordered view handed to
//!   consumers together with its continuation keys

pub mod coordinator;
pub mod diff;
pub mod error;
pub mod snapshot;
pub mod state;

pub use coordinator::{record_from_story, LoadOutcome, PagingConfig, PagingCoordinator};
pub use diff::{apply_edit_script, diff_by_key, EditOp};
pub use error::{PagingError, Result};
pub use snapshot::PagedSnapshot;
pub use state::LoadPhase;
