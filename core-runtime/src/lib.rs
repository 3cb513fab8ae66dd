//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the story client core:
//! - Logging and tracing bootstrap
//! - Event bus system
//! - Network status observation
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that other modules depend on.
//! It establishes the logging conventions and event broadcasting mechanisms
//! used throughout the system. Application state that used to live in
//! ambient globals (connectivity flags, "is someone signed in" booleans) is
//! expressed here as typed events and observable handles instead.

pub mod error;
pub mod events;
pub mod logging;
pub mod network;

pub use error::{Error, Result};
pub use events::{CoreEvent, EventBus, EventStream};
pub use network::{NetworkStateHandle, NetworkStatus};
