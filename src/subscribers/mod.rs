//! # Event subscribers for the actorvisor platform.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and built-in implementations for handling runtime events broadcast through
//! the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Platform::trigger ── publish(Event) ──► Bus ──► listener ──► SubscriberSet
//!                                                                   │
//!                                                      ┌────────────┼─────────┐
//!                                                      ▼            ▼         ▼
//!                                                  LogWriter     Metrics   Custom
//! ```

mod subscribe;
mod subscriber_set;

#[cfg(feature = "logging")]
mod embedded;

pub use subscribe::Subscribe;
pub use subscriber_set::SubscriberSet;

#[cfg(feature = "logging")]
pub use embedded::LogWriter;
