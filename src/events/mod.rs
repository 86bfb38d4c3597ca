//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the platform, the VM
//! runtimes and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Platform::trigger` (lifecycle, messages, supervision,
//!   topology, tasks), `Runtime` (opcode trace), `SubscriberSet` workers
//!   (overflow/panic).
//! - **Consumers**: the listener spawned by `PlatformBuilder::build` (fans out
//!   to `SubscriberSet`) and any receiver from `Platform::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
