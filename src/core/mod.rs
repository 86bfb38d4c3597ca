//! # Platform core.
//!
//! The [`Platform`] owns the state table, schedules script slots, supervises
//! raised errors and moves messages. Actor code reaches it only through a
//! [`Cx`] handle.
//!
//! ## Architecture
//! ```text
//! PlatformBuilder ──build──► Platform
//!                               ├── State     contexts (BTreeMap), routes, groups
//!                               ├── scheduler run_q / wait_q / per-address slots
//!                               ├── tasks     FuturesUnordered, driven by run()
//!                               └── Bus       events ──► SubscriberSet
//!
//! Context ── instance: Box<dyn Actor>   (checked out during hooks)
//!         ── runtime:  Runtime          (checked out during scripts)
//!         ── mailbox / receivers / backlog / template / generation
//! ```
//!
//! ## Files
//! - `platform.rs`     struct, queries, scheduler, task loop
//! - `lifecycle.rs`    allocate, start, instance/runtime checkout
//! - `supervision.rs`  raise, trap walk, restart, terminate
//! - `transfer.rs`     send, route, mailbox, groups
//! - `cx.rs`           capability handle

mod builder;
mod config;
mod context;
mod cx;
mod lifecycle;
mod platform;
mod shutdown;
mod state;
mod supervision;
pub mod task;
mod transfer;

#[cfg(test)]
mod tests;

pub use builder::PlatformBuilder;
pub use config::{Config, DEFAULT_MAX_FRAMES};
pub use cx::Cx;
pub use platform::Platform;
pub use task::{TaskFuture, TaskId, TaskState};
