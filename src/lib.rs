//! # actorvisor
//!
//! **Actorvisor** is a single-threaded actor platform with a small bytecode VM.
//!
//! Actors live in a tree of hierarchical addresses, exchange JSON messages,
//! and are supervised by traps that decide what happens when one of them
//! fails. Every actor owns a VM runtime; the platform schedules scripts on
//! those runtimes one slot at a time and drives async work in between.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐
//!     │   Template   │   │   Template   │   │   Template   │
//!     │ (factory,    │   │  + children  │   │  + trap      │
//!     │  args, trap) │   │  + groups    │   │              │
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘
//!            ▼                  ▼                  ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Platform (single thread)                                         │
//! │  - State       contexts by address, routes, groups                │
//! │  - Scheduler   per-address slots, run queue, wait queue           │
//! │  - Supervision raise ─► trap walk ─► ignore/restart/stop/fatal    │
//! │  - Tasks       futures owned by actors, driven by run()           │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐   │
//!     │   Context    │   │   Context    │   │   Context    │   │
//!     │ Actor + VM   │   │ Actor + VM   │   │ Actor + VM   │   │
//!     │ mailbox      │   │ mailbox      │   │ mailbox      │   │
//!     └┬─────────────┘   └┬─────────────┘   └┬─────────────┘   │
//!      │ ActorStarted     │ MessageAccepted  │ ErrorRaised     │
//!      ▼                  ▼                  ▼                 ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │                   (capacity: Config::bus_capacity)                │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │   listener (builder)   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                      worker1   worker2   workerN
//! ```
//!
//! ### Message path
//! ```text
//! tell(to, msg)
//!   ├─ router for `to`? ──► transfer to router ──► Actor::accept ──► Cx::forward
//!   ├─ BUFFERED ──► mailbox ──► notify script ──► Read ──► Actor::receive
//!   └─ direct   ──► Actor::accept
//! ```
//!
//! ## Features
//! | Area              | Description                                              | Key types                               |
//! |-------------------|----------------------------------------------------------|-----------------------------------------|
//! | **Actors**        | One trait, behaviour declared at init.                   | [`Actor`], [`Behaviour`], [`Template`]  |
//! | **Addressing**    | Hierarchical `/a/b` paths, DISCARD sink.                 | [`Address`]                             |
//! | **Matching**      | First-match-wins receive patterns.                       | [`Matcher`], [`Case`]                   |
//! | **Supervision**   | Per-template traps, root trap on the builder.            | [`Trap`], [`TrapAction`]                |
//! | **VM**            | Stack bytecode with VM and native functions.             | [`Script`], [`Instr`], [`Runtime`]      |
//! | **Subscriber API**| Hook into platform events.                               | [`Subscribe`], [`Event`]                |
//! | **Errors**        | Typed platform, VM and actor errors.                     | [`RuntimeError`], [`VmError`], [`ActorError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use actorvisor::{Actor, ActorError, Behaviour, Config, Cx, Envelope, Matcher, Platform, Template};
//! use serde_json::json;
//!
//! struct Greeter;
//!
//! impl Actor for Greeter {
//!     fn init(&mut self, behaviour: &mut Behaviour) {
//!         *behaviour = Behaviour::immutable(Matcher::any("greet"));
//!     }
//!
//!     fn receive(&mut self, _case: &'static str, env: Envelope, _cx: &mut Cx<'_>) -> Result<(), ActorError> {
//!         println!("hello, {}", env.message);
//!         Ok(())
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), actorvisor::RuntimeError> {
//!     let mut platform = Platform::new(Config::default());
//!     let greeter = platform.spawn(Template::new(|_| Box::new(Greeter)).with_id("greeter"))?;
//!     platform.tell(&greeter, json!("world"));
//!     platform.run().await
//! }
//! ```
mod actor;
mod address;
mod core;
mod error;
mod events;
pub mod policies;
mod subscribers;
pub mod vm;

// ---- Public re-exports ----

pub use actor::{Actor, Behaviour, Case, Envelope, Flags, Kind, Matcher, Message, Template};
pub use address::{Address, SELF_TOKEN, SEPARATOR};
pub use self::core::{Config, Cx, Platform, PlatformBuilder, TaskFuture, TaskId, TaskState};
pub use error::{ActorError, RuntimeError, VmError};
pub use events::{Bus, Event, EventKind};
pub use policies::{Trap, TrapAction};
pub use subscribers::{Subscribe, SubscriberSet};
pub use vm::{Constants, FunInfo, Instr, Runtime, Script, Value};

// Optional: expose a simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
