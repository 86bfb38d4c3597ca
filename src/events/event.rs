//! # Runtime events emitted by the platform, the VM and subscriber workers.
//!
//! The [`EventKind`] enum classifies event types across five categories:
//! - **Lifecycle events**: actor allocation, start, restart, removal
//! - **Message events**: accepted, received, dropped, transferred
//! - **Supervision events**: raised, escalated, ignored, unhandled
//! - **Topology events**: routes and group membership
//! - **Execution events**: tasks, opcode trace, platform stop
//!
//! The [`Event`] struct carries additional metadata such as timestamps, the
//! subject address, envelope fields and reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Events are published synchronously at the point of the state change they describe.
//!
//! ## Example
//! ```rust
//! use actorvisor::{Address, Event, EventKind};
//!
//! let ev = Event::new(EventKind::ErrorRaised)
//!     .with_address(Address::parse("/api").unwrap())
//!     .with_reason("boom");
//!
//! assert_eq!(ev.kind, EventKind::ErrorRaised);
//! assert_eq!(ev.address.as_ref().map(|a| a.as_str()), Some("/api"));
//! assert_eq!(ev.reason.as_deref(), Some("boom"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::actor::{Envelope, Message};
use crate::address::Address;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,

    // === Actor lifecycle ===
    /// Context stored in the state table.
    ///
    /// Sets:
    /// - `address`: new actor
    ActorAllocated,

    /// `Actor::run` was invoked.
    ///
    /// Sets:
    /// - `address`: started actor
    ActorStarted,

    /// The actor was replaced by a fresh context after a `Restart` trap decision.
    ///
    /// Sets:
    /// - `address`: restarted actor
    /// - `reason`: error that caused the restart
    ActorRestarted,

    /// Context removed from the state table (kill, stop, temporary exit).
    ///
    /// Sets:
    /// - `address`: removed actor
    ActorRemoved,

    // === Messages ===
    /// Message reached a context (mailbox or direct `accept`).
    ///
    /// Sets:
    /// - `address`: receiving context
    /// - `to`, `from`, `message`: envelope
    MessageAccepted,

    /// Buffered message matched a receiver and is handed to `Actor::receive`.
    ///
    /// Sets:
    /// - `address`: receiving actor
    /// - `to`, `from`, `message`: envelope
    /// - `reason`: matched case tag
    MessageReceived,

    /// Message discarded (unknown target, declined by router, rejected by receiver).
    ///
    /// Sets:
    /// - `to`, `from`, `message`: envelope
    MessageDropped,

    /// Message redirected to a router.
    ///
    /// Sets:
    /// - `address`: router
    /// - `to`, `from`, `message`: envelope (with the original target)
    MessageTransferred,

    // === Supervision ===
    /// An actor raised an error.
    ///
    /// Sets:
    /// - `address`: raiser
    /// - `reason`: error message
    ErrorRaised,

    /// A trap (or its absence) passed the error up one level.
    ///
    /// Sets:
    /// - `address`: level that escalated
    /// - `to`: parent receiving the escalation
    /// - `from`: original raiser
    /// - `reason`: error message
    ErrorEscalated,

    /// A trap returned `Ignore`.
    ///
    /// Sets:
    /// - `address`: level whose trap decided
    /// - `from`: original raiser
    /// - `reason`: error message
    ErrorIgnored,

    /// Escalation passed the root; the platform stops.
    ///
    /// Sets:
    /// - `from`: original raiser
    /// - `reason`: error message
    UnhandledEscalation,

    // === Topology ===
    /// Route registered.
    ///
    /// Sets:
    /// - `address`: router
    /// - `to`: routed subtree
    RouteAdded,

    /// Route removed.
    ///
    /// Sets:
    /// - `to`: routed subtree
    RouteRemoved,

    /// Address joined a group.
    ///
    /// Sets:
    /// - `address`: member
    /// - `reason`: group name
    MemberAdded,

    // === Execution ===
    /// Async work registered with `run_task`; the owner is blocked.
    ///
    /// Sets:
    /// - `address`: owner
    /// - `task`: task id
    TaskRegistered,

    /// Async work finished; the owner is unblocked.
    ///
    /// Sets:
    /// - `address`: owner
    /// - `task`: task id
    /// - `reason`: error message (failure only)
    TaskSettled,

    /// Opcode dispatched (only when `Config::log_ops` is set).
    ///
    /// Sets:
    /// - `address`: executing actor
    /// - `op`: opcode name
    OpExecuted,

    /// The platform loop stopped (explicit stop, signal, fatal error or idle).
    ///
    /// Sets:
    /// - `reason`: why
    PlatformStopped,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Subject actor, if applicable.
    pub address: Option<Address>,
    /// Envelope target (or escalation target).
    pub to: Option<Address>,
    /// Envelope sender (or original raiser).
    pub from: Option<Address>,
    /// Envelope payload.
    pub message: Option<Message>,
    /// Human-readable reason (errors, overflow details, case tags, group names).
    pub reason: Option<Arc<str>>,
    /// Opcode name for `OpExecuted`.
    pub op: Option<&'static str>,
    /// Task id for task events.
    pub task: Option<u64>,
    /// Subscriber name for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            address: None,
            to: None,
            from: None,
            message: None,
            reason: None,
            op: None,
            task: None,
            subscriber: None,
        }
    }

    /// Attaches the subject address.
    #[inline]
    pub fn with_address(mut self, address: Address) -> Self {
        self.address = Some(address);
        self
    }

    /// Attaches a target address.
    #[inline]
    pub fn with_to(mut self, to: Address) -> Self {
        self.to = Some(to);
        self
    }

    /// Attaches a sender address.
    #[inline]
    pub fn with_from(mut self, from: Address) -> Self {
        self.from = Some(from);
        self
    }

    /// Copies `to`, `from` and `message` from an envelope.
    #[inline]
    pub fn with_envelope(mut self, env: &Envelope) -> Self {
        self.to = Some(env.to.clone());
        self.from = Some(env.from.clone());
        self.message = Some(env.message.clone());
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    #[inline]
    pub fn with_op(mut self, op: &'static str) -> Self {
        self.op = Some(op);
        self
    }

    #[inline]
    pub fn with_task(mut self, id: u64) -> Self {
        self.task = Some(id);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_seq_is_monotonic() {
        let a = Event::new(EventKind::ActorAllocated);
        let b = Event::new(EventKind::ActorAllocated);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_with_envelope_copies_fields() {
        let env = Envelope::new(
            Address::parse("/b").unwrap(),
            Address::parse("/a").unwrap(),
            json!({"n": 1}),
        );
        let ev = Event::new(EventKind::MessageDropped).with_envelope(&env);
        assert_eq!(ev.to.as_ref().map(Address::as_str), Some("/b"));
        assert_eq!(ev.from.as_ref().map(Address::as_str), Some("/a"));
        assert_eq!(ev.message, Some(json!({"n": 1})));
    }

    #[test]
    fn test_subscriber_helpers() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert!(ev.is_subscriber_overflow());
        assert_eq!(ev.subscriber, Some("audit"));
        assert!(Event::subscriber_panicked("audit", "boom".into()).is_subscriber_panic());
    }
}
