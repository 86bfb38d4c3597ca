//! # LogWriter: events rendered through `tracing`
//!
//! A minimal subscriber that turns incoming [`Event`]s into `tracing` records.
//! Use it for tests or demos; install any `tracing` subscriber to see output.
//!
//! ## Example output (fmt subscriber)
//! ```text
//! INFO  actor allocated address=/api
//! INFO  actor started address=/api
//! DEBUG message accepted address=/api to=/api from=? message={"n":1}
//! WARN  message dropped to=/ghost from=/api message="ping"
//! WARN  error raised address=/api/w1 reason=boom
//! INFO  actor restarted address=/api/w1 reason=boom
//! ERROR unhandled escalation from=/api/w1 reason=boom
//! ```

use async_trait::async_trait;

use crate::address::Address;
use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn addr(a: &Option<Address>) -> &str {
    a.as_ref().map_or("-", Address::as_str)
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let reason = e.reason.as_deref().unwrap_or("-");
        let message = e
            .message
            .as_ref()
            .map(ToString::to_string)
            .unwrap_or_default();
        match e.kind {
            EventKind::ActorAllocated => tracing::info!(address = addr(&e.address), "actor allocated"),
            EventKind::ActorStarted => tracing::info!(address = addr(&e.address), "actor started"),
            EventKind::ActorRestarted => {
                tracing::info!(address = addr(&e.address), reason, "actor restarted")
            }
            EventKind::ActorRemoved => tracing::info!(address = addr(&e.address), "actor removed"),
            EventKind::MessageAccepted | EventKind::MessageReceived => tracing::debug!(
                address = addr(&e.address),
                to = addr(&e.to),
                from = addr(&e.from),
                %message,
                "message {}",
                if e.kind == EventKind::MessageAccepted { "accepted" } else { "received" }
            ),
            EventKind::MessageTransferred => tracing::debug!(
                router = addr(&e.address),
                to = addr(&e.to),
                from = addr(&e.from),
                "message transferred"
            ),
            EventKind::MessageDropped => tracing::warn!(
                to = addr(&e.to),
                from = addr(&e.from),
                %message,
                "message dropped"
            ),
            EventKind::ErrorRaised => {
                tracing::warn!(address = addr(&e.address), reason, "error raised")
            }
            EventKind::ErrorEscalated => tracing::info!(
                address = addr(&e.address),
                parent = addr(&e.to),
                source = addr(&e.from),
                reason,
                "error escalated"
            ),
            EventKind::ErrorIgnored => tracing::info!(
                address = addr(&e.address),
                source = addr(&e.from),
                reason,
                "error ignored"
            ),
            EventKind::UnhandledEscalation => {
                tracing::error!(from = addr(&e.from), reason, "unhandled escalation")
            }
            EventKind::RouteAdded => {
                tracing::debug!(router = addr(&e.address), target = addr(&e.to), "route added")
            }
            EventKind::RouteRemoved => tracing::debug!(target = addr(&e.to), "route removed"),
            EventKind::MemberAdded => {
                tracing::debug!(address = addr(&e.address), group = reason, "member added")
            }
            EventKind::TaskRegistered | EventKind::TaskSettled => tracing::debug!(
                address = addr(&e.address),
                task = e.task,
                reason,
                "task {}",
                if e.kind == EventKind::TaskRegistered { "registered" } else { "settled" }
            ),
            EventKind::OpExecuted => {
                tracing::trace!(address = addr(&e.address), op = e.op, "op")
            }
            EventKind::PlatformStopped => tracing::info!(reason, "platform stopped"),
            EventKind::SubscriberOverflow => {
                tracing::warn!(subscriber = e.subscriber, reason, "subscriber overflow")
            }
            EventKind::SubscriberPanicked => {
                tracing::error!(subscriber = e.subscriber, reason, "subscriber panicked")
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
