//! # Core subscriber trait
//!
//! `Subscribe` is the extension point for plugging custom event handlers into the
//! platform. Each subscriber is driven by a dedicated worker loop fed by a bounded
//! queue owned by the [`SubscriberSet`](crate::subscribers::SubscriberSet), so a
//! slow sink never stalls opcode dispatch.
//!
//! ## Example
//! ```rust
//! use actorvisor::{Event, EventKind, Subscribe};
//!
//! struct DropAudit;
//!
//! #[async_trait::async_trait]
//! impl Subscribe for DropAudit {
//!     async fn on_event(&self, ev: &Event) {
//!         if ev.kind == EventKind::MessageDropped {
//!             // write audit record...
//!         }
//!     }
//!     fn name(&self) -> &'static str { "drop-audit" }
//!     fn queue_capacity(&self) -> usize { 512 }
//! }
//! ```

use async_trait::async_trait;

use crate::events::Event;

/// Contract for event subscribers.
///
/// Called from a subscriber-dedicated worker task. Implementations should avoid
/// blocking the async runtime.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handle a single event for this subscriber.
    async fn on_event(&self, event: &Event);

    /// Human-readable name (for logs/metrics).
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Preferred capacity of this subscriber's queue.
    ///
    /// On overflow, events for this subscriber are **dropped** and a
    /// `SubscriberOverflow` event is published.
    fn queue_capacity(&self) -> usize {
        1024
    }
}
