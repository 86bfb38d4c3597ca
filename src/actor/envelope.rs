use serde::{Deserialize, Serialize};

use crate::address::Address;

/// Opaque message payload. The platform stores and routes it and only looks
/// inside when a [`Matcher`](crate::actor::Matcher) asks it to.
pub type Message = serde_json::Value;

/// A message in flight: target, sender and payload.
///
/// For transferred messages `to` is still the original target, not the router.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    pub to: Address,
    pub from: Address,
    pub message: Message,
}

impl Envelope {
    pub fn new(to: Address, from: Address, message: Message) -> Self {
        Self { to, from, message }
    }
}
