//! Actor-facing types.
//!
//! ## Contents
//! - [`Actor`] the single trait every actor implements
//! - [`Behaviour`], [`Flags`] mailbox/receive policy declared in `init`
//! - [`Matcher`], [`Case`], [`Kind`] first-match-wins receive patterns
//! - [`Template`] factory + trap + args + groups + children
//! - [`Envelope`], [`Message`] messages in flight

mod behaviour;
mod case;
mod envelope;
mod instance;
mod template;

pub use behaviour::{Behaviour, Flags};
pub use case::{Case, Kind, Matcher};
pub use envelope::{Envelope, Message};
pub use instance::Actor;
pub use template::Template;
