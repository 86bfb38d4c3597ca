//! # Behaviour policy.
//!
//! Instead of a family of actor variants, each actor declares a [`Behaviour`]
//! during `Actor::init`. The platform copies it into the actor's context:
//!
//! | Preset                      | Flags                    | Receivers                         |
//! |-----------------------------|--------------------------|-----------------------------------|
//! | [`Behaviour::direct`]       | –                        | none; every message hits `accept` |
//! | [`Behaviour::buffered`]     | BUFFERED                 | armed per `Cx::receive`           |
//! | [`Behaviour::immutable`]    | IMMUTABLE, BUFFERED      | one standing, never consumed      |
//! | [`Behaviour::temporary`]    | TEMPORARY, BUFFERED      | one; actor exits after the match  |
//!
//! [`Behaviour::router`] adds ROUTER to any preset: transferred messages then
//! bypass the mailbox and always reach `accept`.

use bitflags::bitflags;

use super::case::Matcher;

bitflags! {
    /// Context flags.
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
    pub struct Flags: u8 {
        /// Keeps a standing receiver.
        const IMMUTABLE = 0x1;
        /// Messages queue in a mailbox until a receiver matches them.
        const BUFFERED  = 0x2;
        /// Terminates itself after its first successful match.
        const TEMPORARY = 0x4;
        /// Receives transfers for routed subtrees through `accept`.
        const ROUTER    = 0x8;
    }
}

/// Mailbox and receive policy of one actor.
#[derive(Clone, Debug, Default)]
pub struct Behaviour {
    pub flags: Flags,
    /// Receiver armed at allocation (standing when IMMUTABLE).
    pub matcher: Option<Matcher>,
}

impl Behaviour {
    /// Unbuffered: messages are handed to `accept` on arrival.
    pub fn direct() -> Self {
        Self::default()
    }

    /// Buffered with no receiver armed yet.
    pub fn buffered() -> Self {
        Self {
            flags: Flags::BUFFERED,
            matcher: None,
        }
    }

    /// Buffered with a standing receiver.
    pub fn immutable(matcher: Matcher) -> Self {
        Self {
            flags: Flags::IMMUTABLE | Flags::BUFFERED,
            matcher: Some(matcher),
        }
    }

    /// Buffered, one receiver, removed after it matches.
    pub fn temporary(matcher: Matcher) -> Self {
        Self {
            flags: Flags::TEMPORARY | Flags::BUFFERED,
            matcher: Some(matcher),
        }
    }

    /// Adds the ROUTER flag.
    pub fn router(mut self) -> Self {
        self.flags |= Flags::ROUTER;
        self
    }

    pub fn is_buffered(&self) -> bool {
        self.flags.contains(Flags::BUFFERED)
    }
}
