//! # Message delivery, routing and groups.
//!
//! ```text
//! route_message(to, from, msg)
//!   ├─ to == DISCARD               ──► absorbed, true
//!   ├─ router(to) registered       ──► MessageTransferred ──► deliver at router
//!   ├─ no context at `to`          ──► false (caller records the drop)
//!   └─ deliver at `to`
//!        ├─ BUFFERED ──► mailbox (FIFO) ──► notify slot
//!        └─ direct   ──► accept now, or backlog while the actor is busy
//! ```
//!
//! A ROUTER-flagged router receives transfers through `accept` even when it
//! is buffered. Envelopes keep their original `to` through a transfer.

use crate::actor::{Envelope, Flags, Matcher, Message};
use crate::address::Address;
use crate::events::{Event, EventKind};

use super::context::Receiver;
use super::platform::Platform;

/// Mailbox head matched by an armed receiver.
pub(crate) struct Match {
    pub case: &'static str,
    pub envelope: Envelope,
    pub temporary: bool,
}

impl Platform {
    /// Sends `message` from `from` to `to`; `false` when nobody could take it.
    pub fn send_message(&mut self, to: &Address, from: &Address, message: Message) -> bool {
        let sent = self.route_message(to, from, message);
        self.drain();
        sent
    }

    /// Sends from outside the tree; see [`Platform::tell_from`].
    pub fn tell(&mut self, to: &Address, message: Message) -> bool {
        self.tell_from(to, &Address::discard(), message)
    }

    /// Like [`Platform::send_message`], but an undeliverable message is
    /// recorded as dropped.
    pub fn tell_from(&mut self, to: &Address, from: &Address, message: Message) -> bool {
        let sent = self.route_message(to, from, message.clone());
        if !sent {
            self.drop_message(Envelope::new(to.clone(), from.clone(), message));
        }
        self.drain();
        sent
    }

    /// Sends to every member of `group`; returns how many accepted.
    pub fn broadcast(&mut self, group: &str, message: Message) -> usize {
        self.broadcast_from(group, &Address::discard(), message)
    }

    pub fn broadcast_from(&mut self, group: &str, from: &Address, message: Message) -> usize {
        let n = self.tell_members(group, from, message);
        self.drain();
        n
    }

    /// Records that `env` was discarded.
    pub fn drop_message(&mut self, env: Envelope) {
        tracing::trace!(to = %env.to, from = %env.from, "message dropped");
        self.trigger(Event::new(EventKind::MessageDropped).with_envelope(&env));
    }

    pub(crate) fn tell_members(&mut self, group: &str, from: &Address, message: Message) -> usize {
        self.state
            .get_group(group)
            .into_iter()
            .filter(|member| self.route_message(member, from, message.clone()))
            .count()
    }

    pub(crate) fn route_message(&mut self, to: &Address, from: &Address, message: Message) -> bool {
        if to.is_discard() {
            return true;
        }
        let env = Envelope::new(to.clone(), from.clone(), message);
        if let Some(router) = self.state.get_router(to) {
            return self.transfer(&router, env);
        }
        self.deliver(env)
    }

    /// Delivers straight to `env.to`, ignoring routes.
    pub(crate) fn deliver(&mut self, env: Envelope) -> bool {
        let to = env.to.clone();
        self.deliver_at(&to, env, false)
    }

    fn transfer(&mut self, router: &Address, env: Envelope) -> bool {
        self.trigger(
            Event::new(EventKind::MessageTransferred)
                .with_address(router.clone())
                .with_envelope(&env),
        );
        if self.state.contains(router) {
            return self.deliver_at(router, env, true);
        }
        // stale route, the message is lost but the send counts as handled
        self.drop_message(env);
        true
    }

    fn deliver_at(&mut self, at: &Address, env: Envelope, transferred: bool) -> bool {
        let Some(ctx) = self.state.get(at) else {
            return false;
        };
        let direct = !ctx.is_buffered() || (transferred && ctx.flags.contains(Flags::ROUTER));
        self.trigger(
            Event::new(EventKind::MessageAccepted)
                .with_address(at.clone())
                .with_envelope(&env),
        );
        if direct {
            self.accept_direct(at, env);
            return true;
        }
        if let Some(mailbox) = self.state.get_mut(at).and_then(|c| c.mailbox.as_mut()) {
            mailbox.push_back(env);
        }
        self.schedule_notify(at);
        true
    }

    // ---------------------------------------------------------------------
    // Receivers and mailbox
    // ---------------------------------------------------------------------

    /// Arms `matcher` as the top receiver of `addr`.
    pub(crate) fn arm_receiver(&mut self, addr: &Address, matcher: Matcher) {
        let Some(ctx) = self.state.get_mut(addr) else {
            return;
        };
        ctx.receivers.push(Receiver {
            matcher,
            standing: false,
        });
        self.schedule_notify(addr);
    }

    pub(crate) fn receiver_count(&self, addr: &Address) -> usize {
        self.state.get(addr).map_or(0, |c| c.receivers.len())
    }

    /// Mailbox length; `None` when `addr` is gone or unbuffered.
    pub fn mailbox_len(&self, addr: &Address) -> Option<usize> {
        self.state.get(addr).and_then(|c| c.mailbox_len())
    }

    /// Tests the mailbox head against the top receiver. On a match the head is
    /// removed, and so is the receiver unless it is standing.
    pub(crate) fn take_match(&mut self, addr: &Address) -> Option<Match> {
        let ctx = self.state.get_mut(addr)?;
        let receiver = ctx.receivers.last()?;
        let head = ctx.mailbox.as_ref()?.front()?;
        let case = receiver.matcher.select(&head.message)?;
        let standing = receiver.standing;

        let envelope = ctx.mailbox.as_mut()?.pop_front()?;
        if !standing {
            ctx.receivers.pop();
        }
        Some(Match {
            case,
            envelope,
            temporary: ctx.flags.contains(Flags::TEMPORARY),
        })
    }

    /// Drops the mailbox head (it matched no receiver).
    pub(crate) fn discard_head(&mut self, addr: &Address) {
        let head = self
            .state
            .get_mut(addr)
            .and_then(|c| c.mailbox.as_mut())
            .and_then(|m| m.pop_front());
        if let Some(env) = head {
            self.drop_message(env);
        }
    }

    /// Takes the mailbox head without matching.
    pub(crate) fn dequeue(&mut self, addr: &Address) -> Option<Envelope> {
        self.state.get_mut(addr)?.mailbox.as_mut()?.pop_front()
    }

    // ---------------------------------------------------------------------
    // Routes and groups
    // ---------------------------------------------------------------------

    /// Sends everything addressed to `target` (or below it) to `router`.
    pub fn put_route(&mut self, target: Address, router: Address) {
        tracing::debug!(routed = %target, router = %router, "route added");
        self.trigger(
            Event::new(EventKind::RouteAdded)
                .with_address(router.clone())
                .with_to(target.clone()),
        );
        self.state.put_route(target, router);
    }

    pub fn remove_route(&mut self, target: &Address) {
        if self.state.remove_route(target).is_some() {
            self.trigger(Event::new(EventKind::RouteRemoved).with_to(target.clone()));
        }
    }

    pub fn get_router(&self, to: &Address) -> Option<Address> {
        self.state.get_router(to)
    }

    /// Adds a live actor to `group`.
    pub fn put_member(&mut self, group: &str, addr: Address) -> bool {
        if !self.state.contains(&addr) {
            return false;
        }
        let added = self.state.put_member(group, addr.clone());
        if added {
            self.trigger(
                Event::new(EventKind::MemberAdded)
                    .with_address(addr)
                    .with_reason(group),
            );
        }
        added
    }

    pub fn remove_member(&mut self, group: &str, addr: &Address) -> bool {
        self.state.remove_member(group, addr)
    }

    pub fn get_group(&self, group: &str) -> Vec<Address> {
        self.state.get_group(group)
    }
}
