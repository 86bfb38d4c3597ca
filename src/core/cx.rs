//! # Capability handle for actor code.
//!
//! A [`Cx`] is handed to every [`Actor`](crate::actor::Actor) hook and to
//! foreign functions. It pairs the actor's runtime with the platform, so all
//! effects are attributed to the actor: sends carry its address as `from`,
//! spawned actors become its children, errors are raised on it.
//!
//! Nothing here drains the scheduler: work scheduled through a `Cx` runs once
//! the current hook returns to the platform.

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::actor::{Envelope, Matcher, Message, Template};
use crate::address::Address;
use crate::error::{ActorError, RuntimeError};
use crate::vm::{Runtime, Script, Value};

use super::platform::Platform;
use super::task::TaskId;

/// Capability handle bound to one actor.
pub struct Cx<'a> {
    runtime: &'a mut Runtime,
    platform: &'a mut Platform,
}

impl<'a> Cx<'a> {
    pub(crate) fn new(runtime: &'a mut Runtime, platform: &'a mut Platform) -> Self {
        Self { runtime, platform }
    }

    /// Address of the actor this handle belongs to.
    pub fn address(&self) -> &Address {
        self.runtime.address()
    }

    /// Read-only view of the platform.
    pub fn platform(&self) -> &Platform {
        &*self.platform
    }

    /// Allocates `template` as a child and starts it (with its own children).
    pub fn spawn(&mut self, template: Template) -> Result<Address, RuntimeError> {
        let addr = self.alloc(template)?;
        self.platform.start_tree(&addr)?;
        Ok(addr)
    }

    /// Allocates `template` as a child without starting it.
    pub fn alloc(&mut self, template: Template) -> Result<Address, RuntimeError> {
        let parent = self.runtime.address().clone();
        self.platform.alloc_actor(&parent, template)
    }

    /// Starts an allocated actor.
    pub fn run(&mut self, target: &Address) -> Result<(), RuntimeError> {
        self.platform.start_actor(target)
    }

    /// Sends through the `tell` script: `true` when delivered, otherwise the
    /// message is recorded as dropped.
    pub fn tell(&mut self, to: &Address, message: Message) -> bool {
        matches!(self.exec(Script::tell(to, message)), Some(Value::Int(1)))
    }

    /// Sends to every member of `group`; returns how many accepted.
    pub fn broadcast(&mut self, group: &str, message: Message) -> usize {
        let from = self.runtime.address().clone();
        self.platform.tell_members(group, &from, message)
    }

    /// Passes `env` on to its own target unchanged, bypassing routes.
    ///
    /// Routers use this to hand transfers to the actor they were meant for.
    pub fn forward(&mut self, env: Envelope) -> bool {
        if !self.platform.contains(&env.to) || env.to.is_root() {
            self.platform.drop_message(env);
            return false;
        }
        self.platform.deliver(env)
    }

    /// Declines `env`; it is recorded as dropped.
    pub fn drop_message(&mut self, env: Envelope) {
        self.platform.drop_message(env);
    }

    /// Arms `matcher` as the next receiver for the mailbox.
    pub fn receive(&mut self, matcher: Matcher) {
        let me = self.runtime.address().clone();
        self.platform.arm_receiver(&me, matcher);
    }

    /// Messages waiting in this actor's mailbox.
    pub fn mailbox_len(&self) -> usize {
        self.platform
            .mailbox_len(self.runtime.address())
            .unwrap_or(0)
    }

    /// Kills this actor or one of its descendants.
    pub fn kill(&mut self, target: &Address) -> Result<(), RuntimeError> {
        self.runtime.kill(self.platform, target)
    }

    /// Removes this actor and its subtree once the current hook returns.
    pub fn exit(&mut self) {
        self.runtime.terminate(self.platform);
    }

    /// Raises `err` on this actor.
    pub fn raise(&mut self, err: ActorError) {
        self.runtime.raise(self.platform, err);
    }

    /// Runs `fut` on the platform loop. This actor runs no further slots until
    /// it settles; `Ok(Some(msg))` comes back as a message to this actor.
    pub fn run_task<F>(&mut self, fut: F) -> TaskId
    where
        F: Future<Output = Result<Option<Message>, ActorError>> + 'static,
    {
        self.runtime.run_task(self.platform, fut.boxed_local())
    }

    /// Routes everything addressed to `target` (and below) to this actor.
    pub fn route(&mut self, target: Address) {
        let me = self.runtime.address().clone();
        self.platform.put_route(target, me);
    }

    pub fn unroute(&mut self, target: &Address) {
        self.platform.remove_route(target);
    }

    /// Joins a named group.
    pub fn join(&mut self, group: &str) -> bool {
        let me = self.runtime.address().clone();
        self.platform.put_member(group, me)
    }

    /// Every live descendant of this actor.
    pub fn children(&self) -> Vec<Address> {
        self.platform.get_children(self.runtime.address())
    }

    /// Executes `script` on this actor's runtime, nested in the current call.
    pub fn exec(&mut self, script: Script) -> Option<Value> {
        self.runtime.exec(self.platform, Arc::new(script))
    }
}
