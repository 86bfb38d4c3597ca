//! # Allocation, start-up and instance checkout.
//!
//! ```text
//! spawn(parent, template)
//!   alloc_actor ─► resolve id ─► make address ─► instantiate ─► init(behaviour)
//!               ─► store context ─► join groups ─► alloc children (recursively)
//!               (a child failing removes the whole partial subtree)
//!   start_tree  ─► run(actor) ─► run(each allocated descendant, parents first)
//! ```
//!
//! Instance and runtime live in the context and are checked out for the
//! duration of a hook or a script. Check-in is generation-aware: an instance
//! whose context was killed or restarted meanwhile is stopped instead of
//! stored, a stale runtime is dropped.

use uuid::Uuid;

use crate::actor::{Actor, Behaviour, Envelope, Template};
use crate::address::Address;
use crate::error::RuntimeError;
use crate::events::{Event, EventKind};
use crate::vm::Runtime;

use super::context::Context;
use super::cx::Cx;
use super::platform::Platform;

impl Platform {
    /// Allocates and starts `template` under root.
    pub fn spawn(&mut self, template: Template) -> Result<Address, RuntimeError> {
        self.spawn_under(&Address::root(), template)
    }

    /// Allocates and starts `template` (and its child templates) under `parent`.
    pub fn spawn_under(
        &mut self,
        parent: &Address,
        template: Template,
    ) -> Result<Address, RuntimeError> {
        let addr = self.alloc_actor(parent, template)?;
        let started = self.start_tree(&addr);
        self.drain();
        started.map(|()| addr)
    }

    /// Allocates without starting; see [`Platform::run_actor`].
    pub fn allocate(
        &mut self,
        parent: &Address,
        template: Template,
    ) -> Result<Address, RuntimeError> {
        self.alloc_actor(parent, template)
    }

    /// Starts an allocated actor.
    pub fn run_actor(&mut self, addr: &Address) -> Result<(), RuntimeError> {
        let started = self.start_actor(addr);
        self.drain();
        started
    }

    pub(crate) fn alloc_actor(
        &mut self,
        parent: &Address,
        template: Template,
    ) -> Result<Address, RuntimeError> {
        if !self.contains(parent) {
            return Err(RuntimeError::NotFound {
                address: parent.clone(),
            });
        }
        let id = match template.id() {
            Some(id) => id.to_string(),
            None => Uuid::new_v4().simple().to_string(),
        };
        let address = Address::make(parent, &id)?;
        if self.state.contains(&address) {
            return Err(RuntimeError::DuplicateAddress { address });
        }

        let template = template.with_id(id);
        let mut instance = template.instantiate();
        let mut behaviour = Behaviour::default();
        instance.init(&mut behaviour);

        let generation = self.next_generation();
        let runtime = Runtime::new(address.clone(), generation, self.cfg.frame_limit());
        let groups = template.groups().to_vec();
        let children = template.children().to_vec();
        self.state.put(Context::new(
            address.clone(),
            generation,
            instance,
            behaviour,
            template,
            runtime,
        ));
        tracing::debug!(address = %address, generation, "actor allocated");
        self.trigger(Event::new(EventKind::ActorAllocated).with_address(address.clone()));

        for group in &groups {
            self.put_member(group, address.clone());
        }
        for child in children {
            if let Err(e) = self.alloc_actor(&address, child) {
                tracing::debug!(address = %address, error = %e, "child allocation failed, rolling back");
                self.terminate(&address);
                return Err(e);
            }
        }
        Ok(address)
    }

    /// Invokes `Actor::run`; an error it returns is raised on the actor.
    pub(crate) fn start_actor(&mut self, addr: &Address) -> Result<(), RuntimeError> {
        if !self.state.contains(addr) {
            return Err(RuntimeError::NotFound {
                address: addr.clone(),
            });
        }
        self.trigger(Event::new(EventKind::ActorStarted).with_address(addr.clone()));
        match self.with_actor(addr, |actor, cx| actor.run(cx)) {
            Some(Ok(())) => {}
            Some(Err(e)) => self.queue_raise(addr.clone(), e),
            None => tracing::debug!(address = %addr, "actor busy, run skipped"),
        }
        Ok(())
    }

    /// Starts `addr`, then every descendant that existed before it started.
    pub(crate) fn start_tree(&mut self, addr: &Address) -> Result<(), RuntimeError> {
        let descendants = self.state.get_children(addr);
        self.start_actor(addr)?;
        for child in descendants {
            if self.state.contains(&child) {
                self.start_actor(&child)?;
            }
        }
        Ok(())
    }

    /// Runs `f` with the instance and a capability handle for `addr`, then
    /// flushes deliveries that were held back meanwhile.
    pub(crate) fn with_actor<R>(
        &mut self,
        addr: &Address,
        f: impl FnOnce(&mut dyn Actor, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let out = self.with_actor_raw(addr, f);
        self.flush_backlog(addr);
        out
    }

    fn with_actor_raw<R>(
        &mut self,
        addr: &Address,
        f: impl FnOnce(&mut dyn Actor, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let mut runtime = self.checkout_runtime(addr)?;
        let out = runtime.invoke(self, f);
        self.checkin_runtime(runtime);
        out
    }

    /// Hands held-back direct deliveries to `accept` once `addr` is idle.
    pub(crate) fn flush_backlog(&mut self, addr: &Address) {
        loop {
            let Some(ctx) = self.state.get_mut(addr) else {
                return;
            };
            if !ctx.is_idle() {
                return;
            }
            let Some(env) = ctx.backlog.pop_front() else {
                return;
            };
            let raiser = addr.clone();
            if let Some(Err(e)) = self.with_actor_raw(addr, |actor, cx| actor.accept(env, cx)) {
                self.queue_raise(raiser, e);
            }
        }
    }

    /// Calls `accept` now, or holds the envelope until the actor is idle.
    pub(crate) fn accept_direct(&mut self, addr: &Address, env: Envelope) {
        let Some(ctx) = self.state.get_mut(addr) else {
            return;
        };
        ctx.backlog.push_back(env);
        self.flush_backlog(addr);
    }

    pub(crate) fn instance_available(&self, addr: &Address) -> bool {
        self.state.get(addr).is_some_and(|c| c.instance.is_some())
    }

    pub(crate) fn checkout_runtime(&mut self, addr: &Address) -> Option<Runtime> {
        self.state.get_mut(addr)?.runtime.take()
    }

    /// Stores `runtime` back and re-queues slots deferred while it was out.
    pub(crate) fn checkin_runtime(&mut self, runtime: Runtime) {
        let addr = runtime.address().clone();
        let Some(ctx) = self.state.get_mut(&addr) else {
            return;
        };
        if ctx.generation == runtime.generation() {
            ctx.runtime = Some(runtime);
            self.enqueue(&addr);
        }
    }

    pub(crate) fn checkout_instance(
        &mut self,
        addr: &Address,
        generation: u64,
    ) -> Option<Box<dyn Actor>> {
        let ctx = self.state.get_mut(addr)?;
        if ctx.generation != generation {
            return None;
        }
        ctx.instance.take()
    }

    pub(crate) fn checkin_instance(
        &mut self,
        addr: &Address,
        generation: u64,
        mut instance: Box<dyn Actor>,
    ) {
        match self.state.get_mut(addr) {
            Some(ctx) if ctx.generation == generation => ctx.instance = Some(instance),
            _ => instance.stop(),
        }
    }
}
