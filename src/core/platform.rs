//! # Platform: state table owner and cooperative scheduler.
//!
//! The [`Platform`] owns every context, the routing table and the groups. It
//! runs scripts one **slot** at a time on a single thread; async work enters
//! through [`Cx::run_task`](crate::core::Cx::run_task) and is driven by
//! [`Platform::run`].
//!
//! ## Architecture
//! ```text
//!   tell / spawn / exec / settle ...          (public entry points)
//!                 │
//!                 ▼
//!   pending[address] ──► run_q ──► drain() ──► run_slot ──► Runtime::exec
//!        (FIFO)            │          ▲
//!                          │ blocked  │ raised errors first
//!                          ▼          │
//!                       wait_q ◄── task pending      supervise(raised)
//!                          │
//!                          └── task settles ──► back to run_q tail
//! ```
//!
//! ## Rules
//! - An address has at most one slot in flight: it appears in the run/wait
//!   queues at most once and never while one of its slots executes. Further
//!   slots wait, in order, in its pending queue.
//! - A slot carries the generation of the context it was scheduled for; a
//!   slot whose context was replaced or removed is skipped.
//! - Raised errors are supervised inside `drain` before the next slot runs.
//! - `drain` is not re-entrant. Internal operations invoked from actor hooks
//!   or scripts only schedule; public entry points drain before returning.
//! - `stop` cancels the platform token; pending slots are kept but no longer run.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::Arc;

use futures::StreamExt;
use futures::future::{FutureExt, LocalBoxFuture};
use futures::stream::FuturesUnordered;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::actor::{Flags, Message, Template};
use crate::address::Address;
use crate::error::{ActorError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::policies::Trap;
use crate::vm::{Script, Value};

use super::builder::PlatformBuilder;
use super::config::Config;
use super::shutdown;
use super::state::State;
use super::supervision::Raised;
use super::task::{TaskFuture, TaskId, TaskState};

type Settled = (TaskId, Result<Option<Message>, ActorError>);

/// Scheduled execution of a script on one actor.
pub(crate) struct Slot {
    pub address: Address,
    pub generation: u64,
    pub script: Arc<Script>,
}

pub(crate) struct TaskEntry {
    pub owner: Address,
    pub generation: u64,
    pub state: TaskState,
}

/// Actor platform: state table, scheduler, supervision and messaging.
pub struct Platform {
    pub(crate) cfg: Config,
    pub(crate) state: State,
    pub(crate) bus: Bus,
    pub(crate) root_trap: Option<Trap>,
    pub(crate) raised: VecDeque<Raised>,

    run_q: VecDeque<Address>,
    wait_q: VecDeque<Address>,
    /// Addresses currently in `run_q` or `wait_q`.
    queued: HashSet<Address>,
    /// Addresses whose slot is executing.
    running: HashSet<Address>,
    pending: HashMap<Address, VecDeque<Slot>>,

    blocked: HashMap<Address, HashSet<TaskId>>,
    tasks: FuturesUnordered<LocalBoxFuture<'static, Settled>>,
    task_states: HashMap<TaskId, TaskEntry>,

    notify: Arc<Script>,
    token: CancellationToken,
    fatal: Option<RuntimeError>,
    draining: bool,
    next_generation: u64,
    next_task: u64,
}

impl Platform {
    /// Platform with `cfg`, no subscribers and no root trap.
    pub fn new(cfg: Config) -> Self {
        PlatformBuilder::new(cfg).build()
    }

    pub fn builder(cfg: Config) -> PlatformBuilder {
        PlatformBuilder::new(cfg)
    }

    pub(crate) fn new_internal(cfg: Config, bus: Bus, root_trap: Option<Trap>) -> Self {
        Self {
            cfg,
            state: State::new(),
            bus,
            root_trap,
            raised: VecDeque::new(),
            run_q: VecDeque::new(),
            wait_q: VecDeque::new(),
            queued: HashSet::new(),
            running: HashSet::new(),
            pending: HashMap::new(),
            blocked: HashMap::new(),
            tasks: FuturesUnordered::new(),
            task_states: HashMap::new(),
            notify: Arc::new(Script::notify()),
            token: CancellationToken::new(),
            fatal: None,
            draining: false,
            next_generation: 1,
            next_task: 1,
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// Publishes an event on the platform bus.
    pub fn trigger(&self, ev: Event) {
        self.bus.publish(ev);
    }

    /// Subscribes to the event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }

    /// Token cancelled by [`Platform::stop`] and by fatal escalations.
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    /// Whether `addr` currently has a context (root always counts).
    pub fn contains(&self, addr: &Address) -> bool {
        addr.is_root() || self.state.contains(addr)
    }

    /// Number of live actors.
    pub fn len(&self) -> usize {
        self.state.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.len() == 0
    }

    pub fn generation(&self, addr: &Address) -> Option<u64> {
        self.state.get(addr).map(|c| c.generation)
    }

    /// Whether `(addr, generation)` still names a live context.
    pub fn is_current(&self, addr: &Address, generation: u64) -> bool {
        self.generation(addr) == Some(generation)
    }

    pub fn flags(&self, addr: &Address) -> Option<Flags> {
        self.state.get(addr).map(|c| c.flags)
    }

    /// Template stored for `addr` (its id always set).
    pub fn template(&self, addr: &Address) -> Option<&Template> {
        self.state.get(addr).map(|c| &c.template)
    }

    /// Every live descendant of `addr` in address order.
    pub fn get_children(&self, addr: &Address) -> Vec<Address> {
        self.state.get_children(addr)
    }

    /// Slots waiting to run, across every address.
    pub fn pending_slots(&self) -> usize {
        self.pending.values().map(VecDeque::len).sum()
    }

    pub fn is_blocked(&self, addr: &Address) -> bool {
        self.blocked.contains_key(addr)
    }

    /// State of task `id`.
    ///
    /// A settled outcome is kept until its owner registers another task or
    /// is removed.
    pub fn task_state(&self, id: TaskId) -> Option<&TaskState> {
        self.task_states.get(&id).map(|t| &t.state)
    }

    /// Tasks registered and not yet settled.
    pub fn pending_tasks(&self) -> usize {
        self.tasks.len()
    }

    /// Error that stopped the platform, if any.
    pub fn fatal(&self) -> Option<&RuntimeError> {
        self.fatal.as_ref()
    }

    pub fn is_stopped(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Stops scheduling. Pending slots stay queued; tasks are no longer polled.
    pub fn stop(&mut self) {
        if !self.token.is_cancelled() {
            tracing::debug!("platform stop requested");
            self.token.cancel();
        }
    }

    // ---------------------------------------------------------------------
    // Scheduling
    // ---------------------------------------------------------------------

    /// Runs `script` on `addr` in a fresh slot and drains.
    pub fn exec(&mut self, addr: &Address, script: Script) -> Result<(), RuntimeError> {
        let generation = self
            .generation(addr)
            .ok_or_else(|| RuntimeError::NotFound {
                address: addr.clone(),
            })?;
        self.schedule(addr, generation, Arc::new(script));
        self.drain();
        Ok(())
    }

    /// Executes `script` on `addr` immediately and returns its result.
    ///
    /// Bypasses the queues; fails with `Blocked` while the actor waits on a
    /// task and with `NotFound` when it is gone or its runtime is in use.
    pub fn eval(&mut self, addr: &Address, script: Script) -> Result<Option<Value>, RuntimeError> {
        if self.blocked.contains_key(addr) {
            return Err(RuntimeError::Blocked {
                address: addr.clone(),
            });
        }
        let mut runtime = self
            .checkout_runtime(addr)
            .ok_or_else(|| RuntimeError::NotFound {
                address: addr.clone(),
            })?;
        let out = runtime.exec(self, Arc::new(script));
        self.checkin_runtime(runtime);
        self.flush_backlog(addr);
        self.drain();
        Ok(out)
    }

    pub(crate) fn schedule(&mut self, addr: &Address, generation: u64, script: Arc<Script>) {
        self.pending.entry(addr.clone()).or_default().push_back(Slot {
            address: addr.clone(),
            generation,
            script,
        });
        self.enqueue(addr);
    }

    /// Schedules the mailbox drain for `addr` unless one is already pending
    /// or there is nothing it could do.
    pub(crate) fn schedule_notify(&mut self, addr: &Address) {
        let Some(ctx) = self.state.get(addr) else {
            return;
        };
        let has_mail = ctx.mailbox.as_ref().is_some_and(|m| !m.is_empty());
        if !has_mail || ctx.receivers.is_empty() {
            return;
        }
        let generation = ctx.generation;
        let already = self.pending.get(addr).is_some_and(|q| {
            q.iter()
                .any(|s| s.generation == generation && Arc::ptr_eq(&s.script, &self.notify))
        });
        if !already {
            let script = Arc::clone(&self.notify);
            self.schedule(addr, generation, script);
        }
    }

    pub(crate) fn enqueue(&mut self, addr: &Address) {
        if self.running.contains(addr) || self.queued.contains(addr) {
            return;
        }
        if !self.pending.get(addr).is_some_and(|q| !q.is_empty()) {
            return;
        }
        self.queued.insert(addr.clone());
        if self.blocked.contains_key(addr) {
            self.wait_q.push_back(addr.clone());
        } else {
            self.run_q.push_back(addr.clone());
        }
    }

    /// Runs raised errors and ready slots until both queues are empty.
    pub(crate) fn drain(&mut self) {
        if self.draining {
            return;
        }
        self.draining = true;
        while !self.token.is_cancelled() {
            if let Some(raised) = self.raised.pop_front() {
                self.supervise(raised);
                continue;
            }
            let Some(addr) = self.run_q.pop_front() else {
                break;
            };
            self.queued.remove(&addr);
            if self.blocked.contains_key(&addr) {
                self.queued.insert(addr.clone());
                self.wait_q.push_back(addr);
                continue;
            }
            let Some(slot) = self.pop_slot(&addr) else {
                continue;
            };
            self.running.insert(addr.clone());
            let deferred = self.run_slot(slot);
            self.running.remove(&addr);
            // A deferred slot is re-queued when its runtime is checked in.
            if !deferred {
                self.enqueue(&addr);
            }
        }
        self.draining = false;
    }

    fn pop_slot(&mut self, addr: &Address) -> Option<Slot> {
        let queue = self.pending.get_mut(addr)?;
        let slot = queue.pop_front();
        if queue.is_empty() {
            self.pending.remove(addr);
        }
        slot
    }

    /// Executes `slot`; returns `true` when it was put back because the
    /// runtime is checked out.
    fn run_slot(&mut self, slot: Slot) -> bool {
        if !self.is_current(&slot.address, slot.generation) {
            tracing::trace!(address = %slot.address, "skipping stale slot");
            return false;
        }
        let Some(mut runtime) = self.checkout_runtime(&slot.address) else {
            tracing::debug!(address = %slot.address, "runtime busy, slot deferred");
            self.pending
                .entry(slot.address.clone())
                .or_default()
                .push_front(slot);
            return true;
        };
        runtime.exec(self, slot.script);
        self.checkin_runtime(runtime);
        self.flush_backlog(&slot.address);
        false
    }

    // ---------------------------------------------------------------------
    // Tasks
    // ---------------------------------------------------------------------

    pub(crate) fn register_task(&mut self, owner: Address, fut: TaskFuture) -> TaskId {
        let id = TaskId(self.next_task);
        self.next_task += 1;

        let generation = self.generation(&owner).unwrap_or_default();
        self.task_states
            .retain(|_, t| t.owner != owner || t.state.is_pending());
        self.blocked.entry(owner.clone()).or_default().insert(id);
        self.task_states.insert(
            id,
            TaskEntry {
                owner: owner.clone(),
                generation,
                state: TaskState::Pending,
            },
        );
        self.tasks.push(fut.map(move |out| (id, out)).boxed_local());
        self.trigger(
            Event::new(EventKind::TaskRegistered)
                .with_address(owner)
                .with_task(id.get()),
        );
        id
    }

    /// Applies a task outcome and unblocks its owner.
    fn settle(&mut self, id: TaskId, outcome: Result<Option<Message>, ActorError>) {
        let Some(entry) = self.task_states.get_mut(&id) else {
            return;
        };
        entry.state = TaskState::Settled(outcome.clone());
        let owner = entry.owner.clone();
        let generation = entry.generation;

        let mut ev = Event::new(EventKind::TaskSettled)
            .with_address(owner.clone())
            .with_task(id.get());
        if let Err(e) = &outcome {
            ev = ev.with_reason(e.to_string());
        }
        self.trigger(ev);

        self.unblock(&owner, id);
        if !self.is_current(&owner, generation) {
            tracing::debug!(address = %owner, task = %id, "owner gone, outcome discarded");
            self.task_states.remove(&id);
            return;
        }
        match outcome {
            Ok(None) => {}
            Ok(Some(message)) => {
                self.route_message(&owner, &owner, message);
            }
            Err(e) => self.queue_raise(owner, e),
        }
    }

    fn unblock(&mut self, owner: &Address, id: TaskId) {
        let Some(ids) = self.blocked.get_mut(owner) else {
            return;
        };
        ids.remove(&id);
        if !ids.is_empty() {
            return;
        }
        self.blocked.remove(owner);
        if let Some(pos) = self.wait_q.iter().position(|a| a == owner) {
            self.wait_q.remove(pos);
            self.run_q.push_back(owner.clone());
        }
    }

    /// Forgets scheduling state for a removed context.
    ///
    /// Settled task outcomes of `addr` are dropped; pending ones stay until
    /// their future completes and are discarded then.
    pub(crate) fn unschedule(&mut self, addr: &Address) {
        self.pending.remove(addr);
        self.blocked.remove(addr);
        self.task_states
            .retain(|_, t| &t.owner != addr || t.state.is_pending());
        if let Some(pos) = self.wait_q.iter().position(|a| a == addr) {
            self.wait_q.remove(pos);
            self.queued.remove(addr);
        }
    }

    pub(crate) fn next_generation(&mut self) -> u64 {
        let g = self.next_generation;
        self.next_generation += 1;
        g
    }

    pub(crate) fn set_fatal(&mut self, err: RuntimeError) {
        if self.fatal.is_none() {
            self.fatal = Some(err);
        }
        self.token.cancel();
    }

    // ---------------------------------------------------------------------
    // Main loop
    // ---------------------------------------------------------------------

    /// Drives the platform until it is idle, stopped, or fails.
    ///
    /// Idle means no runnable slot and no pending task. Returns the fatal
    /// error when an escalation went past the root.
    pub async fn run(&mut self) -> Result<(), RuntimeError> {
        let token = self.token.clone();
        let handle_signals = self.cfg.handle_signals;
        let signal = shutdown::shutdown_requested(handle_signals);
        tokio::pin!(signal);

        let reason = loop {
            self.drain();
            if self.fatal.is_some() {
                break "fatal";
            }
            if token.is_cancelled() {
                break "stopped";
            }
            if self.tasks.is_empty() {
                break "idle";
            }
            tokio::select! {
                _ = token.cancelled() => break "stopped",
                _ = &mut signal => {
                    self.stop();
                    break "signal";
                }
                Some((id, outcome)) = self.tasks.next() => self.settle(id, outcome),
            }
        };

        tracing::debug!(reason, "platform loop exited");
        self.trigger(Event::new(EventKind::PlatformStopped).with_reason(reason));
        match &self.fatal {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}
