//! # Runtime: one execution engine per actor.
//!
//! A [`Runtime`] owns a [`Heap`] and a frame stack and is bound to exactly one
//! context, which it refers to by `(address, generation)`. Execution always
//! borrows the [`Platform`] mutably, so every system-wide effect (send, alloc,
//! kill) goes through the platform API.
//!
//! ## Dispatch
//! ```text
//! exec(script)
//!   push Frame::main(script)                 base = depth before push
//!   while depth > base:
//!     ├─ context gone or replaced?  ──► unwind to base, return None
//!     ├─ fetch op at ip             ──► none: implicit Ret
//!     ├─ ip += 1                        (jumps overwrite ip afterwards)
//!     ├─ step(op)
//!     │    ├─ Ok(Next)
//!     │    ├─ Ok(Halt)              ──► unwind to base, return None
//!     │    └─ Err(e)                ──► unwind to base, raise(e), return None
//!   return top of the base frame's stack
//! ```
//!
//! ## Rules
//! - Jumps are absolute and never followed by an advance.
//! - `exec` is re-entrant: a handler invoked from `Read` may `exec` again on the
//!   same runtime; the nested call only runs frames above its own base.
//! - Errors never escape `exec`; they are queued for supervision on this actor.

use std::sync::Arc;

use crate::actor::{Actor, Envelope, Message, Template};
use crate::address::{Address, SELF_TOKEN};
use crate::core::task::{TaskFuture, TaskId};
use crate::core::{Cx, Platform};
use crate::error::{ActorError, RuntimeError, VmError};
use crate::events::{Event, EventKind};

use super::frame::Frame;
use super::heap::{Heap, HeapObject};
use super::op::Instr;
use super::script::{Constants, Foreign, FunKind, Script};
use super::value::{Datum, Value};

enum Step {
    Next,
    Halt,
}

/// Execution engine bound to one actor.
#[derive(Debug)]
pub struct Runtime {
    address: Address,
    generation: u64,
    heap: Heap,
    frames: Vec<Frame>,
    max_frames: usize,
}

impl Runtime {
    pub(crate) fn new(address: Address, generation: u64, max_frames: usize) -> Self {
        Self {
            address,
            generation,
            heap: Heap::new(),
            frames: Vec::new(),
            max_frames,
        }
    }

    pub fn address(&self) -> &Address {
        &self.address
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Current frame depth.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Live heap cells (zero between executions).
    pub fn heap_live(&self) -> usize {
        self.heap.live()
    }

    /// Runs `script` to completion on this runtime.
    ///
    /// Returns the top of the base frame's operand stack, or `None` when it was
    /// empty or execution halted (raise, self-termination, context replaced).
    pub fn exec(&mut self, platform: &mut Platform, script: Arc<Script>) -> Option<Value> {
        let base = self.frames.len();
        if let Err(e) = self.push_frame(Frame::main(script)) {
            platform.queue_raise(self.address.clone(), e.into());
            return None;
        }

        let mut result = None;
        while self.frames.len() > base {
            if !platform.is_current(&self.address, self.generation) {
                self.unwind(base);
                return None;
            }
            let Some(frame) = self.frames.last_mut() else {
                break;
            };
            let Some(instr) = frame.fetch() else {
                let is_base = self.frames.len() == base + 1;
                let out = self.ret(base);
                if is_base {
                    result = out;
                }
                continue;
            };
            frame.ip += 1;

            if platform.cfg.log_ops {
                platform.trigger(
                    Event::new(EventKind::OpExecuted)
                        .with_address(self.address.clone())
                        .with_op(instr.name()),
                );
            }

            if let Instr::Ret = instr {
                let is_base = self.frames.len() == base + 1;
                let out = self.ret(base);
                if is_base {
                    result = out;
                }
                continue;
            }

            match self.step(platform, instr) {
                Ok(Step::Next) => {}
                Ok(Step::Halt) => {
                    self.unwind(base);
                    return None;
                }
                Err(e) => {
                    self.unwind(base);
                    platform.queue_raise(self.address.clone(), e);
                    return None;
                }
            }
        }
        result
    }

    fn step(&mut self, platform: &mut Platform, instr: Instr) -> Result<Step, ActorError> {
        let op = instr.name();
        match instr {
            Instr::Nop => {}
            Instr::PushNil => self.top()?.push(Datum::Nil),
            Instr::PushInt(n) => self.top()?.push(Datum::Int(n)),
            Instr::PushStr(i) => {
                let s = self.constant("string", i, |c| c.strings.get(i as usize).cloned())?;
                self.push_obj(HeapObject::Str(s))?;
            }
            Instr::PushMsg(i) => {
                let m = self.constant("message", i, |c| c.messages.get(i as usize).cloned())?;
                self.push_obj(HeapObject::Msg(m))?;
            }
            Instr::PushTemplate(i) => {
                let t = self.constant("template", i, |c| c.templates.get(i as usize).cloned())?;
                self.push_obj(HeapObject::Template(t))?;
            }
            Instr::PushFun(i) => {
                self.constant("function", i, |c| c.functions.get(i as usize).map(|_| ()))?;
                self.top()?.push(Datum::Fun(i));
            }
            Instr::PushSelf => {
                let s = self.address.to_string();
                self.push_obj(HeapObject::Str(s))?;
            }
            Instr::Pop => {
                self.top()?.pop(op)?;
            }
            Instr::Dup => {
                let top = self.top()?;
                let d = top.peek(op)?;
                top.push(d);
            }
            Instr::Load(i) => {
                let top = self.top()?;
                let d = top.load(i)?;
                top.push(d);
            }
            Instr::Store(i) => {
                let top = self.top()?;
                let d = top.pop(op)?;
                top.store(i, d);
            }
            Instr::Jump(target) => self.top()?.ip = target,
            Instr::JumpIfZero(target) => {
                let top = self.top()?;
                if top.pop_int(op)? == 0 {
                    top.ip = target;
                }
            }
            Instr::JumpIfOne(target) => {
                let top = self.top()?;
                if top.pop_int(op)? == 1 {
                    top.ip = target;
                }
            }
            Instr::Call(argc) => self.call(platform, argc)?,
            // handled by `exec`
            Instr::Ret => {}
            Instr::Alloc => {
                let template = self.pop_template(op)?;
                let addr = platform.alloc_actor(&self.address, template)?;
                self.push_obj(HeapObject::Str(addr.to_string()))?;
            }
            Instr::Run => {
                let target = self.pop_address(op)?;
                platform.start_actor(&target)?;
            }
            Instr::Send => {
                let to = self.pop_address(op)?;
                let message = self.pop_message(op)?;
                let sent = platform.route_message(&to, &self.address, message);
                self.top()?.push(Datum::Int(i64::from(sent)));
            }
            Instr::Drop => {
                let to = self.pop_address(op)?;
                let message = self.pop_message(op)?;
                platform.drop_message(Envelope::new(to, self.address.clone(), message));
            }
            Instr::Recv(i) => {
                let m = self.constant("matcher", i, |c| c.matchers.get(i as usize).cloned())?;
                platform.arm_receiver(&self.address, m);
            }
            Instr::RecvCount => {
                let n = platform.receiver_count(&self.address);
                self.top()?.push(Datum::Int(n as i64));
            }
            Instr::MailCount => {
                let n = platform.mailbox_len(&self.address).unwrap_or(0);
                self.top()?.push(Datum::Int(n as i64));
            }
            Instr::MailDq => match platform.dequeue(&self.address) {
                Some(env) => self.push_obj(HeapObject::Msg(env.message))?,
                None => self.top()?.push(Datum::Nil),
            },
            Instr::Read => return self.read(platform),
            Instr::Discard => platform.discard_head(&self.address),
            Instr::Kill => {
                let target = self.pop_address(op)?;
                self.kill(platform, &target)?;
            }
            Instr::Raise => {
                let message = match self.pop_message(op)? {
                    Message::String(s) => s,
                    other => other.to_string(),
                };
                return Err(ActorError::Application { message });
            }
            Instr::Route => {
                let target = self.pop_address(op)?;
                platform.put_route(target, self.address.clone());
            }
            Instr::Unroute => {
                let target = self.pop_address(op)?;
                platform.remove_route(&target);
            }
        }
        Ok(Step::Next)
    }

    /// Matches the mailbox head against the top receiver and hands it to
    /// `Actor::receive` on success. Pushes 1 on a match, 0 otherwise.
    fn read(&mut self, platform: &mut Platform) -> Result<Step, ActorError> {
        if !platform.instance_available(&self.address) {
            // handler busy higher up the stack; retry once it returns
            platform.schedule_notify(&self.address);
            return Ok(Step::Halt);
        }
        let Some(hit) = platform.take_match(&self.address) else {
            self.top()?.push(Datum::Int(0));
            return Ok(Step::Next);
        };

        platform.trigger(
            Event::new(EventKind::MessageReceived)
                .with_address(self.address.clone())
                .with_envelope(&hit.envelope)
                .with_reason(hit.case),
        );
        let case = hit.case;
        let envelope = hit.envelope;
        if let Some(Err(e)) = self.invoke(platform, |actor, cx| actor.receive(case, envelope, cx)) {
            platform.queue_raise(self.address.clone(), e);
        }
        if hit.temporary {
            self.terminate(platform);
        }
        self.top()?.push(Datum::Int(1));
        Ok(Step::Next)
    }

    fn call(&mut self, platform: &mut Platform, argc: u8) -> Result<(), ActorError> {
        let op = "call";
        let top = self.top()?;
        let Datum::Fun(index) = top.pop(op)? else {
            return Err(VmError::TypeMismatch {
                op,
                expected: "function",
            }
            .into());
        };
        let args = top.pop_n(argc as usize, op)?;
        let script = Arc::clone(&top.script);
        let info = script
            .constants()
            .functions
            .get(index as usize)
            .cloned()
            .ok_or(VmError::MissingConstant {
                kind: "function",
                index: index as usize,
            })?;
        if info.argc != argc {
            return Err(VmError::TypeMismatch {
                op,
                expected: "matching arity",
            }
            .into());
        }

        match info.kind {
            FunKind::Vm(_) => self.invoke_vm(script, info.name, index, args)?,
            FunKind::Foreign(f) => {
                let values: Vec<Value> = args.iter().map(|d| self.resolve(*d)).collect();
                let out = self.invoke_foreign(platform, &f, &values)?;
                let d = self.alloc_value(out)?;
                self.top()?.push(d);
            }
        }
        Ok(())
    }

    /// Calls a native function with a capability handle for this actor.
    pub fn invoke_foreign(
        &mut self,
        platform: &mut Platform,
        f: &Foreign,
        args: &[Value],
    ) -> Result<Value, ActorError> {
        let mut cx = Cx::new(self, platform);
        f(&mut cx, args)
    }

    /// Pushes a frame for VM function `index`; dispatch continues inside it.
    pub fn invoke_vm(
        &mut self,
        script: Arc<Script>,
        name: &'static str,
        index: u32,
        args: Vec<Datum>,
    ) -> Result<(), VmError> {
        self.push_frame(Frame::call(script, name, index, args))
    }

    /// Queues `err` for supervision, rooted at this actor.
    pub fn raise(&mut self, platform: &mut Platform, err: ActorError) {
        platform.queue_raise(self.address.clone(), err);
    }

    /// Removes this actor (and its subtree) from the platform.
    pub fn terminate(&mut self, platform: &mut Platform) {
        let me = self.address.clone();
        platform.terminate(&me);
    }

    /// Terminates `target`, which must be this actor or one of its descendants.
    ///
    /// Killing an address that is already gone succeeds.
    pub fn kill(&mut self, platform: &mut Platform, target: &Address) -> Result<(), RuntimeError> {
        if *target != self.address && !target.is_descendant_of(&self.address) {
            return Err(RuntimeError::IllegalKillSignal {
                target: target.clone(),
                caller: self.address.clone(),
            });
        }
        platform.terminate(target);
        Ok(())
    }

    /// Registers async work; this actor runs no further slots until it settles.
    pub fn run_task(&mut self, platform: &mut Platform, fut: TaskFuture) -> TaskId {
        platform.register_task(self.address.clone(), fut)
    }

    /// Checks the actor instance out of its context for the duration of `f`.
    ///
    /// Returns `None` when the instance is unavailable (gone, or already in use
    /// further up the stack).
    pub(crate) fn invoke<R>(
        &mut self,
        platform: &mut Platform,
        f: impl FnOnce(&mut dyn Actor, &mut Cx<'_>) -> R,
    ) -> Option<R> {
        let mut instance = platform.checkout_instance(&self.address, self.generation)?;
        let out = {
            let mut cx = Cx::new(self, platform);
            f(instance.as_mut(), &mut cx)
        };
        platform.checkin_instance(&self.address, self.generation, instance);
        Some(out)
    }

    fn push_frame(&mut self, frame: Frame) -> Result<(), VmError> {
        if self.frames.len() >= self.max_frames {
            return Err(VmError::FrameOverflow {
                limit: self.max_frames,
            });
        }
        self.frames.push(frame);
        Ok(())
    }

    /// Pops the top frame. Its return datum goes to the caller frame, or is
    /// resolved and returned when the popped frame was the base of this `exec`.
    fn ret(&mut self, base: usize) -> Option<Value> {
        let mut frame = self.frames.pop()?;
        let out = frame.stack.pop();
        let value = if self.frames.len() == base {
            out.map(|d| self.resolve(d))
        } else {
            if let Some(caller) = self.frames.last_mut() {
                let d = out.unwrap_or(Datum::Nil);
                if let Datum::Ref(r) = d {
                    frame.give(r, caller);
                }
                caller.push(d);
            }
            None
        };
        for r in frame.owned.drain(..) {
            self.heap.release(r);
        }
        value
    }

    fn unwind(&mut self, base: usize) {
        while self.frames.len() > base {
            if let Some(frame) = self.frames.pop() {
                for r in frame.owned {
                    self.heap.release(r);
                }
            }
        }
    }

    fn top(&mut self) -> Result<&mut Frame, VmError> {
        self.frames
            .last_mut()
            .ok_or(VmError::StackUnderflow { op: "frame" })
    }

    fn constant<T>(
        &self,
        kind: &'static str,
        index: u32,
        get: impl FnOnce(&Constants) -> Option<T>,
    ) -> Result<T, VmError> {
        self.frames
            .last()
            .and_then(|f| get(f.script.constants()))
            .ok_or(VmError::MissingConstant {
                kind,
                index: index as usize,
            })
    }

    fn push_obj(&mut self, obj: HeapObject) -> Result<(), VmError> {
        let r = self.heap.alloc(obj);
        let top = self.top()?;
        top.owned.push(r);
        top.push(Datum::Ref(r));
        Ok(())
    }

    fn alloc_value(&mut self, v: Value) -> Result<Datum, VmError> {
        let obj = match v {
            Value::Nil => return Ok(Datum::Nil),
            Value::Int(n) => return Ok(Datum::Int(n)),
            Value::Str(s) => HeapObject::Str(s),
            Value::Message(m) => HeapObject::Msg(m),
            Value::Template(t) => HeapObject::Template(t),
        };
        let r = self.heap.alloc(obj);
        self.top()?.owned.push(r);
        Ok(Datum::Ref(r))
    }

    fn resolve(&self, d: Datum) -> Value {
        match d {
            Datum::Nil | Datum::Fun(_) => Value::Nil,
            Datum::Int(n) => Value::Int(n),
            Datum::Ref(r) => match self.heap.get(r) {
                Some(HeapObject::Str(s)) => Value::Str(s.clone()),
                Some(HeapObject::Msg(m)) => Value::Message(m.clone()),
                Some(HeapObject::Template(t)) => Value::Template(t.clone()),
                None => Value::Nil,
            },
        }
    }

    fn pop_address(&mut self, op: &'static str) -> Result<Address, ActorError> {
        let d = self.top()?.pop(op)?;
        match self.resolve(d) {
            Value::Str(s) | Value::Message(Message::String(s)) if s == SELF_TOKEN => {
                Ok(self.address.clone())
            }
            Value::Str(s) | Value::Message(Message::String(s)) => Ok(Address::parse(&s)?),
            _ => Err(VmError::TypeMismatch {
                op,
                expected: "address",
            }
            .into()),
        }
    }

    fn pop_message(&mut self, op: &'static str) -> Result<Message, VmError> {
        let d = self.top()?.pop(op)?;
        Ok(self.resolve(d).into_message())
    }

    fn pop_template(&mut self, op: &'static str) -> Result<Template, VmError> {
        let d = self.top()?.pop(op)?;
        match self.resolve(d) {
            Value::Template(t) => Ok(t),
            _ => Err(VmError::TypeMismatch {
                op,
                expected: "template",
            }),
        }
    }
}
