use std::collections::VecDeque;
use std::fmt;

use crate::actor::{Actor, Behaviour, Envelope, Flags, Matcher, Template};
use crate::address::Address;
use crate::vm::Runtime;

/// Receive pattern armed on a context.
#[derive(Clone, Debug)]
pub(crate) struct Receiver {
    pub matcher: Matcher,
    /// Standing receivers survive a match (IMMUTABLE actors).
    pub standing: bool,
}

/// Per-actor record stored in the state table.
///
/// Instance and runtime are `Option`s: they are checked out while a hook or
/// a script runs and checked back in afterwards. A context replaced in the
/// meantime (kill, restart) is detected through `generation`.
pub(crate) struct Context {
    pub address: Address,
    pub generation: u64,
    pub instance: Option<Box<dyn Actor>>,
    pub runtime: Option<Runtime>,
    pub flags: Flags,
    /// Present iff BUFFERED.
    pub mailbox: Option<VecDeque<Envelope>>,
    /// Top of stack is the last element.
    pub receivers: Vec<Receiver>,
    /// Direct deliveries that arrived while the instance was checked out.
    pub backlog: VecDeque<Envelope>,
    /// Stored with its id resolved, used to rebuild on restart.
    pub template: Template,
}

impl Context {
    pub fn new(
        address: Address,
        generation: u64,
        instance: Box<dyn Actor>,
        behaviour: Behaviour,
        template: Template,
        runtime: Runtime,
    ) -> Self {
        let flags = behaviour.flags;
        let mailbox = flags.contains(Flags::BUFFERED).then(VecDeque::new);
        let receivers = behaviour
            .matcher
            .map(|matcher| Receiver {
                matcher,
                standing: flags.contains(Flags::IMMUTABLE),
            })
            .into_iter()
            .collect();

        Self {
            address,
            generation,
            instance: Some(instance),
            runtime: Some(runtime),
            flags,
            mailbox,
            receivers,
            backlog: VecDeque::new(),
            template,
        }
    }

    #[inline]
    pub fn is_buffered(&self) -> bool {
        self.mailbox.is_some()
    }

    /// Both the instance and the runtime are checked in.
    #[inline]
    pub fn is_idle(&self) -> bool {
        self.instance.is_some() && self.runtime.is_some()
    }

    pub fn mailbox_len(&self) -> Option<usize> {
        self.mailbox.as_ref().map(VecDeque::len)
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("address", &self.address)
            .field("generation", &self.generation)
            .field("flags", &self.flags)
            .field("mailbox", &self.mailbox_len())
            .field("receivers", &self.receivers.len())
            .field("backlog", &self.backlog.len())
            .field("instance", &self.instance.is_some())
            .field("runtime", &self.runtime.is_some())
            .finish()
    }
}
