//! # Scripts and constant pools.
//!
//! A [`Script`] is a code vector plus the [`Constants`] its instructions index
//! into. VM functions ([`FunInfo::vm`]) share the pool of the script that
//! declares them; foreign functions ([`FunInfo::foreign`]) are native closures
//! called with a capability handle for the executing actor.
//!
//! Prebuilt scripts drive the platform's own messaging:
//!
//! ```text
//! tell(to, msg):   0 PushMsg(0)  1 PushStr(0)  2 Send  3 JumpIfOne(9)
//!                  4 PushMsg(0)  5 PushStr(0)  6 Drop  7 PushInt(0)  8 Ret
//!                  9 PushInt(1)
//!
//! notify:          0 MailCount   1 JumpIfZero(8)
//!                  2 RecvCount   3 JumpIfZero(8)
//!                  4 Read        5 JumpIfOne(0)
//!                  6 Discard     7 Jump(0)      8 Nop
//! ```

use std::fmt;
use std::sync::Arc;

use crate::actor::{Matcher, Message, Template};
use crate::address::Address;
use crate::core::Cx;
use crate::error::ActorError;

use super::op::Instr;
use super::value::Value;

/// Native function callable through `Call`.
pub type Foreign = Arc<dyn Fn(&mut Cx<'_>, &[Value]) -> Result<Value, ActorError>>;

/// Body of a function constant.
#[derive(Clone)]
pub enum FunKind {
    Vm(Arc<[Instr]>),
    Foreign(Foreign),
}

/// Function constant.
#[derive(Clone)]
pub struct FunInfo {
    pub name: &'static str,
    pub argc: u8,
    pub kind: FunKind,
}

impl FunInfo {
    /// VM function; its arguments become locals `0..argc`.
    pub fn vm(name: &'static str, argc: u8, code: Vec<Instr>) -> Self {
        Self {
            name,
            argc,
            kind: FunKind::Vm(code.into()),
        }
    }

    pub fn foreign(
        name: &'static str,
        argc: u8,
        f: impl Fn(&mut Cx<'_>, &[Value]) -> Result<Value, ActorError> + 'static,
    ) -> Self {
        Self {
            name,
            argc,
            kind: FunKind::Foreign(Arc::new(f)),
        }
    }
}

impl fmt::Debug for FunInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let kind = match &self.kind {
            FunKind::Vm(code) => format!("vm({} ops)", code.len()),
            FunKind::Foreign(_) => "foreign".to_string(),
        };
        f.debug_struct("FunInfo")
            .field("name", &self.name)
            .field("argc", &self.argc)
            .field("kind", &kind)
            .finish()
    }
}

/// Constant pool.
#[derive(Clone, Debug, Default)]
pub struct Constants {
    pub strings: Vec<String>,
    pub messages: Vec<Message>,
    pub templates: Vec<Template>,
    pub functions: Vec<FunInfo>,
    pub matchers: Vec<Matcher>,
}

impl Constants {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_str(mut self, s: impl Into<String>) -> Self {
        self.strings.push(s.into());
        self
    }

    pub fn with_message(mut self, m: Message) -> Self {
        self.messages.push(m);
        self
    }

    pub fn with_template(mut self, t: Template) -> Self {
        self.templates.push(t);
        self
    }

    pub fn with_function(mut self, f: FunInfo) -> Self {
        self.functions.push(f);
        self
    }

    pub fn with_matcher(mut self, m: Matcher) -> Self {
        self.matchers.push(m);
        self
    }
}

/// Code plus constants.
#[derive(Clone, Debug, Default)]
pub struct Script {
    constants: Constants,
    code: Vec<Instr>,
}

impl Script {
    /// Script without constants.
    pub fn new(code: Vec<Instr>) -> Self {
        Self {
            constants: Constants::default(),
            code,
        }
    }

    pub fn with_constants(constants: Constants, code: Vec<Instr>) -> Self {
        Self { constants, code }
    }

    pub fn constants(&self) -> &Constants {
        &self.constants
    }

    pub fn code(&self) -> &[Instr] {
        &self.code
    }

    /// Sends `message` to `to`, recording a drop when the target is unknown.
    ///
    /// Leaves `1` (sent) or `0` (dropped) on the stack.
    pub fn tell(to: &Address, message: Message) -> Self {
        use Instr::*;
        Self::with_constants(
            Constants::new().with_str(to.as_str()).with_message(message),
            vec![
                PushMsg(0),
                PushStr(0),
                Send,
                JumpIfOne(9),
                PushMsg(0),
                PushStr(0),
                Drop,
                PushInt(0),
                Ret,
                PushInt(1),
            ],
        )
    }

    /// Drains the mailbox against armed receivers (see module docs).
    pub fn notify() -> Self {
        use Instr::*;
        Self::new(vec![
            MailCount,
            JumpIfZero(8),
            RecvCount,
            JumpIfZero(8),
            Read,
            JumpIfOne(0),
            Discard,
            Jump(0),
            Nop,
        ])
    }

    /// Allocates and starts `template` under the executing actor; leaves its address.
    pub fn spawn(template: Template) -> Self {
        use Instr::*;
        Self::with_constants(
            Constants::new().with_template(template),
            vec![PushTemplate(0), Alloc, Dup, Run],
        )
    }

    /// Kills `target` (self or a descendant).
    pub fn kill(target: &Address) -> Self {
        use Instr::*;
        Self::with_constants(
            Constants::new().with_str(target.as_str()),
            vec![PushStr(0), Kill],
        )
    }

    /// Raises an application error carrying `message`.
    pub fn raise(message: impl Into<String>) -> Self {
        use Instr::*;
        Self::with_constants(
            Constants::new().with_message(Message::String(message.into())),
            vec![PushMsg(0), Raise],
        )
    }
}
