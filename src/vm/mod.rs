//! Bytecode virtual machine.
//!
//! ## Contents
//! - [`Instr`] the instruction set
//! - [`Script`], [`Constants`], [`FunInfo`] code and constant pools
//! - [`Frame`] activation record (operand stack, locals, owned heap cells)
//! - [`Heap`] per-runtime store of strings, messages and templates
//! - [`Runtime`] dispatch loop bound to one actor
//!
//! ```text
//! Script ──► Runtime::exec ──► Frame stack ──► Instr dispatch
//!                                   │                │
//!                                  Heap         Platform (send/alloc/kill/...)
//! ```

mod frame;
mod heap;
mod op;
mod runtime;
mod script;
mod value;

pub use frame::{CodeRef, Frame};
pub use heap::{Heap, HeapObject, HeapRef};
pub use op::Instr;
pub use runtime::Runtime;
pub use script::{Constants, Foreign, FunInfo, FunKind, Script};
pub use value::{Datum, Value};
