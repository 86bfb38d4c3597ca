use std::sync::Arc;

use crate::error::VmError;

use super::heap::HeapRef;
use super::op::Instr;
use super::script::{FunKind, Script};
use super::value::Datum;

/// Which code vector a frame executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CodeRef {
    Main,
    Fun(u32),
}

/// Activation record: instruction pointer, operand stack, locals, owned heap cells.
#[derive(Debug)]
pub struct Frame {
    pub name: &'static str,
    pub script: Arc<Script>,
    pub code: CodeRef,
    pub ip: usize,
    pub stack: Vec<Datum>,
    pub locals: Vec<Datum>,
    pub owned: Vec<HeapRef>,
}

impl Frame {
    pub fn main(script: Arc<Script>) -> Self {
        Self {
            name: "main",
            script,
            code: CodeRef::Main,
            ip: 0,
            stack: Vec::new(),
            locals: Vec::new(),
            owned: Vec::new(),
        }
    }

    /// Frame for function constant `index`; `args` become locals `0..n`.
    pub fn call(script: Arc<Script>, name: &'static str, index: u32, args: Vec<Datum>) -> Self {
        Self {
            name,
            script,
            code: CodeRef::Fun(index),
            ip: 0,
            stack: Vec::new(),
            locals: args,
            owned: Vec::new(),
        }
    }

    /// Instruction at `ip`, or `None` past the end (implicit return).
    pub fn fetch(&self) -> Option<Instr> {
        match self.code {
            CodeRef::Main => self.script.code().get(self.ip).copied(),
            CodeRef::Fun(i) => match &self.script.constants().functions.get(i as usize)?.kind {
                FunKind::Vm(code) => code.get(self.ip).copied(),
                FunKind::Foreign(_) => None,
            },
        }
    }

    #[inline]
    pub fn push(&mut self, d: Datum) {
        self.stack.push(d);
    }

    pub fn pop(&mut self, op: &'static str) -> Result<Datum, VmError> {
        self.stack.pop().ok_or(VmError::StackUnderflow { op })
    }

    pub fn peek(&self, op: &'static str) -> Result<Datum, VmError> {
        self.stack.last().copied().ok_or(VmError::StackUnderflow { op })
    }

    pub fn pop_int(&mut self, op: &'static str) -> Result<i64, VmError> {
        match self.pop(op)? {
            Datum::Int(n) => Ok(n),
            _ => Err(VmError::TypeMismatch { op, expected: "int" }),
        }
    }

    /// Pops `n` operands, returned in push order.
    pub fn pop_n(&mut self, n: usize, op: &'static str) -> Result<Vec<Datum>, VmError> {
        if self.stack.len() < n {
            return Err(VmError::StackUnderflow { op });
        }
        Ok(self.stack.split_off(self.stack.len() - n))
    }

    pub fn load(&self, index: u16) -> Result<Datum, VmError> {
        self.locals
            .get(index as usize)
            .copied()
            .ok_or(VmError::MissingConstant {
                kind: "local",
                index: index as usize,
            })
    }

    /// Stores into a local, growing the table with `Nil` as needed.
    pub fn store(&mut self, index: u16, d: Datum) {
        let i = index as usize;
        if self.locals.len() <= i {
            self.locals.resize(i + 1, Datum::Nil);
        }
        self.locals[i] = d;
    }

    /// Hands a heap cell over from this frame (if it owns it) to `other`.
    pub fn give(&mut self, r: HeapRef, other: &mut Frame) {
        if let Some(pos) = self.owned.iter().position(|o| *o == r) {
            self.owned.swap_remove(pos);
            other.owned.push(r);
        }
    }
}
