//! Error types used by the actorvisor platform, its VM and actor code.
//!
//! This module defines three error enums:
//!
//! - [`RuntimeError`]: structural failures of the platform itself (addressing,
//!   allocation, kill authority, unhandled escalation). These surface to the
//!   caller immediately.
//! - [`VmError`]: faults raised by the bytecode interpreter.
//! - [`ActorError`]: anything routed through supervision: application errors,
//!   VM faults, failed tasks and structural errors hit inside a script.
//!
//! All types provide helper methods (`as_label`, `as_message`) for logging/metrics.
//! Unknown targets are not errors: sends to them report `false` and drop.

use thiserror::Error;

use crate::address::Address;

/// # Errors produced by the platform.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// An actor already occupies the address.
    #[error("address {address} is already allocated")]
    DuplicateAddress {
        /// The occupied address.
        address: Address,
    },

    /// The id cannot be used as an address segment.
    #[error("invalid actor id {id:?}: {reason}")]
    InvalidId {
        /// The rejected id.
        id: String,
        /// Why it was rejected.
        reason: &'static str,
    },

    /// A textual address failed validation.
    #[error("invalid address {address:?}")]
    InvalidAddress {
        /// The rejected input.
        address: String,
    },

    /// No actor lives at the address.
    #[error("no actor at {address}")]
    NotFound {
        /// The missing address.
        address: Address,
    },

    /// The actor is waiting on a task and runs no scripts until it settles.
    #[error("actor {address} is blocked on a pending task")]
    Blocked {
        /// The blocked address.
        address: Address,
    },

    /// Kill target lies outside the caller's subtree.
    #[error("{caller} may not kill {target}")]
    IllegalKillSignal {
        /// Address the caller tried to kill.
        target: Address,
        /// The calling actor.
        caller: Address,
    },

    /// An error escalated past the root without being handled.
    #[error("unhandled escalation from {source_address}: {error}")]
    UnhandledEscalation {
        /// The actor that originally raised.
        source_address: Address,
        /// Message of the escalated error.
        error: String,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use actorvisor::{Address, RuntimeError};
    ///
    /// let err = RuntimeError::NotFound { address: Address::root() };
    /// assert_eq!(err.as_label(), "runtime_not_found");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::DuplicateAddress { .. } => "runtime_duplicate_address",
            RuntimeError::InvalidId { .. } => "runtime_invalid_id",
            RuntimeError::InvalidAddress { .. } => "runtime_invalid_address",
            RuntimeError::NotFound { .. } => "runtime_not_found",
            RuntimeError::Blocked { .. } => "runtime_blocked",
            RuntimeError::IllegalKillSignal { .. } => "runtime_illegal_kill_signal",
            RuntimeError::UnhandledEscalation { .. } => "runtime_unhandled_escalation",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::DuplicateAddress { address } => format!("duplicate address: {address}"),
            RuntimeError::InvalidId { id, reason } => format!("invalid id {id:?}: {reason}"),
            RuntimeError::InvalidAddress { address } => format!("invalid address: {address:?}"),
            RuntimeError::NotFound { address } => format!("not found: {address}"),
            RuntimeError::Blocked { address } => format!("blocked on task: {address}"),
            RuntimeError::IllegalKillSignal { target, caller } => {
                format!("illegal kill: caller={caller} target={target}")
            }
            RuntimeError::UnhandledEscalation {
                source_address,
                error,
            } => format!("unhandled escalation: source={source_address} error={error}"),
        }
    }
}

/// # Faults raised by the bytecode interpreter.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VmError {
    /// An opcode needed more operands than the stack holds.
    #[error("stack underflow in {op}")]
    StackUnderflow { op: &'static str },

    /// An operand had the wrong shape.
    #[error("type mismatch in {op}: expected {expected}")]
    TypeMismatch {
        op: &'static str,
        expected: &'static str,
    },

    /// A constant-pool or local index was out of range.
    #[error("missing {kind} #{index}")]
    MissingConstant { kind: &'static str, index: usize },

    /// The frame stack exceeded its configured depth.
    #[error("frame stack overflow (limit {limit})")]
    FrameOverflow { limit: usize },
}

impl VmError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            VmError::StackUnderflow { .. } => "vm_stack_underflow",
            VmError::TypeMismatch { .. } => "vm_type_mismatch",
            VmError::MissingConstant { .. } => "vm_missing_constant",
            VmError::FrameOverflow { .. } => "vm_frame_overflow",
        }
    }
}

/// # Errors routed through supervision.
///
/// These never surface synchronously to the raiser: they are queued and walk
/// up the tree until a trap handles them.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ActorError {
    /// Raised by actor code.
    #[error("{message}")]
    Application { message: String },

    /// Interpreter fault while running one of the actor's scripts.
    #[error("vm: {0}")]
    Vm(#[from] VmError),

    /// Structural failure hit from inside a script (e.g. `Alloc` on a taken address).
    #[error("runtime: {0}")]
    Runtime(#[from] RuntimeError),

    /// A task registered with `run_task` failed.
    #[error("task failed: {message}")]
    Task { message: String },
}

impl ActorError {
    /// Shorthand for [`ActorError::Application`].
    pub fn application(message: impl Into<String>) -> Self {
        ActorError::Application {
            message: message.into(),
        }
    }

    /// Shorthand for [`ActorError::Task`].
    pub fn task(message: impl Into<String>) -> Self {
        ActorError::Task {
            message: message.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use actorvisor::ActorError;
    ///
    /// let err = ActorError::application("boom");
    /// assert_eq!(err.as_label(), "actor_application");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ActorError::Application { .. } => "actor_application",
            ActorError::Vm(_) => "actor_vm",
            ActorError::Runtime(_) => "actor_runtime",
            ActorError::Task { .. } => "actor_task",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ActorError::Application { message } => format!("error: {message}"),
            ActorError::Vm(e) => format!("vm fault ({}): {e}", e.as_label()),
            ActorError::Runtime(e) => e.as_message(),
            ActorError::Task { message } => format!("task: {message}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_labels_are_stable() {
        let addr = Address::parse("/a").unwrap();
        assert_eq!(
            RuntimeError::DuplicateAddress {
                address: addr.clone()
            }
            .as_label(),
            "runtime_duplicate_address"
        );
        assert_eq!(
            RuntimeError::IllegalKillSignal {
                target: Address::root(),
                caller: addr,
            }
            .as_label(),
            "runtime_illegal_kill_signal"
        );
        assert_eq!(
            ActorError::from(VmError::FrameOverflow { limit: 4 }).as_label(),
            "actor_vm"
        );
    }

    #[test]
    fn test_actor_error_wraps_runtime_error() {
        let err: ActorError = RuntimeError::NotFound {
            address: Address::parse("/x").unwrap(),
        }
        .into();
        assert_eq!(err.as_message(), "not found: /x");
        assert_eq!(err.to_string(), "runtime: no actor at /x");
    }
}
