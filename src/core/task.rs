//! # Async work attached to actors.
//!
//! `Cx::run_task` hands a future to the platform. While it is pending the
//! owning actor is **blocked**: its queued slots wait in the wait queue. When
//! the future settles the owner moves back to the run queue and the outcome
//! is applied:
//!
//! | Outcome          | Effect on the owner                    |
//! |------------------|----------------------------------------|
//! | `Ok(None)`       | nothing                                |
//! | `Ok(Some(msg))`  | `msg` delivered to the owner (from itself) |
//! | `Err(e)`         | `e` raised on the owner                |
//!
//! Outcomes for an owner that died or was restarted meanwhile are discarded.

use std::fmt;

use futures::future::LocalBoxFuture;

use crate::actor::Message;
use crate::error::ActorError;

/// Future driven by `Platform::run` on the platform thread.
pub type TaskFuture = LocalBoxFuture<'static, Result<Option<Message>, ActorError>>;

/// Handle for a registered task.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub(crate) u64);

impl TaskId {
    #[inline]
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Observable state of a task.
#[derive(Clone, Debug, PartialEq)]
pub enum TaskState {
    Pending,
    Settled(Result<Option<Message>, ActorError>),
}

impl TaskState {
    #[inline]
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskState::Pending)
    }

    #[inline]
    pub fn is_settled(&self) -> bool {
        matches!(self, TaskState::Settled(_))
    }
}
