//! # Trap decisions for raised errors.
//!
//! A [`Trap`] is a template-supplied classifier that maps an [`ActorError`] to a
//! [`TrapAction`]. Supervision consults the trap of each level, starting at the
//! raiser and walking up to the root, until one returns something other than
//! [`TrapAction::Raise`].
//!
//! ```text
//! raise(err) at /a/b/c
//!   /a/b/c trap? ── none / Raise ──► /a/b trap? ── Restart ──► restart /a/b/c
//!                                                 ├─ Stop    ──► terminate /a/b/c
//!                                                 └─ Ignore  ──► done
//! /      trap? ── none / Raise ──► UnhandledEscalation (fatal)
//! ```
//!
//! `Restart` and `Stop` always apply to the **original raiser**, whichever
//! level decided.

use std::sync::Arc;

use crate::error::ActorError;

/// Outcome of a trap.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum TrapAction {
    /// Escalate to the parent (default; same as having no trap).
    #[default]
    Raise,
    /// Swallow the error.
    Ignore,
    /// Replace the raiser with a fresh context built from its template.
    Restart,
    /// Terminate the raiser and its subtree.
    Stop,
}

impl TrapAction {
    /// Stable snake_case label.
    pub fn as_label(&self) -> &'static str {
        match self {
            TrapAction::Raise => "raise",
            TrapAction::Ignore => "ignore",
            TrapAction::Restart => "restart",
            TrapAction::Stop => "stop",
        }
    }
}

/// Error classifier attached to a template (or to the root via the builder).
pub type Trap = Arc<dyn Fn(&ActorError) -> TrapAction>;

/// Trap that answers `action` for every error.
pub fn always(action: TrapAction) -> Trap {
    Arc::new(move |_| action)
}

/// Trap that restarts on application errors and escalates everything else.
pub fn restart_on_application() -> Trap {
    Arc::new(|err| match err {
        ActorError::Application { .. } => TrapAction::Restart,
        _ => TrapAction::Raise,
    })
}
