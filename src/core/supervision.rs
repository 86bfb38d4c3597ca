//! # Supervision: raise, escalate, decide.
//!
//! Errors are never handled where they happen. They are queued as
//! [`Raised`] and supervised by `drain` before the next slot runs.
//!
//! ```text
//! raise(source, err)
//!   level = source
//!   loop:
//!     action = trap(level)(err)        (no trap, or level gone → Raise)
//!     ├─ Raise   ──► ErrorEscalated(level → parent); level = parent
//!     │              past root ──► UnhandledEscalation, platform stops
//!     ├─ Ignore  ──► ErrorIgnored
//!     ├─ Restart ──► rebuild `source` from its template, same address
//!     └─ Stop    ──► terminate `source`
//! ```
//!
//! Whatever level decides, `Restart` and `Stop` act on the original raiser.
//! The raiser's template is captured when the error is queued, so an actor
//! that exits in the same slot (a temporary one, say) still answers with its
//! own trap.
//! Root's trap comes from [`PlatformBuilder::with_trap`](super::PlatformBuilder::with_trap).

use crate::actor::Template;
use crate::address::Address;
use crate::error::{ActorError, RuntimeError};
use crate::events::{Event, EventKind};
use crate::policies::TrapAction;

use super::platform::Platform;

/// Error waiting for supervision.
pub(crate) struct Raised {
    pub source: Address,
    pub error: ActorError,
    /// Template of `source` when the error was raised; it outlives a raiser
    /// that exits before supervision runs.
    pub template: Option<Template>,
}

impl Platform {
    /// Raises `err` on `addr` and supervises it before returning.
    pub fn raise(&mut self, addr: &Address, err: ActorError) {
        self.queue_raise(addr.clone(), err);
        self.drain();
    }

    /// Kills `target` and its subtree. Killing root clears the tree; killing
    /// an unknown address is a no-op.
    pub fn kill(&mut self, target: &Address) {
        self.terminate(target);
        self.drain();
    }

    pub(crate) fn queue_raise(&mut self, source: Address, error: ActorError) {
        tracing::debug!(address = %source, error = %error, "error raised");
        self.trigger(
            Event::new(EventKind::ErrorRaised)
                .with_address(source.clone())
                .with_reason(error.to_string()),
        );
        let template = self.state.get(&source).map(|ctx| ctx.template.clone());
        self.raised.push_back(Raised {
            source,
            error,
            template,
        });
    }

    pub(crate) fn supervise(&mut self, raised: Raised) {
        let Raised {
            source,
            error,
            template,
        } = raised;
        let reason = error.to_string();
        let mut level = source.clone();

        loop {
            let action = if level.is_root() {
                self.root_trap.as_ref().map(|trap| trap(&error))
            } else if level == source {
                let current = self.state.get(&level).map(|ctx| &ctx.template);
                current
                    .or(template.as_ref())
                    .and_then(|t| t.classify(&error))
            } else {
                self.state
                    .get(&level)
                    .and_then(|ctx| ctx.template.classify(&error))
            };

            match action.unwrap_or_default() {
                TrapAction::Raise if level.is_root() => {
                    self.unhandled(source, reason);
                    return;
                }
                TrapAction::Raise => {
                    let parent = level.parent();
                    self.trigger(
                        Event::new(EventKind::ErrorEscalated)
                            .with_address(level)
                            .with_to(parent.clone())
                            .with_from(source.clone())
                            .with_reason(reason.as_str()),
                    );
                    level = parent;
                }
                TrapAction::Ignore => {
                    self.trigger(
                        Event::new(EventKind::ErrorIgnored)
                            .with_address(level)
                            .with_from(source)
                            .with_reason(reason),
                    );
                    return;
                }
                TrapAction::Restart => {
                    self.restart(&source, template, &reason);
                    return;
                }
                TrapAction::Stop => {
                    tracing::info!(address = %source, decided_by = %level, "stopping actor");
                    self.terminate(&source);
                    return;
                }
            }
        }
    }

    /// Replaces `source` with a fresh context built from its stored template.
    ///
    /// A raiser that already exited is rebuilt from `raised_with` as long as
    /// its parent is still alive.
    fn restart(&mut self, source: &Address, raised_with: Option<Template>, reason: &str) {
        let current = self.state.get(source).map(|ctx| ctx.template.clone());
        let Some(template) = current.or(raised_with) else {
            tracing::debug!(address = %source, "restart target already gone");
            return;
        };
        self.terminate(source);

        let addr = match self.alloc_actor(&source.parent(), template) {
            Ok(addr) => addr,
            Err(e) => {
                tracing::warn!(address = %source, error = %e, "restart failed");
                return;
            }
        };
        tracing::info!(address = %addr, reason, "actor restarted");
        self.trigger(
            Event::new(EventKind::ActorRestarted)
                .with_address(addr.clone())
                .with_reason(reason),
        );
        if let Err(e) = self.start_tree(&addr) {
            tracing::warn!(address = %addr, error = %e, "restarted actor did not start");
        }
    }

    fn unhandled(&mut self, source: Address, reason: String) {
        tracing::error!(address = %source, error = %reason, "unhandled escalation, stopping platform");
        self.trigger(
            Event::new(EventKind::UnhandledEscalation)
                .with_from(source.clone())
                .with_reason(reason.as_str()),
        );
        self.set_fatal(RuntimeError::UnhandledEscalation {
            source_address: source,
            error: reason,
        });
    }

    /// Removes `addr` and its subtree, children first. Idempotent.
    ///
    /// Root itself is never removed; terminating it clears its children.
    pub(crate) fn terminate(&mut self, addr: &Address) {
        if addr.is_root() {
            for child in self.state.direct_children(addr) {
                self.terminate(&child);
            }
            return;
        }
        if !self.state.contains(addr) {
            return;
        }
        for child in self.state.direct_children(addr) {
            self.terminate(&child);
        }
        let Some(mut ctx) = self.state.remove(addr) else {
            return;
        };
        if let Some(mut instance) = ctx.instance.take() {
            instance.stop();
        }
        self.unschedule(addr);
        tracing::debug!(address = %addr, "actor removed");
        self.trigger(Event::new(EventKind::ActorRemoved).with_address(addr.clone()));
    }
}
