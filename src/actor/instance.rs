use crate::core::Cx;
use crate::error::ActorError;

use super::behaviour::Behaviour;
use super::envelope::Envelope;

/// Contract for actor implementations.
///
/// Every hook runs on the platform thread with exclusive access to the actor;
/// `Cx` is the only way to reach the rest of the system. Errors returned from
/// `accept`, `receive` and `run` are raised on this actor and go through
/// supervision, they never reach the sender.
///
/// ```text
/// allocate ─► init(behaviour) ─► run(cx) ─► accept / receive ... ─► stop()
/// ```
pub trait Actor: 'static {
    /// Declares the mailbox/receive policy. Called once per (re)build.
    fn init(&mut self, behaviour: &mut Behaviour) {
        let _ = behaviour;
    }

    /// Direct delivery for unbuffered actors, and transfers for routers.
    ///
    /// The default declines the message, which records a drop.
    fn accept(&mut self, envelope: Envelope, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        cx.drop_message(envelope);
        Ok(())
    }

    /// A buffered message matched the receiver's case `case`.
    fn receive(
        &mut self,
        case: &'static str,
        envelope: Envelope,
        cx: &mut Cx<'_>,
    ) -> Result<(), ActorError> {
        let _ = (case, envelope, cx);
        Ok(())
    }

    /// Called once the actor is started (and again after each restart).
    fn run(&mut self, cx: &mut Cx<'_>) -> Result<(), ActorError> {
        let _ = cx;
        Ok(())
    }

    /// Called when the context is removed.
    fn stop(&mut self) {}
}
