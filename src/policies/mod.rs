//! Supervision policies.
//!
//! ## Contents
//! - [`TrapAction`] what a supervisor level decides for a raised error
//! - [`Trap`] the classifier type templates (and the root) carry
//! - [`trap`] ready-made classifiers
//!
//! ## Defaults
//! - No trap behaves like a trap returning [`TrapAction::Raise`].
//! - The root has no trap unless `PlatformBuilder::with_trap` installs one;
//!   an error escalating past it is fatal.

pub mod trap;

pub use trap::{Trap, TrapAction};
