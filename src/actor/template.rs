//! # Actor templates.
//!
//! A [`Template`] is everything the platform needs to (re)build an actor:
//! a factory, the arguments passed to it, an optional trap, group names and
//! child templates allocated together with the actor.
//!
//! Templates are cheap to clone (factory and trap are `Arc`s); the platform
//! keeps one per context so `Restart` can rebuild the actor at the same address.
//!
//! ## Example
//! ```rust
//! use actorvisor::{Actor, Template, TrapAction, policies::trap};
//! use serde_json::json;
//!
//! struct Worker;
//! impl Actor for Worker {}
//!
//! let tpl = Template::new(|_args| Box::new(Worker))
//!     .with_id("worker")
//!     .with_args(vec![json!(1), json!("two")])
//!     .with_trap(trap::always(TrapAction::Restart))
//!     .with_group("workers");
//!
//! assert_eq!(tpl.id(), Some("worker"));
//! ```

use std::fmt;
use std::sync::Arc;

use super::envelope::Message;
use super::instance::Actor;
use crate::error::ActorError;
use crate::policies::{Trap, TrapAction};

type Factory = Arc<dyn Fn(&[Message]) -> Box<dyn Actor>>;

/// Recipe for an actor.
#[derive(Clone)]
pub struct Template {
    id: Option<String>,
    create: Factory,
    trap: Option<Trap>,
    args: Vec<Message>,
    groups: Vec<String>,
    children: Vec<Template>,
}

impl Template {
    /// Template without id (one is generated at allocation), trap, args, groups or children.
    pub fn new(create: impl Fn(&[Message]) -> Box<dyn Actor> + 'static) -> Self {
        Self {
            id: None,
            create: Arc::new(create),
            trap: None,
            args: Vec::new(),
            groups: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Arguments handed to the factory on every (re)build.
    pub fn with_args(mut self, args: Vec<Message>) -> Self {
        self.args = args;
        self
    }

    pub fn with_trap(mut self, trap: Trap) -> Self {
        self.trap = Some(trap);
        self
    }

    /// Adds the actor to a named group on allocation.
    pub fn with_group(mut self, group: impl Into<String>) -> Self {
        self.groups.push(group.into());
        self
    }

    /// Adds a child allocated under this actor and started right after it.
    pub fn with_child(mut self, child: Template) -> Self {
        self.children.push(child);
        self
    }

    pub fn id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    pub fn args(&self) -> &[Message] {
        &self.args
    }

    pub fn groups(&self) -> &[String] {
        &self.groups
    }

    pub fn children(&self) -> &[Template] {
        &self.children
    }

    pub fn has_trap(&self) -> bool {
        self.trap.is_some()
    }

    /// Runs the trap; `None` when the template has none.
    pub fn classify(&self, err: &ActorError) -> Option<TrapAction> {
        self.trap.as_ref().map(|t| t(err))
    }

    /// Builds a fresh instance from the stored args.
    pub(crate) fn instantiate(&self) -> Box<dyn Actor> {
        (self.create)(&self.args)
    }
}

impl fmt::Debug for Template {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Template")
            .field("id", &self.id)
            .field("args", &self.args)
            .field("trap", &self.trap.is_some())
            .field("groups", &self.groups)
            .field("children", &self.children.len())
            .finish()
    }
}
