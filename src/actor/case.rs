//! # Receive matchers.
//!
//! A [`Matcher`] is an ordered list of [`Case`]s. Each case carries a tag (the
//! discriminant handed to `Actor::receive`), a structural [`Kind`] and an
//! optional guard predicate. [`Matcher::select`] tries cases in declared order;
//! the first success wins.
//!
//! ```text
//! Matcher [ Case("ping", String, ==\"ping\"), Case("job", Object, has \"id\"), Case("other", Any) ]
//!   "ping"        → Some("ping")
//!   {"id": 3}     → Some("job")
//!   42            → Some("other")
//! ```

use std::fmt;
use std::sync::Arc;

use super::envelope::Message;

/// Structural shape a case accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Kind {
    Any,
    Null,
    Bool,
    Number,
    String,
    Array,
    Object,
}

impl Kind {
    /// Whether `message` has this shape.
    pub fn admits(&self, message: &Message) -> bool {
        match self {
            Kind::Any => true,
            Kind::Null => message.is_null(),
            Kind::Bool => message.is_boolean(),
            Kind::Number => message.is_number(),
            Kind::String => message.is_string(),
            Kind::Array => message.is_array(),
            Kind::Object => message.is_object(),
        }
    }
}

type Guard = Arc<dyn Fn(&Message) -> bool>;

/// One arm of a matcher.
#[derive(Clone)]
pub struct Case {
    tag: &'static str,
    kind: Kind,
    guard: Option<Guard>,
}

impl Case {
    pub fn new(tag: &'static str, kind: Kind) -> Self {
        Self {
            tag,
            kind,
            guard: None,
        }
    }

    /// Matches anything.
    pub fn any(tag: &'static str) -> Self {
        Self::new(tag, Kind::Any)
    }

    /// Matches messages equal to `value`.
    pub fn equals(tag: &'static str, value: Message) -> Self {
        Self::any(tag).when(move |m| *m == value)
    }

    /// Matches objects whose `key` field equals `value` (e.g. `{"type": "job", ..}`).
    pub fn field(tag: &'static str, key: &'static str, value: Message) -> Self {
        Self::new(tag, Kind::Object).when(move |m| m.get(key) == Some(&value))
    }

    /// Adds a guard; the case matches only when the shape fits and the guard holds.
    pub fn when(mut self, guard: impl Fn(&Message) -> bool + 'static) -> Self {
        self.guard = Some(Arc::new(guard));
        self
    }

    pub fn tag(&self) -> &'static str {
        self.tag
    }

    fn admits(&self, message: &Message) -> bool {
        self.kind.admits(message) && self.guard.as_ref().is_none_or(|g| g(message))
    }
}

impl fmt::Debug for Case {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Case")
            .field("tag", &self.tag)
            .field("kind", &self.kind)
            .field("guarded", &self.guard.is_some())
            .finish()
    }
}

/// Ordered set of cases; first match wins.
#[derive(Clone, Debug, Default)]
pub struct Matcher {
    cases: Vec<Case>,
}

impl Matcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Single catch-all case.
    pub fn any(tag: &'static str) -> Self {
        Self::new().case(Case::any(tag))
    }

    /// Appends a case (tried after every case already present).
    pub fn case(mut self, case: Case) -> Self {
        self.cases.push(case);
        self
    }

    /// Tag of the first case admitting `message`.
    pub fn select(&self, message: &Message) -> Option<&'static str> {
        self.cases.iter().find(|c| c.admits(message)).map(Case::tag)
    }

    pub fn len(&self) -> usize {
        self.cases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cases.is_empty()
    }
}
