use crate::actor::{Message, Template};

use super::heap::HeapRef;

/// Operand-stack slot.
///
/// Composite values live on the runtime heap and are referenced by index;
/// functions are referenced by their index in the frame's constant pool.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Datum {
    Nil,
    Int(i64),
    Ref(HeapRef),
    Fun(u32),
}

/// Resolved value, as seen by foreign functions and `exec` callers.
#[derive(Clone, Debug)]
pub enum Value {
    Nil,
    Int(i64),
    Str(String),
    Message(Message),
    Template(Template),
}

impl Value {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Converts to a message payload; templates become `null`.
    pub fn into_message(self) -> Message {
        match self {
            Value::Nil | Value::Template(_) => Message::Null,
            Value::Int(n) => Message::from(n),
            Value::Str(s) => Message::String(s),
            Value::Message(m) => m,
        }
    }

    /// Short type name for diagnostics.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Nil => "nil",
            Value::Int(_) => "int",
            Value::Str(_) => "str",
            Value::Message(_) => "message",
            Value::Template(_) => "template",
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Nil, Value::Nil) => true,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::Message(a), Value::Message(b)) => a == b,
            _ => false,
        }
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<Message> for Value {
    fn from(m: Message) -> Self {
        Value::Message(m)
    }
}
