//! # Hierarchical actor addresses.
//!
//! Every actor lives at an [`Address`]: a `/`-separated path whose prefix is the
//! address of its parent. The tree is rooted at [`Address::root`] (`/`).
//!
//! ```text
//! /                 root (always exists, never has a context)
//! ├── /api          child of root
//! │   ├── /api/w1   child of /api
//! │   └── /api/w2
//! └── /db
//! ?                 DISCARD: absorbs anything sent to it
//! ```
//!
//! ## Rules
//! - ids are non-empty and never contain the separator;
//! - the self token `$` is reserved and rejected as an id;
//! - `parent(make(p, id)) == p` for every accepted `(p, id)`;
//! - the parent of root is root.

use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::RuntimeError;

/// Path separator.
pub const SEPARATOR: char = '/';

/// Reserved id that scripts use to refer to the executing actor.
pub const SELF_TOKEN: &str = "$";

const DISCARD: &str = "?";

/// Location of an actor in the supervision tree.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(Arc<str>);

impl Address {
    /// The root of the tree (`/`).
    pub fn root() -> Self {
        Self(Arc::from("/"))
    }

    /// The DISCARD sentinel (`?`). Messages sent here vanish without a drop event.
    pub fn discard() -> Self {
        Self(Arc::from(DISCARD))
    }

    /// Builds the address of child `id` under `parent`.
    ///
    /// Fails with [`RuntimeError::InvalidId`] when `id` is empty, contains the
    /// separator, or is the reserved self token.
    pub fn make(parent: &Address, id: &str) -> Result<Self, RuntimeError> {
        validate_id(id)?;
        if parent.is_discard() {
            return Err(RuntimeError::InvalidId {
                id: id.to_string(),
                reason: "discard address cannot have children",
            });
        }
        let path = if parent.is_root() {
            format!("/{id}")
        } else {
            format!("{}/{id}", parent.0)
        };
        Ok(Self(Arc::from(path)))
    }

    /// Parses and validates a textual address.
    pub fn parse(raw: &str) -> Result<Self, RuntimeError> {
        if raw == "/" {
            return Ok(Self::root());
        }
        if raw == DISCARD {
            return Ok(Self::discard());
        }
        let Some(rest) = raw.strip_prefix(SEPARATOR) else {
            return Err(RuntimeError::InvalidAddress {
                address: raw.to_string(),
            });
        };
        for segment in rest.split(SEPARATOR) {
            if validate_id(segment).is_err() {
                return Err(RuntimeError::InvalidAddress {
                    address: raw.to_string(),
                });
            }
        }
        Ok(Self(Arc::from(raw)))
    }

    /// Returns the parent address; root (and DISCARD) map to root.
    pub fn parent(&self) -> Address {
        if self.is_root() || self.is_discard() {
            return Self::root();
        }
        match self.0.rfind(SEPARATOR) {
            Some(0) | None => Self::root(),
            Some(i) => Self(Arc::from(&self.0[..i])),
        }
    }

    /// Last path segment (`""` for root).
    pub fn id(&self) -> &str {
        if self.is_root() {
            return "";
        }
        match self.0.rfind(SEPARATOR) {
            Some(i) => &self.0[i + 1..],
            None => &self.0,
        }
    }

    /// Number of segments below root (`0` for root).
    pub fn depth(&self) -> usize {
        if self.is_root() || self.is_discard() {
            0
        } else {
            self.0.matches(SEPARATOR).count()
        }
    }

    #[inline]
    pub fn is_root(&self) -> bool {
        &*self.0 == "/"
    }

    #[inline]
    pub fn is_discard(&self) -> bool {
        &*self.0 == DISCARD
    }

    /// Strict descendant test on whole segments: `/a/b` descends from `/a`,
    /// `/ab` does not, and no address descends from itself.
    pub fn is_descendant_of(&self, ancestor: &Address) -> bool {
        if self == ancestor || self.is_discard() || ancestor.is_discard() {
            return false;
        }
        if ancestor.is_root() {
            return !self.is_root();
        }
        self.0
            .strip_prefix(&*ancestor.0)
            .is_some_and(|rest| rest.starts_with(SEPARATOR))
    }

    /// Prefix shared by every descendant (`/` for root, `/a/` for `/a`).
    pub(crate) fn subtree_prefix(&self) -> String {
        if self.is_root() {
            "/".to_string()
        } else {
            format!("{}/", self.0)
        }
    }

    /// Walks from this address up to and including root.
    pub fn ancestry(&self) -> impl Iterator<Item = Address> {
        let mut next = Some(self.clone());
        std::iter::from_fn(move || {
            let cur = next.take()?;
            if !cur.is_root() {
                next = Some(cur.parent());
            }
            Some(cur)
        })
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

fn validate_id(id: &str) -> Result<(), RuntimeError> {
    let reason = if id.is_empty() {
        "empty id"
    } else if id.contains(SEPARATOR) {
        "id contains the path separator"
    } else if id == SELF_TOKEN {
        "id is the reserved self token"
    } else {
        return Ok(());
    };
    Err(RuntimeError::InvalidId {
        id: id.to_string(),
        reason,
    })
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = RuntimeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Address::parse(&raw)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.0.to_string()
    }
}

impl Borrow<str> for Address {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parent_of_make_is_parent() {
        let root = Address::root();
        let a = Address::make(&root, "a").unwrap();
        let b = Address::make(&a, "b").unwrap();
        let c = Address::make(&b, "worker-7").unwrap();

        assert_eq!(a.parent(), root);
        assert_eq!(b.parent(), a);
        assert_eq!(c.parent(), b);
        assert_eq!(c.as_str(), "/a/b/worker-7");
        assert_eq!(c.id(), "worker-7");
    }

    #[test]
    fn test_root_is_its_own_parent() {
        assert_eq!(Address::root().parent(), Address::root());
        assert_eq!(Address::root().depth(), 0);
    }

    #[test]
    fn test_make_rejects_reserved_and_malformed_ids() {
        let root = Address::root();
        for bad in ["", "a/b", "$"] {
            let err = Address::make(&root, bad).unwrap_err();
            assert_eq!(err.as_label(), "runtime_invalid_id", "id {bad:?}");
        }
    }

    #[test]
    fn test_parse_validates_segments() {
        assert_eq!(Address::parse("/a/b").unwrap().depth(), 2);
        assert!(Address::parse("/").unwrap().is_root());
        assert!(Address::parse("?").unwrap().is_discard());
        assert!(Address::parse("a/b").is_err());
        assert!(Address::parse("/a//b").is_err());
        assert!(Address::parse("/a/").is_err());
        assert!(Address::parse("/a/$").is_err());
    }

    #[test]
    fn test_descendant_is_segment_aware() {
        let a = Address::parse("/a").unwrap();
        let ab = Address::parse("/a/b").unwrap();
        let abc = Address::parse("/a/b/c").unwrap();
        let a_b = Address::parse("/ab").unwrap();

        assert!(ab.is_descendant_of(&a));
        assert!(abc.is_descendant_of(&a));
        assert!(!a_b.is_descendant_of(&a));
        assert!(!a.is_descendant_of(&a));
        assert!(a.is_descendant_of(&Address::root()));
        assert!(!Address::discard().is_descendant_of(&Address::root()));
    }

    #[test]
    fn test_ancestry_walks_to_root() {
        let abc = Address::parse("/a/b/c").unwrap();
        let chain: Vec<String> = abc.ancestry().map(String::from).collect();
        assert_eq!(chain, vec!["/a/b/c", "/a/b", "/a", "/"]);
    }

    #[test]
    fn test_serde_uses_plain_string() {
        let addr = Address::parse("/a/b").unwrap();
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, "\"/a/b\"");
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
        assert!(serde_json::from_str::<Address>("\"nope\"").is_err());
    }
}
