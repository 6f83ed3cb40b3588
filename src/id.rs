// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Identifier type shared by entities, keys, and writers.
//!
//! Every tie-break in the crate is decided by comparing identifiers, so
//! the ordering here is part of the convergence contract: it is plain
//! lexical (byte-wise) string order, identical on every replica.

use std::borrow::Borrow;
use std::fmt;
use std::ops::Deref;

use serde::Deserialize;
use serde::Serialize;

/// The identifier of the distinguished root node.
pub const ROOT_ID: &str = "root";

/// An opaque identifier.
///
/// Used for node ids (store entities), candidate parents (store keys),
/// and writer ids (replicas).
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Id(String);

impl Id {
    /// Create an identifier from anything string-like.
    pub fn new(id: impl Into<String>) -> Id {
        return Id(id.into());
    }

    /// The root identifier.
    pub fn root() -> Id {
        return Id(ROOT_ID.to_string());
    }

    /// Check whether this is the root identifier.
    #[inline]
    pub fn is_root(&self) -> bool {
        return self.0 == ROOT_ID;
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        return &self.0;
    }
}

impl From<&str> for Id {
    fn from(id: &str) -> Id {
        return Id(id.to_string());
    }
}

impl From<String> for Id {
    fn from(id: String) -> Id {
        return Id(id);
    }
}

impl From<&Id> for Id {
    fn from(id: &Id) -> Id {
        return id.clone();
    }
}

impl Borrow<str> for Id {
    fn borrow(&self) -> &str {
        return &self.0;
    }
}

impl Deref for Id {
    type Target = str;

    fn deref(&self) -> &str {
        return &self.0;
    }
}

impl AsRef<str> for Id {
    fn as_ref(&self) -> &str {
        return &self.0;
    }
}

impl PartialEq<str> for Id {
    fn eq(&self, other: &str) -> bool {
        return self.0 == other;
    }
}

impl PartialEq<&str> for Id {
    fn eq(&self, other: &&str) -> bool {
        return self.0 == *other;
    }
}

impl fmt::Debug for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return write!(f, "Id({})", self.0);
    }
}

impl fmt::Display for Id {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.0);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordering_is_lexical() {
        assert!(Id::from("b") > Id::from("a"));
        assert!(Id::from("a:10") < Id::from("a:9"));
        assert!(Id::from("B") < Id::from("a"));
    }

    #[test]
    fn root_is_recognized() {
        assert!(Id::root().is_root());
        assert!(Id::from(ROOT_ID).is_root());
        assert!(!Id::from("rooted").is_root());
    }

    #[test]
    fn compares_with_str() {
        let id = Id::from("node");
        assert_eq!(id, "node");
        assert_eq!(id.to_string(), "node");
        assert_eq!(format!("{:?}", id), "Id(node)");
    }
}
