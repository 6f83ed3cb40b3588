// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Errors returned by local tree edits.
//!
//! Conflicting or cycle-inducing writes that arrive through `apply` are
//! ordinary operation and never produce an error.

use thiserror::Error;

use crate::id::Id;

/// Error returned when a local edit is rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// The identifier has never been referenced by any write.
    #[error("unknown entity: {0}")]
    UnknownEntity(Id),

    /// A node with this identifier already exists.
    #[error("entity already exists: {0}")]
    AlreadyExists(Id),

    /// The root never moves.
    #[error("the root node cannot be moved")]
    RootImmovable,

    /// The new parent lies inside the subtree of the node being moved.
    #[error("moving {child} under {parent} would create a cycle")]
    Cycle { child: Id, parent: Id },
}

pub type Result<T> = std::result::Result<T, Error>;
