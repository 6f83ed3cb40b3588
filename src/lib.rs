// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Canopy - a movable tree that replicas edit concurrently and merge
//! without coordination.
//!
//! Parent edges live in a last-writer-wins register map. After every write
//! the tree is rebuilt from those edges, repairing any cycles that merged
//! concurrent moves introduced, so all replicas holding the same writes
//! see the same tree.
//!
//! # Quick Start
//!
//! ```
//! use canopy::crdt::Crdt;
//! use canopy::replica::Replica;
//!
//! let mut alice = Replica::with_writer("alice");
//! let mut bob = Replica::with_writer("bob");
//!
//! let docs = alice.create("root").unwrap();
//! let notes = alice.create("root").unwrap();
//! bob.merge(&alice);
//!
//! // Concurrent moves that form a cycle once merged
//! alice.move_node(&notes, &docs).unwrap();
//! bob.move_node(&docs, &notes).unwrap();
//!
//! alice.merge(&bob);
//! bob.merge(&alice);
//! assert_eq!(alice.tree().render(), bob.tree().render());
//! ```

pub mod clock;
pub mod config;
pub mod crdt;
pub mod digest;
pub mod error;
pub mod id;
pub mod replica;
pub mod store;
pub mod tree;
pub mod undo;

pub use error::Error;
pub use error::Result;
pub use id::Id;
pub use id::ROOT_ID;
pub use replica::Replica;
