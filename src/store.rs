// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Last-writer-wins register map.
//!
//! The store is a map from `(entity, key)` to a register holding the write
//! with the greatest `(timestamp, writer)`. That total order is what makes
//! merging commutative, associative, and idempotent: any two stores that
//! applied the same set of writes hold the same registers, whatever the
//! delivery order and however many duplicates arrived.
//!
//! A register whose value is `None` records an explicit clear. It is a
//! different state from a cell that was never written.
//!
//! Every apply notifies the listeners synchronously, in registration order,
//! whether or not the write won. Listeners never see the store itself; a
//! listener that wants to write pushes onto a `Deferred` queue which the
//! owner drains once the current apply has returned.

use rustc_hash::FxHashMap;
use serde::Deserialize;
use serde::Serialize;

use crate::clock::Clock;
use crate::clock::LamportClock;
use crate::crdt::Crdt;
use crate::id::Id;

/// Where a write came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Origin {
    /// Issued on this replica.
    Local,
    /// Delivered from another replica.
    Remote,
}

/// A single field write, the unit exchanged between replicas.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Write<V> {
    pub entity: Id,
    pub key: Id,
    pub value: Option<V>,
    pub writer: Id,
    pub timestamp: u64,
}

/// The current contents of one cell.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Register<V> {
    pub value: Option<V>,
    pub writer: Id,
    pub timestamp: u64,
}

/// What listeners are told after each apply.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Change<V> {
    pub write: Write<V>,
    pub origin: Origin,
    /// The cell's value before this write was applied.
    pub previous: Option<V>,
    /// False if an existing register outranked the write.
    pub accepted: bool,
}

/// Writes requested by listeners, applied after the current apply returns.
#[derive(Clone, Debug)]
pub struct Deferred<V> {
    writes: Vec<(Id, Id, Option<V>)>,
}

impl<V> Deferred<V> {
    fn new() -> Deferred<V> {
        return Deferred { writes: Vec::new() };
    }

    /// Queue a local write of `value` into `(entity, key)`.
    pub fn push(&mut self, entity: Id, key: Id, value: Option<V>) {
        self.writes.push((entity, key, value));
    }

    pub fn is_empty(&self) -> bool {
        return self.writes.is_empty();
    }

    fn take(&mut self) -> Vec<(Id, Id, Option<V>)> {
        return std::mem::take(&mut self.writes);
    }
}

type Listener<V> = Box<dyn FnMut(&Change<V>, &mut Deferred<V>)>;

impl<V> Write<V> {
    /// Whether this write should replace `register`.
    ///
    /// A write loses to a register with a strictly greater timestamp, or an
    /// equal timestamp and a lexically greater writer.
    pub fn outranks(&self, register: &Register<V>) -> bool {
        if register.timestamp != self.timestamp {
            return self.timestamp > register.timestamp;
        }
        return self.writer >= register.writer;
    }
}

/// A last-writer-wins register map owned by one replica.
pub struct Store<V> {
    writer: Id,
    clock: Box<dyn Clock>,
    rows: FxHashMap<Id, FxHashMap<Id, Register<V>>>,
    listeners: Vec<Listener<V>>,
    deferred: Deferred<V>,
}

impl<V: Clone> Store<V> {
    /// Create an empty store writing as `writer`, with a Lamport clock.
    pub fn new(writer: impl Into<Id>) -> Store<V> {
        return Store::with_clock(writer, Box::new(LamportClock::new()));
    }

    /// Create an empty store with a specific clock source.
    pub fn with_clock(writer: impl Into<Id>, clock: Box<dyn Clock>) -> Store<V> {
        return Store {
            writer: writer.into(),
            clock,
            rows: FxHashMap::default(),
            listeners: Vec::new(),
            deferred: Deferred::new(),
        };
    }

    /// The id this store tags its own writes with.
    pub fn writer(&self) -> &Id {
        return &self.writer;
    }

    /// Register a listener. Listeners fire in registration order.
    pub fn subscribe(&mut self, listener: impl FnMut(&Change<V>, &mut Deferred<V>) + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Get the value in a cell. `None` for both cleared and unwritten cells.
    pub fn get(&self, entity: &str, key: &str) -> Option<&V> {
        return self.register(entity, key).and_then(|r| r.value.as_ref());
    }

    /// Get the full register of a cell, if it was ever written.
    pub fn register(&self, entity: &str, key: &str) -> Option<&Register<V>> {
        return self.rows.get(entity).and_then(|row| row.get(key));
    }

    /// Iterate the written cells of one entity.
    pub fn row(&self, entity: &str) -> impl Iterator<Item = (&Id, &Register<V>)> {
        return self.rows.get(entity).into_iter().flat_map(|row| row.iter());
    }

    /// Iterate every entity with at least one written cell.
    pub fn entities(&self) -> impl Iterator<Item = &Id> {
        return self.rows.keys();
    }

    /// Check whether an entity has any written cell.
    pub fn contains(&self, entity: &str) -> bool {
        return self.rows.contains_key(entity);
    }

    /// Number of written cells.
    pub fn len(&self) -> usize {
        return self.rows.values().map(|row| row.len()).sum();
    }

    pub fn is_empty(&self) -> bool {
        return self.rows.is_empty();
    }

    /// Write a value locally.
    ///
    /// The timestamp comes from the clock but is forced past the cell's
    /// current timestamp, so a local write is always locally visible.
    pub fn set(&mut self, entity: impl Into<Id>, key: impl Into<Id>, value: Option<V>) -> Change<V> {
        let write = self.stamp(entity.into(), key.into(), value);
        return self.apply(write, Origin::Local);
    }

    /// Build a locally-stamped write without applying it.
    pub fn stamp(&mut self, entity: Id, key: Id, value: Option<V>) -> Write<V> {
        let mut timestamp = self.clock.now();
        if let Some(prior) = self.register(&entity, &key) {
            timestamp = timestamp.max(prior.timestamp.saturating_add(1));
        }
        return Write {
            entity,
            key,
            value,
            writer: self.writer.clone(),
            timestamp,
        };
    }

    /// Apply a write from anywhere and notify listeners.
    pub fn apply(&mut self, write: Write<V>, origin: Origin) -> Change<V> {
        self.clock.observe(write.timestamp);

        let row = self.rows.entry(write.entity.clone()).or_default();
        let (previous, accepted) = match row.get_mut(&write.key) {
            Some(register) => {
                let previous = register.value.clone();
                let accepted = write.outranks(register);
                if accepted {
                    *register = Register {
                        value: write.value.clone(),
                        writer: write.writer.clone(),
                        timestamp: write.timestamp,
                    };
                }
                (previous, accepted)
            }
            None => {
                row.insert(write.key.clone(), Register {
                    value: write.value.clone(),
                    writer: write.writer.clone(),
                    timestamp: write.timestamp,
                });
                (None, true)
            }
        };

        tracing::trace!(
            entity = %write.entity,
            key = %write.key,
            writer = %write.writer,
            timestamp = write.timestamp,
            ?origin,
            accepted,
            "apply"
        );

        let change = Change { write, origin, previous, accepted };
        for listener in self.listeners.iter_mut() {
            listener(&change, &mut self.deferred);
        }
        return change;
    }

    /// Take the writes listeners have queued since the last call.
    pub fn take_deferred(&mut self) -> Vec<(Id, Id, Option<V>)> {
        return self.deferred.take();
    }

    /// Export every register as a write, sorted by `(entity, key)`.
    pub fn writes(&self) -> Vec<Write<V>> {
        let mut writes: Vec<Write<V>> = self.rows
            .iter()
            .flat_map(|(entity, row)| {
                row.iter().map(move |(key, register)| Write {
                    entity: entity.clone(),
                    key: key.clone(),
                    value: register.value.clone(),
                    writer: register.writer.clone(),
                    timestamp: register.timestamp,
                })
            })
            .collect();
        writes.sort_by(|a, b| a.entity.cmp(&b.entity).then_with(|| a.key.cmp(&b.key)));
        return writes;
    }
}

impl<V: Clone> Crdt for Store<V> {
    fn merge(&mut self, other: &Self) {
        for write in other.writes() {
            self.apply(write, Origin::Remote);
        }
    }
}
