// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! A replica: edge store, materialized tree, and undo log wired together.
//!
//! Every write, local or remote, takes the same path:
//!
//! 1. the store resolves it and notifies its listeners,
//! 2. the undo log records it if it is local user intent,
//! 3. the tree is rebuilt from the edge table,
//! 4. writes queued by listeners are applied, unrecorded.
//!
//! Nothing is asynchronous; when a call returns the tree is current.

use rustc_hash::FxHashSet;

use crate::config::Config;
use crate::crdt::Crdt;
use crate::error::Error;
use crate::error::Result;
use crate::id::Id;
use crate::store::Change;
use crate::store::Deferred;
use crate::store::Origin;
use crate::store::Store;
use crate::store::Write;
use crate::tree::Counter;
use crate::tree::Node;
use crate::tree::Tree;
use crate::undo::UndoRedo;

/// One independent copy of a movable tree.
pub struct Replica {
    store: Store<Counter>,
    tree: Tree,
    undo: UndoRedo<Counter>,
    next_seq: u64,
}

impl Replica {
    pub fn new(config: Config) -> Replica {
        let mut undo = match config.filter {
            Some(filter) => UndoRedo::with_filter(filter),
            None => UndoRedo::new(),
        };
        undo.set_enabled(config.undo);
        return Replica {
            store: Store::with_clock(config.writer, config.clock.build()),
            tree: Tree::new(),
            undo,
            next_seq: 0,
        };
    }

    /// A replica with default settings.
    pub fn with_writer(writer: impl Into<Id>) -> Replica {
        return Replica::new(Config::new(writer));
    }

    pub fn writer(&self) -> &Id {
        return self.store.writer();
    }

    pub fn tree(&self) -> &Tree {
        return &self.tree;
    }

    pub fn store(&self) -> &Store<Counter> {
        return &self.store;
    }

    pub fn history(&self) -> &UndoRedo<Counter> {
        return &self.undo;
    }

    /// Every register, ready to ship to another replica.
    pub fn writes(&self) -> Vec<Write<Counter>> {
        return self.store.writes();
    }

    /// Register an outbound listener, fired after every apply.
    pub fn subscribe(&mut self, listener: impl FnMut(&Change<Counter>, &mut Deferred<Counter>) + 'static) {
        self.store.subscribe(listener);
    }

    /// Write an edge cell locally.
    pub fn set(&mut self, entity: impl Into<Id>, key: impl Into<Id>, value: Option<Counter>) -> Change<Counter> {
        let change = self.store.set(entity, key, value);
        self.undo.observe(&change);
        self.rebuild();
        self.drain_deferred();
        return change;
    }

    /// Deliver one write.
    pub fn apply(&mut self, write: Write<Counter>, origin: Origin) -> Change<Counter> {
        let change = self.store.apply(write, origin);
        self.undo.observe(&change);
        self.rebuild();
        self.drain_deferred();
        return change;
    }

    /// Deliver many writes, rebuilding the tree once at the end.
    /// Returns how many writes were accepted.
    pub fn apply_all(&mut self, writes: impl IntoIterator<Item = Write<Counter>>, origin: Origin) -> usize {
        let mut accepted = 0;
        for write in writes {
            let change = self.store.apply(write, origin);
            self.undo.observe(&change);
            if change.accepted {
                accepted += 1;
            }
        }
        self.rebuild();
        self.drain_deferred();
        return accepted;
    }

    fn rebuild(&mut self) {
        self.tree = Tree::materialize(&self.store);
    }

    fn drain_deferred(&mut self) {
        loop {
            let pending = self.store.take_deferred();
            if pending.is_empty() {
                return;
            }
            let paused = self.undo.pause();
            for (entity, key, value) in pending {
                self.store.set(entity, key, value);
            }
            self.undo.resume(paused);
            self.rebuild();
        }
    }

    /// Run `f` as one undoable unit. Calls nest.
    pub fn batch<T>(&mut self, f: impl FnOnce(&mut Replica) -> T) -> T {
        self.undo.begin();
        let out = f(self);
        self.undo.end();
        return out;
    }

    /// Undo the last batch. False if there was nothing to undo.
    pub fn undo(&mut self) -> bool {
        let Replica { store, tree, undo, .. } = self;
        let replayed = undo.undo_with(|entity, key, value| {
            let change = store.set(entity, key, value);
            *tree = Tree::materialize(store);
            return change.previous;
        });
        self.drain_deferred();
        return replayed;
    }

    /// Redo the last undone batch. False if there was nothing to redo.
    pub fn redo(&mut self) -> bool {
        let Replica { store, tree, undo, .. } = self;
        let replayed = undo.redo_with(|entity, key, value| {
            let change = store.set(entity, key, value);
            *tree = Tree::materialize(store);
            return change.previous;
        });
        self.drain_deferred();
        return replayed;
    }

    /// Create a node under `parent` with a fresh id.
    pub fn create(&mut self, parent: &str) -> Result<Id> {
        let id = self.mint();
        self.create_with_id(id.clone(), parent)?;
        return Ok(id);
    }

    /// Create a node with a caller-chosen id.
    pub fn create_with_id(&mut self, id: impl Into<Id>, parent: &str) -> Result<()> {
        let id = id.into();
        if self.tree.contains(&id) {
            return Err(Error::AlreadyExists(id));
        }
        if !self.tree.contains(parent) {
            return Err(Error::UnknownEntity(Id::from(parent)));
        }
        self.set(id, parent, Some(0));
        return Ok(());
    }

    fn mint(&mut self) -> Id {
        loop {
            let id = Id::new(format!("{}:{}", self.writer(), self.next_seq));
            self.next_seq += 1;
            if !self.tree.contains(&id) {
                return id;
            }
        }
    }

    /// Move `child` under `parent`.
    ///
    /// Rejects moves that would put a node inside its own subtree. Cycles
    /// that only appear once concurrent moves merge are repaired by the
    /// tree instead.
    pub fn move_node(&mut self, child: &str, parent: &str) -> Result<()> {
        self.check_move(child, parent)?;
        if self.tree.is_ancestor(child, parent) {
            return Err(Error::Cycle {
                child: Id::from(child),
                parent: Id::from(parent),
            });
        }
        self.write_move(child, parent);
        return Ok(());
    }

    /// Move without the subtree check, as a merged concurrent move would.
    pub fn move_unchecked(&mut self, child: &str, parent: &str) -> Result<()> {
        self.check_move(child, parent)?;
        self.write_move(child, parent);
        return Ok(());
    }

    fn check_move(&self, child: &str, parent: &str) -> Result<()> {
        if child == self.tree.root_id().as_str() {
            return Err(Error::RootImmovable);
        }
        for id in [child, parent] {
            if !self.tree.contains(id) {
                return Err(Error::UnknownEntity(Id::from(id)));
            }
        }
        return Ok(());
    }

    fn write_move(&mut self, child: &str, parent: &str) {
        let edits = self.plan_move(child, parent);
        tracing::debug!(%child, %parent, pinned = edits.len() - 1, "move");
        self.batch(|replica| {
            for (node, parent) in edits {
                let counter = replica.next_counter(&node);
                replica.set(node, parent, Some(counter));
            }
        });
    }

    /// The edge writes for a move: pins first, then the new edge.
    ///
    /// Any ancestor of the old or new parent that currently hangs off an edge
    /// other than its largest one gets that edge rewritten with a higher
    /// counter, so a later merge cannot flip it to a stale edge.
    fn plan_move(&self, child: &str, parent: &str) -> Vec<(Id, Id)> {
        let mut edits = Vec::new();
        let mut pinned = FxHashSet::default();
        self.pin_ancestors(self.tree.parent(child), &mut edits, &mut pinned);
        self.pin_ancestors(self.tree.node(parent).map(Node::id), &mut edits, &mut pinned);
        edits.push((Id::from(child), Id::from(parent)));
        return edits;
    }

    fn pin_ancestors(&self, start: Option<&Id>, edits: &mut Vec<(Id, Id)>, pinned: &mut FxHashSet<Id>) {
        let mut cursor = start;
        while let Some(node) = cursor.and_then(|id| self.tree.node(id)) {
            let Some(parent) = node.parent() else {
                break;
            };
            let largest = node.largest_edge().map(|(id, _)| id);
            if largest != Some(parent) && pinned.insert(node.id().clone()) {
                edits.push((node.id().clone(), parent.clone()));
            }
            cursor = Some(parent);
        }
    }

    fn next_counter(&self, id: &str) -> Counter {
        return self.tree
            .node(id)
            .and_then(Node::max_counter)
            .map_or(0, |counter| counter.saturating_add(1));
    }
}

impl Crdt for Replica {
    fn merge(&mut self, other: &Self) {
        self.apply_all(other.writes(), Origin::Remote);
    }
}
