// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Undo/redo over field writes.
//!
//! The log watches local writes and remembers what each cell held before.
//! Writes made while a batch is open accumulate in a pending buffer; when the
//! outermost batch closes the buffer becomes one undo entry and the redo
//! stack is cleared. A write made outside any batch is a batch of its own.
//!
//! Undoing replays the remembered values as fresh local writes, in their
//! original order, while recording is suppressed. The values those replays
//! overwrite form the inverse entry, which goes onto the other stack.
//!
//! Pending entries are coalesced per cell: only the first prior value is
//! kept, so a batch that writes one cell twice still undoes exactly.
//!
//! Remote writes are never recorded.

use smallvec::SmallVec;

use crate::id::Id;
use crate::store::Change;
use crate::store::Origin;

/// Decides which keys are recorded.
pub type KeyFilter = Box<dyn Fn(&Id) -> bool>;

/// What a cell held before a recorded write.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Entry<V> {
    pub entity: Id,
    pub key: Id,
    pub previous: Option<V>,
}

/// A group of writes undone and redone as one unit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Batch<V> {
    entries: SmallVec<[Entry<V>; 4]>,
}

impl<V> Batch<V> {
    pub fn entries(&self) -> &[Entry<V>] {
        return &self.entries;
    }

    pub fn len(&self) -> usize {
        return self.entries.len();
    }

    pub fn is_empty(&self) -> bool {
        return self.entries.is_empty();
    }

    /// Write every entry back in order, collecting the inverse batch.
    ///
    /// `write` performs one local write and returns the value it replaced.
    fn replay(self, mut write: impl FnMut(Id, Id, Option<V>) -> Option<V>) -> Batch<V> {
        let mut inverse = SmallVec::with_capacity(self.entries.len());
        for entry in self.entries {
            let previous = write(entry.entity.clone(), entry.key.clone(), entry.previous);
            inverse.push(Entry {
                entity: entry.entity,
                key: entry.key,
                previous,
            });
        }
        return Batch { entries: inverse };
    }
}

/// What the log is currently doing.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum State {
    Idle,
    /// At least one batch is open.
    Recording,
    /// Replaying an undo or redo; writes are not recorded.
    Replaying,
}

/// Undo and redo stacks for one replica.
pub struct UndoRedo<V> {
    depth: usize,
    replaying: bool,
    enabled: bool,
    filter: Option<KeyFilter>,
    pending: SmallVec<[Entry<V>; 4]>,
    undo: Vec<Batch<V>>,
    redo: Vec<Batch<V>>,
}

impl<V: Clone> Default for UndoRedo<V> {
    fn default() -> Self {
        return Self::new();
    }
}

impl<V: Clone> UndoRedo<V> {
    /// Create a log that records every local key.
    pub fn new() -> UndoRedo<V> {
        return UndoRedo {
            depth: 0,
            replaying: false,
            enabled: true,
            filter: None,
            pending: SmallVec::new(),
            undo: Vec::new(),
            redo: Vec::new(),
        };
    }

    /// Only record writes whose key passes `filter`.
    pub fn with_filter(filter: KeyFilter) -> UndoRedo<V> {
        let mut log = UndoRedo::new();
        log.filter = Some(filter);
        return log;
    }

    /// Turn recording on or off entirely.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn state(&self) -> State {
        if self.replaying {
            return State::Replaying;
        }
        if self.depth > 0 {
            return State::Recording;
        }
        return State::Idle;
    }

    /// Record a write if it is local, unsuppressed, and passes the filter.
    pub fn observe(&mut self, change: &Change<V>) {
        if !self.enabled || self.replaying || change.origin != Origin::Local {
            return;
        }
        let write = &change.write;
        if let Some(filter) = &self.filter {
            if !filter(&write.key) {
                return;
            }
        }
        let seen = self.pending
            .iter()
            .any(|e| e.entity == write.entity && e.key == write.key);
        if !seen {
            self.pending.push(Entry {
                entity: write.entity.clone(),
                key: write.key.clone(),
                previous: change.previous.clone(),
            });
        }
        if self.depth == 0 {
            self.commit();
        }
    }

    /// Open a batch. Batches nest; only the outermost one commits.
    pub fn begin(&mut self) {
        self.depth += 1;
    }

    /// Close a batch, committing if it was the outermost.
    pub fn end(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.commit();
        }
    }

    fn commit(&mut self) {
        if self.pending.is_empty() {
            return;
        }
        let entries = std::mem::take(&mut self.pending);
        tracing::debug!(writes = entries.len(), "commit undo batch");
        self.undo.push(Batch { entries });
        self.redo.clear();
    }

    /// Suppress recording for writes that are not user intent.
    pub fn pause(&mut self) -> bool {
        return std::mem::replace(&mut self.replaying, true);
    }

    /// Restore the recording state returned by `pause`.
    pub fn resume(&mut self, paused: bool) {
        self.replaying = paused;
    }

    /// Undo the most recent batch through `write`. False if nothing to undo.
    pub fn undo_with(&mut self, write: impl FnMut(Id, Id, Option<V>) -> Option<V>) -> bool {
        let Some(batch) = self.undo.pop() else {
            return false;
        };
        tracing::debug!(writes = batch.len(), "undo");
        let paused = self.pause();
        let inverse = batch.replay(write);
        self.resume(paused);
        self.redo.push(inverse);
        return true;
    }

    /// Redo the most recently undone batch through `write`.
    pub fn redo_with(&mut self, write: impl FnMut(Id, Id, Option<V>) -> Option<V>) -> bool {
        let Some(batch) = self.redo.pop() else {
            return false;
        };
        tracing::debug!(writes = batch.len(), "redo");
        let paused = self.pause();
        let inverse = batch.replay(write);
        self.resume(paused);
        self.undo.push(inverse);
        return true;
    }

    pub fn can_undo(&self) -> bool {
        return !self.undo.is_empty();
    }

    pub fn can_redo(&self) -> bool {
        return !self.redo.is_empty();
    }

    pub fn undo_len(&self) -> usize {
        return self.undo.len();
    }

    pub fn redo_len(&self) -> usize {
        return self.redo.len();
    }

    /// The next batch `undo` would replay.
    pub fn peek_undo(&self) -> Option<&Batch<V>> {
        return self.undo.last();
    }

    /// Forget both stacks and anything pending.
    pub fn clear(&mut self) {
        self.pending.clear();
        self.undo.clear();
        self.redo.clear();
    }
}
