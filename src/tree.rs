// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Materialized tree, rebuilt from the edge table on every apply.
//!
//! The store holds, for each child, a row of candidate parents with a
//! counter: cell `(child, parent) = counter`. The tree is a pure function
//! of those rows:
//!
//! 1. **Active edges**: each node picks its largest edge (highest counter,
//!    ties broken by the larger parent id). This gives every node at most
//!    one parent, so nodes whose chain reaches the root already form a tree.
//!
//! 2. **Detached nodes**: every other node sits on or behind a cycle, or
//!    hangs off a node that has no edges at all. A tortoise/hare walk finds
//!    them without looping forever.
//!
//! 3. **Repair**: edges from detached nodes into the attached tree are
//!    *ready*, edges between detached nodes are *deferred*. Ready edges pop
//!    from a heap in one fixed order (counter desc, parent asc, child asc);
//!    popping reattaches the child and promotes the edges that were waiting
//!    on it. The order depends only on the edge table, so every replica
//!    repairs identically.
//!
//! 4. **Children**: rebuilt from parent pointers and sorted by id.
//!
//! Nodes with no edges stay parentless and belong to no children list.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt;

use rustc_hash::FxHashMap;
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

use crate::digest::Digest;
use crate::id::Id;
use crate::store::Store;

/// The value stored in an edge cell.
pub type Counter = u64;

/// One row of the materialized tree.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Node {
    id: Id,
    parent: Option<Id>,
    children: Vec<Id>,
    edges: FxHashMap<Id, Counter>,
}

impl Node {
    fn new(id: Id) -> Node {
        return Node {
            id,
            parent: None,
            children: Vec::new(),
            edges: FxHashMap::default(),
        };
    }

    pub fn id(&self) -> &Id {
        return &self.id;
    }

    /// The parent after reconciliation.
    pub fn parent(&self) -> Option<&Id> {
        return self.parent.as_ref();
    }

    /// Children after reconciliation, sorted by id.
    pub fn children(&self) -> &[Id] {
        return &self.children;
    }

    /// Every live candidate parent with its counter.
    pub fn edges(&self) -> &FxHashMap<Id, Counter> {
        return &self.edges;
    }

    /// The edge with the highest counter, ties going to the larger parent id.
    pub fn largest_edge(&self) -> Option<(&Id, Counter)> {
        return self.edges
            .iter()
            .max_by(|(a_id, a_c), (b_id, b_c)| a_c.cmp(b_c).then_with(|| a_id.cmp(b_id)))
            .map(|(id, &counter)| (id, counter));
    }

    /// The highest counter on this row, if any.
    pub fn max_counter(&self) -> Option<Counter> {
        return self.edges.values().copied().max();
    }
}

/// An edge waiting to reattach a detached child.
///
/// The heap pops the greatest item, so the ordering puts higher counters
/// first and, among equal counters, smaller parent then smaller child ids.
#[derive(Clone, Debug, PartialEq, Eq)]
struct Candidate {
    counter: Counter,
    parent: Id,
    child: Id,
}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        return Some(self.cmp(other));
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        return self.counter
            .cmp(&other.counter)
            .then_with(|| other.parent.cmp(&self.parent))
            .then_with(|| other.child.cmp(&self.child));
    }
}

/// A cycle-free tree rooted at `ROOT_ID`, derived from an edge table.
#[derive(Clone, Debug)]
pub struct Tree {
    root: Id,
    nodes: FxHashMap<Id, Node>,
    detached: Vec<Id>,
}

impl Default for Tree {
    fn default() -> Self {
        return Tree::new();
    }
}

impl Tree {
    /// A tree holding only the root.
    pub fn new() -> Tree {
        let root = Id::root();
        let mut nodes = FxHashMap::default();
        nodes.insert(root.clone(), Node::new(root.clone()));
        return Tree {
            root,
            nodes,
            detached: Vec::new(),
        };
    }

    /// Build the tree for the current contents of an edge store.
    pub fn materialize(store: &Store<Counter>) -> Tree {
        let mut tree = Tree::new();
        for child in store.entities() {
            for (parent, register) in store.row(child) {
                tree.row(parent);
                let node = tree.row(child);
                if let Some(counter) = register.value {
                    node.edges.insert(parent.clone(), counter);
                }
            }
        }
        tree.reconcile();
        return tree;
    }

    fn row(&mut self, id: &Id) -> &mut Node {
        return self.nodes
            .entry(id.clone())
            .or_insert_with(|| Node::new(id.clone()));
    }

    fn reconcile(&mut self) {
        // Every node starts out under its largest edge.
        for node in self.nodes.values_mut() {
            node.children.clear();
            node.parent = match node.id.is_root() {
                true => None,
                false => node.largest_edge().map(|(id, _)| id.clone()),
            };
        }

        let mut detached = self.collect_detached();
        if !detached.is_empty() {
            self.repair(&mut detached);
        }

        // Whatever could not be reattached has no path to the root.
        let mut leftover: Vec<Id> = detached.into_iter().collect();
        leftover.sort();
        for id in leftover.iter() {
            if let Some(node) = self.nodes.get_mut(id) {
                node.parent = None;
            }
        }
        self.detached = leftover;

        let mut links: Vec<(Id, Id)> = self.nodes
            .values()
            .filter_map(|node| node.parent.clone().map(|parent| (parent, node.id.clone())))
            .collect();
        links.sort();
        for (parent, child) in links {
            if let Some(node) = self.nodes.get_mut(&parent) {
                node.children.push(child);
            }
        }
    }

    /// Gather every node whose parent chain does not reach the root.
    fn collect_detached(&self) -> FxHashSet<Id> {
        let mut detached = FxHashSet::default();
        for id in self.nodes.keys() {
            if detached.contains(id) || self.is_ancestor(&self.root, id) {
                continue;
            }
            // Everything above an unrooted node is unrooted as well. The walk
            // stops at the first node already collected, which also ends it
            // when it comes back around a cycle.
            let mut cursor = Some(id);
            while let Some(node) = cursor {
                if !detached.insert(node.clone()) {
                    break;
                }
                cursor = self.parent(node);
            }
        }
        return detached;
    }

    fn repair(&mut self, detached: &mut FxHashSet<Id>) {
        tracing::debug!(count = detached.len(), "repairing detached nodes");

        let mut ready = BinaryHeap::new();
        let mut deferred: FxHashMap<Id, SmallVec<[Candidate; 2]>> = FxHashMap::default();
        for child in detached.iter() {
            let Some(node) = self.nodes.get(child) else {
                continue;
            };
            for (parent, &counter) in node.edges.iter() {
                let candidate = Candidate {
                    counter,
                    parent: parent.clone(),
                    child: child.clone(),
                };
                if detached.contains(parent) {
                    deferred.entry(parent.clone()).or_default().push(candidate);
                } else {
                    ready.push(candidate);
                }
            }
        }

        while let Some(top) = ready.pop() {
            if !detached.remove(&top.child) {
                continue;
            }
            tracing::debug!(child = %top.child, parent = %top.parent, counter = top.counter, "reattached");
            if let Some(waiting) = deferred.remove(&top.child) {
                ready.extend(waiting);
            }
            if let Some(node) = self.nodes.get_mut(&top.child) {
                node.parent = Some(top.parent);
            }
        }
    }

    /// The root identifier.
    pub fn root_id(&self) -> &Id {
        return &self.root;
    }

    /// The root node.
    pub fn root(&self) -> &Node {
        return &self.nodes[&self.root];
    }

    pub fn node(&self, id: &str) -> Option<&Node> {
        return self.nodes.get(id);
    }

    pub fn contains(&self, id: &str) -> bool {
        return self.nodes.contains_key(id);
    }

    pub fn parent(&self, id: &str) -> Option<&Id> {
        return self.nodes.get(id).and_then(|node| node.parent.as_ref());
    }

    /// Children of a node, empty for unknown ids.
    pub fn children(&self, id: &str) -> &[Id] {
        return match self.nodes.get(id) {
            Some(node) => &node.children,
            None => &[],
        };
    }

    /// The raw candidate-parent map of a node.
    pub fn edges(&self, id: &str) -> Option<&FxHashMap<Id, Counter>> {
        return self.nodes.get(id).map(|node| &node.edges);
    }

    /// The largest edge of a node, which is not necessarily its parent.
    pub fn active_edge(&self, id: &str) -> Option<(&Id, Counter)> {
        return self.nodes.get(id).and_then(|node| node.largest_edge());
    }

    /// Number of node rows, including the root and detached nodes.
    pub fn len(&self) -> usize {
        return self.nodes.len();
    }

    /// Always false: the root row always exists.
    pub fn is_empty(&self) -> bool {
        return self.nodes.is_empty();
    }

    /// Nodes with no path to the root, sorted by id.
    pub fn detached(&self) -> &[Id] {
        return &self.detached;
    }

    /// Iterate every node row in no particular order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        return self.nodes.values();
    }

    /// Check whether `ancestor` is `node` or lies on its parent chain.
    ///
    /// Uses a tortoise/hare walk so it terminates on cyclic chains.
    pub fn is_ancestor(&self, ancestor: &str, node: &str) -> bool {
        if node == ancestor {
            return true;
        }
        let mut tortoise = node;
        let mut hare = node;
        loop {
            for _ in 0..2 {
                match self.parent(hare) {
                    None => return false,
                    Some(parent) if parent.as_str() == ancestor => return true,
                    Some(parent) => hare = parent.as_str(),
                }
            }
            tortoise = match self.parent(tortoise) {
                Some(parent) => parent.as_str(),
                None => return false,
            };
            if tortoise == hare {
                return false;
            }
        }
    }

    /// Check whether a node reaches the root.
    pub fn is_rooted(&self, id: &str) -> bool {
        return self.contains(id) && self.is_ancestor(&self.root, id);
    }

    /// Number of parent steps from a node to the root.
    pub fn depth(&self, id: &str) -> Option<usize> {
        if !self.is_rooted(id) {
            return None;
        }
        let mut depth = 0;
        let mut cursor = id;
        while let Some(parent) = self.parent(cursor) {
            depth += 1;
            cursor = parent.as_str();
        }
        return Some(depth);
    }

    /// Rooted nodes in depth-first preorder, children in id order.
    pub fn walk(&self) -> Vec<(usize, &Id)> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![(0, &self.root)];
        while let Some((depth, id)) = stack.pop() {
            order.push((depth, id));
            for child in self.children(id).iter().rev() {
                stack.push((depth + 1, child));
            }
        }
        return order;
    }

    /// Draw the rooted tree, one node per line.
    pub fn render(&self) -> String {
        let mut out = format!("{}\n", self.root);
        let mut stack: Vec<(&Id, String, bool)> = Vec::new();
        let children = self.children(&self.root);
        for (i, child) in children.iter().enumerate().rev() {
            stack.push((child, String::new(), i + 1 == children.len()));
        }
        while let Some((id, prefix, last)) = stack.pop() {
            let connector = if last { "└── " } else { "├── " };
            out.push_str(&prefix);
            out.push_str(connector);
            out.push_str(id);
            out.push('\n');

            let prefix = if last { format!("{}    ", prefix) } else { format!("{}│   ", prefix) };
            let children = self.children(id);
            for (i, child) in children.iter().enumerate().rev() {
                stack.push((child, prefix.clone(), i + 1 == children.len()));
            }
        }
        return out;
    }

    /// A fingerprint of the rooted shape; equal iff renderings are equal.
    pub fn digest(&self) -> Digest {
        return Digest::of_tree(&self.render());
    }
}

impl fmt::Display for Tree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        return f.write_str(&self.render());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn edge(store: &mut Store<Counter>, child: &str, parent: &str, counter: Counter) {
        store.set(child, parent, Some(counter));
    }

    fn assert_rooted(tree: &Tree) {
        for node in tree.nodes() {
            if node.edges().is_empty() || tree.detached().contains(node.id()) {
                continue;
            }
            assert!(tree.is_rooted(node.id()), "{} is not rooted", node.id());
            assert!(tree.depth(node.id()).unwrap() < tree.len());
        }
    }

    #[test]
    fn empty_store_has_only_root() {
        let tree = Tree::materialize(&Store::new("a"));
        assert_eq!(tree.len(), 1);
        assert_eq!(tree.root().id(), "root");
        assert!(tree.root().children().is_empty());
        assert_eq!(tree.render(), "root\n");
    }

    #[test]
    fn simple_tree() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "z", "x", 0);
        let tree = Tree::materialize(&store);

        assert_eq!(tree.children("root"), &[Id::from("x"), Id::from("y")]);
        assert_eq!(tree.parent("z"), Some(&Id::from("x")));
        assert_eq!(tree.depth("z"), Some(2));
        assert_eq!(tree.render(), "root\n├── x\n│   └── z\n└── y\n");
    }

    #[test]
    fn highest_counter_wins() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "z", "y", 0);
        edge(&mut store, "z", "x", 1);
        let tree = Tree::materialize(&store);
        assert_eq!(tree.parent("z"), Some(&Id::from("x")));
    }

    #[test]
    fn equal_counters_pick_larger_parent() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "z", "root", 0);
        edge(&mut store, "z", "x", 1);
        edge(&mut store, "z", "y", 1);
        let tree = Tree::materialize(&store);
        assert_eq!(tree.parent("z"), Some(&Id::from("y")));
        assert_eq!(tree.active_edge("z"), Some((&Id::from("y"), 1)));
    }

    #[test]
    fn cycle_reattaches_lower_priority_edge_under_root() {
        let mut store = Store::new("a");
        edge(&mut store, "A", "root", 0);
        edge(&mut store, "B", "A", 0);
        // Forced move of A under its own child
        edge(&mut store, "A", "B", 1);
        let tree = Tree::materialize(&store);

        assert_eq!(tree.parent("A"), Some(&Id::from("root")));
        assert_eq!(tree.parent("B"), Some(&Id::from("A")));
        assert_eq!(tree.active_edge("A"), Some((&Id::from("B"), 1)));
        assert!(tree.detached().is_empty());
        assert_rooted(&tree);
    }

    #[test]
    fn self_edge_is_a_cycle_of_one() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "x", "x", 5);
        let tree = Tree::materialize(&store);
        assert_eq!(tree.parent("x"), Some(&Id::from("root")));
        assert_rooted(&tree);
    }

    #[test]
    fn repair_prefers_highest_ready_counter() {
        let mut store = Store::new("a");
        edge(&mut store, "p", "root", 0);
        edge(&mut store, "q", "root", 0);
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "x", "p", 1);
        edge(&mut store, "y", "x", 2);
        edge(&mut store, "x", "y", 3);
        let tree = Tree::materialize(&store);

        // x's ready edges are root(0) and p(1); y's only ready edge is root(0)
        assert_eq!(tree.parent("x"), Some(&Id::from("p")));
        assert_eq!(tree.parent("y"), Some(&Id::from("x")));
        assert_rooted(&tree);
    }

    #[test]
    fn repair_ties_go_to_smaller_parent() {
        let mut store = Store::new("a");
        edge(&mut store, "p", "root", 0);
        edge(&mut store, "q", "root", 0);
        edge(&mut store, "x", "q", 1);
        edge(&mut store, "y", "p", 1);
        edge(&mut store, "y", "x", 2);
        edge(&mut store, "x", "y", 3);
        let tree = Tree::materialize(&store);

        // y -> p pops before x -> q, then x follows its deferred edge to y
        assert_eq!(tree.parent("y"), Some(&Id::from("p")));
        assert_eq!(tree.parent("x"), Some(&Id::from("y")));
        assert_rooted(&tree);
    }

    #[test]
    fn edgeless_parent_stays_outside_the_tree() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "ghost", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "y", "ghost", 1);
        let tree = Tree::materialize(&store);

        assert!(tree.contains("ghost"));
        assert_eq!(tree.parent("ghost"), None);
        assert!(!tree.is_rooted("ghost"));
        assert!(tree.children("ghost").is_empty());
        // x has no other way in, y falls back to its root edge
        assert_eq!(tree.parent("x"), None);
        assert_eq!(tree.parent("y"), Some(&Id::from("root")));
        assert_eq!(tree.detached(), &[Id::from("ghost"), Id::from("x")]);
    }

    #[test]
    fn cleared_edges_do_not_count() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        edge(&mut store, "y", "x", 1);
        store.set("y", "x", None);
        let tree = Tree::materialize(&store);
        assert_eq!(tree.parent("y"), Some(&Id::from("root")));
        assert_eq!(tree.edges("y").unwrap().len(), 1);
    }

    #[test]
    fn edges_on_root_are_ignored() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "root", "x", 9);
        let tree = Tree::materialize(&store);
        assert_eq!(tree.parent("root"), None);
        assert_eq!(tree.parent("x"), Some(&Id::from("root")));
    }

    #[test]
    fn is_ancestor_terminates_on_cycles() {
        let mut tree = Tree::new();
        for (child, parent) in [("a", "b"), ("b", "c"), ("c", "a")] {
            tree.row(&Id::from(child)).parent = Some(Id::from(parent));
        }
        assert!(!tree.is_ancestor("root", "a"));
        assert!(tree.is_ancestor("c", "a"));
        assert!(tree.is_ancestor("a", "a"));
    }

    #[test]
    fn walk_is_preorder() {
        let mut store = Store::new("a");
        edge(&mut store, "b", "root", 0);
        edge(&mut store, "a", "root", 0);
        edge(&mut store, "c", "a", 0);
        let tree = Tree::materialize(&store);
        let order: Vec<(usize, &str)> = tree.walk().into_iter().map(|(d, id)| (d, id.as_str())).collect();
        assert_eq!(order, vec![(0, "root"), (1, "a"), (2, "c"), (1, "b")]);
    }

    #[test]
    fn digest_tracks_shape() {
        let mut store = Store::new("a");
        edge(&mut store, "x", "root", 0);
        edge(&mut store, "y", "root", 0);
        let before = Tree::materialize(&store).digest();
        edge(&mut store, "y", "x", 1);
        let after = Tree::materialize(&store).digest();
        assert_ne!(before, after);
        assert_eq!(after, Tree::materialize(&store).digest());
    }
}
