//! AFL fuzz harness for the movable tree
//!
//! This harness tests the critical properties:
//! 1. Convergence: replicas that see the same writes build the same tree
//! 2. Rootedness: a node stays detached only if no candidate parent is rooted
//! 3. Repair termination: reconciliation never loops on merged cycles
//!
//! Model: Each user has their own replica. They create and move nodes
//! locally and periodically broadcast their state to other users.

use afl::fuzz;
use canopy::Id;
use canopy::Replica;

const NUM_USERS: usize = 3;

/// Operation types the fuzzer can generate
#[derive(Debug, Clone, Copy)]
enum FuzzOp {
    /// User creates a node under an existing one
    Create { user: u8, parent: u8 },
    /// User moves one existing node under another, skipping local cycles
    Move { user: u8, target: u8, parent: u8 },
    /// User undoes their last batch
    Undo { user: u8 },
    /// User A receives broadcast from user B (merges B into A)
    Broadcast { from: u8, to: u8 },
    /// All users sync (full mesh broadcast)
    FullSync,
}

impl FuzzOp {
    fn from_bytes(bytes: &[u8]) -> Option<(FuzzOp, &[u8])> {
        if bytes.is_empty() {
            return None;
        }

        let op_type = bytes[0] % 5;
        let rest = &bytes[1..];

        match op_type {
            0 if rest.len() >= 2 => {
                let op = FuzzOp::Create {
                    user: rest[0] % NUM_USERS as u8,
                    parent: rest[1],
                };
                Some((op, &rest[2..]))
            }
            1 if rest.len() >= 3 => {
                let op = FuzzOp::Move {
                    user: rest[0] % NUM_USERS as u8,
                    target: rest[1],
                    parent: rest[2],
                };
                Some((op, &rest[3..]))
            }
            2 if !rest.is_empty() => {
                let op = FuzzOp::Undo {
                    user: rest[0] % NUM_USERS as u8,
                };
                Some((op, &rest[1..]))
            }
            3 if rest.len() >= 2 => {
                let op = FuzzOp::Broadcast {
                    from: rest[0] % NUM_USERS as u8,
                    to: rest[1] % NUM_USERS as u8,
                };
                Some((op, &rest[2..]))
            }
            4 => Some((FuzzOp::FullSync, rest)),
            _ => None,
        }
    }
}

/// Rooted node ids of a replica, in preorder.
fn rooted(replica: &Replica) -> Vec<Id> {
    return replica.tree().walk().into_iter().map(|(_, id)| id.clone()).collect();
}

fn full_sync(replicas: &mut [Replica]) {
    for i in 0..replicas.len() {
        for j in 0..replicas.len() {
            if i != j {
                let writes = replicas[j].writes();
                replicas[i].apply_all(writes, canopy::store::Origin::Remote);
            }
        }
    }
}

fn check(replicas: &[Replica]) {
    let first = replicas[0].tree().render();
    for (i, r) in replicas.iter().enumerate().skip(1) {
        assert_eq!(
            r.tree().render(), first,
            "Convergence failure! User {} != User 0 after full sync",
            i
        );
    }
    for r in replicas {
        let tree = r.tree();
        for node in tree.nodes() {
            if !tree.detached().contains(node.id()) {
                assert!(tree.is_rooted(node.id()), "{} lost its way to the root", node.id());
                continue;
            }
            // Only nodes with nothing rooted to hang from may stay detached
            for parent in node.edges().keys() {
                assert!(!tree.is_rooted(parent), "{} was not reattached under {}", node.id(), parent);
            }
        }
    }
}

fn main() {
    fuzz!(|data: &[u8]| {
        let mut replicas: Vec<Replica> = (0..NUM_USERS)
            .map(|i| Replica::with_writer(format!("user{}", i)))
            .collect();
        let mut remaining = data;

        while let Some((op, rest)) = FuzzOp::from_bytes(remaining) {
            remaining = rest;

            match op {
                FuzzOp::Create { user, parent } => {
                    let r = &mut replicas[user as usize];
                    let nodes = rooted(r);
                    let parent = &nodes[parent as usize % nodes.len()];
                    r.create(parent).unwrap();
                }

                FuzzOp::Move { user, target, parent } => {
                    let r = &mut replicas[user as usize];
                    let nodes = rooted(r);
                    let target = &nodes[target as usize % nodes.len()];
                    let parent = &nodes[parent as usize % nodes.len()];
                    // Root and local cycles are rejected; that is fine here
                    let _ = r.move_node(target, parent);
                }

                FuzzOp::Undo { user } => {
                    replicas[user as usize].undo();
                }

                FuzzOp::Broadcast { from, to } => {
                    if from != to {
                        let source = replicas[from as usize].writes();
                        replicas[to as usize].apply_all(source, canopy::store::Origin::Remote);
                    }
                }

                FuzzOp::FullSync => {
                    full_sync(&mut replicas);
                    check(&replicas);
                }
            }
        }

        full_sync(&mut replicas);
        check(&replicas);

        // Merging again changes nothing
        let before = replicas[0].tree().render();
        let again = replicas[1].writes();
        replicas[0].apply_all(again, canopy::store::Origin::Remote);
        assert_eq!(replicas[0].tree().render(), before, "Merge is not idempotent");
    });
}
