// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Tree benchmarks: bulk creation, random local moves, and two replicas
//! trading moves and merges.

use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion};
use rand::{Rng, SeedableRng};
use rand::rngs::StdRng;

use canopy::Id;
use canopy::Replica;
use canopy::crdt::Crdt;

const CREATE_NODE_NUM: usize = 1000;
const MOVE_NODE_NUM: usize = 200;
const MOVE_TIMES: usize = 500;

fn populated(writer: &str, size: usize) -> (Replica, Vec<Id>) {
    let mut replica = Replica::with_writer(writer);
    let ids = (0..size).map(|_| replica.create("root").unwrap()).collect();
    return (replica, ids);
}

pub fn tree_create(c: &mut Criterion) {
    let mut b = c.benchmark_group(format!("tree create {} nodes", CREATE_NODE_NUM));
    b.sample_size(10);
    b.bench_function("under root", |b| {
        b.iter_batched(
            || Replica::with_writer("bench"),
            |mut replica| {
                for _ in 0..CREATE_NODE_NUM {
                    black_box(replica.create("root").unwrap());
                }
                replica
            },
            BatchSize::LargeInput,
        )
    });
    b.bench_function("as a chain", |b| {
        b.iter_batched(
            || Replica::with_writer("bench"),
            |mut replica| {
                let mut parent = Id::root();
                for _ in 0..CREATE_NODE_NUM {
                    parent = replica.create(&parent).unwrap();
                }
                replica
            },
            BatchSize::LargeInput,
        )
    });
    b.finish();
}

pub fn tree_move(c: &mut Criterion) {
    let mut b = c.benchmark_group(format!(
        "tree {} nodes move {} times",
        MOVE_NODE_NUM, MOVE_TIMES
    ));
    b.sample_size(10);
    b.bench_function("local", |b| {
        let (mut replica, ids) = populated("bench", MOVE_NODE_NUM);
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| {
            for _ in 0..MOVE_TIMES {
                let i = rng.gen_range(0..MOVE_NODE_NUM);
                let j = rng.gen_range(0..MOVE_NODE_NUM);
                let _ = replica.move_node(&ids[i], &ids[j]);
            }
        })
    });
    b.bench_function("unchecked", |b| {
        let (mut replica, ids) = populated("bench", MOVE_NODE_NUM);
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| {
            for _ in 0..MOVE_TIMES {
                let i = rng.gen_range(0..MOVE_NODE_NUM);
                let j = rng.gen_range(0..MOVE_NODE_NUM);
                let _ = replica.move_unchecked(&ids[i], &ids[j]);
            }
        })
    });
    b.finish();
}

pub fn realtime_move(c: &mut Criterion) {
    let mut b = c.benchmark_group("realtime tree move");
    b.sample_size(10);
    b.bench_function("two replicas", |b| {
        let (mut tree_a, ids) = populated("a", MOVE_NODE_NUM);
        let mut tree_b = Replica::with_writer("b");
        tree_b.merge(&tree_a);
        let mut rng = StdRng::seed_from_u64(0);
        b.iter(|| {
            for t in 0..MOVE_TIMES {
                let i = rng.gen_range(0..MOVE_NODE_NUM);
                let j = rng.gen_range(0..MOVE_NODE_NUM);
                if t % 2 == 0 {
                    let _ = tree_a.move_node(&ids[i], &ids[j]);
                    tree_b.merge(&tree_a);
                } else {
                    let _ = tree_b.move_node(&ids[i], &ids[j]);
                    tree_a.merge(&tree_b);
                }
            }
        })
    });
    b.finish();
}

pub fn undo_redo(c: &mut Criterion) {
    let mut b = c.benchmark_group("undo redo");
    b.sample_size(10);
    b.bench_function(format!("{} moves", MOVE_TIMES), |b| {
        b.iter_batched(
            || {
                let (mut replica, ids) = populated("bench", MOVE_NODE_NUM);
                let mut rng = StdRng::seed_from_u64(0);
                for _ in 0..MOVE_TIMES {
                    let i = rng.gen_range(0..MOVE_NODE_NUM);
                    let j = rng.gen_range(0..MOVE_NODE_NUM);
                    let _ = replica.move_node(&ids[i], &ids[j]);
                }
                replica
            },
            |mut replica| {
                while replica.undo() {}
                while replica.redo() {}
                replica
            },
            BatchSize::LargeInput,
        )
    });
    b.finish();
}

criterion_group!(benches, tree_create, tree_move, realtime_move, undo_redo);
criterion_main!(benches);
