use canopy::crdt::Crdt;
use canopy::Replica;
use tracing_subscriber::EnvFilter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let mut alice = Replica::with_writer("alice");
    let mut bob = Replica::with_writer("bob");

    alice.create_with_id("A", "root").unwrap();
    alice.create_with_id("B", "A").unwrap();
    alice.create_with_id("C", "root").unwrap();
    bob.merge(&alice);
    println!("shared:\n{}", alice.tree());

    // Each move is legal locally; together they form a cycle.
    alice.move_node("A", "C").unwrap();
    bob.move_node("C", "B").unwrap();
    println!("alice:\n{}", alice.tree());
    println!("bob:\n{}", bob.tree());

    alice.merge(&bob);
    bob.merge(&alice);
    println!("merged:\n{}", alice.tree());
    println!("digest: {:?}", alice.tree().digest());
    assert_eq!(alice.tree().digest(), bob.tree().digest());

    alice.undo();
    println!("alice after undo:\n{}", alice.tree());
}
