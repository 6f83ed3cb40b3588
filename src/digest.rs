// model = "claude-opus-4-5"
// created = "2026-10-19"
// modified = "2026-10-19"
// driver = "Isaac Clayton"

//! Fingerprints for comparing replicas without shipping whole trees.
//!
//! Two replicas have converged when their renderings match byte for byte.
//! A digest is the blake3 hash of that rendering, so peers can compare 32
//! bytes instead of the tree itself.

use blake3::Hasher;

/// Type constant for tree shape digests.
pub const TYPE_TREE: u8 = 0x10;

/// A blake3 hash, 32 bytes.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Digest(pub [u8; 32]);

impl Digest {
    /// Hash a rendered tree with domain separation.
    pub fn of_tree(rendering: &str) -> Digest {
        let mut hasher = Hasher::new();
        hasher.update(&[TYPE_TREE]);
        hasher.update(&(rendering.len() as u64).to_le_bytes());
        hasher.update(rendering.as_bytes());
        return Digest(*hasher.finalize().as_bytes());
    }

    pub fn to_hex(&self) -> String {
        return self.0.iter().map(|b| format!("{:02x}", b)).collect();
    }
}

impl std::fmt::Debug for Digest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        return write!(f, "Digest({})", self.to_hex());
    }
}
