//! Binary SHA-256 Merkle tree over serialized transactions.
//!
//! Level 0 holds the hash of every leaf. Each following level holds
//! `ceil(n / 2)` entries; when a level has an odd length its last entry is
//! paired with itself. The last level holds the single root.

use crate::hash::{sha256_hex, Hash};
use serde::{Deserialize, Serialize};

/// Which side of the running hash a proof sibling sits on.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofStep {
    pub direction: Direction,
    pub sibling: Hash,
}

pub type MerkleProof = Vec<ProofStep>;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct MerkleTree {
    levels: Vec<Vec<Hash>>,
}

fn combine(left: &str, right: &str) -> Hash {
    let mut joined = String::with_capacity(left.len() + right.len());
    joined.push_str(left);
    joined.push_str(right);
    sha256_hex(joined)
}

impl MerkleTree {
    /// Build the tree. An empty input gives a tree without a root.
    pub fn build<S: AsRef<str>>(leaves: &[S]) -> Self {
        if leaves.is_empty() {
            return Self::default();
        }

        let mut level: Vec<Hash> = leaves.iter().map(|l| sha256_hex(l.as_ref())).collect();
        let mut levels = Vec::new();

        while level.len() > 1 {
            let next = level
                .chunks(2)
                .map(|pair| match pair {
                    [a, b] => combine(a, b),
                    [a] => combine(a, a),
                    _ => unreachable!("chunks(2) yields one or two items"),
                })
                .collect();
            levels.push(level);
            level = next;
        }
        levels.push(level);

        Self { levels }
    }

    pub fn root(&self) -> Option<&Hash> {
        self.levels.last().and_then(|top| top.first())
    }

    pub fn leaf_count(&self) -> usize {
        self.levels.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Number of levels including leaves and root.
    pub fn depth(&self) -> usize {
        self.levels.len()
    }

    pub fn levels(&self) -> &[Vec<Hash>] {
        &self.levels
    }

    /// Sibling path from leaf `index` up to, but excluding, the root.
    /// `None` if `index` is out of range.
    pub fn get_proof(&self, index: usize) -> Option<MerkleProof> {
        if index >= self.leaf_count() {
            return None;
        }

        let mut proof = Vec::with_capacity(self.levels.len().saturating_sub(1));
        let mut idx = index;
        for level in &self.levels[..self.levels.len() - 1] {
            let step = if idx % 2 == 0 {
                // odd tail pairs with itself
                let sibling = level.get(idx + 1).unwrap_or(&level[idx]);
                ProofStep {
                    direction: Direction::Right,
                    sibling: sibling.clone(),
                }
            } else {
                ProofStep {
                    direction: Direction::Left,
                    sibling: level[idx - 1].clone(),
                }
            };
            proof.push(step);
            idx /= 2;
        }
        Some(proof)
    }

    /// Check that `leaf` hashes up to `expected_root` along `proof`.
    /// Needs no tree, only the proof and the claimed root.
    pub fn verify_proof(leaf: &str, proof: &[ProofStep], expected_root: &str) -> bool {
        let computed = proof
            .iter()
            .fold(sha256_hex(leaf), |current, step| match step.direction {
                Direction::Left => combine(&step.sibling, &current),
                Direction::Right => combine(&current, &step.sibling),
            });
        computed == expected_root
    }
}
