use crate::canonical::{Canonical, CanonicalObject};
use crate::constants::GENESIS_PREVIOUS_HASH;
use crate::error::Result;
use crate::hash::{meets_difficulty, sha256_hex, Hash};
use crate::merkle::{MerkleProof, MerkleTree};
use crate::pow::{self, MiningControl, MiningStats};
use crate::transaction::{now_timestamp, Transaction};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: f64,
    pub transactions: Vec<Transaction>,
    pub previous_hash: Hash,
    /// `None` only for a block without transactions.
    pub merkle_root: Option<Hash>,
    pub nonce: u64,
    pub hash: Hash,
    pub difficulty: u32,
}

impl Block {
    /// Stamp, commit the transactions to a Merkle root and hash with nonce 0.
    /// The block is not mined yet.
    pub fn new(
        index: u64,
        transactions: Vec<Transaction>,
        previous_hash: impl Into<Hash>,
        difficulty: u32,
    ) -> Self {
        let merkle_root = Self::merkle_tree_of(&transactions).root().cloned();
        let mut block = Self {
            index,
            timestamp: now_timestamp(),
            transactions,
            previous_hash: previous_hash.into(),
            merkle_root,
            nonce: 0,
            hash: Hash::new(),
            difficulty,
        };
        block.hash = block.calculate_hash();
        block
    }

    /// Unmined genesis block with a single seed transaction.
    pub fn genesis(difficulty: u32) -> Self {
        Self::new(
            0,
            vec![Transaction::genesis_seed()],
            GENESIS_PREVIOUS_HASH,
            difficulty,
        )
    }

    fn merkle_tree_of(transactions: &[Transaction]) -> MerkleTree {
        let leaves: Vec<String> = transactions.iter().map(|tx| tx.canonical_json()).collect();
        MerkleTree::build(&leaves)
    }

    /// SHA-256 over the canonical encoding of the hashed fields.
    /// `hash` and `difficulty` are not part of the input.
    pub fn calculate_hash(&self) -> Hash {
        sha256_hex(self.canonical_json())
    }

    /// Run proof-of-work to completion with no observer.
    pub fn mine(&mut self) -> Result<MiningStats> {
        self.mine_with(&MiningControl::default())
    }

    pub fn mine_with(&mut self, ctl: &MiningControl<'_>) -> Result<MiningStats> {
        pow::search(self, ctl)
    }

    /// Stored hash matches recomputation.
    pub fn has_valid_hash(&self) -> bool {
        self.hash == self.calculate_hash()
    }

    pub fn meets_difficulty(&self, difficulty: u32) -> bool {
        meets_difficulty(&self.hash, difficulty)
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 0 && self.previous_hash == GENESIS_PREVIOUS_HASH
    }

    /// Tree over the block's current transactions.
    pub fn merkle_tree(&self) -> MerkleTree {
        Self::merkle_tree_of(&self.transactions)
    }

    /// Membership proof for transaction `i`, `None` if out of range.
    pub fn merkle_proof(&self, i: usize) -> Option<MerkleProof> {
        self.merkle_tree().get_proof(i)
    }

    /// Check transaction `i` against the stored Merkle root.
    pub fn verify_transaction(&self, i: usize) -> bool {
        let (Some(tx), Some(root)) = (self.transactions.get(i), self.merkle_root.as_deref()) else {
            return false;
        };
        self.merkle_proof(i)
            .is_some_and(|proof| MerkleTree::verify_proof(&tx.canonical_json(), &proof, root))
    }
}

impl Canonical for Block {
    fn canonical_json(&self) -> String {
        CanonicalObject::new()
            .uint("index", self.index)
            .float("timestamp", self.timestamp)
            .array("transactions", &self.transactions)
            .string("previous_hash", &self.previous_hash)
            .optional_string("merkle_root", self.merkle_root.as_deref())
            .uint("nonce", self.nonce)
            .finish()
    }
}

/// `%Y-%m-%d %H:%M:%S` in UTC, or the raw seconds if out of range.
fn format_timestamp(timestamp: f64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp.trunc() as i64, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| format!("{timestamp:.3}"))
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Block #{}", self.index)?;
        writeln!(f, "  Timestamp:    {}", format_timestamp(self.timestamp))?;
        writeln!(f, "  Hash:         {}", self.hash)?;
        writeln!(f, "  Previous:     {}", self.previous_hash)?;
        writeln!(
            f,
            "  Merkle Root:  {}",
            self.merkle_root.as_deref().unwrap_or("-")
        )?;
        writeln!(f, "  Nonce:        {}", self.nonce)?;
        write!(f, "  Transactions: {}", self.transactions.len())?;
        for (i, tx) in self.transactions.iter().enumerate() {
            write!(
                f,
                "\n    {}. {:.8}... -> {:.8}... : {} coins",
                i + 1,
                tx.from,
                tx.to,
                tx.amount
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::HASH_HEX_SIZE;

    fn txs() -> Vec<Transaction> {
        vec![
            Transaction {
                from: "a".repeat(40),
                to: "b".repeat(40),
                amount: 10,
                timestamp: 1_600_000_000.0,
                signature: Some("sig-1".into()),
            },
            Transaction {
                from: "a".repeat(40),
                to: "c".repeat(40),
                amount: 15,
                timestamp: 1_600_000_100.0,
                signature: Some("sig-2".into()),
            },
            Transaction::reward("d".repeat(40), 50),
        ]
    }

    #[test]
    fn new_block_has_root_and_initial_hash() {
        let b = Block::new(1, txs(), "f".repeat(64), 2);
        assert_eq!(b.nonce, 0);
        assert_eq!(b.hash.len(), HASH_HEX_SIZE);
        assert!(b.has_valid_hash());
        assert_eq!(b.merkle_root.as_ref(), b.merkle_tree().root());
        assert!(b.timestamp > 0.0);
    }

    #[test]
    fn empty_block_has_no_merkle_root() {
        let b = Block::new(3, vec![], "f".repeat(64), 1);
        assert_eq!(b.merkle_root, None);
        assert!(b.canonical_json().contains(r#""merkle_root":null"#));
        assert!(!b.verify_transaction(0));
    }

    #[test]
    fn hash_is_deterministic() {
        let b = Block::new(1, txs(), "f".repeat(64), 2);
        assert_eq!(b.calculate_hash(), b.calculate_hash());
        assert_eq!(b.clone().calculate_hash(), b.hash);
    }

    #[test]
    fn hash_ignores_difficulty_and_stored_hash() {
        let mut b = Block::new(1, txs(), "f".repeat(64), 2);
        let h = b.calculate_hash();
        b.difficulty = 9;
        b.hash = "junk".into();
        assert_eq!(b.calculate_hash(), h);
    }

    #[test]
    fn canonical_field_order_is_sorted() {
        let b = Block::new(1, vec![], "p", 1);
        let json = b.canonical_json();
        let keys = ["index", "merkle_root", "nonce", "previous_hash", "timestamp", "transactions"];
        let positions: Vec<usize> = keys.iter().map(|k| json.find(k).unwrap()).collect();
        assert!(positions.windows(2).all(|w| w[0] < w[1]), "{json}");
    }

    #[test]
    fn hash_changes_with_nonce_and_transactions() {
        let mut b = Block::new(1, txs(), "f".repeat(64), 2);
        let h0 = b.calculate_hash();
        b.nonce += 1;
        assert_ne!(b.calculate_hash(), h0);
        b.nonce -= 1;
        b.transactions[0].amount = 999_999;
        assert_ne!(b.calculate_hash(), h0);
    }

    #[test]
    fn mine_meets_difficulty() {
        let mut b = Block::new(1, txs(), "f".repeat(64), 2);
        let stats = b.mine().unwrap();
        assert!(b.meets_difficulty(2));
        assert!(b.hash.starts_with("00"));
        assert!(b.has_valid_hash());
        assert_eq!(stats.nonce, b.nonce);
    }

    #[test]
    fn genesis_shape() {
        let g = Block::genesis(1);
        assert!(g.is_genesis());
        assert_eq!(g.previous_hash, "0");
        assert_eq!(g.transactions.len(), 1);
        assert_eq!(g.transactions[0].amount, 0);
    }

    #[test]
    fn every_transaction_has_a_verifiable_proof() {
        let b = Block::new(1, txs(), "f".repeat(64), 1);
        for i in 0..b.transactions.len() {
            assert!(b.verify_transaction(i));
        }
        assert!(!b.verify_transaction(3));
        assert!(b.merkle_proof(3).is_none());
    }

    #[test]
    fn tampered_transaction_fails_membership_check() {
        let mut b = Block::new(1, txs(), "f".repeat(64), 1);
        b.transactions[1].amount += 1;
        assert!(!b.verify_transaction(1));
    }

    #[test]
    fn serde_roundtrip_keeps_hash_valid() {
        let mut b = Block::new(1, txs(), "f".repeat(64), 1);
        b.mine().unwrap();
        let json = serde_json::to_string(&b).unwrap();
        let back: Block = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
        assert!(back.has_valid_hash());
    }

    #[test]
    fn display_lists_transactions() {
        let b = Block::new(7, txs(), "f".repeat(64), 1);
        let shown = b.to_string();
        assert!(shown.starts_with("Block #7"));
        assert!(shown.contains("aaaaaaaa... -> bbbbbbbb... : 10 coins"));
        assert!(shown.contains("Transactions: 3"));
    }

    #[test]
    fn display_formats_timestamp_as_date() {
        let mut b = Block::new(2, txs(), "f".repeat(64), 1);
        b.timestamp = 1_600_000_000.75;
        assert!(b.to_string().contains("Timestamp:    2020-09-13 12:26:40"));
    }
}
