//! Single-process proof-of-work ledger.
//!
//! Wallets sign transactions, the [`Blockchain`] admits them into a pending
//! pool after checking the signature, and mining packages the pool plus a
//! reward into a hash-linked [`Block`] committed by a Merkle root.

pub mod block;
pub mod canonical;
pub mod chain;
pub mod config;
pub mod constants;
pub mod error;
pub mod hash;
pub mod merkle;
pub mod pow;
pub mod shared;
pub mod transaction;
pub mod wallet;

pub use block::Block;
pub use canonical::Canonical;
pub use chain::{Blockchain, ChainViolation, ViolationKind};
pub use config::LedgerConfig;
pub use error::{LedgerError, Result};
pub use hash::{sha256_hex, Hash};
pub use merkle::{Direction, MerkleProof, MerkleTree, ProofStep};
pub use pow::{CancelToken, MiningObserver, MiningStats, NoopObserver, TracingObserver};
pub use shared::SharedLedger;
pub use transaction::Transaction;
pub use wallet::{PublicKey, Signature, Wallet};
