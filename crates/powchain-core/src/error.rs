use thiserror::Error;

/// Failures that indicate a caller bug or an aborted operation.
///
/// Tampering and bad signatures are not errors: they are reported as
/// `false` or as a [`crate::chain::ChainViolation`].
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LedgerError {
    #[error("invalid amount: {0} (must be positive)")]
    InvalidAmount(u64),

    #[error("invalid address: {0:?}")]
    InvalidAddress(String),

    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    #[error("mining of block {index} cancelled after {attempts} attempts")]
    MiningCancelled { index: u64, attempts: u64 },

    #[error("nonce space exhausted while mining block {index}")]
    NonceSpaceExhausted { index: u64 },

    #[error("ledger lock poisoned")]
    LockPoisoned,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, LedgerError>;
