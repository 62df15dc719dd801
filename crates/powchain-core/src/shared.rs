//! Thread-safe handle over a [`Blockchain`].
//!
//! Mining holds the ledger lock from pool snapshot to append, so two mining
//! runs can never extend the same tip and admission waits for the running
//! search to finish.

use crate::block::Block;
use crate::chain::Blockchain;
use crate::error::{LedgerError, Result};
use crate::pow::CancelToken;
use crate::transaction::Transaction;
use crate::wallet::{PublicKey, Signature};
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Clone)]
pub struct SharedLedger {
    inner: Arc<Mutex<Blockchain>>,
}

impl SharedLedger {
    pub fn new(ledger: Blockchain) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Blockchain>> {
        self.inner.lock().map_err(|_| LedgerError::LockPoisoned)
    }

    pub fn add_transaction(
        &self,
        tx: Transaction,
        signature: &Signature,
        public_key: &PublicKey,
    ) -> Result<bool> {
        Ok(self.lock()?.add_transaction(tx, signature, public_key))
    }

    /// Mine under the lock and return a copy of the appended block.
    pub fn mine_pending(&self, miner: &str) -> Result<Option<Block>> {
        Ok(self.lock()?.mine_pending(miner)?.cloned())
    }

    pub fn mine_pending_with(&self, miner: &str, cancel: &CancelToken) -> Result<Option<Block>> {
        Ok(self.lock()?.mine_pending_with(miner, cancel)?.cloned())
    }

    pub fn validate_chain(&self) -> Result<bool> {
        Ok(self.lock()?.validate_chain())
    }

    pub fn get_balance(&self, address: &str) -> Result<i128> {
        Ok(self.lock()?.get_balance(address))
    }

    pub fn len(&self) -> Result<usize> {
        Ok(self.lock()?.len())
    }

    pub fn pending_len(&self) -> Result<usize> {
        Ok(self.lock()?.pending().len())
    }

    /// Run `f` with exclusive access to the ledger.
    pub fn with<R>(&self, f: impl FnOnce(&mut Blockchain) -> R) -> Result<R> {
        Ok(f(&mut *self.lock()?))
    }
}
