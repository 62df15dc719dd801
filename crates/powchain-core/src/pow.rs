//! Proof-of-work nonce search.

use crate::block::Block;
use crate::constants::PROGRESS_INTERVAL;
use crate::error::{LedgerError, Result};
use crate::hash::{meets_difficulty, Hash};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MiningStats {
    pub index: u64,
    pub nonce: u64,
    /// Hashes computed after the initial one.
    pub attempts: u64,
    pub elapsed: Duration,
    pub hash: Hash,
}

/// Receives mining progress. All methods default to no-ops.
pub trait MiningObserver: Send + Sync {
    fn on_start(&self, _index: u64, _difficulty: u32) {}
    fn on_progress(&self, _index: u64, _attempts: u64) {}
    fn on_mined(&self, _stats: &MiningStats) {}
}

#[derive(Clone, Copy, Debug, Default)]
pub struct NoopObserver;

impl MiningObserver for NoopObserver {}

/// Forwards mining events to `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl MiningObserver for TracingObserver {
    fn on_start(&self, index: u64, difficulty: u32) {
        debug!(index, difficulty, "mining started");
    }

    fn on_progress(&self, index: u64, attempts: u64) {
        debug!(index, attempts, "mining in progress");
    }

    fn on_mined(&self, stats: &MiningStats) {
        info!(
            index = stats.index,
            nonce = stats.nonce,
            attempts = stats.attempts,
            elapsed_ms = stats.elapsed.as_millis() as u64,
            hash = %stats.hash,
            "block mined"
        );
    }
}

/// Cooperative cancellation flag, shared between the miner and its owner.
#[derive(Clone, Debug, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    pub fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

pub struct MiningControl<'a> {
    pub observer: &'a dyn MiningObserver,
    pub cancel: Option<&'a CancelToken>,
    /// Nonces between two progress reports / cancellation checks.
    pub check_interval: u64,
}

impl Default for MiningControl<'_> {
    fn default() -> Self {
        Self {
            observer: &NoopObserver,
            cancel: None,
            check_interval: PROGRESS_INTERVAL,
        }
    }
}

/// Increment `block.nonce` until its hash has `block.difficulty` leading
/// zero hex digits. Runs until success, cancellation, or nonce overflow.
pub fn search(block: &mut Block, ctl: &MiningControl<'_>) -> Result<MiningStats> {
    let started = Instant::now();
    let interval = ctl.check_interval.max(1);
    let mut attempts = 0u64;

    ctl.observer.on_start(block.index, block.difficulty);
    block.hash = block.calculate_hash();

    while !meets_difficulty(&block.hash, block.difficulty) {
        block.nonce = block
            .nonce
            .checked_add(1)
            .ok_or(LedgerError::NonceSpaceExhausted { index: block.index })?;
        block.hash = block.calculate_hash();
        attempts += 1;

        if attempts % interval == 0 {
            ctl.observer.on_progress(block.index, attempts);
            if ctl.cancel.is_some_and(CancelToken::is_cancelled) {
                return Err(LedgerError::MiningCancelled {
                    index: block.index,
                    attempts,
                });
            }
        }
    }

    let stats = MiningStats {
        index: block.index,
        nonce: block.nonce,
        attempts,
        elapsed: started.elapsed(),
        hash: block.hash.clone(),
    };
    ctl.observer.on_mined(&stats);
    Ok(stats)
}
