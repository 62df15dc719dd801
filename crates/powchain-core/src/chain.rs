use crate::block::Block;
use crate::config::LedgerConfig;
use crate::error::Result;
use crate::pow::{CancelToken, MiningControl, MiningObserver, TracingObserver};
use crate::transaction::Transaction;
use crate::wallet::{validate_address, PublicKey, Signature};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ViolationKind {
    /// Stored hash differs from the recomputed one.
    HashMismatch,
    /// `previous_hash` differs from the prior block's hash.
    BrokenLink,
    /// Hash lacks the required leading zero digits.
    InsufficientWork,
    /// Block index differs from its chain position.
    IndexMismatch,
    /// Chain is empty or does not start with a genesis block.
    MissingGenesis,
}

/// First rule broken by a chain, and where.
#[derive(Clone, Copy, Debug, Error, PartialEq, Eq)]
#[error("block {index}: {kind:?}")]
pub struct ChainViolation {
    pub index: usize,
    pub kind: ViolationKind,
}

/// Single-writer proof-of-work ledger: an append-only block list plus a
/// pool of admitted transactions awaiting the next block.
pub struct Blockchain {
    chain: Vec<Block>,
    pending: Vec<Transaction>,
    config: LedgerConfig,
    observer: Box<dyn MiningObserver>,
}

impl Blockchain {
    /// New ledger with a mined genesis block, reporting through `tracing`.
    pub fn new(config: LedgerConfig) -> Result<Self> {
        Self::with_observer(config, Box::new(TracingObserver))
    }

    pub fn with_observer(config: LedgerConfig, observer: Box<dyn MiningObserver>) -> Result<Self> {
        config.validate()?;
        let mut ledger = Self {
            chain: Vec::new(),
            pending: Vec::new(),
            config,
            observer,
        };
        ledger.create_genesis()?;
        Ok(ledger)
    }

    /// Wrap blocks produced elsewhere, e.g. a deserialized dump. The result
    /// is not validated; call [`Blockchain::validate_chain`].
    pub fn from_blocks(config: LedgerConfig, blocks: Vec<Block>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            chain: blocks,
            pending: Vec::new(),
            config,
            observer: Box::new(TracingObserver),
        })
    }

    fn create_genesis(&mut self) -> Result<()> {
        let mut genesis = Block::genesis(self.config.difficulty);
        genesis.mine_with(&self.control(None))?;
        info!(hash = %genesis.hash, "genesis block created");
        self.chain.push(genesis);
        Ok(())
    }

    fn control<'a>(&'a self, cancel: Option<&'a CancelToken>) -> MiningControl<'a> {
        MiningControl {
            observer: self.observer.as_ref(),
            cancel,
            check_interval: self.config.progress_interval,
        }
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }

    pub fn mining_reward(&self) -> u64 {
        self.config.mining_reward
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    /// Mutable access to a confirmed block. Any edit is caught by
    /// [`Blockchain::validate_chain`]; meant for tamper simulation.
    pub fn block_mut(&mut self, index: usize) -> Option<&mut Block> {
        self.chain.get_mut(index)
    }

    pub fn pending(&self) -> &[Transaction] {
        &self.pending
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    pub fn latest_block(&self) -> Option<&Block> {
        self.chain.last()
    }

    /// Admit `tx` into the pending pool if `signature` verifies under
    /// `public_key`. No balance or duplicate checks are made.
    pub fn add_transaction(
        &mut self,
        mut tx: Transaction,
        signature: &Signature,
        public_key: &PublicKey,
    ) -> bool {
        if !public_key.verify(&tx, signature) {
            warn!(from = %tx.from, to = %tx.to, amount = tx.amount, "rejected transaction: bad signature");
            return false;
        }
        tx.signature = Some(signature.0.clone());
        info!(from = %tx.from, to = %tx.to, amount = tx.amount, "transaction admitted");
        self.pending.push(tx);
        true
    }

    /// Mine the pool plus a reward for `miner` into a new block.
    ///
    /// `Ok(None)` when the pool is empty. The pool is drained only once the
    /// block is appended.
    pub fn mine_pending(&mut self, miner: &str) -> Result<Option<&Block>> {
        self.mine_pending_inner(miner, None)
    }

    /// As [`Blockchain::mine_pending`], giving up when `cancel` fires. A
    /// cancelled run leaves chain and pool as they were.
    pub fn mine_pending_with(&mut self, miner: &str, cancel: &CancelToken) -> Result<Option<&Block>> {
        self.mine_pending_inner(miner, Some(cancel))
    }

    fn mine_pending_inner(
        &mut self,
        miner: &str,
        cancel: Option<&CancelToken>,
    ) -> Result<Option<&Block>> {
        validate_address(miner)?;
        let Some(tip) = self.chain.last() else {
            return Ok(None);
        };
        if self.pending.is_empty() {
            info!("no pending transactions to mine");
            return Ok(None);
        }

        let reward = Transaction {
            from: self.config.reward_sender.clone(),
            ..Transaction::reward(miner, self.config.mining_reward)
        };

        let mut transactions = self.pending.clone();
        transactions.push(reward);

        let mut block = Block::new(
            self.chain.len() as u64,
            transactions,
            tip.hash.clone(),
            self.config.difficulty,
        );
        block.mine_with(&self.control(cancel))?;

        info!(index = block.index, txs = block.transactions.len(), "block appended");
        self.chain.push(block);
        self.pending.clear();
        Ok(self.chain.last())
    }

    /// True if the chain opens with an intact genesis block and every later
    /// block has a correct hash, links to its predecessor and meets the
    /// difficulty.
    pub fn validate_chain(&self) -> bool {
        self.validate_chain_report().is_ok()
    }

    /// As [`Blockchain::validate_chain`], naming the first violation.
    pub fn validate_chain_report(&self) -> std::result::Result<(), ChainViolation> {
        let genesis_kind = match self.chain.first() {
            Some(g) if !g.is_genesis() => Some(ViolationKind::MissingGenesis),
            Some(g) if !g.has_valid_hash() => Some(ViolationKind::HashMismatch),
            Some(_) => None,
            None => Some(ViolationKind::MissingGenesis),
        };
        if let Some(kind) = genesis_kind {
            let violation = ChainViolation { index: 0, kind };
            warn!(%violation, "chain validation failed");
            return Err(violation);
        }

        for (i, pair) in self.chain.windows(2).enumerate() {
            let (prev, block) = (&pair[0], &pair[1]);
            let index = i + 1;
            let kind = if block.index != index as u64 {
                Some(ViolationKind::IndexMismatch)
            } else if !block.has_valid_hash() {
                Some(ViolationKind::HashMismatch)
            } else if block.previous_hash != prev.hash {
                Some(ViolationKind::BrokenLink)
            } else if !block.meets_difficulty(self.config.difficulty) {
                Some(ViolationKind::InsufficientWork)
            } else {
                None
            };
            if let Some(kind) = kind {
                let violation = ChainViolation { index, kind };
                warn!(%violation, "chain validation failed");
                return Err(violation);
            }
        }
        Ok(())
    }

    /// Net amount received by `address`, replayed over the whole chain.
    pub fn get_balance(&self, address: &str) -> i128 {
        self.transactions()
            .map(|tx| {
                let mut delta = 0i128;
                if tx.to == address {
                    delta += i128::from(tx.amount);
                }
                if tx.from == address {
                    delta -= i128::from(tx.amount);
                }
                delta
            })
            .sum()
    }

    /// Balance of every address that appears in a confirmed transaction.
    pub fn balances(&self) -> BTreeMap<String, i128> {
        let mut out = BTreeMap::new();
        for tx in self.transactions() {
            *out.entry(tx.to.clone()).or_insert(0) += i128::from(tx.amount);
            *out.entry(tx.from.clone()).or_insert(0) -= i128::from(tx.amount);
        }
        out
    }

    /// Sum of all reward payouts confirmed so far.
    pub fn total_rewards(&self) -> u64 {
        self.transactions()
            .filter(|tx| tx.from == self.config.reward_sender)
            .map(|tx| tx.amount)
            .sum()
    }

    fn transactions(&self) -> impl Iterator<Item = &Transaction> {
        self.chain.iter().flat_map(|b| b.transactions.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::GENESIS_PREVIOUS_HASH;
    use crate::error::LedgerError;
    use crate::hash::count_leading_zero_digits;
    use crate::wallet::Wallet;

    fn ledger() -> Blockchain {
        Blockchain::new(LedgerConfig::with_difficulty(1)).unwrap()
    }

    #[test]
    fn genesis_only_chain_is_valid() {
        let bc = ledger();
        assert_eq!(bc.len(), 1);
        let g = &bc.blocks()[0];
        assert_eq!(g.index, 0);
        assert_eq!(g.previous_hash, GENESIS_PREVIOUS_HASH);
        assert_eq!(g.transactions.len(), 1);
        assert!(g.meets_difficulty(1));
        assert!(bc.validate_chain());
    }

    #[test]
    fn add_transaction_accepts_valid_signature() {
        let mut bc = ledger();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 10).unwrap();
        assert!(bc.add_transaction(tx, &sig, alice.public_key()));
        assert_eq!(bc.pending().len(), 1);
        assert_eq!(bc.pending()[0].signature.as_deref(), Some(sig.as_str()));
    }

    #[test]
    fn add_transaction_rejects_bad_signature_and_leaves_pool() {
        let mut bc = ledger();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 10).unwrap();
        assert!(!bc.add_transaction(tx.clone(), &sig, bob.public_key()));
        assert!(!bc.add_transaction(tx, &Signature("00".into()), alice.public_key()));
        assert!(bc.pending().is_empty());
    }

    #[test]
    fn mining_empty_pool_is_a_noop() {
        let mut bc = ledger();
        let miner = Wallet::generate();
        assert!(bc.mine_pending(miner.address()).unwrap().is_none());
        assert_eq!(bc.len(), 1);
    }

    #[test]
    fn mining_with_malformed_miner_address_fails_fast() {
        let mut bc = ledger();
        let err = bc.mine_pending("miner-bob").unwrap_err();
        assert!(matches!(err, LedgerError::InvalidAddress(_)));
    }

    #[test]
    fn mine_pending_appends_block_with_reward_and_clears_pool() {
        let mut bc = ledger();
        let (alice, bob, miner) = (Wallet::generate(), Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 10).unwrap();
        assert!(bc.add_transaction(tx, &sig, alice.public_key()));

        let genesis_hash = bc.blocks()[0].hash.clone();
        let block = bc.mine_pending(miner.address()).unwrap().unwrap().clone();

        assert_eq!(block.index, 1);
        assert_eq!(block.previous_hash, genesis_hash);
        assert_eq!(block.transactions.len(), 2);
        let reward = block.transactions.last().unwrap();
        assert!(reward.is_reward());
        assert_eq!(reward.to, miner.address());
        assert_eq!(reward.amount, 50);
        assert!(bc.pending().is_empty());
        assert!(bc.validate_chain());
    }

    #[test]
    fn cancelled_mining_changes_nothing() {
        let mut config = LedgerConfig::with_difficulty(1);
        config.progress_interval = 1;
        let mut bc = Blockchain::new(config).unwrap();
        bc.config.difficulty = 64;

        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 3).unwrap();
        bc.add_transaction(tx, &sig, alice.public_key());

        let token = CancelToken::new();
        token.cancel();
        let err = bc.mine_pending_with(bob.address(), &token).unwrap_err();
        assert!(matches!(err, LedgerError::MiningCancelled { index: 1, .. }));
        assert_eq!(bc.len(), 1);
        assert_eq!(bc.pending().len(), 1);
    }

    #[test]
    fn report_names_violation_kind_and_index() {
        let mut bc = ledger();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        for amount in [1, 2] {
            let (tx, sig) = alice.transfer(bob.address(), amount).unwrap();
            bc.add_transaction(tx, &sig, alice.public_key());
            bc.mine_pending(bob.address()).unwrap();
        }
        assert_eq!(bc.validate_chain_report(), Ok(()));

        bc.block_mut(2).unwrap().previous_hash = "f".repeat(64);
        let v = bc.validate_chain_report().unwrap_err();
        assert_eq!(v.index, 2);
        assert_eq!(v.kind, ViolationKind::HashMismatch);

        // re-sealing the edited block moves the failure to the link check
        let block = bc.block_mut(2).unwrap();
        block.mine().unwrap();
        let v = bc.validate_chain_report().unwrap_err();
        assert_eq!(v.kind, ViolationKind::BrokenLink);
    }

    #[test]
    fn index_mismatch_is_reported() {
        let mut bc = ledger();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 1).unwrap();
        bc.add_transaction(tx, &sig, alice.public_key());
        bc.mine_pending(bob.address()).unwrap();
        bc.block_mut(1).unwrap().index = 5;
        assert_eq!(
            bc.validate_chain_report().unwrap_err().kind,
            ViolationKind::IndexMismatch
        );
    }

    #[test]
    fn insufficient_work_is_reported() {
        let mut bc = Blockchain::new(LedgerConfig::with_difficulty(0)).unwrap();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 1).unwrap();
        bc.add_transaction(tx, &sig, alice.public_key());
        bc.mine_pending(bob.address()).unwrap();

        let zeros = count_leading_zero_digits(&bc.blocks()[1].hash) as u32;
        bc.config.difficulty = zeros + 1;
        assert_eq!(
            bc.validate_chain_report().unwrap_err(),
            ChainViolation {
                index: 1,
                kind: ViolationKind::InsufficientWork
            }
        );
    }

    #[test]
    fn balances_replay_the_chain() {
        let mut bc = ledger();
        let (alice, bob, miner) = (Wallet::generate(), Wallet::generate(), Wallet::generate());
        bc.mine_pending(alice.address()).unwrap();
        assert_eq!(bc.get_balance(alice.address()), 0);

        let (tx, sig) = alice.transfer(bob.address(), 10).unwrap();
        bc.add_transaction(tx, &sig, alice.public_key());
        bc.mine_pending(miner.address()).unwrap();

        assert_eq!(bc.get_balance(alice.address()), -10);
        assert_eq!(bc.get_balance(bob.address()), 10);
        assert_eq!(bc.get_balance(miner.address()), 50);
        assert_eq!(bc.get_balance("network"), -50);
        assert_eq!(bc.total_rewards(), 50);
        assert_eq!(bc.balances().get(bob.address()), Some(&10));
    }

    #[test]
    fn from_blocks_keeps_chain_for_validation() {
        let mut bc = ledger();
        let (alice, bob) = (Wallet::generate(), Wallet::generate());
        let (tx, sig) = alice.transfer(bob.address(), 4).unwrap();
        bc.add_transaction(tx, &sig, alice.public_key());
        bc.mine_pending(bob.address()).unwrap();

        let copy = Blockchain::from_blocks(bc.config().clone(), bc.blocks().to_vec()).unwrap();
        assert_eq!(copy.len(), 2);
        assert!(copy.validate_chain());
        assert_eq!(copy.get_balance(bob.address()), 54);
    }

    #[test]
    fn empty_chain_is_missing_genesis() {
        let bc = Blockchain::from_blocks(LedgerConfig::with_difficulty(1), vec![]).unwrap();
        assert!(!bc.validate_chain());
        assert_eq!(
            bc.validate_chain_report().unwrap_err(),
            ChainViolation {
                index: 0,
                kind: ViolationKind::MissingGenesis
            }
        );
    }

    #[test]
    fn chain_must_open_with_genesis_block() {
        let miner = Wallet::generate();
        let mut forged = Block::new(
            7,
            vec![Transaction::reward(miner.address(), 1_000_000)],
            "f".repeat(64),
            1,
        );
        forged.mine().unwrap();
        assert!(forged.has_valid_hash());

        let bc = Blockchain::from_blocks(LedgerConfig::with_difficulty(1), vec![forged]).unwrap();
        assert!(!bc.validate_chain());
        assert_eq!(
            bc.validate_chain_report().unwrap_err().kind,
            ViolationKind::MissingGenesis
        );
    }

    #[test]
    fn edited_genesis_is_reported() {
        let mut bc = ledger();
        bc.block_mut(0).unwrap().transactions[0].amount += 1;
        assert_eq!(
            bc.validate_chain_report().unwrap_err(),
            ChainViolation {
                index: 0,
                kind: ViolationKind::HashMismatch
            }
        );
    }
}
