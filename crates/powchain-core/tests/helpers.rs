#![allow(dead_code)]

use powchain_core::{Blockchain, LedgerConfig, NoopObserver, Wallet};

pub const TEST_DIFFICULTY: u32 = 2;

pub fn test_ledger() -> Blockchain {
    Blockchain::with_observer(
        LedgerConfig::with_difficulty(TEST_DIFFICULTY),
        Box::new(NoopObserver),
    )
    .expect("ledger with genesis")
}

pub fn wallets(n: usize) -> Vec<Wallet> {
    (0..n).map(|_| Wallet::generate()).collect()
}

/// Sign and admit a transfer, asserting it was accepted.
pub fn send(ledger: &mut Blockchain, from: &Wallet, to: &Wallet, amount: u64) {
    let (tx, sig) = from.transfer(to.address(), amount).expect("valid transfer");
    assert!(
        ledger.add_transaction(tx, &sig, from.public_key()),
        "signature should verify"
    );
}
