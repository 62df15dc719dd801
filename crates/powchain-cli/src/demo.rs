use anyhow::{Context, Result};
use powchain_core::{
    Blockchain, Canonical, LedgerConfig, MerkleTree, MiningObserver, MiningStats, Wallet,
};
use std::io::Write;

/// Prints mining progress the way a console user expects to see it.
pub struct ConsoleObserver;

impl MiningObserver for ConsoleObserver {
    fn on_start(&self, index: u64, difficulty: u32) {
        print!("Mining block {index} (difficulty: {difficulty})...");
        let _ = std::io::stdout().flush();
    }

    fn on_mined(&self, stats: &MiningStats) {
        println!(
            " Mined! (nonce: {}, time: {:.2}s)",
            stats.nonce,
            stats.elapsed.as_secs_f64()
        );
    }
}

fn section(n: u32, title: &str) {
    println!("\n[{n}] {title}");
    println!("{}", "-".repeat(70));
}

fn send(ledger: &mut Blockchain, from: &Wallet, to: &Wallet, amount: u64) -> Result<()> {
    let (tx, sig) = from.transfer(to.address(), amount)?;
    if ledger.add_transaction(tx, &sig, from.public_key()) {
        println!(
            "Transaction added: {:.8}... -> {:.8}... ({amount} coins)",
            from.address(),
            to.address()
        );
    } else {
        println!("Invalid transaction signature");
    }
    Ok(())
}

fn mine(ledger: &mut Blockchain, miner: &Wallet) -> Result<()> {
    match ledger.mine_pending(miner.address())? {
        Some(block) => println!("Block {} added to chain", block.index),
        None => println!("No transactions to mine"),
    }
    Ok(())
}

fn report_validity(ledger: &Blockchain) {
    match ledger.validate_chain_report() {
        Ok(()) => println!("Blockchain is valid"),
        Err(v) => println!("Blockchain is INVALID ({v})"),
    }
}

/// Walk through the full ledger lifecycle and return the final ledger.
pub fn run(config: LedgerConfig) -> Result<Blockchain> {
    println!("{}", "=".repeat(70));
    println!("PROOF-OF-WORK LEDGER WALKTHROUGH");
    println!("{}", "=".repeat(70));

    section(1, "INITIALIZING BLOCKCHAIN");
    let mut ledger = Blockchain::with_observer(config, Box::new(ConsoleObserver))?;
    println!("Genesis block created");

    section(2, "CREATING WALLETS");
    let (alice, bob, charlie) = (Wallet::generate(), Wallet::generate(), Wallet::generate());
    println!("Alice's address:   {}", alice.address());
    println!("Bob's address:     {}", bob.address());
    println!("Charlie's address: {}", charlie.address());

    section(3, "CREATING SIGNED TRANSACTIONS");
    // nothing pending yet: mining is a no-op
    mine(&mut ledger, &alice)?;
    send(&mut ledger, &alice, &bob, 10)?;
    send(&mut ledger, &alice, &charlie, 15)?;

    section(4, "MINING BLOCKS");
    mine(&mut ledger, &bob)?;
    send(&mut ledger, &bob, &charlie, 5)?;
    mine(&mut ledger, &charlie)?;

    println!("\n{}", "=".repeat(70));
    println!("BLOCKCHAIN STATE");
    println!("{}", "=".repeat(70));
    for block in ledger.blocks() {
        println!("\n{block}");
    }

    section(5, "ACCOUNT BALANCES");
    for (name, wallet) in [("Alice", &alice), ("Bob", &bob), ("Charlie", &charlie)] {
        println!("{name}: {} coins", ledger.get_balance(wallet.address()));
    }

    section(6, "BLOCKCHAIN VALIDATION");
    report_validity(&ledger);

    section(7, "TAMPER DETECTION");
    let original = {
        let block = ledger.block_mut(1).context("block 1 missing")?;
        let tx = block.transactions.first_mut().context("block 1 is empty")?;
        let original = tx.amount;
        tx.amount = 999_999;
        original
    };
    println!("Changed block 1 transaction 0 amount: {original} -> 999999");
    report_validity(&ledger);
    if let Some(tx) = ledger
        .block_mut(1)
        .and_then(|b| b.transactions.first_mut())
    {
        tx.amount = original;
    }
    println!("Restored original value: {original}");
    report_validity(&ledger);

    section(8, "MERKLE TREE VERIFICATION");
    let block = &ledger.blocks()[1];
    let root = block.merkle_root.clone().unwrap_or_default();
    println!("Merkle Root: {root}");
    println!("Transactions in block: {}", block.transactions.len());
    let proof = block.merkle_proof(0).context("no transaction 0")?;
    let leaf = block.transactions[0].canonical_json();
    println!("\nVerifying transaction 0:");
    println!("  Proof length: {} hashes", proof.len());
    println!("  Valid: {}", MerkleTree::verify_proof(&leaf, &proof, &root));

    Ok(ledger)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn walkthrough_leaves_a_valid_three_block_chain() {
        let ledger = run(LedgerConfig::with_difficulty(1)).unwrap();
        assert_eq!(ledger.len(), 3);
        assert!(ledger.validate_chain());
        assert_eq!(ledger.blocks()[1].transactions.len(), 3);
        assert_eq!(ledger.total_rewards(), 100);
    }
}
