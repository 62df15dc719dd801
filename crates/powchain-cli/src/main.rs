mod demo;
mod settings;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use powchain_core::{Block, Blockchain, Canonical, MerkleTree, Wallet};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser, Debug)]
#[command(name = "powchain")]
#[command(about = "Single-process proof-of-work ledger")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Args, Debug)]
struct LedgerArgs {
    /// TOML file with ledger settings
    #[arg(long)]
    config: Option<PathBuf>,
    /// Leading zero hex digits required per block hash
    #[arg(long)]
    difficulty: Option<u32>,
    /// Coins paid to the miner of each block
    #[arg(long)]
    reward: Option<u64>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the full wallet / mining / validation walkthrough
    Demo {
        #[command(flatten)]
        ledger: LedgerArgs,
        /// Write the resulting chain as JSON
        #[arg(long)]
        out: Option<PathBuf>,
    },
    /// Validate a chain previously written by `demo --out`
    Verify {
        file: PathBuf,
        #[command(flatten)]
        ledger: LedgerArgs,
    },
    /// Print and check the Merkle proof of one transaction in a chain file
    Prove {
        file: PathBuf,
        /// Block index
        #[arg(long)]
        block: usize,
        /// Transaction index within the block
        #[arg(long, default_value_t = 0)]
        tx: usize,
    },
    /// Generate a wallet and print its address
    Wallet,
}

fn read_chain(path: &Path) -> Result<Vec<Block>> {
    let text = fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))
}

fn main() -> Result<()> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.cmd {
        Command::Demo { ledger, out } => {
            let config = settings::load(ledger.config.as_deref(), ledger.difficulty, ledger.reward)?;
            let chain = demo::run(config)?;
            if let Some(path) = out {
                let json = serde_json::to_string_pretty(chain.blocks())?;
                fs::write(&path, json).with_context(|| format!("writing {}", path.display()))?;
                info!(path = %path.display(), blocks = chain.len(), "chain written");
                println!("\nChain written to {}", path.display());
            }
        }
        Command::Verify { file, ledger } => {
            let config = settings::load(ledger.config.as_deref(), ledger.difficulty, ledger.reward)?;
            let chain = Blockchain::from_blocks(config, read_chain(&file)?)?;
            match chain.validate_chain_report() {
                Ok(()) => println!("valid: {} blocks", chain.len()),
                Err(v) => bail!("invalid chain: {v}"),
            }
        }
        Command::Prove { file, block, tx } => {
            let blocks = read_chain(&file)?;
            let block = blocks
                .get(block)
                .with_context(|| format!("no block {block} in chain"))?;
            let proof = block
                .merkle_proof(tx)
                .with_context(|| format!("no transaction {tx} in block {}", block.index))?;
            let root = block.merkle_root.clone().unwrap_or_default();
            let leaf = block.transactions[tx].canonical_json();
            for step in &proof {
                println!("{:?} {}", step.direction, step.sibling);
            }
            let ok = MerkleTree::verify_proof(&leaf, &proof, &root);
            println!("root: {root}");
            println!("valid: {ok}");
            if !ok {
                bail!("proof does not reach the stored Merkle root");
            }
        }
        Command::Wallet => {
            let wallet = Wallet::generate();
            println!("address:    {}", wallet.address());
            println!("public key: {}", wallet.public_key().to_hex());
        }
    }
    Ok(())
}
