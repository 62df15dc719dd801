use anyhow::{Context, Result};
use powchain_core::LedgerConfig;
use std::fs;
use std::path::Path;

/// Ledger config from an optional TOML file, with flag overrides applied last.
pub fn load(path: Option<&Path>, difficulty: Option<u32>, reward: Option<u64>) -> Result<LedgerConfig> {
    let mut config = match path {
        Some(p) => {
            let text = fs::read_to_string(p)
                .with_context(|| format!("reading config {}", p.display()))?;
            toml::from_str(&text).with_context(|| format!("parsing config {}", p.display()))?
        }
        None => LedgerConfig::default(),
    };
    if let Some(d) = difficulty {
        config.difficulty = d;
    }
    if let Some(r) = reward {
        config.mining_reward = r;
    }
    config.validate()?;
    Ok(config)
}
