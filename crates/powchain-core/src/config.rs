use crate::constants::{
    DEFAULT_DIFFICULTY, HASH_HEX_SIZE, MINING_REWARD, PROGRESS_INTERVAL, REWARD_SENDER,
};
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Static parameters of one ledger instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LedgerConfig {
    /// Leading zero hex digits required in every block hash.
    #[serde(default = "default_difficulty")]
    pub difficulty: u32,
    #[serde(default = "default_mining_reward")]
    pub mining_reward: u64,
    #[serde(default = "default_reward_sender")]
    pub reward_sender: String,
    /// Nonces between cancellation checks and progress reports.
    #[serde(default = "default_progress_interval")]
    pub progress_interval: u64,
}

fn default_difficulty() -> u32 {
    DEFAULT_DIFFICULTY
}

fn default_mining_reward() -> u64 {
    MINING_REWARD
}

fn default_reward_sender() -> String {
    REWARD_SENDER.to_string()
}

fn default_progress_interval() -> u64 {
    PROGRESS_INTERVAL
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            difficulty: default_difficulty(),
            mining_reward: default_mining_reward(),
            reward_sender: default_reward_sender(),
            progress_interval: default_progress_interval(),
        }
    }
}

impl LedgerConfig {
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            difficulty,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.difficulty as usize > HASH_HEX_SIZE {
            return Err(LedgerError::Config(format!(
                "difficulty {} exceeds hash length {HASH_HEX_SIZE}",
                self.difficulty
            )));
        }
        if self.progress_interval == 0 {
            return Err(LedgerError::Config("progress_interval must be > 0".into()));
        }
        if self.reward_sender.trim().is_empty() {
            return Err(LedgerError::Config("reward_sender must not be empty".into()));
        }
        Ok(())
    }
}
