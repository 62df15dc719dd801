pub const HASH_SIZE: usize = 32;
pub const HASH_HEX_SIZE: usize = HASH_SIZE * 2;
pub const ADDRESS_HEX_SIZE: usize = 40;

pub const DEFAULT_DIFFICULTY: u32 = 4;
pub const MINING_REWARD: u64 = 50;
/// Nonces tried between two cancellation checks / progress reports.
pub const PROGRESS_INTERVAL: u64 = 10_000;

pub const REWARD_SENDER: &str = "network";
pub const REWARD_SIGNATURE: &str = "mining_reward";

pub const GENESIS_PREVIOUS_HASH: &str = "0";
pub const GENESIS_SENDER: &str = "genesis";
pub const GENESIS_RECIPIENT: &str = "network";
