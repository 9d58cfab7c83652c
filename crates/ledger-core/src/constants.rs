pub const NANOSECONDS: i64 = 1;
pub const MICROSECONDS: i64 = 1_000 * NANOSECONDS;
pub const MILLISECONDS: i64 = 1_000 * MICROSECONDS;
pub const SECONDS: i64 = 1_000 * MILLISECONDS;

/// Target spacing between blocks; faster blocks raise the difficulty.
pub const MINE_RATE: i64 = 4 * SECONDS;

pub const STARTING_BALANCE: u64 = 1_000;
pub const MINING_REWARD: u64 = 50;
/// Address carried by the input of every reward transaction.
pub const MINING_REWARD_ADDRESS: &str = "*--official-mining-reward--*";

pub const GENESIS_TIMESTAMP: i64 = 1;
pub const GENESIS_LAST_HASH: &str = "genesis_last_hash";
pub const GENESIS_HASH: &str = "genesis_hash";
pub const GENESIS_DIFFICULTY: u32 = 4;
pub const GENESIS_NONCE: &str = "genesis_nonce";

/// Length of wallet addresses and transaction ids.
pub const SHORT_ID_LEN: usize = 8;
