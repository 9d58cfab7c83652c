pub(crate) const DEFAULT_LISTEN: &str = "127.0.0.1:5000";
pub(crate) const MAX_RANGE: usize = 250;
pub(crate) const SEED_BLOCKS: usize = 10;
pub(crate) const SEED_TXS_PER_BLOCK: usize = 2;
pub(crate) const SEED_PENDING: usize = 3;
pub(crate) const RELAY_BLOCK_PATH: &str = "/relay/block";
pub(crate) const RELAY_TRANSACTION_PATH: &str = "/relay/transaction";
