//! Proof-of-work account ledger: blocks, mining, validation, balance replay,
//! wallets, transactions, the pending pool and the longest-valid-chain rule.

pub mod block;
pub mod chain;
pub mod constants;
pub mod error;
pub mod hash;
pub mod ledger;
pub mod mine;
pub mod node;
pub mod pool;
pub mod pow;
pub mod relay;
pub mod transaction;
pub mod wallet;

pub use block::{validate_block, Block, Nonce};
pub use chain::{
    validate_chain, validate_pending_transaction, validate_transaction_chain, Blockchain,
};
pub use error::{NodeError, ReplicationError, TransactionError, ValidationError};
pub use mine::{mine_block, mine_block_until};
pub use node::{Node, WalletInfo};
pub use pool::TransactionPool;
pub use relay::{Channel, MessageHandler, Publisher};
pub use transaction::{Input, Output, RewardInput, Transaction, TransferInput};
pub use wallet::{Signature, Wallet};

use std::time::{SystemTime, UNIX_EPOCH};

/// Current time in nanoseconds since the unix epoch.
pub(crate) fn now_nanos() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as i64)
        .unwrap_or_default()
}

/// Fresh random token of [`constants::SHORT_ID_LEN`] hex characters.
pub(crate) fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(constants::SHORT_ID_LEN);
    id
}
