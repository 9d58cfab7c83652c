use thiserror::Error;

/// A rule that a block, chain or transaction under test failed. The object is
/// rejected as a whole; nothing is corrected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("block last_hash {found} does not reference predecessor hash {expected}")]
    Linkage { expected: String, found: String },

    #[error("block hash {hash} does not meet the proof of work for difficulty {difficulty}")]
    ProofOfWork { hash: String, difficulty: u32 },

    #[error("block difficulty moved from {previous} to {current}; it may only adjust by 1")]
    DifficultyJump { previous: u32, current: u32 },

    #[error("block hash {stored} does not match its fields (recomputed {recomputed})")]
    HashMismatch { stored: String, recomputed: String },

    #[error("the first block is not the genesis block")]
    Genesis,

    #[error("transaction {id} is not unique in the chain")]
    DuplicateTransaction { id: String },

    #[error("block {block_hash} carries more than one mining reward")]
    MultipleReward { block_hash: String },

    #[error("transaction {id} claims input amount {claimed} but history gives {historic}")]
    InvalidInputAmount {
        id: String,
        claimed: u64,
        historic: u64,
    },

    #[error("transaction {id} outputs total {output_total}, input amount is {input_amount}")]
    OutputMismatch {
        id: String,
        input_amount: u64,
        output_total: u128,
    },

    #[error("transaction {id} has an invalid signature")]
    InvalidSignature { id: String },

    #[error("transaction {id} is not a valid mining reward")]
    InvalidReward { id: String },

    #[error("transaction {id} is a mining reward; rewards are only minted by miners")]
    UnexpectedReward { id: String },
}

/// Failure while building or amending a transaction.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransactionError {
    #[error("amount {amount} exceeds balance {balance}")]
    InsufficientBalance { amount: u64, balance: u64 },
}

/// Reason a candidate chain was not adopted. Local state is left untouched.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReplicationError {
    #[error("cannot replace: incoming chain of length {candidate} is not longer than local chain of length {local}")]
    NotLonger { candidate: usize, local: usize },

    #[error("cannot replace: incoming chain is invalid: {0}")]
    InvalidChain(#[source] ValidationError),
}

/// Errors surfaced by [`crate::node::Node`] operations.
#[derive(Error, Debug)]
pub enum NodeError {
    #[error(transparent)]
    Transaction(#[from] TransactionError),

    #[error(transparent)]
    Replication(#[from] ReplicationError),

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("chain tip moved while mining; block discarded")]
    Superseded,

    #[error("failed to publish: {0}")]
    Publish(#[source] anyhow::Error),

    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),
}
