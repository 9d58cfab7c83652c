use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constants::{
    GENESIS_DIFFICULTY, GENESIS_HASH, GENESIS_LAST_HASH, GENESIS_NONCE, GENESIS_TIMESTAMP,
};
use crate::error::ValidationError;
use crate::hash::crypto_hash;
use crate::pow::meets_difficulty;
use crate::transaction::Transaction;

/// Proof-of-work counter. Mined blocks carry a number; the genesis literal
/// carries a label.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Nonce {
    Count(u64),
    Label(String),
}

impl fmt::Display for Nonce {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Nonce::Count(n) => write!(f, "{n}"),
            Nonce::Label(s) => f.write_str(s),
        }
    }
}

/// One entry of the hash-linked chain.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Block {
    /// Nanoseconds since the unix epoch.
    pub timestamp: i64,
    pub last_hash: String,
    pub hash: String,
    pub data: Vec<Transaction>,
    pub difficulty: u32,
    pub nonce: Nonce,
}

impl Block {
    /// The fixed first block, identical on every node.
    pub fn genesis() -> Self {
        Self {
            timestamp: GENESIS_TIMESTAMP,
            last_hash: GENESIS_LAST_HASH.to_string(),
            hash: GENESIS_HASH.to_string(),
            data: Vec::new(),
            difficulty: GENESIS_DIFFICULTY,
            nonce: Nonce::Label(GENESIS_NONCE.to_string()),
        }
    }

    /// Hash of the block fields in the order
    /// `(timestamp, last_hash, data, difficulty, nonce)`, ignoring the stored `hash`.
    pub fn compute_hash(&self) -> String {
        block_hash(
            self.timestamp,
            &self.last_hash,
            &self.data,
            self.difficulty,
            &self.nonce,
        )
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

pub(crate) fn block_hash(
    timestamp: i64,
    last_hash: &str,
    data: &[Transaction],
    difficulty: u32,
    nonce: &Nonce,
) -> String {
    crypto_hash(&(timestamp, last_hash, data, difficulty, nonce))
}

/// Check `block` against its predecessor: linkage, proof of work, difficulty
/// step and hash integrity, in that order.
pub fn validate_block(last_block: &Block, block: &Block) -> Result<(), ValidationError> {
    if block.last_hash != last_block.hash {
        return Err(ValidationError::Linkage {
            expected: last_block.hash.clone(),
            found: block.last_hash.clone(),
        });
    }

    if !meets_difficulty(&block.hash, block.difficulty) {
        return Err(ValidationError::ProofOfWork {
            hash: block.hash.clone(),
            difficulty: block.difficulty,
        });
    }

    if last_block.difficulty.abs_diff(block.difficulty) > 1 {
        return Err(ValidationError::DifficultyJump {
            previous: last_block.difficulty,
            current: block.difficulty,
        });
    }

    let recomputed = block.compute_hash();
    if block.hash != recomputed {
        return Err(ValidationError::HashMismatch {
            stored: block.hash.clone(),
            recomputed,
        });
    }

    Ok(())
}
