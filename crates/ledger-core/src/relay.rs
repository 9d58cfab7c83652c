//! Contracts between the core and whatever transport moves blocks and
//! transactions between nodes.

use std::fmt;

use crate::block::Block;
use crate::error::{ReplicationError, ValidationError};
use crate::transaction::Transaction;

/// Kind of payload carried by a relay message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Channel {
    Block,
    Transaction,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Block => "BLOCK",
            Channel::Transaction => "TRANSACTION",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outbound side: hands a serialized payload to the transport.
pub trait Publisher: Send + Sync {
    fn publish(&self, channel: Channel, payload: &str) -> anyhow::Result<()>;
}

/// Inbound side: the transport calls one method per channel as messages
/// arrive and logs the result.
pub trait MessageHandler {
    /// A peer mined `block`; try to extend the local chain with it.
    fn on_block_delivered(&self, block: Block) -> Result<(), ReplicationError>;

    /// A peer issued or amended `tx`; keep it pending.
    fn on_transaction_delivered(&self, tx: Transaction) -> Result<(), ValidationError>;
}
