use std::collections::HashMap;
use tracing::{debug, warn};

use crate::block::Block;
use crate::chain::validate_pending_transaction;
use crate::transaction::Transaction;

/// Transactions seen by this node but not yet in a block, keyed by id.
#[derive(Debug, Default, Clone)]
pub struct TransactionPool {
    transactions: HashMap<String, Transaction>,
}

impl TransactionPool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace by id.
    pub fn set(&mut self, tx: Transaction) {
        debug!("Pool set transaction {}", tx.id);
        self.transactions.insert(tx.id.clone(), tx);
    }

    pub fn get(&self, id: &str) -> Option<&Transaction> {
        self.transactions.get(id)
    }

    /// The pending transaction sent by `address`, if any.
    pub fn existing_transaction(&self, address: &str) -> Option<&Transaction> {
        self.transactions
            .values()
            .find(|tx| tx.input.sender() == Some(address))
    }

    /// Every pending transaction.
    pub fn transaction_data(&self) -> Vec<Transaction> {
        self.transactions.values().cloned().collect()
    }

    /// Pending transactions that can still be mined on top of `chain`. Entries
    /// that went stale stay in the pool and are skipped.
    pub fn valid_transactions(&self, chain: &[Block]) -> Vec<Transaction> {
        self.transactions
            .values()
            .filter(|tx| match validate_pending_transaction(chain, tx) {
                Ok(()) => true,
                Err(err) => {
                    warn!("Skipping pending transaction {}: {}", tx.id, err);
                    false
                }
            })
            .cloned()
            .collect()
    }

    /// Drop every transaction whose id already appears in `chain`.
    pub fn clear_blockchain_transactions(&mut self, chain: &[Block]) {
        let before = self.transactions.len();
        for tx in chain.iter().flat_map(|block| block.data.iter()) {
            self.transactions.remove(&tx.id);
        }
        let removed = before - self.transactions.len();
        if removed > 0 {
            debug!("Pool pruned {} committed transactions", removed);
        }
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }
}
