use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tracing::{info, warn};

use crate::block::Block;
use crate::chain::{validate_pending_transaction, Blockchain};
use crate::error::{NodeError, ReplicationError, TransactionError, ValidationError};
use crate::mine::mine_block_until;
use crate::pool::TransactionPool;
use crate::relay::{Channel, MessageHandler, Publisher};
use crate::transaction::Transaction;
use crate::wallet::Wallet;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WalletInfo {
    pub address: String,
    pub balance: u64,
}

/// Everything one node owns: its chain, its pending pool, its wallet and the
/// publisher it broadcasts through.
///
/// Locks are always taken chain first, pool second. Replacing or extending the
/// chain prunes the pool before the chain lock is released, so no reader sees
/// one without the other.
pub struct Node {
    blockchain: RwLock<Blockchain>,
    pool: RwLock<TransactionPool>,
    wallet: Wallet,
    publisher: Arc<dyn Publisher>,
    // bumped on every chain mutation; lets in-flight mining notice a new tip
    tip_version: AtomicU64,
}

fn read<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(PoisonError::into_inner)
}

fn write<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(PoisonError::into_inner)
}

impl Node {
    pub fn new(wallet: Wallet, publisher: Arc<dyn Publisher>) -> Self {
        Self {
            blockchain: RwLock::new(Blockchain::new()),
            pool: RwLock::new(TransactionPool::new()),
            wallet,
            publisher,
            tip_version: AtomicU64::new(0),
        }
    }

    pub fn wallet(&self) -> &Wallet {
        &self.wallet
    }

    /// Mine `data` on the current tip and append it.
    ///
    /// The search runs without holding any lock. If the tip changes meanwhile
    /// the search is abandoned and [`NodeError::Superseded`] returned.
    pub fn add_block(&self, data: Vec<Transaction>) -> Result<Block, NodeError> {
        let (block, carried) = self.mine_and_append(data)?;
        self.broadcast_carried(carried);
        Ok(block)
    }

    // Returns the appended block and any payments reissued from the pool.
    fn mine_and_append(
        &self,
        data: Vec<Transaction>,
    ) -> Result<(Block, Option<Transaction>), NodeError> {
        let (last_block, version) = {
            let chain = read(&self.blockchain);
            (chain.last_block().clone(), self.tip_version.load(Ordering::SeqCst))
        };

        let block = mine_block_until(&last_block, data, || {
            self.tip_version.load(Ordering::SeqCst) != version
        })
        .ok_or(NodeError::Superseded)?;

        let carried = {
            let mut chain = write(&self.blockchain);
            if chain.last_block().hash != block.last_hash {
                return Err(NodeError::Superseded);
            }
            chain.push_block(block.clone())?;
            self.tip_version.fetch_add(1, Ordering::SeqCst);
            info!(
                "Appended block {} at height {}",
                block.hash,
                chain.blocks().len() - 1
            );
            self.settle_pool(chain.blocks(), std::slice::from_ref(&block))
        };
        Ok((block, carried))
    }

    /// Mine every pending transaction that still holds against the tip, plus
    /// this node's reward, and broadcast the result.
    pub fn mine(&self) -> Result<Block, NodeError> {
        let mut data = {
            let chain = read(&self.blockchain);
            read(&self.pool).valid_transactions(chain.blocks())
        };
        data.push(Transaction::reward(&self.wallet));

        let (block, carried) = self.mine_and_append(data)?;
        if let Err(err) = self.broadcast_block(&block) {
            warn!("Mined block {} was not broadcast: {}", block.hash, err);
        }
        self.broadcast_carried(carried);
        Ok(block)
    }

    /// Pay `amount` to `recipient` from this node's wallet, folding it into the
    /// wallet's pending transaction when there is one.
    pub fn transact(&self, recipient: &str, amount: u64) -> Result<Transaction, NodeError> {
        let tx = {
            let chain = read(&self.blockchain);
            let mut pool = write(&self.pool);
            let tx = match pool.existing_transaction(self.wallet.address()) {
                Some(existing) => existing.update(&self.wallet, recipient, amount)?,
                None => Transaction::new(&self.wallet, chain.blocks(), recipient, amount)?,
            };
            pool.set(tx.clone());
            tx
        };

        if let Err(err) = self.broadcast_transaction(&tx) {
            warn!("Transaction {} was not broadcast: {}", tx.id, err);
        }
        Ok(tx)
    }

    /// Longest-valid-chain rule. Replacement and pool pruning happen under the
    /// same chain write lock.
    pub fn replace_chain(&self, candidate: Vec<Block>) -> Result<(), ReplicationError> {
        let carried = {
            let mut chain = write(&self.blockchain);
            chain.replace_chain(candidate)?;
            self.tip_version.fetch_add(1, Ordering::SeqCst);
            self.settle_pool(chain.blocks(), chain.blocks())
        };
        self.broadcast_carried(carried);
        Ok(())
    }

    /// Drop from the pool whatever `committed` settled. Called with the chain
    /// write lock held; `chain` is the new chain.
    ///
    /// If this wallet's pending transaction was committed in an earlier form,
    /// the payments amended into it since are reissued as a fresh transaction
    /// on top of `chain`, pooled and returned.
    fn settle_pool(&self, chain: &[Block], committed: &[Block]) -> Option<Transaction> {
        let mut pool = write(&self.pool);
        let carried = pool
            .existing_transaction(self.wallet.address())
            .and_then(|pending| {
                let mined = committed
                    .iter()
                    .flat_map(|block| block.data.iter())
                    .find(|tx| tx.id == pending.id)?;
                if mined == pending {
                    return None;
                }
                match self.reissue_unmined(chain, mined, pending) {
                    Ok(reissued) => reissued,
                    Err(err) => {
                        warn!("Dropping payments amended into {}: {}", pending.id, err);
                        None
                    }
                }
            });

        pool.clear_blockchain_transactions(committed);
        if let Some(tx) = &carried {
            info!("Reissued payments missing from the mined copy as {}", tx.id);
            pool.set(tx.clone());
        }
        carried
    }

    fn reissue_unmined(
        &self,
        chain: &[Block],
        mined: &Transaction,
        pending: &Transaction,
    ) -> Result<Option<Transaction>, TransactionError> {
        let sender = self.wallet.address();
        let mut reissued: Option<Transaction> = None;
        for (recipient, &amount) in &pending.output {
            let settled = mined.output.get(recipient).copied().unwrap_or(0);
            if recipient == sender || amount <= settled {
                continue;
            }
            reissued = Some(match reissued {
                Some(tx) => tx.update(&self.wallet, recipient, amount - settled)?,
                None => Transaction::new(&self.wallet, chain, recipient, amount - settled)?,
            });
        }
        Ok(reissued)
    }

    fn broadcast_carried(&self, carried: Option<Transaction>) {
        if let Some(tx) = carried {
            if let Err(err) = self.broadcast_transaction(&tx) {
                warn!("Transaction {} was not broadcast: {}", tx.id, err);
            }
        }
    }

    pub fn broadcast_block(&self, block: &Block) -> Result<(), NodeError> {
        let payload = serde_json::to_string(block)?;
        self.publisher
            .publish(Channel::Block, &payload)
            .map_err(NodeError::Publish)
    }

    pub fn broadcast_transaction(&self, tx: &Transaction) -> Result<(), NodeError> {
        let payload = serde_json::to_string(tx)?;
        self.publisher
            .publish(Channel::Transaction, &payload)
            .map_err(NodeError::Publish)
    }

    pub fn chain(&self) -> Vec<Block> {
        read(&self.blockchain).blocks().to_vec()
    }

    pub fn chain_length(&self) -> usize {
        read(&self.blockchain).blocks().len()
    }

    /// Blocks newest first, sliced to `start..end` and clamped to the chain.
    pub fn chain_range(&self, start: usize, end: usize) -> Vec<Block> {
        let chain = read(&self.blockchain);
        chain
            .blocks()
            .iter()
            .rev()
            .skip(start)
            .take(end.saturating_sub(start))
            .cloned()
            .collect()
    }

    pub fn wallet_info(&self) -> WalletInfo {
        let chain = read(&self.blockchain);
        WalletInfo {
            address: self.wallet.address().to_string(),
            balance: self.wallet.balance(chain.blocks()),
        }
    }

    pub fn known_addresses(&self) -> Vec<String> {
        read(&self.blockchain).known_addresses()
    }

    pub fn pool_transactions(&self) -> Vec<Transaction> {
        read(&self.pool).transaction_data()
    }
}

impl MessageHandler for Node {
    fn on_block_delivered(&self, block: Block) -> Result<(), ReplicationError> {
        let mut candidate = self.chain();
        candidate.push(block);
        self.replace_chain(candidate)
    }

    fn on_transaction_delivered(&self, tx: Transaction) -> Result<(), ValidationError> {
        let chain = read(&self.blockchain);
        validate_pending_transaction(chain.blocks(), &tx)?;
        write(&self.pool).set(tx);
        Ok(())
    }
}
