#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use ledger_core::{
    Block, Blockchain, Channel, MessageHandler, Node, Publisher, Transaction, Wallet,
};

/// Publisher that queues every message so a test can hand them to other nodes.
#[derive(Default)]
pub struct QueueRelay {
    queue: Mutex<Vec<(Channel, String)>>,
}

impl Publisher for QueueRelay {
    fn publish(&self, channel: Channel, payload: &str) -> anyhow::Result<()> {
        self.queue
            .lock()
            .expect("relay queue poisoned")
            .push((channel, payload.to_string()));
        Ok(())
    }
}

impl QueueRelay {
    pub fn take(&self) -> Vec<(Channel, String)> {
        std::mem::take(&mut *self.queue.lock().expect("relay queue poisoned"))
    }

    /// Hand every queued message to `handler`, decoding it the way a transport
    /// adapter would. Returns how many deliveries were rejected.
    pub fn deliver_to<H: MessageHandler>(&self, handler: &H) -> usize {
        let mut rejected = 0;
        for (channel, payload) in self.take() {
            let ok = match channel {
                Channel::Block => {
                    let block = Block::from_json(&payload).expect("block payload decodes");
                    handler.on_block_delivered(block).is_ok()
                }
                Channel::Transaction => {
                    let tx = Transaction::from_json(&payload).expect("tx payload decodes");
                    handler.on_transaction_delivered(tx).is_ok()
                }
            };
            if !ok {
                rejected += 1;
            }
        }
        rejected
    }
}

pub fn create_node() -> (Node, Arc<QueueRelay>) {
    let relay = Arc::new(QueueRelay::default());
    (Node::new(Wallet::new(), relay.clone()), relay)
}

/// A chain of `blocks` mined blocks, each carrying one transfer from a fresh
/// wallet.
pub fn chain_with_transfers(blocks: usize) -> Blockchain {
    let mut blockchain = Blockchain::new();
    for i in 0..blocks {
        let tx = Transaction::new(&Wallet::new(), blockchain.blocks(), "recipient", i as u64)
            .expect("fresh wallet can afford the transfer");
        blockchain.add_block(vec![tx]);
    }
    blockchain
}
