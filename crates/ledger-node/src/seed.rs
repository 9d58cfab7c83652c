use ledger_core::{MessageHandler, Node, NodeError, Transaction, Wallet};
use rand::Rng;
use tracing::info;

use crate::constants::{SEED_BLOCKS, SEED_PENDING, SEED_TXS_PER_BLOCK};

fn random_transfer<R: Rng>(node: &Node, rng: &mut R) -> Result<Transaction, NodeError> {
    let tx = Transaction::new(
        &Wallet::new(),
        &node.chain(),
        Wallet::new().address(),
        rng.gen_range(2..=50),
    )?;
    Ok(tx)
}

/// Fill a fresh node with demo history: mined blocks of transfers between
/// throwaway wallets, plus a few pending transfers.
pub fn seed_demo_data<R: Rng>(node: &Node, rng: &mut R) -> Result<(), NodeError> {
    for _ in 0..SEED_BLOCKS {
        let data = (0..SEED_TXS_PER_BLOCK)
            .map(|_| random_transfer(node, rng))
            .collect::<Result<Vec<_>, _>>()?;
        node.add_block(data)?;
    }

    for _ in 0..SEED_PENDING {
        node.on_transaction_delivered(random_transfer(node, rng)?)?;
    }

    info!(
        "Seeded {} blocks and {} pending transactions",
        SEED_BLOCKS, SEED_PENDING
    );
    Ok(())
}
