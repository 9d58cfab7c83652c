use crate::block::{block_hash, Block, Nonce};
use crate::pow::{adjust_difficulty, meets_difficulty};
use crate::transaction::Transaction;
use crate::now_nanos;
use tracing::info;

/// Mines a block on top of `last_block` carrying `data`.
///
/// Each attempt bumps the nonce, refreshes the timestamp and recomputes the
/// difficulty for that timestamp. There is no attempt cap: the loop relies on
/// the expected `2^difficulty` attempts being finite.
pub fn mine_block(last_block: &Block, data: Vec<Transaction>) -> Block {
    match mine_block_until(last_block, data, || false) {
        Some(block) => block,
        None => unreachable!("mining without a stop condition always yields a block"),
    }
}

/// Same search as [`mine_block`], polling `should_stop` before every attempt.
/// Returns `None` once `should_stop` reports true.
pub fn mine_block_until<F>(last_block: &Block, data: Vec<Transaction>, should_stop: F) -> Option<Block>
where
    F: Fn() -> bool,
{
    let mut timestamp = now_nanos();
    let mut difficulty = adjust_difficulty(last_block, timestamp);
    let mut nonce = 0u64;
    let mut hash = block_hash(
        timestamp,
        &last_block.hash,
        &data,
        difficulty,
        &Nonce::Count(nonce),
    );

    while !meets_difficulty(&hash, difficulty) {
        if should_stop() {
            return None;
        }
        nonce = nonce.wrapping_add(1);
        timestamp = now_nanos();
        difficulty = adjust_difficulty(last_block, timestamp);
        hash = block_hash(
            timestamp,
            &last_block.hash,
            &data,
            difficulty,
            &Nonce::Count(nonce),
        );
    }

    info!(
        "Mined block with difficulty {} nonce {} hash {}",
        difficulty, nonce, hash
    );

    Some(Block {
        timestamp,
        last_hash: last_block.hash.clone(),
        hash,
        data,
        difficulty,
        nonce: Nonce::Count(nonce),
    })
}
