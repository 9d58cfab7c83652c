use crate::block::Block;
use crate::constants::MINE_RATE;

/// Number of leading zero bits in the binary expansion of a hex string.
///
/// Each hex digit contributes four bits. Counting stops at the first non-zero
/// digit, or at the first character that is not a hex digit.
pub fn leading_zero_bits(hex: &str) -> u32 {
    let mut total = 0u32;
    for c in hex.chars() {
        match c.to_digit(16) {
            Some(0) => total += 4,
            Some(nibble) => {
                total += nibble.leading_zeros() - (u32::BITS - 4);
                break;
            }
            None => break,
        }
    }
    total
}

/// True when the leading `difficulty` bits of `hash` are all zero.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    leading_zero_bits(hash) >= difficulty
}

/// Difficulty for a block mined at `new_timestamp` on top of `last_block`.
///
/// Blocks arriving faster than [`MINE_RATE`] raise the difficulty by one;
/// slower ones lower it by one, never below 1.
pub fn adjust_difficulty(last_block: &Block, new_timestamp: i64) -> u32 {
    if new_timestamp.saturating_sub(last_block.timestamp) < MINE_RATE {
        return last_block.difficulty.saturating_add(1);
    }
    if last_block.difficulty > 1 {
        return last_block.difficulty - 1;
    }
    1
}
