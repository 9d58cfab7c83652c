use crate::block::Block;
use crate::constants::STARTING_BALANCE;

/// Balance of `address` after replaying `chain` oldest to newest.
///
/// Every address starts at [`STARTING_BALANCE`]. A transaction sent by the
/// address resets the balance to the remainder it paid back to itself; any
/// other transaction paying the address adds to it. Wallet balances and the
/// chain validator's input check both go through here.
pub fn balance(chain: &[Block], address: &str) -> u64 {
    let mut balance = STARTING_BALANCE;

    for tx in chain.iter().flat_map(|block| block.data.iter()) {
        if tx.input.sender() == Some(address) {
            balance = tx.output.get(address).copied().unwrap_or(0);
        } else if let Some(amount) = tx.output.get(address) {
            balance = balance.saturating_add(*amount);
        }
    }

    balance
}
