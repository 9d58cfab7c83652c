use rayon::prelude::*;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{info, warn};

use crate::block::{validate_block, Block};
use crate::error::{ReplicationError, ValidationError};
use crate::ledger;
use crate::mine::mine_block;
use crate::transaction::{Input, Transaction, TransferInput};

/// Append-only sequence of blocks starting at genesis.
///
/// A `Blockchain` only ever holds a chain that was built locally from genesis
/// or accepted through [`Blockchain::replace_chain`], so it is never empty.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Blockchain {
    chain: Vec<Block>,
}

impl Default for Blockchain {
    fn default() -> Self {
        Self::new()
    }
}

impl Blockchain {
    pub fn new() -> Self {
        Self {
            chain: vec![Block::genesis()],
        }
    }

    pub fn blocks(&self) -> &[Block] {
        &self.chain
    }

    pub fn last_block(&self) -> &Block {
        self.chain
            .last()
            .expect("blockchain always holds at least the genesis block")
    }

    /// Mine `data` on top of the current tip and append it.
    pub fn add_block(&mut self, data: Vec<Transaction>) -> &Block {
        let block = mine_block(self.last_block(), data);
        self.chain.push(block);
        self.last_block()
    }

    /// Append a block mined elsewhere, provided it extends the current tip and
    /// its transactions hold against the history before it.
    pub fn push_block(&mut self, block: Block) -> Result<(), ValidationError> {
        validate_block(self.last_block(), &block)?;
        let mut seen_ids = committed_ids(&self.chain);
        validate_block_transactions(&self.chain, &block, &mut seen_ids)?;
        self.chain.push(block);
        Ok(())
    }

    /// Adopt `candidate` if it is strictly longer and fully valid. On error the
    /// local chain is unchanged.
    pub fn replace_chain(&mut self, candidate: Vec<Block>) -> Result<(), ReplicationError> {
        if candidate.len() <= self.chain.len() {
            return Err(ReplicationError::NotLonger {
                candidate: candidate.len(),
                local: self.chain.len(),
            });
        }

        if let Err(reason) = validate_chain(&candidate) {
            warn!("Rejected incoming chain of length {}: {}", candidate.len(), reason);
            return Err(ReplicationError::InvalidChain(reason));
        }

        info!(
            "Replacing local chain of length {} with incoming chain of length {}",
            self.chain.len(),
            candidate.len()
        );
        self.chain = candidate;
        Ok(())
    }

    /// Every address that appears as a recipient anywhere in the chain.
    pub fn known_addresses(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut addresses = Vec::new();
        for tx in self.chain.iter().flat_map(|block| block.data.iter()) {
            for address in tx.output.keys() {
                if seen.insert(address.as_str()) {
                    addresses.push(address.clone());
                }
            }
        }
        addresses
    }
}

/// Full validation: exact genesis, every block against its predecessor, then
/// the transaction rules across the whole chain.
///
/// Block pairs are checked in parallel; the error reported is the one for the
/// lowest failing height, as a sequential scan would find it.
pub fn validate_chain(chain: &[Block]) -> Result<(), ValidationError> {
    match chain.first() {
        Some(first) if *first == Block::genesis() => {}
        _ => return Err(ValidationError::Genesis),
    }

    let broken = (1..chain.len())
        .into_par_iter()
        .find_map_first(|i| validate_block(&chain[i - 1], &chain[i]).err());
    if let Some(err) = broken {
        return Err(err);
    }

    validate_transaction_chain(chain)
}

/// Transaction rules across a chain:
/// - each id appears once in the whole chain
/// - at most one reward per block
/// - a transfer's input amount equals the sender's balance replayed over the
///   blocks before the one carrying it
/// - each transaction passes [`Transaction::validate`]
pub fn validate_transaction_chain(chain: &[Block]) -> Result<(), ValidationError> {
    let mut seen_ids = HashSet::new();
    for (height, block) in chain.iter().enumerate() {
        validate_block_transactions(&chain[..height], block, &mut seen_ids)?;
    }
    Ok(())
}

/// Rules a pending transaction must pass before it may be mined on top of
/// `chain`: it is a transfer, its id is not committed yet, its input amount is
/// the sender's balance at the tip, and it passes [`Transaction::validate`].
pub fn validate_pending_transaction(
    chain: &[Block],
    tx: &Transaction,
) -> Result<(), ValidationError> {
    let input = match &tx.input {
        Input::Transfer(input) => input,
        Input::Reward(_) => {
            return Err(ValidationError::UnexpectedReward { id: tx.id.clone() });
        }
    };
    if committed_ids(chain).contains(tx.id.as_str()) {
        return Err(ValidationError::DuplicateTransaction { id: tx.id.clone() });
    }
    check_input_amount(chain, tx, input)?;
    tx.validate()
}

fn committed_ids(chain: &[Block]) -> HashSet<&str> {
    chain
        .iter()
        .flat_map(|block| block.data.iter())
        .map(|tx| tx.id.as_str())
        .collect()
}

fn check_input_amount(
    history: &[Block],
    tx: &Transaction,
    input: &TransferInput,
) -> Result<(), ValidationError> {
    let historic = ledger::balance(history, &input.address);
    if historic != input.amount {
        return Err(ValidationError::InvalidInputAmount {
            id: tx.id.clone(),
            claimed: input.amount,
            historic,
        });
    }
    Ok(())
}

// `history` is every block before `block`; `seen_ids` holds the ids already
// met in it and collects the ids of `block`.
fn validate_block_transactions<'a>(
    history: &[Block],
    block: &'a Block,
    seen_ids: &mut HashSet<&'a str>,
) -> Result<(), ValidationError> {
    let mut has_reward = false;

    for tx in &block.data {
        if !seen_ids.insert(tx.id.as_str()) {
            return Err(ValidationError::DuplicateTransaction { id: tx.id.clone() });
        }

        match &tx.input {
            Input::Reward(_) => {
                if has_reward {
                    return Err(ValidationError::MultipleReward {
                        block_hash: block.hash.clone(),
                    });
                }
                has_reward = true;
            }
            Input::Transfer(input) => check_input_amount(history, tx, input)?,
        }

        tx.validate()?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::STARTING_BALANCE;
    use crate::wallet::Wallet;

    fn sample_chain() -> Blockchain {
        let mut blockchain = Blockchain::new();
        for i in 0..3 {
            let tx = Transaction::new(&Wallet::new(), blockchain.blocks(), "recipient", i).unwrap();
            blockchain.add_block(vec![tx]);
        }
        blockchain
    }

    #[test]
    fn new_chain_starts_at_genesis() {
        let blockchain = Blockchain::new();
        assert_eq!(blockchain.blocks().len(), 1);
        assert_eq!(blockchain.blocks()[0], Block::genesis());
    }

    #[test]
    fn add_block_appends_data() {
        let mut blockchain = Blockchain::new();
        let data = vec![Transaction::reward(&Wallet::new())];
        blockchain.add_block(data.clone());
        assert_eq!(blockchain.last_block().data, data);
    }

    #[test]
    fn valid_chain_passes() {
        assert_eq!(validate_chain(sample_chain().blocks()), Ok(()));
    }

    #[test]
    fn empty_chain_is_invalid() {
        assert_eq!(validate_chain(&[]), Err(ValidationError::Genesis));
    }

    #[test]
    fn bad_genesis_is_rejected() {
        let mut blocks = sample_chain().blocks().to_vec();
        blocks[0].hash = "evil_hash".into();
        assert_eq!(validate_chain(&blocks), Err(ValidationError::Genesis));
    }

    #[test]
    fn first_broken_link_is_reported() {
        let mut blocks = sample_chain().blocks().to_vec();
        blocks[3].last_hash = "evil_last_hash".into();
        blocks[2].nonce = crate::block::Nonce::Count(u64::MAX);
        assert!(matches!(
            validate_chain(&blocks),
            Err(ValidationError::HashMismatch { .. })
        ));
    }

    #[test]
    fn replace_chain_with_longer_valid_chain() {
        let longer = sample_chain();
        let mut blockchain = Blockchain::new();
        blockchain.replace_chain(longer.blocks().to_vec()).unwrap();
        assert_eq!(blockchain, longer);
    }

    #[test]
    fn replace_chain_not_longer_keeps_local() {
        let mut blockchain = sample_chain();
        let before = blockchain.clone();
        let err = blockchain
            .replace_chain(Blockchain::new().blocks().to_vec())
            .unwrap_err();
        assert_eq!(err, ReplicationError::NotLonger { candidate: 1, local: 4 });
        assert_eq!(blockchain, before);

        let err = blockchain.replace_chain(before.blocks().to_vec()).unwrap_err();
        assert!(matches!(err, ReplicationError::NotLonger { .. }));
        assert_eq!(blockchain, before);
    }

    #[test]
    fn replace_chain_with_invalid_chain_keeps_local() {
        let mut incoming = sample_chain().blocks().to_vec();
        incoming[1].hash = "evil_hash".into();
        let mut blockchain = Blockchain::new();
        let err = blockchain.replace_chain(incoming).unwrap_err();
        assert!(matches!(
            err,
            ReplicationError::InvalidChain(ValidationError::ProofOfWork { .. })
        ));
        assert_eq!(blockchain, Blockchain::new());
    }

    #[test]
    fn push_block_requires_current_tip() {
        let mut blockchain = Blockchain::new();
        let stale = mine_block(&Block::genesis(), vec![]);
        blockchain.add_block(vec![]);
        assert!(matches!(
            blockchain.push_block(stale),
            Err(ValidationError::Linkage { .. })
        ));

        let fresh = mine_block(blockchain.last_block(), vec![]);
        assert_eq!(blockchain.push_block(fresh), Ok(()));
        assert_eq!(blockchain.blocks().len(), 3);
    }

    #[test]
    fn push_block_enforces_transaction_rules() {
        let mut blockchain = Blockchain::new();
        let double_reward = mine_block(
            blockchain.last_block(),
            vec![
                Transaction::reward(&Wallet::new()),
                Transaction::reward(&Wallet::new()),
            ],
        );
        assert!(matches!(
            blockchain.push_block(double_reward),
            Err(ValidationError::MultipleReward { .. })
        ));

        let tx = Transaction::new(&Wallet::new(), blockchain.blocks(), "recipient", 1).unwrap();
        blockchain.add_block(vec![tx.clone()]);
        let replay = mine_block(blockchain.last_block(), vec![tx.clone()]);
        assert_eq!(
            blockchain.push_block(replay),
            Err(ValidationError::DuplicateTransaction { id: tx.id })
        );
        assert_eq!(blockchain.blocks().len(), 2);
    }

    #[test]
    fn pending_transaction_checked_against_tip() {
        let mut blockchain = Blockchain::new();
        let wallet = Wallet::new();
        let fresh = Transaction::new(&wallet, blockchain.blocks(), "recipient", 5).unwrap();
        assert_eq!(validate_pending_transaction(blockchain.blocks(), &fresh), Ok(()));

        let reward = Transaction::reward(&wallet);
        assert_eq!(
            validate_pending_transaction(blockchain.blocks(), &reward),
            Err(ValidationError::UnexpectedReward { id: reward.id.clone() })
        );

        let spent = Transaction::new(&wallet, blockchain.blocks(), "other", 7).unwrap();
        blockchain.add_block(vec![spent.clone()]);
        assert_eq!(
            validate_pending_transaction(blockchain.blocks(), &spent),
            Err(ValidationError::DuplicateTransaction { id: spent.id })
        );
        assert_eq!(
            validate_pending_transaction(blockchain.blocks(), &fresh),
            Err(ValidationError::InvalidInputAmount {
                id: fresh.id.clone(),
                claimed: STARTING_BALANCE,
                historic: STARTING_BALANCE - 7,
            })
        );
    }

    #[test]
    fn valid_transaction_chain_passes() {
        assert_eq!(validate_transaction_chain(sample_chain().blocks()), Ok(()));
    }

    #[test]
    fn duplicate_transaction_in_one_block() {
        let mut blockchain = sample_chain();
        let tx = Transaction::new(&Wallet::new(), blockchain.blocks(), "recipient", 1).unwrap();
        blockchain.add_block(vec![tx.clone(), tx]);
        assert!(matches!(
            validate_transaction_chain(blockchain.blocks()),
            Err(ValidationError::DuplicateTransaction { .. })
        ));
    }

    #[test]
    fn duplicate_transaction_across_blocks() {
        let mut blockchain = sample_chain();
        let repeated = blockchain.blocks()[1].data[0].clone();
        blockchain.add_block(vec![repeated.clone()]);
        assert_eq!(
            validate_transaction_chain(blockchain.blocks()),
            Err(ValidationError::DuplicateTransaction { id: repeated.id })
        );
    }

    #[test]
    fn multiple_rewards_in_one_block() {
        let mut blockchain = sample_chain();
        let rewards = vec![
            Transaction::reward(&Wallet::new()),
            Transaction::reward(&Wallet::new()),
        ];
        blockchain.add_block(rewards);
        assert!(matches!(
            validate_transaction_chain(blockchain.blocks()),
            Err(ValidationError::MultipleReward { .. })
        ));
    }

    #[test]
    fn one_reward_per_block_across_blocks_is_fine() {
        let mut blockchain = sample_chain();
        blockchain.add_block(vec![Transaction::reward(&Wallet::new())]);
        blockchain.add_block(vec![Transaction::reward(&Wallet::new())]);
        assert_eq!(validate_transaction_chain(blockchain.blocks()), Ok(()));
    }

    #[test]
    fn bad_transaction_is_rejected() {
        let mut blockchain = sample_chain();
        let mut tx = Transaction::new(&Wallet::new(), blockchain.blocks(), "recipient", 1).unwrap();
        if let Input::Transfer(input) = &mut tx.input {
            input.signature = Wallet::new().sign(&tx.output);
        }
        blockchain.add_block(vec![tx]);
        assert!(matches!(
            validate_transaction_chain(blockchain.blocks()),
            Err(ValidationError::InvalidSignature { .. })
        ));
    }

    #[test]
    fn bad_historic_balance_is_rejected() {
        let mut blockchain = sample_chain();
        let wallet = Wallet::new();
        let mut tx = Transaction::new(&wallet, blockchain.blocks(), "recipient", 1).unwrap();
        tx.output.insert(wallet.address().to_string(), 9000);
        let signature = wallet.sign(&tx.output);
        if let Input::Transfer(input) = &mut tx.input {
            input.amount = 9001;
            input.signature = signature;
        }
        blockchain.add_block(vec![tx]);
        assert!(matches!(
            validate_transaction_chain(blockchain.blocks()),
            Err(ValidationError::InvalidInputAmount {
                claimed: 9001,
                historic: 1000,
                ..
            })
        ));
    }

    #[test]
    fn known_addresses_are_unique() {
        let blockchain = sample_chain();
        let addresses = blockchain.known_addresses();
        assert_eq!(addresses.iter().filter(|a| *a == "recipient").count(), 1);
        // one recipient plus three distinct senders
        assert_eq!(addresses.len(), 4);
    }
}
