use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::block::Block;
use crate::constants::{MINING_REWARD, MINING_REWARD_ADDRESS};
use crate::error::{TransactionError, ValidationError};
use crate::wallet::{Signature, Wallet};
use crate::{now_nanos, short_id};

/// Recipient address → amount. Ordered so the encoding signed by the sender is
/// the encoding every verifier reproduces.
pub type Output = BTreeMap<String, u64>;

/// Transfer of funds from one sender to one or more recipients.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Transaction {
    pub id: String,
    pub output: Output,
    pub input: Input,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Input {
    Transfer(TransferInput),
    Reward(RewardInput),
}

/// Authorization of a transfer: the sender's whole balance at signing time and
/// a signature over the output.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TransferInput {
    pub timestamp: i64,
    pub amount: u64,
    pub address: String,
    pub public_key: String,
    pub signature: Signature,
}

/// Sentinel input of a mining reward. Encodes as
/// `{"address": "*--official-mining-reward--*"}` and decodes from nothing else.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RewardInputRepr", into = "RewardInputRepr")]
pub struct RewardInput;

#[derive(Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RewardInputRepr {
    address: String,
}

impl TryFrom<RewardInputRepr> for RewardInput {
    type Error = String;

    fn try_from(repr: RewardInputRepr) -> Result<Self, Self::Error> {
        if repr.address == MINING_REWARD_ADDRESS {
            Ok(RewardInput)
        } else {
            Err(format!("unexpected reward input address {}", repr.address))
        }
    }
}

impl From<RewardInput> for RewardInputRepr {
    fn from(_: RewardInput) -> Self {
        Self {
            address: MINING_REWARD_ADDRESS.to_string(),
        }
    }
}

impl TransferInput {
    fn signed(sender: &Wallet, amount: u64, output: &Output) -> Self {
        Self {
            timestamp: now_nanos(),
            amount,
            address: sender.address().to_string(),
            public_key: sender.public_key_hex(),
            signature: sender.sign(output),
        }
    }
}

impl Input {
    /// Address of the sender, if this is a transfer.
    pub fn sender(&self) -> Option<&str> {
        match self {
            Input::Transfer(input) => Some(&input.address),
            Input::Reward(_) => None,
        }
    }
}

impl Transaction {
    /// Send `amount` to `recipient`, spending the sender's whole balance as of
    /// `chain` and returning the remainder to the sender.
    pub fn new(
        sender: &Wallet,
        chain: &[Block],
        recipient: &str,
        amount: u64,
    ) -> Result<Self, TransactionError> {
        let balance = sender.balance(chain);
        if amount > balance {
            return Err(TransactionError::InsufficientBalance { amount, balance });
        }

        let mut output = Output::new();
        output.insert(recipient.to_string(), amount);
        *output.entry(sender.address().to_string()).or_insert(0) += balance - amount;

        let input = TransferInput::signed(sender, balance, &output);
        Ok(Self {
            id: short_id(),
            output,
            input: Input::Transfer(input),
        })
    }

    /// Pay `amount` more to `recipient` out of the sender's remaining output.
    ///
    /// Returns the amended transaction and leaves `self` untouched. The id is
    /// kept, so the amended copy replaces the original in a pool.
    pub fn update(
        &self,
        sender: &Wallet,
        recipient: &str,
        amount: u64,
    ) -> Result<Self, TransactionError> {
        let remaining = self.output.get(sender.address()).copied().unwrap_or(0);
        if amount > remaining {
            return Err(TransactionError::InsufficientBalance {
                amount,
                balance: remaining,
            });
        }

        let mut output = self.output.clone();
        *output.entry(recipient.to_string()).or_insert(0) += amount;
        if let Some(own) = output.get_mut(sender.address()) {
            *own -= amount;
        }

        let input_amount = match &self.input {
            Input::Transfer(input) => input.amount,
            Input::Reward(_) => MINING_REWARD,
        };
        let input = TransferInput::signed(sender, input_amount, &output);
        Ok(Self {
            id: self.id.clone(),
            output,
            input: Input::Transfer(input),
        })
    }

    /// Reward paid to the miner of a block.
    pub fn reward(miner: &Wallet) -> Self {
        let mut output = Output::new();
        output.insert(miner.address().to_string(), MINING_REWARD);
        Self {
            id: short_id(),
            output,
            input: Input::Reward(RewardInput),
        }
    }

    /// Standalone rules: a reward pays exactly [`MINING_REWARD`] to one
    /// address; a transfer's outputs sum to its input amount and carry a valid
    /// signature.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let input = match &self.input {
            Input::Reward(_) => {
                let mut values = self.output.values();
                return match (values.next(), values.next()) {
                    (Some(&MINING_REWARD), None) => Ok(()),
                    _ => Err(ValidationError::InvalidReward {
                        id: self.id.clone(),
                    }),
                };
            }
            Input::Transfer(input) => input,
        };

        let output_total: u128 = self.output.values().map(|v| u128::from(*v)).sum();
        if output_total != u128::from(input.amount) {
            return Err(ValidationError::OutputMismatch {
                id: self.id.clone(),
                input_amount: input.amount,
                output_total,
            });
        }

        if !Wallet::verify(&input.public_key, &self.output, &input.signature) {
            return Err(ValidationError::InvalidSignature {
                id: self.id.clone(),
            });
        }

        Ok(())
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
