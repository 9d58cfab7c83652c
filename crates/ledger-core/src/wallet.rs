use rand::rngs::OsRng;
use secp256k1::{ecdsa, Message, PublicKey, Secp256k1, SecretKey};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::block::Block;
use crate::hash::{canonical_bytes, sha256};
use crate::{ledger, short_id};

/// ECDSA signature as its two scalars `(r, s)`.
///
/// Each scalar is a 256-bit unsigned integer, carried as 64 characters of
/// big-endian lowercase hex, since JSON numbers do not hold 256-bit integers
/// portably. On the wire it is the pair `["<r hex>", "<s hex>"]`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Signature(pub String, pub String);

impl Signature {
    pub fn r(&self) -> &str {
        &self.0
    }

    pub fn s(&self) -> &str {
        &self.1
    }

    fn from_ecdsa(sig: &ecdsa::Signature) -> Self {
        let compact = sig.serialize_compact();
        Self(hex::encode(&compact[..32]), hex::encode(&compact[32..]))
    }

    fn to_ecdsa(&self) -> Option<ecdsa::Signature> {
        let mut compact = hex::decode(&self.0).ok()?;
        if compact.len() != 32 {
            return None;
        }
        let s = hex::decode(&self.1).ok()?;
        if s.len() != 32 {
            return None;
        }
        compact.extend_from_slice(&s);
        ecdsa::Signature::from_compact(&compact).ok()
    }
}

/// A keypair on secp256k1 plus the short address it transacts under.
///
/// The wallet stores no balance: [`Wallet::balance`] replays the chain it is
/// given.
#[derive(Clone)]
pub struct Wallet {
    address: String,
    secret_key: SecretKey,
    public_key: PublicKey,
}

impl fmt::Debug for Wallet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Wallet")
            .field("address", &self.address)
            .field("public_key", &self.public_key_hex())
            .finish_non_exhaustive()
    }
}

impl Default for Wallet {
    fn default() -> Self {
        Self::new()
    }
}

impl Wallet {
    pub fn new() -> Self {
        let secp = Secp256k1::new();
        let (secret_key, public_key) = secp.generate_keypair(&mut OsRng);
        Self {
            address: short_id(),
            secret_key,
            public_key,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    /// Hex of the compressed SEC1 public key (33 bytes).
    pub fn public_key_hex(&self) -> String {
        hex::encode(self.public_key.serialize())
    }

    /// Balance of this wallet's address as of the end of `chain`.
    pub fn balance(&self, chain: &[Block]) -> u64 {
        ledger::balance(chain, &self.address)
    }

    /// Sign the canonical json encoding of `data`.
    pub fn sign<T: Serialize + ?Sized>(&self, data: &T) -> Signature {
        let secp = Secp256k1::signing_only();
        let msg = message_for(data);
        Signature::from_ecdsa(&secp.sign_ecdsa(&msg, &self.secret_key))
    }

    /// Check `signature` over the canonical json of `data` under `public_key`
    /// (hex, compressed or uncompressed). Malformed keys or signatures verify
    /// as false.
    pub fn verify<T: Serialize + ?Sized>(public_key: &str, data: &T, signature: &Signature) -> bool {
        let Ok(pk_bytes) = hex::decode(public_key) else {
            return false;
        };
        let Ok(pk) = PublicKey::from_slice(&pk_bytes) else {
            return false;
        };
        let Some(mut sig) = signature.to_ecdsa() else {
            return false;
        };
        sig.normalize_s();
        let secp = Secp256k1::verification_only();
        secp.verify_ecdsa(&message_for(data), &sig, &pk).is_ok()
    }
}

fn message_for<T: Serialize + ?Sized>(data: &T) -> Message {
    Message::from_digest(sha256(&canonical_bytes(data)))
}
