use serde::Serialize;
use sha2::{Digest, Sha256};

/// SHA-256 over the canonical JSON encoding of `value`, as lowercase hex.
///
/// Callers hash tuples, so the field order is part of the preimage: `(a, b)`
/// and `(b, a)` give different digests.
pub fn crypto_hash<T: Serialize + ?Sized>(value: &T) -> String {
    hex::encode(sha256(&canonical_bytes(value)))
}

pub fn sha256(bytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest[..]);
    out
}

/// Canonical JSON bytes shared by block hashing and transaction signing.
///
/// Every type in this crate serializes maps as `BTreeMap` with string keys, so
/// encoding cannot fail for them.
pub fn canonical_bytes<T: Serialize + ?Sized>(value: &T) -> Vec<u8> {
    serde_json::to_vec(value).expect("ledger types always encode to json")
}
