//! Salted credential digests and Aadhaar lookup digests.
//!
//! Passwords are stored as hex SHA-256 over `salt || password` with a
//! random per-account salt; Aadhaar numbers are stored only as an
//! unsalted digest so they can serve as a lookup key.

use rand::RngCore;
use sha2::{Digest, Sha256};

const SALT_BYTES: usize = 16;

pub fn generate_salt() -> String {
    let mut bytes = [0u8; SALT_BYTES];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex_encode(&bytes)
}

pub fn digest_password(password: &str, salt: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(salt.as_bytes());
    hasher.update(password.as_bytes());
    hex_encode(&hasher.finalize())
}

pub fn verify_password(password: &str, salt: &str, expected_digest: &str) -> bool {
    constant_time_eq(&digest_password(password, salt), expected_digest)
}

pub fn digest_aadhaar(aadhaar: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(aadhaar.as_bytes());
    hex_encode(&hasher.finalize())
}

/// Byte-wise comparison that does not short-circuit on the first
/// mismatch. Inputs of different lengths compare unequal immediately,
/// which leaks only the length of fixed-width digests.
pub fn constant_time_eq(left: &str, right: &str) -> bool {
    let left = left.as_bytes();
    let right = right.as_bytes();
    if left.len() != right.len() {
        return false;
    }
    left.iter().zip(right).fold(0u8, |acc, (l, r)| acc | (l ^ r)) == 0
}

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}
