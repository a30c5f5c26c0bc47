use sha2::{Digest, Sha256};

/// One-way hash of a password credential, as lowercase hex SHA-256.
///
/// The hash is deterministic so that login can look up an exact
/// (username, hash) pair.
pub fn hash_password(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    hex::encode(hasher.finalize())
}
