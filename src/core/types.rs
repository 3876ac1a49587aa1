//! Common types used across auditkit modules.

/// Timestamp wrapper for consistent serialization.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Get current UTC timestamp.
pub fn now() -> Timestamp {
    chrono::Utc::now()
}

/// Hex-encoded SHA3-256 digest over a sequence of parts.
pub fn sha3_hex(parts: &[&[u8]]) -> String {
    use sha3::{Digest, Sha3_256};

    let mut hasher = Sha3_256::new();
    for part in parts {
        hasher.update(part);
    }
    hex::encode(hasher.finalize())
}
