use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 digest.
pub type Hash = String;

/// SHA-256 over the raw bytes (UTF-8 for strings), rendered as lowercase hex.
pub fn sha256_hex(data: impl AsRef<[u8]>) -> Hash {
    let mut hasher = Sha256::new();
    hasher.update(data.as_ref());
    hex::encode(hasher.finalize())
}

/// Number of leading `'0'` hex digits in `hash`.
pub fn count_leading_zero_digits(hash: &str) -> usize {
    hash.bytes().take_while(|b| *b == b'0').count()
}

/// True if `hash` starts with at least `difficulty` zero hex digits.
pub fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
    count_leading_zero_digits(hash) >= difficulty as usize
}
