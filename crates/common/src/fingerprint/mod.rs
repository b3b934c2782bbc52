//! Content fingerprints
//!
//! A fingerprint is the lowercase hex SHA-256 of the content a monitor
//! extracted from a source. Change detection only ever compares fingerprints,
//! never the content itself.

use crate::errors::{AppError, Result};
use sha2::{Digest, Sha256};

/// Length of a fingerprint in hex characters
pub const FINGERPRINT_LEN: usize = 64;

/// Compute the fingerprint of a piece of content
pub fn content_fingerprint(content: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(content.as_bytes());
    hex::encode(hasher.finalize())
}

/// Whether `value` has the shape of a fingerprint
pub fn is_fingerprint(value: &str) -> bool {
    value.len() == FINGERPRINT_LEN && value.bytes().all(|b| b.is_ascii_hexdigit())
}

/// Validate a fingerprint supplied by a caller, normalizing it to lowercase
pub fn parse_fingerprint(field: &str, value: &str) -> Result<String> {
    let value = value.trim();
    if !is_fingerprint(value) {
        return Err(AppError::InvalidFormat {
            message: format!(
                "{} must be {} hexadecimal characters, got {:?}",
                field, FINGERPRINT_LEN, value
            ),
        });
    }
    Ok(value.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_digest() {
        assert_eq!(
            content_fingerprint(""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn test_fingerprint_is_fixed_length() {
        let short = content_fingerprint("a");
        let long = content_fingerprint(&"HMRC update ".repeat(500));
        assert_eq!(short.len(), FINGERPRINT_LEN);
        assert_eq!(long.len(), FINGERPRINT_LEN);
        assert!(is_fingerprint(&short));
        assert_ne!(short, long);
    }

    #[test]
    fn test_parse_fingerprint() {
        let upper = content_fingerprint("x").to_ascii_uppercase();
        assert_eq!(parse_fingerprint("hash", &upper).unwrap(), content_fingerprint("x"));

        // MD5-sized hashes are rejected
        let err = parse_fingerprint("hash", "d41d8cd98f00b204e9800998ecf8427e").unwrap_err();
        assert!(matches!(err, AppError::InvalidFormat { .. }));

        assert!(parse_fingerprint("hash", &"g".repeat(64)).is_err());
    }
}
