//! Cache entry key generation.

use sha2::{Digest, Sha256};

/// Compute the primary key for a cached entry.
///
/// The same URL stored in two partitions yields two distinct keys.
pub fn compute_entry_key(partition: &str, url: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(partition.as_bytes());
    hasher.update(b"\n");
    hasher.update(url.as_bytes());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_stability() {
        let key1 = compute_entry_key("jarvis-static-v1", "https://example.com/app.js");
        let key2 = compute_entry_key("jarvis-static-v1", "https://example.com/app.js");
        assert_eq!(key1, key2);
    }

    #[test]
    fn test_key_differs_by_partition() {
        let static_key = compute_entry_key("jarvis-static-v1", "https://example.com/app.js");
        let dynamic_key = compute_entry_key("jarvis-dynamic-v1", "https://example.com/app.js");
        assert_ne!(static_key, dynamic_key);
    }

    #[test]
    fn test_key_separator_prevents_ambiguity() {
        assert_ne!(compute_entry_key("ab", "c"), compute_entry_key("a", "bc"));
    }

    #[test]
    fn test_key_format() {
        let key = compute_entry_key("p", "https://example.com");
        assert_eq!(key.len(), 64);
        assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
