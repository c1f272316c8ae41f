//! Blake3 hashing utilities for deterministic artifact names

/// Hash raw bytes with blake3.
pub(crate) fn hash_bytes(data: &[u8]) -> blake3::Hash {
    blake3::hash(data)
}

/// Return the first 8 hex characters of a blake3 hash.
pub(crate) fn short_hash(hash: &blake3::Hash) -> String {
    hash.to_hex()[..8].to_string()
}

/// Short, filesystem-safe digest of an item within its feed.
///
/// Covers both ids (NUL-separated), so the same article carried by two
/// feeds gets two digests. Stable across runs, which keeps artifact paths
/// deterministic.
pub fn item_digest(feed_id: &str, item_id: &str) -> String {
    let mut hasher = blake3::Hasher::new();
    hasher.update(feed_id.as_bytes());
    hasher.update(&[0]);
    hasher.update(item_id.as_bytes());
    short_hash(&hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_bytes_deterministic() {
        assert_eq!(hash_bytes(b"hello"), hash_bytes(b"hello"));
    }

    #[test]
    fn hash_bytes_different_input() {
        assert_ne!(hash_bytes(b"hello"), hash_bytes(b"world"));
    }

    #[test]
    fn short_hash_length() {
        assert_eq!(short_hash(&hash_bytes(b"test")).len(), 8);
    }

    #[test]
    fn item_digest_is_stable_hex() {
        let a = item_digest("bbc", "https://example.com/news/1");
        let b = item_digest("bbc", "https://example.com/news/1");
        assert_eq!(a, b);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
        assert_ne!(a, item_digest("bbc", "https://example.com/news/2"));
    }

    #[test]
    fn item_digest_depends_on_feed() {
        let item = "https://example.com/news/1";
        assert_ne!(item_digest("a/b", item), item_digest("a_b", item));
    }

    #[test]
    fn item_digest_separates_ids() {
        assert_ne!(item_digest("ab", "c"), item_digest("a", "bc"));
    }
}
