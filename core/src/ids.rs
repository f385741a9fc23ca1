use sha2::{Digest, Sha256};
use ulid::Ulid;

pub fn session_id_ulid() -> String {
    format!("s_{}", Ulid::new())
}

pub fn sha256_hex(bytes: &[u8]) -> String {
    let mut h = Sha256::new();
    h.update(bytes);
    hex::encode(h.finalize())
}

/// Stable replacement id for an item whose source id was already taken by an
/// earlier item in the same payload.
pub fn disambiguated_item_id(raw_id: &str, shop_index: usize, position: usize) -> String {
    let digest = sha256_hex(format!("{}:{}:{}", shop_index, position, raw_id).as_bytes());
    format!("{}-{}", raw_id, &digest[..8])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_ids_are_prefixed_and_unique() {
        let a = session_id_ulid();
        let b = session_id_ulid();
        assert!(a.starts_with("s_"));
        assert_eq!(a.len(), 28);
        assert_ne!(a, b);
    }

    #[test]
    fn disambiguated_id_is_deterministic() {
        let a = disambiguated_item_id("0", 1, 0);
        assert_eq!(a, disambiguated_item_id("0", 1, 0));
        assert_ne!(a, disambiguated_item_id("0", 2, 0));
        assert!(a.starts_with("0-"));
        assert_eq!(a.len(), 2 + 8);
    }
}
