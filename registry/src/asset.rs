//! # Asset Identity
//!
//! Naming things is half the battle in a marketplace. An asset is never
//! identified by a bare number — collections from different issuers reuse
//! the same numeric ids freely — so every map in Agora is keyed by the
//! composite [`AssetKey`].

use serde::{Deserialize, Serialize};

/// Identity of a marketplace participant.
///
/// Formatted as a hex-encoded public key. The ledger treats addresses as
/// opaque — it never parses or derives them, only compares for equality
/// and keys maps with them.
pub type Address = String;

/// Composite identifier for a single non-fungible asset.
///
/// A collection identifier (the issuing contract or registry namespace)
/// plus the asset's numeric id within that collection. Two assets with
/// the same `asset_id` in different collections are unrelated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssetKey {
    /// The collection this asset belongs to.
    pub collection: String,
    /// The asset's id within its collection.
    pub asset_id: u64,
}

impl AssetKey {
    /// Builds a key from a collection identifier and asset id.
    pub fn new(collection: impl Into<String>, asset_id: u64) -> Self {
        Self {
            collection: collection.into(),
            asset_id,
        }
    }
}

impl std::fmt::Display for AssetKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}#{}", self.collection, self.asset_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_renders_collection_and_id() {
        let key = AssetKey::new("atelier", 7);
        assert_eq!(key.to_string(), "atelier#7");
    }

    #[test]
    fn same_id_different_collection_is_distinct() {
        let a = AssetKey::new("atelier", 1);
        let b = AssetKey::new("bazaar", 1);
        assert_ne!(a, b);
    }

    #[test]
    fn key_serialization_roundtrip() {
        let key = AssetKey::new("atelier", 42);
        let json = serde_json::to_string(&key).unwrap();
        let restored: AssetKey = serde_json::from_str(&json).unwrap();
        assert_eq!(key, restored);
    }
}
