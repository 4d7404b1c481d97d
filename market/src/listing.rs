//! # Listing Map
//!
//! A [`Listing`] is an active offer to sell one asset at a fixed price.
//! The [`ListingBook`] maps [`AssetKey`] to its listing, if any. Absence
//! of a key means "not listed" — there is no tombstone state, and a zero
//! price never enters the book (the ledger guards reject it before
//! insertion), so existence of an entry always means an active,
//! purchasable listing.
//!
//! The book is deliberately dumb storage: precondition checks (ownership,
//! approval, price validation) live in [`crate::ledger`], which is the
//! only writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use agora_registry::{Address, AssetKey};

/// An active fixed-price offer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Listing {
    /// The address that listed the asset and will be credited on sale.
    pub seller: Address,

    /// Asking price in smallest currency units. Always strictly positive
    /// for a listing that exists in the book.
    pub price: u64,

    /// When the listing was created.
    pub listed_at: DateTime<Utc>,

    /// When the price was last changed. Equals `listed_at` until the
    /// first update.
    pub updated_at: DateTime<Utc>,
}

impl Listing {
    /// Creates a fresh listing with both timestamps set to now.
    pub fn new(seller: impl Into<Address>, price: u64) -> Self {
        let now = Utc::now();
        Self {
            seller: seller.into(),
            price,
            listed_at: now,
            updated_at: now,
        }
    }
}

/// All active listings, keyed by asset.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ListingBook {
    /// Active listings indexed by asset key.
    #[serde(with = "asset_key_map")]
    listings: HashMap<AssetKey, Listing>,
}

/// Serde helper: composite [`AssetKey`] map keys are not valid JSON object
/// keys, so the map crosses the serialization boundary as a sequence of
/// `(key, listing)` pairs.
mod asset_key_map {
    use super::{AssetKey, HashMap, Listing};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S>(
        map: &HashMap<AssetKey, Listing>,
        serializer: S,
    ) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let entries: Vec<(&AssetKey, &Listing)> = map.iter().collect();
        entries.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<HashMap<AssetKey, Listing>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let entries: Vec<(AssetKey, Listing)> = Vec::deserialize(deserializer)?;
        Ok(entries.into_iter().collect())
    }
}

impl ListingBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the listing for `key`, if one is active.
    pub fn get(&self, key: &AssetKey) -> Option<&Listing> {
        self.listings.get(key)
    }

    /// Returns `true` if `key` has an active listing.
    pub fn contains(&self, key: &AssetKey) -> bool {
        self.listings.contains_key(key)
    }

    /// Inserts a listing for `key`, returning whatever was there before.
    ///
    /// The ledger checks for an existing entry first; a `Some` return here
    /// means that guard was bypassed.
    pub fn insert(&mut self, key: AssetKey, listing: Listing) -> Option<Listing> {
        self.listings.insert(key, listing)
    }

    /// Removes and returns the listing for `key`.
    pub fn remove(&mut self, key: &AssetKey) -> Option<Listing> {
        self.listings.remove(key)
    }

    /// Replaces the price of an existing listing, bumping `updated_at`.
    /// Returns `false` if no listing exists for `key`.
    pub fn set_price(&mut self, key: &AssetKey, price: u64) -> bool {
        match self.listings.get_mut(key) {
            Some(listing) => {
                listing.price = price;
                listing.updated_at = Utc::now();
                true
            }
            None => false,
        }
    }

    /// Returns all active listings as `(key, listing)` pairs.
    pub fn active(&self) -> Vec<(AssetKey, Listing)> {
        self.listings
            .iter()
            .map(|(key, listing)| (key.clone(), listing.clone()))
            .collect()
    }

    /// Returns the number of active listings.
    pub fn len(&self) -> usize {
        self.listings.len()
    }

    /// Returns `true` if nothing is listed.
    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AssetKey {
        AssetKey::new("atelier", 7)
    }

    #[test]
    fn insert_and_get() {
        let mut book = ListingBook::new();
        book.insert(key(), Listing::new("alice", 100));

        let listing = book.get(&key()).unwrap();
        assert_eq!(listing.seller, "alice");
        assert_eq!(listing.price, 100);
        assert_eq!(book.len(), 1);
    }

    #[test]
    fn remove_returns_listing_and_frees_key() {
        let mut book = ListingBook::new();
        book.insert(key(), Listing::new("alice", 100));

        let removed = book.remove(&key()).unwrap();
        assert_eq!(removed.price, 100);
        assert!(book.get(&key()).is_none());
        assert!(book.is_empty());
    }

    #[test]
    fn set_price_replaces_and_bumps_updated_at() {
        let mut book = ListingBook::new();
        book.insert(key(), Listing::new("alice", 100));

        assert!(book.set_price(&key(), 250));
        let listing = book.get(&key()).unwrap();
        assert_eq!(listing.price, 250);
        assert!(listing.updated_at >= listing.listed_at);
    }

    #[test]
    fn set_price_on_missing_key_is_false() {
        let mut book = ListingBook::new();
        assert!(!book.set_price(&key(), 250));
    }

    #[test]
    fn active_lists_everything() {
        let mut book = ListingBook::new();
        book.insert(AssetKey::new("atelier", 1), Listing::new("alice", 10));
        book.insert(AssetKey::new("atelier", 2), Listing::new("bob", 20));

        let mut all = book.active();
        all.sort_by_key(|(k, _)| k.asset_id);
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].1.seller, "alice");
        assert_eq!(all[1].1.price, 20);
    }

    #[test]
    fn book_serialization_roundtrip() {
        let mut book = ListingBook::new();
        book.insert(key(), Listing::new("alice", 100));

        let json = serde_json::to_string(&book).unwrap();
        let restored: ListingBook = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.get(&key()).unwrap().price, 100);
    }
}
