//! # Ownership Registry
//!
//! The [`AssetRegistry`] trait is the only external collaborator the
//! listing ledger has. It tracks who owns each asset, which operators an
//! owner has approved to move a specific asset on their behalf, and it
//! performs the actual transfer at settlement time.
//!
//! [`InMemoryAssetRegistry`] is the reference implementation. It keeps
//! the whole ownership table behind a `parking_lot::RwLock` so the trait
//! methods can take `&self` and the registry can be shared behind an
//! `Arc` — concurrency coordination lives inside the implementation, not
//! in the trait.
//!
//! Transfer failure is a first-class outcome: a receiver may be unable to
//! accept an asset (no receiver hook, frozen account, compliance hold).
//! The in-memory registry models this with a receiver block-list, which
//! is also how the ledger's rollback paths are exercised in tests.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

use crate::asset::{Address, AssetKey};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during registry operations.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// The referenced asset has never been minted.
    #[error("unknown asset: {0}")]
    UnknownAsset(AssetKey),

    /// A transfer named a `from` address that is not the current owner.
    #[error("wrong owner for {key}: {claimed} claimed, {actual} holds it")]
    WrongOwner {
        /// The asset being transferred.
        key: AssetKey,
        /// The address the caller claimed owns the asset.
        claimed: Address,
        /// The address that actually owns it.
        actual: Address,
    },

    /// The receiver cannot accept the asset.
    #[error("receiver {receiver} cannot accept {key}")]
    ReceiverRejected {
        /// The asset being transferred.
        key: AssetKey,
        /// The address that rejected it.
        receiver: Address,
    },

    /// Attempted to mint an asset key that already exists.
    #[error("asset {0} is already minted")]
    AlreadyMinted(AssetKey),
}

// ---------------------------------------------------------------------------
// Trait
// ---------------------------------------------------------------------------

/// Ownership and approval tracking for the assets traded on Agora.
///
/// Implementations must be shareable across threads (`Send + Sync`) and
/// handle their own interior locking; the ledger calls these methods
/// while holding its own state lock.
pub trait AssetRegistry: Send + Sync {
    /// Returns the current owner of the asset.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownAsset`] if the asset was never minted.
    fn owner_of(&self, key: &AssetKey) -> Result<Address, RegistryError>;

    /// Returns `true` if `operator` is approved to move this specific asset
    /// on the owner's behalf.
    ///
    /// Unknown assets simply report `false` — approval is meaningless
    /// without ownership.
    fn is_approved_for(&self, key: &AssetKey, operator: &str) -> bool;

    /// Transfers the asset from `from` to `to` and clears any outstanding
    /// approval on it.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownAsset`] if the asset was never minted,
    /// [`RegistryError::WrongOwner`] if `from` is not the current owner, and
    /// [`RegistryError::ReceiverRejected`] if `to` cannot accept the asset.
    fn transfer(&self, key: &AssetKey, from: &str, to: &str) -> Result<(), RegistryError>;
}

// ---------------------------------------------------------------------------
// In-Memory Implementation
// ---------------------------------------------------------------------------

/// Ownership table: owners, per-asset approvals, blocked receivers.
#[derive(Debug, Default, Clone)]
struct RegistryState {
    /// Current owner of each minted asset.
    owners: HashMap<AssetKey, Address>,
    /// Per-asset operator approvals. Cleared on transfer.
    approvals: HashMap<AssetKey, Address>,
    /// Addresses that refuse incoming transfers.
    blocked_receivers: HashSet<Address>,
}

/// Reference registry backed by in-memory maps.
///
/// In production the ownership table would live in the issuing chain or a
/// persistent store; this implementation exists for tests and as the
/// template for real backends. All methods take `&self` — state lives
/// behind an interior `RwLock`.
#[derive(Debug, Default)]
pub struct InMemoryAssetRegistry {
    state: RwLock<RegistryState>,
}

impl InMemoryAssetRegistry {
    /// Creates an empty registry: no assets, no approvals, no blocks.
    pub fn new() -> Self {
        Self::default()
    }

    /// Mints a new asset to `owner`.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::AlreadyMinted`] if the key already exists.
    pub fn mint(&self, key: AssetKey, owner: impl Into<Address>) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if state.owners.contains_key(&key) {
            return Err(RegistryError::AlreadyMinted(key));
        }
        state.owners.insert(key, owner.into());
        Ok(())
    }

    /// Approves `operator` to move the asset. Replaces any prior approval.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::UnknownAsset`] if the asset was never minted.
    pub fn set_approval(
        &self,
        key: &AssetKey,
        operator: impl Into<Address>,
    ) -> Result<(), RegistryError> {
        let mut state = self.state.write();
        if !state.owners.contains_key(key) {
            return Err(RegistryError::UnknownAsset(key.clone()));
        }
        state.approvals.insert(key.clone(), operator.into());
        Ok(())
    }

    /// Removes any approval on the asset. A no-op if none exists.
    pub fn revoke_approval(&self, key: &AssetKey) {
        self.state.write().approvals.remove(key);
    }

    /// Marks `receiver` as unable to accept transfers.
    pub fn block_receiver(&self, receiver: impl Into<Address>) {
        self.state.write().blocked_receivers.insert(receiver.into());
    }

    /// Re-enables transfers to `receiver`.
    pub fn unblock_receiver(&self, receiver: &str) {
        self.state.write().blocked_receivers.remove(receiver);
    }

    /// Returns every asset currently owned by `owner`.
    pub fn assets_of(&self, owner: &str) -> Vec<AssetKey> {
        self.state
            .read()
            .owners
            .iter()
            .filter(|(_, holder)| holder.as_str() == owner)
            .map(|(key, _)| key.clone())
            .collect()
    }

    /// Returns the number of minted assets.
    pub fn asset_count(&self) -> usize {
        self.state.read().owners.len()
    }
}

impl AssetRegistry for InMemoryAssetRegistry {
    fn owner_of(&self, key: &AssetKey) -> Result<Address, RegistryError> {
        self.state
            .read()
            .owners
            .get(key)
            .cloned()
            .ok_or_else(|| RegistryError::UnknownAsset(key.clone()))
    }

    fn is_approved_for(&self, key: &AssetKey, operator: &str) -> bool {
        self.state
            .read()
            .approvals
            .get(key)
            .is_some_and(|approved| approved.as_str() == operator)
    }

    fn transfer(&self, key: &AssetKey, from: &str, to: &str) -> Result<(), RegistryError> {
        let mut state = self.state.write();

        let owner = state
            .owners
            .get(key)
            .ok_or_else(|| RegistryError::UnknownAsset(key.clone()))?;

        if owner.as_str() != from {
            return Err(RegistryError::WrongOwner {
                key: key.clone(),
                claimed: from.to_string(),
                actual: owner.clone(),
            });
        }

        if state.blocked_receivers.contains(to) {
            return Err(RegistryError::ReceiverRejected {
                key: key.clone(),
                receiver: to.to_string(),
            });
        }

        state.owners.insert(key.clone(), to.to_string());
        // A transfer invalidates whatever the previous owner approved.
        state.approvals.remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn key() -> AssetKey {
        AssetKey::new("atelier", 7)
    }

    #[test]
    fn mint_assigns_owner() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        assert_eq!(registry.owner_of(&key()).unwrap(), "alice");
        assert_eq!(registry.asset_count(), 1);
    }

    #[test]
    fn double_mint_rejected() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        let result = registry.mint(key(), "bob");
        assert!(matches!(result, Err(RegistryError::AlreadyMinted(_))));
    }

    #[test]
    fn owner_of_unknown_asset_rejected() {
        let registry = InMemoryAssetRegistry::new();
        let result = registry.owner_of(&key());
        assert!(matches!(result, Err(RegistryError::UnknownAsset(_))));
    }

    #[test]
    fn approval_is_per_asset_and_exact() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        registry.set_approval(&key(), "market").unwrap();

        assert!(registry.is_approved_for(&key(), "market"));
        assert!(!registry.is_approved_for(&key(), "someone_else"));
        assert!(!registry.is_approved_for(&AssetKey::new("atelier", 8), "market"));
    }

    #[test]
    fn approval_on_unknown_asset_rejected() {
        let registry = InMemoryAssetRegistry::new();
        let result = registry.set_approval(&key(), "market");
        assert!(matches!(result, Err(RegistryError::UnknownAsset(_))));
    }

    #[test]
    fn revoke_approval_clears_it() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        registry.set_approval(&key(), "market").unwrap();
        registry.revoke_approval(&key());
        assert!(!registry.is_approved_for(&key(), "market"));
    }

    #[test]
    fn transfer_moves_ownership_and_clears_approval() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        registry.set_approval(&key(), "market").unwrap();

        registry.transfer(&key(), "alice", "bob").unwrap();

        assert_eq!(registry.owner_of(&key()).unwrap(), "bob");
        assert!(!registry.is_approved_for(&key(), "market"));
    }

    #[test]
    fn transfer_from_non_owner_rejected() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        let result = registry.transfer(&key(), "mallory", "bob");
        assert!(matches!(result, Err(RegistryError::WrongOwner { .. })));
        assert_eq!(registry.owner_of(&key()).unwrap(), "alice");
    }

    #[test]
    fn transfer_to_blocked_receiver_rejected() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(key(), "alice").unwrap();
        registry.block_receiver("bob");

        let result = registry.transfer(&key(), "alice", "bob");
        assert!(matches!(result, Err(RegistryError::ReceiverRejected { .. })));
        assert_eq!(registry.owner_of(&key()).unwrap(), "alice");

        registry.unblock_receiver("bob");
        registry.transfer(&key(), "alice", "bob").unwrap();
        assert_eq!(registry.owner_of(&key()).unwrap(), "bob");
    }

    #[test]
    fn assets_of_lists_current_holdings() {
        let registry = InMemoryAssetRegistry::new();
        registry.mint(AssetKey::new("atelier", 1), "alice").unwrap();
        registry.mint(AssetKey::new("atelier", 2), "alice").unwrap();
        registry.mint(AssetKey::new("bazaar", 1), "bob").unwrap();

        let mut held = registry.assets_of("alice");
        held.sort_by_key(|k| k.asset_id);
        assert_eq!(held.len(), 2);
        assert_eq!(held[0], AssetKey::new("atelier", 1));
        assert_eq!(held[1], AssetKey::new("atelier", 2));
    }
}
