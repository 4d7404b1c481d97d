//! # Market Ledger
//!
//! The state machine at the center of Agora. Per asset key the lifecycle
//! is:
//!
//! ```text
//!              list
//!    ┌──────────────────────┐
//!    │                      ▼
//! ┌──┴───────┐         ┌────────┐ ─┐
//! │ Unlisted  │         │ Listed │  │ update (price change)
//! └──▲────▲──┘         └─┬───┬──┘ ◄┘
//!    │    │   cancel     │   │
//!    │    └──────────────┘   │
//!    │          buy          │
//!    └───────────────────────┘
//! ```
//!
//! No terminal state — a key freed by `cancel` or `buy` can be listed
//! again immediately.
//!
//! ## Atomicity
//!
//! Every operation runs under one [`Mutex`] held for its full duration,
//! external collaborator calls included. Within an operation the order is
//! always checks, then local effects, then the external interaction; if
//! the interaction fails, the local effects are undone before the lock is
//! released, so no caller ever observes a partial operation.
//!
//! ## Settlement
//!
//! `buy` credits the seller's proceeds balance and moves the asset; it
//! never pushes value to the seller. Value moves only when the seller
//! calls `withdraw`, through the [`PaymentConduit`] seam. Overpayment on
//! `buy` is permitted and accrues to the seller in full.

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use agora_registry::{Address, AssetKey, AssetRegistry, RegistryError};

use crate::events::{EventEnvelope, EventLog, MarketEvent};
use crate::listing::{Listing, ListingBook};
use crate::payout::{PaymentConduit, PayoutError};
use crate::proceeds::{ProceedsBook, ProceedsError};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors surfaced by ledger operations.
///
/// Every variant carries the offending parameters so callers can render a
/// precise message without re-reading ledger state.
#[derive(Debug, Error)]
pub enum MarketError {
    /// Listings require a strictly positive price.
    #[error("invalid price {price} for {key}: listings require a positive price")]
    InvalidPrice {
        /// The asset being listed or re-priced.
        key: AssetKey,
        /// The rejected price.
        price: u64,
    },

    /// The asset already has an active listing.
    #[error("{key} is already listed")]
    AlreadyListed {
        /// The asset with the existing listing.
        key: AssetKey,
    },

    /// The asset has no active listing.
    #[error("{key} is not listed")]
    NotListed {
        /// The asset without a listing.
        key: AssetKey,
    },

    /// The registry has not approved the market to move this asset.
    #[error("market {operator} is not approved to move {key}")]
    NotApprovedForMarket {
        /// The asset lacking approval.
        key: AssetKey,
        /// The market's operator identity that needs the approval.
        operator: Address,
    },

    /// The caller does not own the asset.
    #[error("{caller} is not the owner of {key}")]
    NotOwner {
        /// The asset in question.
        key: AssetKey,
        /// The caller who is not the owner.
        caller: Address,
    },

    /// The offered payment is below the asking price.
    #[error("offer of {offered} does not meet the asking price {price} for {key}")]
    PriceNotMet {
        /// The asset being bought.
        key: AssetKey,
        /// The asking price.
        price: u64,
        /// The insufficient payment.
        offered: u64,
    },

    /// Withdraw was called with nothing to withdraw.
    #[error("no proceeds to withdraw for {caller}")]
    NoProceeds {
        /// The caller with a zero balance.
        caller: Address,
    },

    /// The registry failed to move the asset; the purchase was rolled back.
    #[error("asset transfer failed for {key}: {source}")]
    TransferFailed {
        /// The asset that did not move.
        key: AssetKey,
        /// The registry's reason.
        #[source]
        source: RegistryError,
    },

    /// The conduit failed to pay out; the balance was restored.
    #[error("payout of {amount} to {caller} failed: {source}")]
    PayoutFailed {
        /// The seller whose withdrawal failed.
        caller: Address,
        /// The amount that did not move.
        amount: u64,
        /// The conduit's reason.
        #[source]
        source: PayoutError,
    },

    /// Proceeds bookkeeping failed (overflow).
    #[error("proceeds bookkeeping failed: {0}")]
    Proceeds(#[from] ProceedsError),
}

// ---------------------------------------------------------------------------
// Ledger State
// ---------------------------------------------------------------------------

/// The two maps the ledger owns, plus the notification log.
///
/// Serializable as a unit so the whole ledger can be snapshotted.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct LedgerState {
    listings: ListingBook,
    proceeds: ProceedsBook,
    events: EventLog,
}

// ---------------------------------------------------------------------------
// MarketLedger
// ---------------------------------------------------------------------------

/// The Agora listing ledger.
///
/// Owns the listing and proceeds maps and enforces every precondition for
/// listing, purchase, and withdrawal. Consults the [`AssetRegistry`] for
/// ownership and approval, instructs it to move assets at purchase time,
/// and pushes value through the [`PaymentConduit`] at withdrawal time.
/// Never takes custody of assets, and holds no value beyond the per-seller
/// proceeds bookkeeping.
///
/// All methods take `&self`; serialization of operations is handled by the
/// internal state lock, so a `MarketLedger` can be shared behind an `Arc`.
pub struct MarketLedger {
    /// The identity the registry must approve before an asset can be
    /// listed here.
    operator: Address,
    registry: Arc<dyn AssetRegistry>,
    conduit: Arc<dyn PaymentConduit>,
    state: Mutex<LedgerState>,
}

impl MarketLedger {
    /// Creates an empty ledger.
    ///
    /// # Arguments
    ///
    /// * `operator` - The market's own identity, as known to the registry.
    ///   Sellers must approve this identity for each asset they list.
    /// * `registry` - Ownership/approval tracking for the traded assets.
    /// * `conduit` - Value transfer used by [`withdraw`](Self::withdraw).
    pub fn new(
        operator: impl Into<Address>,
        registry: Arc<dyn AssetRegistry>,
        conduit: Arc<dyn PaymentConduit>,
    ) -> Self {
        Self {
            operator: operator.into(),
            registry,
            conduit,
            state: Mutex::new(LedgerState::default()),
        }
    }

    /// Returns the market's operator identity.
    pub fn operator(&self) -> &str {
        &self.operator
    }

    // -- mutating operations ------------------------------------------------

    /// Lists an asset for sale at a fixed price.
    ///
    /// The caller must own the asset and must have approved the market's
    /// operator identity with the registry. The asset stays with the
    /// caller — only the offer is recorded here.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::InvalidPrice`] for a zero price,
    /// [`MarketError::AlreadyListed`] if the key has an active listing,
    /// [`MarketError::NotOwner`] if the caller does not own the asset, and
    /// [`MarketError::NotApprovedForMarket`] if the registry has not
    /// approved the market for this asset.
    pub fn list(&self, key: AssetKey, price: u64, caller: &str) -> Result<(), MarketError> {
        let mut state = self.state.lock();

        if price == 0 {
            return Err(MarketError::InvalidPrice { key, price });
        }
        if state.listings.contains(&key) {
            return Err(MarketError::AlreadyListed { key });
        }
        self.ensure_owner(&key, caller)?;
        if !self.registry.is_approved_for(&key, &self.operator) {
            return Err(MarketError::NotApprovedForMarket {
                key,
                operator: self.operator.clone(),
            });
        }

        state.listings.insert(key.clone(), Listing::new(caller, price));
        state.events.emit(MarketEvent::Listed {
            key: key.clone(),
            seller: caller.to_string(),
            price,
        });
        info!(%key, seller = caller, price, "asset listed");
        Ok(())
    }

    /// Purchases a listed asset at its asking price.
    ///
    /// `payment` must meet the asking price; any excess accrues to the
    /// seller with no refund. Settlement order: the seller's proceeds are
    /// credited and the listing deleted first, then the registry moves the
    /// asset from seller to caller. A transfer failure rolls both local
    /// changes back — the purchase either happens entirely or not at all.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotListed`] if the key has no listing,
    /// [`MarketError::PriceNotMet`] if `payment` is below the asking
    /// price, and [`MarketError::TransferFailed`] if the registry refuses
    /// the transfer (with all local state restored).
    pub fn buy(&self, key: AssetKey, caller: &str, payment: u64) -> Result<(), MarketError> {
        let mut state = self.state.lock();

        let listing = state
            .listings
            .get(&key)
            .cloned()
            .ok_or_else(|| MarketError::NotListed { key: key.clone() })?;
        if payment < listing.price {
            return Err(MarketError::PriceNotMet {
                key,
                price: listing.price,
                offered: payment,
            });
        }

        // Effects before the external call: a reentrant or concurrent
        // observer must never see the listing still active once the seller
        // has been credited.
        state.proceeds.credit(&listing.seller, payment)?;
        state.listings.remove(&key);

        if let Err(source) = self.registry.transfer(&key, &listing.seller, caller) {
            // Undo both effects; the operation has no partial-success state.
            state.proceeds.debit(&listing.seller, payment);
            state.listings.insert(key.clone(), listing);
            warn!(%key, buyer = caller, error = %source, "purchase rolled back");
            return Err(MarketError::TransferFailed { key, source });
        }

        state.events.emit(MarketEvent::Purchased {
            key: key.clone(),
            seller: listing.seller.clone(),
            buyer: caller.to_string(),
            price: payment,
        });
        info!(%key, seller = %listing.seller, buyer = caller, payment, "asset purchased");
        Ok(())
    }

    /// Removes an active listing.
    ///
    /// Only the asset's current owner — per the registry, not the stored
    /// seller — may cancel. No balance effect.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotOwner`] if the caller does not own the
    /// asset, whether or not it is listed, and [`MarketError::NotListed`]
    /// if the owner cancels a key that has no listing.
    pub fn cancel(&self, key: AssetKey, caller: &str) -> Result<(), MarketError> {
        let mut state = self.state.lock();

        // Ownership comes first: a non-owner is turned away with the same
        // error whether or not a listing exists.
        self.ensure_owner(&key, caller)?;
        if !state.listings.contains(&key) {
            return Err(MarketError::NotListed { key });
        }

        state.listings.remove(&key);
        state.events.emit(MarketEvent::Canceled {
            key: key.clone(),
            seller: caller.to_string(),
        });
        info!(%key, seller = caller, "listing canceled");
        Ok(())
    }

    /// Changes the asking price of an active listing.
    ///
    /// A zero price is rejected, symmetric with [`list`](Self::list) —
    /// delisting goes through [`cancel`](Self::cancel), never through a
    /// price of zero.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NotOwner`] if the caller does not own the
    /// asset, whether or not it is listed, [`MarketError::NotListed`] if
    /// the owner re-prices a key that has no listing, and
    /// [`MarketError::InvalidPrice`] for a zero price.
    pub fn update(&self, key: AssetKey, new_price: u64, caller: &str) -> Result<(), MarketError> {
        let mut state = self.state.lock();

        // Same guard order as cancel: ownership before listing state.
        self.ensure_owner(&key, caller)?;
        if !state.listings.contains(&key) {
            return Err(MarketError::NotListed { key });
        }
        if new_price == 0 {
            return Err(MarketError::InvalidPrice {
                key,
                price: new_price,
            });
        }

        state.listings.set_price(&key, new_price);
        state.events.emit(MarketEvent::PriceChanged {
            key: key.clone(),
            seller: caller.to_string(),
            price: new_price,
        });
        info!(%key, seller = caller, new_price, "listing re-priced");
        Ok(())
    }

    /// Pays out the caller's entire accumulated proceeds.
    ///
    /// The balance is zeroed first, then the conduit moves the value; if
    /// the conduit rejects the payment the balance is restored in full.
    /// There is no partial withdrawal.
    ///
    /// Returns the amount paid out.
    ///
    /// # Errors
    ///
    /// Returns [`MarketError::NoProceeds`] if the caller's balance is zero
    /// and [`MarketError::PayoutFailed`] if the conduit rejects the
    /// payment (with the balance restored).
    pub fn withdraw(&self, caller: &str) -> Result<u64, MarketError> {
        let mut state = self.state.lock();

        let amount = state.proceeds.take_all(caller);
        if amount == 0 {
            return Err(MarketError::NoProceeds {
                caller: caller.to_string(),
            });
        }

        if let Err(source) = self.conduit.pay(caller, amount) {
            // Cannot overflow: the balance was `amount` moments ago and
            // the lock has been held throughout.
            let restored = state.proceeds.restore(caller, amount);
            debug_assert!(restored.is_ok(), "restore of a just-taken balance overflowed");
            warn!(seller = caller, amount, error = %source, "withdrawal rolled back");
            return Err(MarketError::PayoutFailed {
                caller: caller.to_string(),
                amount,
                source,
            });
        }

        state.events.emit(MarketEvent::ProceedsWithdrawn {
            seller: caller.to_string(),
            amount,
        });
        info!(seller = caller, amount, "proceeds withdrawn");
        Ok(amount)
    }

    // -- reads --------------------------------------------------------------

    /// Returns the active listing for `key`, or `None` if unlisted.
    pub fn listing(&self, key: &AssetKey) -> Option<Listing> {
        self.state.lock().listings.get(key).cloned()
    }

    /// Returns the caller's withdrawable proceeds, zero if none.
    pub fn proceeds_of(&self, seller: &str) -> u64 {
        self.state.lock().proceeds.balance_of(seller)
    }

    /// Returns every active listing.
    pub fn active_listings(&self) -> Vec<(AssetKey, Listing)> {
        self.state.lock().listings.active()
    }

    /// Returns the number of active listings.
    pub fn listing_count(&self) -> usize {
        self.state.lock().listings.len()
    }

    /// Drains and returns all pending notification events, oldest first.
    pub fn take_events(&self) -> Vec<EventEnvelope> {
        self.state.lock().events.take()
    }

    // -- guards -------------------------------------------------------------

    /// Checks that `caller` is the asset's current owner per the registry.
    ///
    /// A registry that does not know the asset at all also yields
    /// [`MarketError::NotOwner`] — an unminted asset has no owner, so the
    /// caller cannot be it.
    fn ensure_owner(&self, key: &AssetKey, caller: &str) -> Result<(), MarketError> {
        match self.registry.owner_of(key) {
            Ok(owner) if owner == caller => Ok(()),
            _ => Err(MarketError::NotOwner {
                key: key.clone(),
                caller: caller.to_string(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
