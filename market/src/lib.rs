//! # Agora Market — Fixed-Price Listing Ledger
//!
//! A non-custodial marketplace core: owners advertise an asset at a fixed
//! price, buyers purchase at that price, and proceeds settle through a
//! pull-payment balance — the ledger never holds the asset and never holds
//! more value than the per-seller credit it owes.
//!
//! ## Architecture
//!
//! ```text
//! listing.rs  — Listing map: (collection, asset id) → (seller, price)
//! proceeds.rs — Credit map: seller → withdrawable proceeds
//! events.rs   — Notification surface for indexers and UIs
//! payout.rs   — Value-transfer seam used by withdraw
//! ledger.rs   — MarketLedger: the operations, guards, and atomicity
//! ```
//!
//! ## Design Principles
//!
//! 1. **Checks, effects, interactions — in that order.** Every operation
//!    validates, then mutates ledger state, then calls out to a
//!    collaborator. If the collaborator call fails, the just-applied
//!    mutations are undone before the error reaches the caller: no
//!    operation has a partial-success state.
//! 2. **Pull payments.** A purchase credits the seller's balance; moving
//!    actual value happens later, when the seller withdraws. A purchase
//!    never depends on the seller being able to receive value.
//! 3. **Single-writer discipline.** The entire ledger state sits behind one
//!    mutex held for the full duration of each operation, so no invocation
//!    can observe another's intermediate state.
//! 4. All monetary amounts are `u64` in smallest-unit denomination, and
//!    all arithmetic on them is checked — wrapping arithmetic and money do
//!    not mix.

pub mod events;
pub mod ledger;
pub mod listing;
pub mod payout;
pub mod proceeds;

pub use events::{EventEnvelope, EventLog, MarketEvent};
pub use ledger::{MarketError, MarketLedger};
pub use listing::{Listing, ListingBook};
pub use payout::{InMemoryConduit, PaymentConduit, PayoutError};
pub use proceeds::{ProceedsBook, ProceedsError};
