//! # Market Events
//!
//! Every successful state change emits a [`MarketEvent`] for external
//! observers — indexers, UIs, analytics. Events are a notification
//! surface, not part of the correctness contract: delivery is
//! at-least-once via the drainable [`EventLog`], and consumers must treat
//! them as hints to re-read ledger state, not as the state itself.
//!
//! Ordering matches the order the ledger committed the underlying state
//! changes, since events are appended while the ledger's state lock is
//! held.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use agora_registry::{Address, AssetKey};

/// A successful ledger state change, from the observer's point of view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketEvent {
    /// An asset was listed for sale.
    Listed {
        /// The listed asset.
        key: AssetKey,
        /// The owner who listed it.
        seller: Address,
        /// Asking price in smallest units.
        price: u64,
    },

    /// The asking price of an active listing changed.
    PriceChanged {
        /// The listed asset.
        key: AssetKey,
        /// The owner who changed the price.
        seller: Address,
        /// The new asking price.
        price: u64,
    },

    /// An asset was purchased and the listing closed.
    Purchased {
        /// The purchased asset.
        key: AssetKey,
        /// The seller who was credited.
        seller: Address,
        /// The buyer who now owns the asset.
        buyer: Address,
        /// The amount credited to the seller (payment, including any
        /// overpayment).
        price: u64,
    },

    /// A listing was withdrawn by the asset owner.
    Canceled {
        /// The delisted asset.
        key: AssetKey,
        /// The owner who canceled.
        seller: Address,
    },

    /// A seller withdrew their accumulated proceeds.
    ProceedsWithdrawn {
        /// The seller who withdrew.
        seller: Address,
        /// The full balance that was paid out.
        amount: u64,
    },
}

/// A [`MarketEvent`] stamped with identity and emission time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique id for deduplication by at-least-once consumers.
    pub id: Uuid,
    /// When the ledger emitted the event.
    pub emitted_at: DateTime<Utc>,
    /// The state change itself.
    pub event: MarketEvent,
}

/// Append-only in-memory event log, drained by observers.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventLog {
    pending: Vec<EventEnvelope>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an event, wrapping it in a fresh envelope.
    pub fn emit(&mut self, event: MarketEvent) {
        self.pending.push(EventEnvelope {
            id: Uuid::new_v4(),
            emitted_at: Utc::now(),
            event,
        });
    }

    /// Removes and returns all pending events, oldest first.
    pub fn take(&mut self) -> Vec<EventEnvelope> {
        std::mem::take(&mut self.pending)
    }

    /// Returns the number of undrained events.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn emit_then_take_preserves_order() {
        let mut log = EventLog::new();
        let key = AssetKey::new("atelier", 7);

        log.emit(MarketEvent::Listed {
            key: key.clone(),
            seller: "alice".into(),
            price: 100,
        });
        log.emit(MarketEvent::Canceled {
            key: key.clone(),
            seller: "alice".into(),
        });

        let drained = log.take();
        assert_eq!(drained.len(), 2);
        assert!(matches!(drained[0].event, MarketEvent::Listed { .. }));
        assert!(matches!(drained[1].event, MarketEvent::Canceled { .. }));
        assert_ne!(drained[0].id, drained[1].id);

        // Drained means gone.
        assert_eq!(log.pending(), 0);
        assert!(log.take().is_empty());
    }

    #[test]
    fn envelope_serialization_roundtrip() {
        let mut log = EventLog::new();
        log.emit(MarketEvent::ProceedsWithdrawn {
            seller: "alice".into(),
            amount: 500,
        });

        let envelope = &log.take()[0];
        let json = serde_json::to_string(envelope).unwrap();
        let restored: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.id, envelope.id);
        assert_eq!(restored.event, envelope.event);
    }
}
