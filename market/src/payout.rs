//! # Payout Conduit
//!
//! The second and last external seam of the ledger: moving real value to a
//! seller when they withdraw their proceeds. The ledger only ever pays out
//! a balance it has already zeroed — if the conduit rejects the payment,
//! the ledger restores the balance and surfaces the failure.
//!
//! [`InMemoryConduit`] records payments per address and supports failure
//! injection through a reject-list, which is how withdraw rollback is
//! exercised in tests.

use std::collections::{HashMap, HashSet};

use parking_lot::RwLock;
use thiserror::Error;

use agora_registry::Address;

/// Errors that can occur when pushing value to a recipient.
#[derive(Debug, Error)]
pub enum PayoutError {
    /// The recipient cannot accept the payment.
    #[error("payment of {amount} to {recipient} was rejected")]
    Rejected {
        /// The address that could not be paid.
        recipient: Address,
        /// The amount that failed to move.
        amount: u64,
    },

    /// Paying would overflow the recipient's received total.
    #[error("payout overflow for {recipient}: received {received}, payment {amount}")]
    Overflow {
        /// The address whose running total would overflow.
        recipient: Address,
        /// The total received so far.
        received: u64,
        /// The payment that caused the overflow.
        amount: u64,
    },
}

/// Value-transfer collaborator used by withdraw.
///
/// Implementations must be shareable across threads and handle their own
/// locking; the ledger calls [`pay`](Self::pay) while holding its state
/// lock.
pub trait PaymentConduit: Send + Sync {
    /// Transfers `amount` smallest units to `to`.
    ///
    /// # Errors
    ///
    /// Returns [`PayoutError::Rejected`] if the recipient cannot accept
    /// the payment, or [`PayoutError::Overflow`] if the implementation's
    /// bookkeeping would overflow. The transfer is all-or-nothing.
    fn pay(&self, to: &str, amount: u64) -> Result<(), PayoutError>;
}

/// Reference conduit backed by in-memory bookkeeping.
#[derive(Debug, Default)]
pub struct InMemoryConduit {
    paid: RwLock<HashMap<Address, u64>>,
    rejecting: RwLock<HashSet<Address>>,
}

impl InMemoryConduit {
    /// Creates a conduit that accepts every payment.
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes payments to `recipient` fail until unblocked.
    pub fn reject_payments_to(&self, recipient: impl Into<Address>) {
        self.rejecting.write().insert(recipient.into());
    }

    /// Re-enables payments to `recipient`.
    pub fn allow_payments_to(&self, recipient: &str) {
        self.rejecting.write().remove(recipient);
    }

    /// Returns the total amount successfully paid to `recipient`.
    pub fn total_paid_to(&self, recipient: &str) -> u64 {
        self.paid.read().get(recipient).copied().unwrap_or(0)
    }
}

impl PaymentConduit for InMemoryConduit {
    fn pay(&self, to: &str, amount: u64) -> Result<(), PayoutError> {
        if self.rejecting.read().contains(to) {
            return Err(PayoutError::Rejected {
                recipient: to.to_string(),
                amount,
            });
        }
        let mut paid = self.paid.write();
        let total = paid.entry(to.to_string()).or_insert(0);
        *total = total.checked_add(amount).ok_or(PayoutError::Overflow {
            recipient: to.to_string(),
            received: *total,
            amount,
        })?;
        Ok(())
    }
}
