//! # Proceeds Map
//!
//! Sales settle through pull payments: a purchase credits the seller's
//! entry in the [`ProceedsBook`], and the seller later withdraws the whole
//! balance in one go. This keeps the purchase path independent of whether
//! the seller can receive value at that moment.
//!
//! Balances only ever grow by purchase settlement and only ever shrink to
//! zero by a full withdrawal — there is no partial withdrawal. The
//! [`restore`](ProceedsBook::restore) method exists solely for the
//! ledger's rollback path when a payout fails after the balance was
//! already zeroed.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use agora_registry::Address;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors that can occur during proceeds bookkeeping.
#[derive(Debug, Error)]
pub enum ProceedsError {
    /// A credit would overflow the seller's balance.
    ///
    /// Hitting this means someone accumulated more than 18.4 quintillion
    /// smallest units without withdrawing. A bug or an attack, either way
    /// the credit is refused.
    #[error("proceeds overflow for {seller}: current {current}, credit {credit}")]
    Overflow {
        /// The seller whose balance would overflow.
        seller: Address,
        /// The balance before the failed credit.
        current: u64,
        /// The amount that caused the overflow.
        credit: u64,
    },
}

// ---------------------------------------------------------------------------
// ProceedsBook
// ---------------------------------------------------------------------------

/// Withdrawable proceeds owed to each seller.
///
/// Entries are created implicitly on first credit and removed when zeroed
/// by a withdrawal, so the map never accumulates dead zero entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProceedsBook {
    credits: HashMap<Address, u64>,
}

impl ProceedsBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Credits `amount` to `seller`, returning the new balance.
    ///
    /// # Errors
    ///
    /// Returns [`ProceedsError::Overflow`] if the credit would exceed
    /// `u64::MAX`; the balance is left untouched.
    pub fn credit(&mut self, seller: &str, amount: u64) -> Result<u64, ProceedsError> {
        let balance = self.credits.entry(seller.to_string()).or_insert(0);
        let updated = balance
            .checked_add(amount)
            .ok_or_else(|| ProceedsError::Overflow {
                seller: seller.to_string(),
                current: *balance,
                credit: amount,
            })?;
        *balance = updated;
        Ok(updated)
    }

    /// Debits `amount` from `seller`. Used only to undo a credit applied
    /// earlier in the same failed operation, so the entry must exist and
    /// hold at least `amount` — anything else is ledger corruption.
    pub(crate) fn debit(&mut self, seller: &str, amount: u64) {
        if let Some(balance) = self.credits.get_mut(seller) {
            *balance = balance.saturating_sub(amount);
            if *balance == 0 {
                self.credits.remove(seller);
            }
        }
    }

    /// Returns the withdrawable balance for `seller`, zero if none.
    pub fn balance_of(&self, seller: &str) -> u64 {
        self.credits.get(seller).copied().unwrap_or(0)
    }

    /// Zeroes the balance for `seller` and returns what it held.
    ///
    /// Returns 0 without touching the map if no entry exists.
    pub fn take_all(&mut self, seller: &str) -> u64 {
        self.credits.remove(seller).unwrap_or(0)
    }

    /// Puts a previously taken balance back, crediting it on top of
    /// whatever has accrued since. The rollback half of
    /// [`take_all`](Self::take_all).
    ///
    /// # Errors
    ///
    /// Returns [`ProceedsError::Overflow`] if restoring would exceed
    /// `u64::MAX`.
    pub fn restore(&mut self, seller: &str, amount: u64) -> Result<u64, ProceedsError> {
        self.credit(seller, amount)
    }

    /// Returns every seller currently owed a nonzero balance.
    pub fn creditors(&self) -> Vec<(Address, u64)> {
        self.credits
            .iter()
            .map(|(seller, amount)| (seller.clone(), *amount))
            .collect()
    }

    /// Returns `true` if nobody is owed anything.
    pub fn is_empty(&self) -> bool {
        self.credits.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn credit_creates_entry_and_accumulates() {
        let mut book = ProceedsBook::new();
        assert_eq!(book.credit("alice", 100).unwrap(), 100);
        assert_eq!(book.credit("alice", 50).unwrap(), 150);
        assert_eq!(book.balance_of("alice"), 150);
    }

    #[test]
    fn balance_of_unknown_seller_is_zero() {
        let book = ProceedsBook::new();
        assert_eq!(book.balance_of("nobody"), 0);
    }

    #[test]
    fn credit_overflow_rejected_and_balance_untouched() {
        let mut book = ProceedsBook::new();
        book.credit("alice", u64::MAX).unwrap();
        let result = book.credit("alice", 1);
        assert!(matches!(result, Err(ProceedsError::Overflow { .. })));
        assert_eq!(book.balance_of("alice"), u64::MAX);
    }

    #[test]
    fn take_all_zeroes_and_returns_balance() {
        let mut book = ProceedsBook::new();
        book.credit("alice", 300).unwrap();

        assert_eq!(book.take_all("alice"), 300);
        assert_eq!(book.balance_of("alice"), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn take_all_on_empty_balance_is_zero() {
        let mut book = ProceedsBook::new();
        assert_eq!(book.take_all("alice"), 0);
    }

    #[test]
    fn restore_puts_taken_balance_back() {
        let mut book = ProceedsBook::new();
        book.credit("alice", 300).unwrap();
        let taken = book.take_all("alice");

        book.restore("alice", taken).unwrap();
        assert_eq!(book.balance_of("alice"), 300);
    }

    #[test]
    fn debit_undoes_credit_and_drops_zero_entries() {
        let mut book = ProceedsBook::new();
        book.credit("alice", 100).unwrap();
        book.debit("alice", 100);

        assert_eq!(book.balance_of("alice"), 0);
        assert!(book.is_empty());
    }

    #[test]
    fn creditors_lists_outstanding_balances() {
        let mut book = ProceedsBook::new();
        book.credit("alice", 100).unwrap();
        book.credit("bob", 200).unwrap();

        let mut owed = book.creditors();
        owed.sort();
        assert_eq!(owed, vec![("alice".to_string(), 100), ("bob".to_string(), 200)]);
    }

    #[test]
    fn book_serialization_roundtrip() {
        let mut book = ProceedsBook::new();
        book.credit("alice", 42).unwrap();

        let json = serde_json::to_string(&book).unwrap();
        let restored: ProceedsBook = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.balance_of("alice"), 42);
    }
}
