//! # Ledger Collaborator
//!
//! Holds balances per address and moves value between them. A single
//! [`Ledger::transfer`] either fully applies or leaves both balances
//! unchanged. [`Ledger::transfer_all`] extends that guarantee to a batch:
//! if any transfer in the batch fails, the ones already applied are
//! reversed before the error is returned.
//!
//! [`InMemoryLedger`] is the implementation used by tests and by the
//! devnet in `selfescrow-cli`.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use selfescrow_core::{Address, Amount};

// ─── Transfers ───────────────────────────────────────────────────────

/// A single movement of value between two accounts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transfer {
    /// Debited account.
    pub from: Address,
    /// Credited account.
    pub to: Address,
    /// Amount moved.
    pub amount: Amount,
}

impl Transfer {
    /// Build a transfer.
    pub fn new(from: Address, to: Address, amount: Amount) -> Self {
        Self { from, to, amount }
    }

    /// The transfer that undoes this one.
    pub fn reversed(&self) -> Self {
        Self {
            from: self.to,
            to: self.from,
            amount: self.amount,
        }
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Errors raised by a ledger transfer. Balances are unchanged when returned.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// The debited account holds less than the requested amount.
    #[error("insufficient balance in {account}: has {balance}, needs {requested}")]
    InsufficientBalance {
        /// Debited account.
        account: Address,
        /// Its balance at the time of the transfer.
        balance: Amount,
        /// Amount requested.
        requested: Amount,
    },

    /// Crediting the receiving account would overflow its balance.
    #[error("balance overflow crediting {account} with {amount}")]
    BalanceOverflow {
        /// Credited account.
        account: Address,
        /// Amount that could not be credited.
        amount: Amount,
    },
}

// ─── Ledger Trait ────────────────────────────────────────────────────

/// Balance store with atomic transfers.
pub trait Ledger {
    /// Current balance of `account`. Unknown accounts hold zero.
    fn balance(&self, account: &Address) -> Amount;

    /// Apply one transfer, or fail leaving both balances unchanged.
    fn transfer(&mut self, transfer: &Transfer) -> Result<(), LedgerError>;

    /// Apply every transfer in order, or none of them.
    ///
    /// On failure, the transfers already applied are reversed newest first
    /// and the original error is returned.
    fn transfer_all(&mut self, transfers: &[Transfer]) -> Result<(), LedgerError> {
        for (applied, transfer) in transfers.iter().enumerate() {
            if let Err(err) = self.transfer(transfer) {
                tracing::warn!(
                    failed_index = applied,
                    rolled_back = applied,
                    error = %err,
                    "transfer batch failed; rolling back"
                );
                for done in transfers[..applied].iter().rev() {
                    if let Err(undo_err) = self.transfer(&done.reversed()) {
                        tracing::error!(
                            from = %done.to,
                            to = %done.from,
                            amount = %done.amount,
                            error = %undo_err,
                            "rollback transfer failed"
                        );
                    }
                }
                return Err(err);
            }
        }
        Ok(())
    }
}

// ─── In-Memory Ledger ────────────────────────────────────────────────

/// Ledger backed by an ordered map of balances.
///
/// Zero balances are not stored, so two ledgers with the same non-zero
/// balances compare equal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InMemoryLedger {
    balances: BTreeMap<Address, Amount>,
}

impl InMemoryLedger {
    /// An empty ledger.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create `amount` out of thin air in `account` (genesis allocation).
    pub fn mint(&mut self, account: Address, amount: Amount) -> Result<(), LedgerError> {
        let current = self.balance(&account);
        let updated = current
            .checked_add(amount)
            .ok_or(LedgerError::BalanceOverflow { account, amount })?;
        self.set(account, updated);
        Ok(())
    }

    /// Every account with a non-zero balance, in address order.
    pub fn accounts(&self) -> impl Iterator<Item = (&Address, &Amount)> {
        self.balances.iter()
    }

    /// Sum of all balances, or `None` if it does not fit an [`Amount`].
    pub fn total_supply(&self) -> Option<Amount> {
        self.balances
            .values()
            .try_fold(Amount::ZERO, |acc, b| acc.checked_add(*b))
    }

    fn set(&mut self, account: Address, amount: Amount) {
        if amount.is_zero() {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, amount);
        }
    }
}

impl Ledger for InMemoryLedger {
    fn balance(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(Amount::ZERO)
    }

    fn transfer(&mut self, transfer: &Transfer) -> Result<(), LedgerError> {
        let from_balance = self.balance(&transfer.from);
        let debited = from_balance.checked_sub(transfer.amount).ok_or(
            LedgerError::InsufficientBalance {
                account: transfer.from,
                balance: from_balance,
                requested: transfer.amount,
            },
        )?;

        if transfer.from == transfer.to {
            return Ok(());
        }

        let credited = self
            .balance(&transfer.to)
            .checked_add(transfer.amount)
            .ok_or(LedgerError::BalanceOverflow {
                account: transfer.to,
                amount: transfer.amount,
            })?;

        self.set(transfer.from, debited);
        self.set(transfer.to, credited);
        Ok(())
    }
}

// ─── Tests ───────────────────────────────────────────────────────────
