//! # selfescrow-state: The Self-Escrow State Machine
//!
//! A single escrowed payment between two parties, brokered by an owner.
//!
//! ## Components
//!
//! - **Escrow** (`escrow.rs`): `Unfunded → Funded → Closed`. `fund` takes
//!   the deposit and pays the owner's fee, `release` authorizes value for
//!   collection, `collect` withdraws it, and `close` returns the uncollected
//!   remainder to the owner once [`CLOSE_TIMEOUT_SECS`] have passed since
//!   deployment.
//!
//! - **Ledger** (`ledger.rs`): balance store the escrow moves value
//!   through. Batches are all-or-nothing.
//!
//! - **Clock** (`clock.rs`): time source for the close timeout and event
//!   timestamps.
//!
//! ## Design
//!
//! The escrow never touches balances directly. Each operation checks its
//! preconditions, hands the ledger one batch of transfers, and only writes
//! its own fields once the batch has been applied. A rejected call leaves
//! both the escrow and the ledger exactly as they were.

pub mod clock;
pub mod escrow;
pub mod ledger;

// ─── Escrow re-exports ──────────────────────────────────────────────

pub use escrow::{
    Escrow, EscrowError, EscrowEvent, EscrowEventKind, EscrowState, EscrowTerms,
    InvariantViolation, CLOSE_TIMEOUT_SECS,
};

// ─── Collaborator re-exports ────────────────────────────────────────

pub use clock::{Clock, ManualClock, OffsetClock, SystemClock};
pub use ledger::{InMemoryLedger, Ledger, LedgerError, Transfer};
