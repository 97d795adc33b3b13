//! # Self-Escrow State Machine
//!
//! One escrowed payment from `party_from` to `party_to`, brokered by an
//! `owner` who earns a fee on funding and may reclaim unresolved value
//! after a fixed timeout.
//!
//! ## States
//!
//! ```text
//! Unfunded ──fund──▶ Funded ──release / collect──▶ Funded
//!    │                  │
//!    └──close──▶ Closed ◀──close──┘
//!               (terminal)
//! ```
//!
//! `release` only authorizes; `collect` settles. The payer can stage
//! partial payouts without giving the payee unilateral access beyond what
//! was explicitly released.
//!
//! ## Atomicity
//!
//! Every operation validates all preconditions first, then applies its
//! ledger transfers as one batch through [`Ledger::transfer_all`], and only
//! then writes the new field values. A rejected call changes nothing:
//! no fields, no balances, no event.
//!
//! ## Precondition Order
//!
//! The closed check runs before the caller check on every operation, so a
//! closed escrow answers `E_CLOSED` to everyone. After that: caller, phase,
//! amount.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use selfescrow_core::{Address, Amount, Timestamp};

use crate::clock::Clock;
use crate::ledger::{Ledger, LedgerError, Transfer};

/// Seconds after creation before the owner may close (365 days).
pub const CLOSE_TIMEOUT_SECS: u64 = 31_536_000;

// ─── Escrow State ────────────────────────────────────────────────────

/// The lifecycle phase of an escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowState {
    /// Deployed, awaiting the one-time deposit.
    Unfunded,
    /// Deposit received; release/collect cycles are open.
    Funded,
    /// Closed by the owner (terminal).
    Closed,
}

impl EscrowState {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// The canonical string name of this state.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unfunded => "UNFUNDED",
            Self::Funded => "FUNDED",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for EscrowState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Errors ──────────────────────────────────────────────────────────

/// Why an escrow call was rejected.
///
/// The `Display` of every precondition variant is its reason code,
/// verbatim, so callers can match on the string as well as the variant.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EscrowError {
    /// The caller is not the party this operation belongs to.
    #[error("E_INVALID_ORIGIN")]
    InvalidOrigin,

    /// The escrow has already been funded.
    #[error("E_ALREADY")]
    Already,

    /// The escrow is closed.
    #[error("E_CLOSED")]
    Closed,

    /// Zero amount, wrong deposit, or terms that overflow.
    #[error("E_INVALID_VALUE")]
    InvalidValue,

    /// The escrow has not been funded yet.
    #[error("E_NOT_FUNDED")]
    NotFunded,

    /// The amount exceeds what is still releasable or collectable.
    #[error("E_TOO_MUCH")]
    TooMuch,

    /// The close timeout has not elapsed.
    #[error("E_TOO_SOON")]
    TooSoon,

    /// A ledger transfer failed; every transfer of the call was rolled back.
    #[error("ledger transfer failed: {0}")]
    Ledger(#[from] LedgerError),
}

impl EscrowError {
    /// The short reason code for this error.
    pub fn reason(&self) -> &'static str {
        match self {
            Self::InvalidOrigin => "E_INVALID_ORIGIN",
            Self::Already => "E_ALREADY",
            Self::Closed => "E_CLOSED",
            Self::InvalidValue => "E_INVALID_VALUE",
            Self::NotFunded => "E_NOT_FUNDED",
            Self::TooMuch => "E_TOO_MUCH",
            Self::TooSoon => "E_TOO_SOON",
            Self::Ledger(_) => "E_TRANSFER_FAILED",
        }
    }
}

/// A broken escrow invariant, found by [`Escrow::verify_invariants`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("escrow {escrow} invariant violated: {detail}")]
pub struct InvariantViolation {
    /// The escrow's custody address.
    pub escrow: Address,
    /// What does not hold.
    pub detail: String,
}

// ─── Events ──────────────────────────────────────────────────────────

/// Kind of committed escrow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EscrowEventKind {
    /// The escrow was created.
    Deployed,
    /// The deposit was received and the fee paid.
    Funded,
    /// The payer authorized more value for collection.
    Released,
    /// The payee withdrew released value.
    Collected,
    /// The owner closed the escrow and reclaimed the remainder.
    Closed,
}

impl EscrowEventKind {
    /// The canonical string name of this event kind.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Deployed => "DEPLOYED",
            Self::Funded => "FUNDED",
            Self::Released => "RELEASED",
            Self::Collected => "COLLECTED",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for EscrowEventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Record of a committed operation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowEvent {
    /// What happened.
    pub kind: EscrowEventKind,
    /// Who called.
    pub caller: Address,
    /// Amount of the operation: the value for deploy, the deposit for
    /// fund, the requested amount for release and collect, the payout
    /// for close.
    pub amount: Amount,
    /// When it was committed.
    pub timestamp: Timestamp,
}

// ─── Terms ───────────────────────────────────────────────────────────

/// Constructor parameters of an escrow, fixed for its lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EscrowTerms {
    /// The deployer; receives the fee and the close remainder.
    pub owner: Address,
    /// The funding party.
    pub party_from: Address,
    /// The receiving party.
    pub party_to: Address,
    /// Amount held in escrow.
    pub value: Amount,
    /// Amount paid to the owner on funding.
    pub fee: Amount,
}

// ─── Escrow ──────────────────────────────────────────────────────────

/// A single self-executing escrow.
///
/// Fields are private; read them through the accessors. Mutating calls
/// take the authenticated caller explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Escrow {
    address: Address,
    owner: Address,
    party_from: Address,
    party_to: Address,
    value: Amount,
    fee: Amount,
    funded: bool,
    closed: bool,
    released: Amount,
    collected: Amount,
    creation_time: Timestamp,
    events: Vec<EscrowEvent>,
}

impl Escrow {
    /// Deploy a new escrow in the UNFUNDED state.
    ///
    /// The custody address is derived from the owner and `nonce`; the
    /// caller is responsible for not reusing a nonce per owner.
    ///
    /// # Errors
    ///
    /// [`EscrowError::InvalidValue`] if `value + fee` overflows, since the
    /// escrow could then never be funded, or if any party is the escrow's
    /// own custody address.
    pub fn deploy(terms: EscrowTerms, nonce: u64, clock: &impl Clock) -> Result<Self, EscrowError> {
        terms
            .value
            .checked_add(terms.fee)
            .ok_or(EscrowError::InvalidValue)?;

        // Transfers between custody and itself move nothing.
        let address = Address::derive_contract(&terms.owner, nonce);
        if [terms.owner, terms.party_from, terms.party_to].contains(&address) {
            return Err(EscrowError::InvalidValue);
        }

        let now = clock.now();
        tracing::info!(
            escrow = %address,
            owner = %terms.owner,
            party_from = %terms.party_from,
            party_to = %terms.party_to,
            value = %terms.value,
            fee = %terms.fee,
            "escrow deployed"
        );

        Ok(Self {
            address,
            owner: terms.owner,
            party_from: terms.party_from,
            party_to: terms.party_to,
            value: terms.value,
            fee: terms.fee,
            funded: false,
            closed: false,
            released: Amount::ZERO,
            collected: Amount::ZERO,
            creation_time: now,
            events: vec![EscrowEvent {
                kind: EscrowEventKind::Deployed,
                caller: terms.owner,
                amount: terms.value,
                timestamp: now,
            }],
        })
    }

    // ── Accessors ────────────────────────────────────────────────────

    /// The escrow's custody account on the ledger.
    pub fn address(&self) -> Address {
        self.address
    }

    /// The deployer.
    pub fn owner(&self) -> Address {
        self.owner
    }

    /// The funding party.
    pub fn party_from(&self) -> Address {
        self.party_from
    }

    /// The receiving party.
    pub fn party_to(&self) -> Address {
        self.party_to
    }

    /// Total escrowed value.
    pub fn value(&self) -> Amount {
        self.value
    }

    /// Fee paid to the owner on funding.
    pub fn fee(&self) -> Amount {
        self.fee
    }

    /// Cumulative amount released for collection.
    pub fn released(&self) -> Amount {
        self.released
    }

    /// Cumulative amount collected by `party_to`.
    pub fn collected(&self) -> Amount {
        self.collected
    }

    /// Whether the deposit has been received.
    pub fn funded(&self) -> bool {
        self.funded
    }

    /// Whether the escrow has been closed.
    pub fn closed(&self) -> bool {
        self.closed
    }

    /// When the escrow was deployed.
    pub fn creation_time(&self) -> Timestamp {
        self.creation_time
    }

    /// Earliest time the owner may close, or `None` if out of range.
    pub fn closable_at(&self) -> Option<Timestamp> {
        self.creation_time.checked_add_secs(CLOSE_TIMEOUT_SECS)
    }

    /// Committed operations, oldest first. The first entry is the deploy.
    pub fn events(&self) -> &[EscrowEvent] {
        &self.events
    }

    /// Current lifecycle phase.
    pub fn state(&self) -> EscrowState {
        if self.closed {
            EscrowState::Closed
        } else if self.funded {
            EscrowState::Funded
        } else {
            EscrowState::Unfunded
        }
    }

    /// Value currently held in custody, as the ledger reports it.
    pub fn custodial_balance(&self, ledger: &impl Ledger) -> Amount {
        ledger.balance(&self.address)
    }

    /// Custody the escrow should hold in its current state: nothing until
    /// funded, `value - collected` while open, nothing once closed.
    pub fn expected_custody(&self) -> Amount {
        match self.state() {
            EscrowState::Unfunded | EscrowState::Closed => Amount::ZERO,
            EscrowState::Funded => self
                .value
                .checked_sub(self.collected)
                .unwrap_or(Amount::ZERO),
        }
    }

    // ── Operations ───────────────────────────────────────────────────

    /// Deposit `value + fee` from `party_from`; the fee goes straight to
    /// the owner.
    pub fn fund(
        &mut self,
        ledger: &mut impl Ledger,
        clock: &impl Clock,
        caller: &Address,
        amount: Amount,
    ) -> Result<EscrowEvent, EscrowError> {
        self.check_fund(caller, amount)
            .map_err(|e| self.reverted("fund", caller, e))?;

        let mut transfers = vec![Transfer::new(*caller, self.address, amount)];
        if !self.fee.is_zero() {
            transfers.push(Transfer::new(self.address, self.owner, self.fee));
        }
        self.settle(ledger, "fund", caller, &transfers)?;

        self.funded = true;
        Ok(self.commit(EscrowEventKind::Funded, caller, amount, clock))
    }

    /// Authorize `amount` more for `party_to` to collect. Moves no value.
    pub fn release(
        &mut self,
        clock: &impl Clock,
        caller: &Address,
        amount: Amount,
    ) -> Result<EscrowEvent, EscrowError> {
        let released = self
            .check_release(caller, amount)
            .map_err(|e| self.reverted("release", caller, e))?;

        self.released = released;
        Ok(self.commit(EscrowEventKind::Released, caller, amount, clock))
    }

    /// Withdraw `amount` of released value to `party_to`.
    pub fn collect(
        &mut self,
        ledger: &mut impl Ledger,
        clock: &impl Clock,
        caller: &Address,
        amount: Amount,
    ) -> Result<EscrowEvent, EscrowError> {
        let collected = self
            .check_collect(caller, amount)
            .map_err(|e| self.reverted("collect", caller, e))?;

        let transfers = [Transfer::new(self.address, self.party_to, amount)];
        self.settle(ledger, "collect", caller, &transfers)?;

        self.collected = collected;
        Ok(self.commit(EscrowEventKind::Collected, caller, amount, clock))
    }

    /// Close after the timeout, paying the uncollected remainder to the owner.
    ///
    /// An unfunded escrow closes with a zero payout.
    pub fn close(
        &mut self,
        ledger: &mut impl Ledger,
        clock: &impl Clock,
        caller: &Address,
    ) -> Result<EscrowEvent, EscrowError> {
        let payout = self
            .check_close(caller, clock.now())
            .map_err(|e| self.reverted("close", caller, e))?;

        if !payout.is_zero() {
            let transfers = [Transfer::new(self.address, self.owner, payout)];
            self.settle(ledger, "close", caller, &transfers)?;
        }

        self.closed = true;
        Ok(self.commit(EscrowEventKind::Closed, caller, payout, clock))
    }

    /// Check every invariant that must hold between calls.
    pub fn verify_invariants(&self, ledger: &impl Ledger) -> Result<(), InvariantViolation> {
        let violation = |detail: String| InvariantViolation {
            escrow: self.address,
            detail,
        };

        if self.collected > self.released {
            return Err(violation(format!(
                "collected {} exceeds released {}",
                self.collected, self.released
            )));
        }
        if self.released > self.value {
            return Err(violation(format!(
                "released {} exceeds value {}",
                self.released, self.value
            )));
        }
        if !self.funded && !self.released.is_zero() {
            return Err(violation(format!(
                "released {} before funding",
                self.released
            )));
        }
        let custody = self.custodial_balance(ledger);
        let expected = self.expected_custody();
        if custody != expected {
            return Err(violation(format!(
                "custodial balance {custody} in state {} (expected {expected})",
                self.state()
            )));
        }
        Ok(())
    }

    // ── Preconditions ────────────────────────────────────────────────

    fn check_fund(&self, caller: &Address, amount: Amount) -> Result<(), EscrowError> {
        self.require_open()?;
        require_caller(caller, &self.party_from)?;
        if self.funded {
            return Err(EscrowError::Already);
        }
        let required = self
            .value
            .checked_add(self.fee)
            .ok_or(EscrowError::InvalidValue)?;
        if amount != required {
            return Err(EscrowError::InvalidValue);
        }
        Ok(())
    }

    /// Returns the new `released` total.
    fn check_release(&self, caller: &Address, amount: Amount) -> Result<Amount, EscrowError> {
        self.require_open()?;
        require_caller(caller, &self.party_from)?;
        self.require_funded()?;
        if amount.is_zero() {
            return Err(EscrowError::InvalidValue);
        }
        match self.released.checked_add(amount) {
            Some(total) if total <= self.value => Ok(total),
            _ => Err(EscrowError::TooMuch),
        }
    }

    /// Returns the new `collected` total.
    fn check_collect(&self, caller: &Address, amount: Amount) -> Result<Amount, EscrowError> {
        self.require_open()?;
        require_caller(caller, &self.party_to)?;
        self.require_funded()?;
        if amount.is_zero() {
            return Err(EscrowError::InvalidValue);
        }
        match self.collected.checked_add(amount) {
            Some(total) if total <= self.released => Ok(total),
            _ => Err(EscrowError::TooMuch),
        }
    }

    /// Returns the payout owed to the owner.
    fn check_close(&self, caller: &Address, now: Timestamp) -> Result<Amount, EscrowError> {
        self.require_open()?;
        require_caller(caller, &self.owner)?;
        match self.closable_at() {
            Some(deadline) if now >= deadline => {}
            _ => return Err(EscrowError::TooSoon),
        }
        if !self.funded {
            return Ok(Amount::ZERO);
        }
        self.value
            .checked_sub(self.collected)
            .ok_or(EscrowError::TooMuch)
    }

    fn require_open(&self) -> Result<(), EscrowError> {
        if self.closed {
            return Err(EscrowError::Closed);
        }
        Ok(())
    }

    fn require_funded(&self) -> Result<(), EscrowError> {
        if !self.funded {
            return Err(EscrowError::NotFunded);
        }
        Ok(())
    }

    // ── Commit helpers ───────────────────────────────────────────────

    fn settle(
        &self,
        ledger: &mut impl Ledger,
        op: &'static str,
        caller: &Address,
        transfers: &[Transfer],
    ) -> Result<(), EscrowError> {
        ledger
            .transfer_all(transfers)
            .map_err(|e| self.reverted(op, caller, EscrowError::from(e)))
    }

    fn reverted(&self, op: &'static str, caller: &Address, err: EscrowError) -> EscrowError {
        tracing::debug!(
            escrow = %self.address,
            op,
            caller = %caller,
            reason = err.reason(),
            "escrow call reverted"
        );
        err
    }

    fn commit(
        &mut self,
        kind: EscrowEventKind,
        caller: &Address,
        amount: Amount,
        clock: &impl Clock,
    ) -> EscrowEvent {
        let event = EscrowEvent {
            kind,
            caller: *caller,
            amount,
            timestamp: clock.now(),
        };
        tracing::info!(
            escrow = %self.address,
            event = %kind,
            caller = %caller,
            amount = %amount,
            released = %self.released,
            collected = %self.collected,
            "escrow call committed"
        );
        self.events.push(event.clone());
        event
    }
}

fn require_caller(caller: &Address, expected: &Address) -> Result<(), EscrowError> {
    if caller != expected {
        return Err(EscrowError::InvalidOrigin);
    }
    Ok(())
}

// ─── Tests ───────────────────────────────────────────────────────────
