//! # Devnet Chain
//!
//! The local chain the CLI operates on: one [`InMemoryLedger`], an
//! [`OffsetClock`] advanced by `sleep`, a deploy nonce, and every escrow
//! deployed so far keyed by custody address.
//!
//! State lives in `<state-dir>/chain.json`. Each command loads it, runs
//! one call, and saves only if the call committed.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use selfescrow_core::{Address, Amount, Timestamp};
use selfescrow_state::{
    Clock, Escrow, EscrowEvent, EscrowTerms, InMemoryLedger, OffsetClock,
};

/// File name of the persisted chain inside the state directory.
pub const CHAIN_FILE: &str = "chain.json";

/// A mutating call against a deployed escrow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EscrowCall {
    Fund(Amount),
    Release(Amount),
    Collect(Amount),
    Close,
}

impl EscrowCall {
    /// Lowercase operation name, as used on the command line.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Fund(_) => "fund",
            Self::Release(_) => "release",
            Self::Collect(_) => "collect",
            Self::Close => "close",
        }
    }
}

/// Persisted devnet state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chain {
    ledger: InMemoryLedger,
    clock: OffsetClock,
    next_nonce: u64,
    escrows: BTreeMap<Address, Escrow>,
}

impl Chain {
    /// A fresh chain with the given balances minted.
    pub fn genesis(allocations: impl IntoIterator<Item = (Address, Amount)>) -> Result<Self> {
        let mut ledger = InMemoryLedger::new();
        for (account, amount) in allocations {
            ledger
                .mint(account, amount)
                .with_context(|| format!("genesis allocation to {account}"))?;
        }
        Ok(Self {
            ledger,
            ..Self::default()
        })
    }

    /// Load `<dir>/chain.json`, or `None` if the chain was never saved.
    pub fn load(dir: &Path) -> Result<Option<Self>> {
        let path = chain_file(dir);
        if !path.exists() {
            return Ok(None);
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read chain state: {}", path.display()))?;
        let chain = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse chain state: {}", path.display()))?;
        Ok(Some(chain))
    }

    /// Write the chain to `<dir>/chain.json`, creating `dir` if needed.
    pub fn save(&self, dir: &Path) -> Result<()> {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("failed to create state directory: {}", dir.display()))?;
        let path = chain_file(dir);
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(&path, json)
            .with_context(|| format!("failed to write chain state: {}", path.display()))?;
        tracing::debug!(path = %path.display(), escrows = self.escrows.len(), "saved chain");
        Ok(())
    }

    pub fn ledger(&self) -> &InMemoryLedger {
        &self.ledger
    }

    /// Current devnet time.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    /// Seconds the devnet clock runs ahead of wall time.
    pub fn clock_offset_secs(&self) -> u64 {
        self.clock.offset_secs()
    }

    /// Advance the devnet clock by `secs`.
    pub fn sleep(&mut self, secs: u64) -> Result<Timestamp> {
        self.clock.sleep(secs)?;
        Ok(self.clock.mark())
    }

    /// Deploy a new escrow and return its address.
    ///
    /// A rejected deploy does not consume a nonce.
    pub fn deploy(&mut self, terms: EscrowTerms) -> Result<Address> {
        let escrow = Escrow::deploy(terms, self.next_nonce, &self.clock)?;
        let address = escrow.address();
        if self.escrows.contains_key(&address) {
            anyhow::bail!("escrow address collision at {address}");
        }
        self.next_nonce += 1;
        self.escrows.insert(address, escrow);
        self.clock.mark();
        Ok(address)
    }

    /// Look up a deployed escrow.
    pub fn escrow(&self, address: &Address) -> Result<&Escrow> {
        self.escrows
            .get(address)
            .with_context(|| format!("no escrow deployed at {address}"))
    }

    /// Deployed escrows in address order.
    pub fn escrows(&self) -> impl Iterator<Item = &Escrow> {
        self.escrows.values()
    }

    /// Run `call` on the escrow at `address` as `caller`.
    ///
    /// A reverted call surfaces as an [`selfescrow_state::EscrowError`]
    /// inside the returned error.
    pub fn execute(
        &mut self,
        address: &Address,
        caller: &Address,
        call: EscrowCall,
    ) -> Result<EscrowEvent> {
        let escrow = self
            .escrows
            .get_mut(address)
            .with_context(|| format!("no escrow deployed at {address}"))?;
        let event = match call {
            EscrowCall::Fund(amount) => escrow.fund(&mut self.ledger, &self.clock, caller, amount),
            EscrowCall::Release(amount) => escrow.release(&self.clock, caller, amount),
            EscrowCall::Collect(amount) => {
                escrow.collect(&mut self.ledger, &self.clock, caller, amount)
            }
            EscrowCall::Close => escrow.close(&mut self.ledger, &self.clock, caller),
        }?;
        self.clock.mark();
        Ok(event)
    }
}

fn chain_file(dir: &Path) -> PathBuf {
    dir.join(CHAIN_FILE)
}
