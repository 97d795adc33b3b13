//! # Devnet Subcommands
//!
//! Account and clock commands that do not touch an escrow.
//!
//! - `accounts`: list configured accounts with their balances.
//! - `balance`: show one party's balance.
//! - `sleep`: advance the devnet clock.

use anyhow::Result;
use clap::Args;

use selfescrow_state::Ledger;

use crate::context::CliContext;

/// Arguments for `selfescrow balance`.
#[derive(Args, Debug)]
pub struct BalanceArgs {
    /// Account alias or `0x` address (escrow addresses included).
    pub party: String,
}

/// Arguments for `selfescrow sleep`.
#[derive(Args, Debug)]
pub struct SleepArgs {
    /// Seconds to advance the devnet clock by.
    pub secs: u64,
}

/// List every configured account and its balance.
pub fn run_accounts(ctx: &CliContext) -> Result<u8> {
    let chain = ctx.load_chain()?;
    if ctx.config.accounts.is_empty() {
        println!("No accounts configured.");
        return Ok(0);
    }
    for account in &ctx.config.accounts {
        let address = account.address();
        println!(
            "{:<16} {address}  {}",
            account.alias,
            chain.ledger().balance(&address)
        );
    }
    Ok(0)
}

/// Print a party's ledger balance.
pub fn run_balance(args: &BalanceArgs, ctx: &CliContext) -> Result<u8> {
    let address = ctx.party(&args.party)?;
    let chain = ctx.load_chain()?;
    println!("{}: {}", ctx.label(&address), chain.ledger().balance(&address));
    Ok(0)
}

/// Advance the devnet clock and persist the new offset.
pub fn run_sleep(args: &SleepArgs, ctx: &CliContext) -> Result<u8> {
    let mut chain = ctx.load_chain()?;
    let now = chain.sleep(args.secs)?;
    ctx.save_chain(&chain)?;
    tracing::info!(secs = args.secs, offset = chain.clock_offset_secs(), "devnet clock advanced");
    println!("OK: advanced clock by {}s (now {now})", args.secs);
    Ok(0)
}
