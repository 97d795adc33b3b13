//! # Escrow Subcommands
//!
//! Deploy escrows on the devnet and call them.
//!
//! ## Subcommands
//!
//! - `deploy`: Deploy a new escrow; prints its address.
//! - `fund`: Deposit `value + fee` as `party_from`.
//! - `release`: Authorize value for collection as `party_from`.
//! - `collect`: Withdraw released value as `party_to`.
//! - `close`: Reclaim the remainder as owner after the timeout.
//! - `status`: Show every field, the custodial balance and the event log.
//!
//! A call rejected by the escrow prints `REVERTED: <reason>` and exits
//! with code 1. The chain is saved only after a committed call.

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use selfescrow_core::{Address, Amount, Timestamp};
use selfescrow_state::{
    Escrow, EscrowError, EscrowEvent, EscrowState, EscrowTerms, CLOSE_TIMEOUT_SECS,
};

use crate::chain::{Chain, EscrowCall};
use crate::context::CliContext;

/// Arguments for `selfescrow deploy`.
#[derive(Args, Debug)]
pub struct DeployArgs {
    /// Funding party (alias or address).
    #[arg(long = "from")]
    pub party_from: String,
    /// Receiving party (alias or address).
    #[arg(long = "to")]
    pub party_to: String,
    /// Amount to hold in escrow.
    #[arg(long)]
    pub value: Amount,
    /// Fee paid to the owner on funding.
    #[arg(long, default_value = "0")]
    pub fee: Amount,
    /// Owner (alias or address). Defaults to `acct_owner`, then `account0`.
    #[arg(long)]
    pub owner: Option<String>,
}

/// Arguments for `fund`, `release` and `collect`.
#[derive(Args, Debug)]
pub struct CallArgs {
    /// Escrow address.
    #[arg(long)]
    pub escrow: Address,
    /// Calling party (alias or address).
    #[arg(long)]
    pub caller: String,
    /// Amount of the call.
    #[arg(long)]
    pub amount: Amount,
}

/// Arguments for `selfescrow close`.
#[derive(Args, Debug)]
pub struct CloseArgs {
    /// Escrow address.
    #[arg(long)]
    pub escrow: Address,
    /// Calling party (alias or address).
    #[arg(long)]
    pub caller: String,
}

/// Arguments for `selfescrow status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Escrow address.
    #[arg(long)]
    pub escrow: Address,
    /// Print machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

/// Deploy a new escrow.
pub fn run_deploy(args: &DeployArgs, ctx: &CliContext) -> Result<u8> {
    let owner = match &args.owner {
        Some(owner) => ctx.party(owner)?,
        None => ctx.config.default_owner()?,
    };
    let terms = EscrowTerms {
        owner,
        party_from: ctx.party(&args.party_from)?,
        party_to: ctx.party(&args.party_to)?,
        value: args.value,
        fee: args.fee,
    };

    let mut chain = ctx.load_chain()?;
    let address = match chain.deploy(terms) {
        Ok(address) => address,
        Err(err) => return reverted("deploy", err),
    };
    ctx.save_chain(&chain)?;

    println!("OK: deployed escrow {address}");
    println!("  Owner: {}", ctx.label(&owner));
    println!("  Value: {}  Fee: {}", args.value, args.fee);
    Ok(0)
}

/// Fund an escrow.
pub fn run_fund(args: &CallArgs, ctx: &CliContext) -> Result<u8> {
    run_call(ctx, &args.escrow, &args.caller, EscrowCall::Fund(args.amount))
}

/// Release value for collection.
pub fn run_release(args: &CallArgs, ctx: &CliContext) -> Result<u8> {
    run_call(ctx, &args.escrow, &args.caller, EscrowCall::Release(args.amount))
}

/// Collect released value.
pub fn run_collect(args: &CallArgs, ctx: &CliContext) -> Result<u8> {
    run_call(ctx, &args.escrow, &args.caller, EscrowCall::Collect(args.amount))
}

/// Close an escrow.
pub fn run_close(args: &CloseArgs, ctx: &CliContext) -> Result<u8> {
    run_call(ctx, &args.escrow, &args.caller, EscrowCall::Close)
}

fn run_call(ctx: &CliContext, address: &Address, caller: &str, call: EscrowCall) -> Result<u8> {
    let caller = ctx.party(caller)?;
    let mut chain = ctx.load_chain()?;
    let event = match chain.execute(address, &caller, call) {
        Ok(event) => event,
        Err(err) => return reverted(call.name(), err),
    };
    ctx.save_chain(&chain)?;
    tracing::info!(op = call.name(), escrow = %address, amount = %event.amount, "escrow call saved");

    let escrow = chain.escrow(address)?;
    match call {
        EscrowCall::Fund(amount) => println!(
            "OK: funded escrow {address} with {amount} (fee {} paid to {})",
            escrow.fee(),
            ctx.label(&escrow.owner())
        ),
        EscrowCall::Release(amount) => println!(
            "OK: released {amount} (released {} of {})",
            escrow.released(),
            escrow.value()
        ),
        EscrowCall::Collect(amount) => println!(
            "OK: collected {amount} to {} (collected {} of {} released)",
            ctx.label(&escrow.party_to()),
            escrow.collected(),
            escrow.released()
        ),
        EscrowCall::Close => println!(
            "OK: closed escrow {address}; {} returned to {}",
            event.amount,
            ctx.label(&escrow.owner())
        ),
    }
    Ok(0)
}

/// Report a reverted escrow call, or pass any other error through.
fn reverted(op: &str, err: anyhow::Error) -> Result<u8> {
    match err.downcast_ref::<EscrowError>() {
        Some(escrow_err) => {
            if let EscrowError::Ledger(ledger_err) = escrow_err {
                tracing::warn!(op, error = %ledger_err, "ledger rejected transfer");
            }
            tracing::debug!(op, reason = escrow_err.reason(), "escrow call reverted");
            println!("REVERTED: {}", escrow_err.reason());
            Ok(1)
        }
        None => Err(err),
    }
}

// ─── Status ──────────────────────────────────────────────────────────

/// Everything `status` reports about an escrow.
#[derive(Debug, Serialize)]
pub struct StatusReport<'a> {
    pub address: Address,
    pub state: EscrowState,
    pub owner: Address,
    pub party_from: Address,
    pub party_to: Address,
    pub value: Amount,
    pub fee: Amount,
    pub funded: bool,
    pub closed: bool,
    pub released: Amount,
    pub collected: Amount,
    pub custodial_balance: Amount,
    pub creation_time: Timestamp,
    pub closable_at: Option<Timestamp>,
    pub timeout_secs: u64,
    pub now: Timestamp,
    pub events: &'a [EscrowEvent],
}

impl<'a> StatusReport<'a> {
    pub fn new(escrow: &'a Escrow, chain: &Chain) -> Self {
        Self {
            address: escrow.address(),
            state: escrow.state(),
            owner: escrow.owner(),
            party_from: escrow.party_from(),
            party_to: escrow.party_to(),
            value: escrow.value(),
            fee: escrow.fee(),
            funded: escrow.funded(),
            closed: escrow.closed(),
            released: escrow.released(),
            collected: escrow.collected(),
            custodial_balance: escrow.custodial_balance(chain.ledger()),
            creation_time: escrow.creation_time(),
            closable_at: escrow.closable_at(),
            timeout_secs: CLOSE_TIMEOUT_SECS,
            now: chain.now(),
            events: escrow.events(),
        }
    }
}

/// Show escrow status.
pub fn run_status(args: &StatusArgs, ctx: &CliContext) -> Result<u8> {
    let chain = ctx.load_chain()?;
    let escrow = chain.escrow(&args.escrow)?;
    let report = StatusReport::new(escrow, &chain);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(0);
    }

    println!("Escrow: {}", report.address);
    println!("  State: {}", report.state);
    println!("  Owner: {}", ctx.label(&report.owner));
    println!("  From: {}", ctx.label(&report.party_from));
    println!("  To: {}", ctx.label(&report.party_to));
    println!("  Value: {}  Fee: {}", report.value, report.fee);
    println!("  Released: {}  Collected: {}", report.released, report.collected);
    println!("  Custodial balance: {}", report.custodial_balance);
    println!("  Created: {}", report.creation_time);
    match report.closable_at {
        Some(at) => println!("  Closable at: {at}"),
        None => println!("  Closable at: never"),
    }
    println!("  Now: {}", report.now);
    println!("  Events: {}", report.events.len());
    for (i, e) in report.events.iter().enumerate() {
        println!(
            "    [{i}] {} {} by {} at {}",
            e.kind,
            e.amount,
            ctx.label(&e.caller),
            e.timestamp
        );
    }
    Ok(0)
}
