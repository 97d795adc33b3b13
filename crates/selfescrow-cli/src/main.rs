//! # selfescrow CLI entry point
//!
//! Parses command-line arguments and dispatches to subcommand handlers.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use selfescrow_cli::config::CliConfig;
use selfescrow_cli::context::{CliContext, DEFAULT_STATE_DIR};
use selfescrow_cli::devnet::{run_accounts, run_balance, run_sleep, BalanceArgs, SleepArgs};
use selfescrow_cli::escrow::{
    run_close, run_collect, run_deploy, run_fund, run_release, run_status, CallArgs, CloseArgs,
    DeployArgs, StatusArgs,
};

/// Self-escrow devnet CLI.
///
/// Deploys two-party escrows on a local persisted chain and drives them
/// through funding, staged release and collection, and timeout-gated close.
#[derive(Parser, Debug)]
#[command(name = "selfescrow", version, about, long_about = None)]
struct Cli {
    /// Enable verbose output. Repeat for more verbosity (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Path to configuration file (default: ./selfescrow.yaml if present).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the devnet chain state.
    #[arg(long, global = true, default_value = DEFAULT_STATE_DIR)]
    state_dir: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// List configured accounts and their balances.
    Accounts,

    /// Show the ledger balance of an account or escrow.
    Balance(BalanceArgs),

    /// Advance the devnet clock.
    Sleep(SleepArgs),

    /// Deploy a new escrow.
    Deploy(DeployArgs),

    /// Deposit value + fee into an escrow (party_from only).
    Fund(CallArgs),

    /// Authorize value for collection (party_from only).
    Release(CallArgs),

    /// Withdraw released value (party_to only).
    Collect(CallArgs),

    /// Return the uncollected remainder to the owner after the timeout.
    Close(CloseArgs),

    /// Show escrow state and event log.
    Status(StatusArgs),
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize tracing based on verbosity level.
    let filter = match cli.verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"),
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = build_context(&cli).and_then(|ctx| dispatch(&cli.command, &ctx));

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(2)
        }
    }
}

fn build_context(cli: &Cli) -> anyhow::Result<CliContext> {
    let cwd = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let config = CliConfig::resolve(cli.config.as_deref(), &cwd)?;
    tracing::debug!(state_dir = %cli.state_dir.display(), "resolved devnet state directory");
    Ok(CliContext::new(config, cli.state_dir.clone()))
}

fn dispatch(command: &Commands, ctx: &CliContext) -> anyhow::Result<u8> {
    match command {
        Commands::Accounts => run_accounts(ctx),
        Commands::Balance(args) => run_balance(args, ctx),
        Commands::Sleep(args) => run_sleep(args, ctx),
        Commands::Deploy(args) => run_deploy(args, ctx),
        Commands::Fund(args) => run_fund(args, ctx),
        Commands::Release(args) => run_release(args, ctx),
        Commands::Collect(args) => run_collect(args, ctx),
        Commands::Close(args) => run_close(args, ctx),
        Commands::Status(args) => run_status(args, ctx),
    }
}
