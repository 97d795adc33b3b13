//! # selfescrow-cli: Self-Escrow Devnet Command-Line Interface
//!
//! Runs escrows on a local persisted devnet: a ledger seeded from
//! `selfescrow.yaml` (or ten default accounts), a clock that can be moved
//! forward, and every escrow deployed so far.
//!
//! ## Subcommands
//!
//! - `accounts`, `balance`, `sleep`: devnet inspection and time travel
//! - `deploy`: create an escrow
//! - `fund`, `release`, `collect`, `close`: escrow calls
//! - `status`: escrow fields and event log, as text or JSON
//!
//! ## Crate Policy
//!
//! - Argument parsing lives in `main.rs`; handlers live in library modules
//!   so they can be tested without spawning the binary.
//! - Escrow semantics belong to `selfescrow-state`. Handlers only resolve
//!   parties, load the chain, make one call and save.
//! - Handlers return the process exit code: 0 on success, 1 on revert.

pub mod chain;
pub mod config;
pub mod context;
pub mod devnet;
pub mod escrow;
