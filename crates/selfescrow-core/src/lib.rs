//! # selfescrow-core: Foundational Types for the Self-Escrow Stack
//!
//! Primitive types shared by the escrow engine and the `selfescrow` CLI.
//! Every other crate in the workspace depends on `selfescrow-core`; it
//! depends on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for domain primitives.** `Address` and `Amount` are
//!    newtypes with validated constructors. No bare strings for parties, no
//!    bare integers for value.
//!
//! 2. **Checked arithmetic only.** `Amount` exposes `checked_add` and
//!    `checked_sub`; there is no `Add` impl that could wrap or panic.
//!
//! 3. **UTC-only timestamps.** `Timestamp` is UTC with seconds precision,
//!    the same resolution as a block timestamp.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `selfescrow-*` crates (this is the leaf of the DAG).
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.
//! - All public types derive `Debug`, `Clone`, and implement `Serialize`/`Deserialize`.

pub mod amount;
pub mod error;
pub mod identity;
pub mod temporal;

// Re-export primary types for ergonomic imports.
pub use amount::Amount;
pub use error::CoreError;
pub use identity::Address;
pub use temporal::Timestamp;
