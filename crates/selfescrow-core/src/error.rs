//! # Error Types
//!
//! Errors raised while constructing or parsing the primitive types.
//! Engine-level failures live in `selfescrow-state`.

use thiserror::Error;

/// Error produced by the primitive constructors and parsers.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// An address string was not `0x` followed by 40 hex digits.
    #[error("invalid address {input:?}: {reason}")]
    InvalidAddress {
        /// The rejected input.
        input: String,
        /// Why it was rejected.
        reason: String,
    },

    /// An amount string was not a non-negative base-10 integer.
    #[error("invalid amount {0:?}")]
    InvalidAmount(String),

    /// A timestamp could not be constructed.
    #[error("invalid timestamp: {0}")]
    InvalidTimestamp(String),
}
