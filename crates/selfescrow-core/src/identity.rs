//! # Ledger Addresses
//!
//! `Address` identifies every party the ledger knows about: the funder,
//! the payee, the owner, and the escrow's own custody account. It is a
//! 20-byte value rendered as `0x` followed by 40 lowercase hex digits.
//!
//! ## Derivation
//!
//! Two deterministic constructors exist:
//!
//! - [`Address::from_label()`] hashes a human label (`"account0"`), used
//!   for the devnet's default accounts.
//! - [`Address::derive_contract()`] hashes a deployer address and its
//!   deploy nonce, used for escrow custody accounts. Same deployer and
//!   nonce always yield the same address.
//!
//! Both take the first 20 bytes of a SHA-256 digest. The derivation is
//! not Ethereum-compatible (no Keccak, no RLP); it only has to be stable
//! within this stack.

use sha2::{Digest, Sha256};
use serde::{Deserialize, Serialize};

use crate::error::CoreError;

/// Number of bytes in an address.
pub const ADDRESS_LEN: usize = 20;

/// A 20-byte ledger address.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address([u8; ADDRESS_LEN]);

impl Address {
    /// Parse an address from `0x`-prefixed hex. Upper and lower case
    /// digits are both accepted; the prefix is mandatory.
    pub fn parse(s: &str) -> Result<Self, CoreError> {
        let invalid = |reason: &str| CoreError::InvalidAddress {
            input: s.to_string(),
            reason: reason.to_string(),
        };

        let hex = s
            .strip_prefix("0x")
            .or_else(|| s.strip_prefix("0X"))
            .ok_or_else(|| invalid("missing 0x prefix"))?;
        if hex.len() != ADDRESS_LEN * 2 {
            return Err(invalid("expected 40 hex digits"));
        }

        let mut bytes = [0u8; ADDRESS_LEN];
        for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
            let hi = hex_value(chunk[0]).ok_or_else(|| invalid("non-hex digit"))?;
            let lo = hex_value(chunk[1]).ok_or_else(|| invalid("non-hex digit"))?;
            bytes[i] = (hi << 4) | lo;
        }
        Ok(Self(bytes))
    }

    /// Deterministic address for a human-readable label.
    pub fn from_label(label: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"selfescrow:account:");
        hasher.update(label.as_bytes());
        Self::truncate(&hasher.finalize())
    }

    /// Deterministic custody address for the `nonce`-th deployment by `deployer`.
    pub fn derive_contract(deployer: &Address, nonce: u64) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(b"selfescrow:contract:");
        hasher.update(deployer.0);
        hasher.update(nonce.to_be_bytes());
        Self::truncate(&hasher.finalize())
    }

    /// Render as `0x`-prefixed lowercase hex.
    pub fn to_hex(&self) -> String {
        let digits: String = self.0.iter().map(|b| format!("{b:02x}")).collect();
        format!("0x{digits}")
    }

    fn truncate(digest: &[u8]) -> Self {
        let mut bytes = [0u8; ADDRESS_LEN];
        bytes.copy_from_slice(&digest[..ADDRESS_LEN]);
        Self(bytes)
    }
}

fn hex_value(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        b'A'..=b'F' => Some(c - b'A' + 10),
        _ => None,
    }
}

impl std::fmt::Display for Address {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl std::str::FromStr for Address {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Address {
    type Error = CoreError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<Address> for String {
    fn from(addr: Address) -> Self {
        addr.to_hex()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_and_display_roundtrip() {
        let s = "0x00112233445566778899aabbccddeeff00112233";
        let addr = Address::parse(s).unwrap();
        assert_eq!(addr.to_string(), s);
    }

    #[test]
    fn parse_accepts_uppercase_digits() {
        let addr = Address::parse("0x00112233445566778899AABBCCDDEEFF00112233").unwrap();
        assert_eq!(addr.to_hex(), "0x00112233445566778899aabbccddeeff00112233");
    }

    #[test]
    fn parse_rejects_missing_prefix() {
        let err = Address::parse("00112233445566778899aabbccddeeff00112233").unwrap_err();
        assert!(err.to_string().contains("missing 0x prefix"));
    }

    #[test]
    fn parse_rejects_wrong_length() {
        assert!(Address::parse("0x1234").is_err());
        assert!(Address::parse("0x").is_err());
        assert!(Address::parse("").is_err());
    }

    #[test]
    fn parse_rejects_non_hex() {
        let err = Address::parse("0x0011223344556677889900zz0011223344556677").unwrap_err();
        assert!(err.to_string().contains("non-hex"));
    }

    #[test]
    fn labels_are_deterministic_and_distinct() {
        assert_eq!(Address::from_label("account1"), Address::from_label("account1"));
        assert_ne!(Address::from_label("account1"), Address::from_label("account2"));
    }

    #[test]
    fn contract_address_depends_on_deployer_and_nonce() {
        let owner = Address::from_label("account0");
        let other = Address::from_label("account1");
        let a0 = Address::derive_contract(&owner, 0);
        assert_eq!(a0, Address::derive_contract(&owner, 0));
        assert_ne!(a0, Address::derive_contract(&owner, 1));
        assert_ne!(a0, Address::derive_contract(&other, 0));
        assert_ne!(a0, owner);
    }

    #[test]
    fn serde_uses_hex_string() {
        let addr = Address::from_label("acct_from");
        let json = serde_json::to_string(&addr).unwrap();
        assert_eq!(json, format!("\"{}\"", addr.to_hex()));
        let back: Address = serde_json::from_str(&json).unwrap();
        assert_eq!(back, addr);
    }

    #[test]
    fn serde_rejects_malformed_string() {
        let result: Result<Address, _> = serde_json::from_str("\"0xnothex\"");
        assert!(result.is_err());
    }
}
