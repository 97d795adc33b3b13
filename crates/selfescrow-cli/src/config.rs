//! # Devnet Configuration
//!
//! Named accounts and their genesis balances, read from `selfescrow.yaml`:
//!
//! ```yaml
//! accounts:
//!   - alias: acct_owner
//!     balance: 1000000
//!   - alias: acct_from
//!     balance: 1000000
//!   - alias: acct_to
//!     address: "0x00000000000000000000000000000000000000b0"
//!     balance: 0
//! ```
//!
//! An account without an `address` gets one derived from its alias.
//! Without a config file, ten accounts `account0`..`account9` holding
//! [`DEFAULT_BALANCE`] each are used.

use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};

use selfescrow_core::{Address, Amount};

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "selfescrow.yaml";

/// Genesis balance of each default account.
pub const DEFAULT_BALANCE: Amount = Amount::new(1_000_000);

/// Number of default accounts.
pub const DEFAULT_ACCOUNT_COUNT: usize = 10;

/// Aliases tried, in order, when `deploy` is given no `--owner`.
pub const DEFAULT_OWNER_ALIASES: [&str; 2] = ["acct_owner", "account0"];

/// One named devnet account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountConfig {
    /// Name used on the command line.
    pub alias: String,
    /// Explicit address; derived from the alias when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
    /// Balance minted at genesis.
    #[serde(default)]
    pub balance: Amount,
}

impl AccountConfig {
    /// The account's ledger address.
    pub fn address(&self) -> Address {
        self.address
            .unwrap_or_else(|| Address::from_label(&self.alias))
    }
}

/// Parsed `selfescrow.yaml`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CliConfig {
    /// Named accounts, in genesis order.
    #[serde(default)]
    pub accounts: Vec<AccountConfig>,
}

impl Default for CliConfig {
    fn default() -> Self {
        let accounts = (0..DEFAULT_ACCOUNT_COUNT)
            .map(|i| AccountConfig {
                alias: format!("account{i}"),
                address: None,
                balance: DEFAULT_BALANCE,
            })
            .collect();
        Self { accounts }
    }
}

impl CliConfig {
    /// Load and validate a config file.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;
        let config: CliConfig = serde_yaml::from_str(&content)
            .with_context(|| format!("failed to parse config: {}", path.display()))?;
        config.validate()?;
        tracing::debug!(
            path = %path.display(),
            accounts = config.accounts.len(),
            "loaded config"
        );
        Ok(config)
    }

    /// Pick the config for this invocation.
    ///
    /// An explicit path must exist. Otherwise [`DEFAULT_CONFIG_FILE`] in
    /// `cwd` is used if present, and the default accounts if not.
    pub fn resolve(explicit: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }
        let default_path = cwd.join(DEFAULT_CONFIG_FILE);
        if default_path.is_file() {
            return Self::load(&default_path);
        }
        tracing::debug!("no config file; using default accounts");
        Ok(Self::default())
    }

    /// Reject empty, duplicate, or address-shaped aliases and duplicate addresses.
    pub fn validate(&self) -> Result<()> {
        let mut aliases = BTreeSet::new();
        let mut addresses = BTreeSet::new();
        for account in &self.accounts {
            let alias = account.alias.as_str();
            if alias.trim().is_empty() {
                bail!("account alias must not be empty");
            }
            if alias.starts_with("0x") || alias.starts_with("0X") {
                bail!("account alias must not look like an address: {alias:?}");
            }
            if !aliases.insert(alias) {
                bail!("duplicate account alias: {alias:?}");
            }
            if !addresses.insert(account.address()) {
                bail!("duplicate account address {} (alias {alias:?})", account.address());
            }
        }
        Ok(())
    }

    /// Resolve a party given as an alias or a `0x` address.
    pub fn resolve_party(&self, party: &str) -> Result<Address> {
        if party.starts_with("0x") || party.starts_with("0X") {
            return Address::parse(party).with_context(|| format!("invalid party {party:?}"));
        }
        self.accounts
            .iter()
            .find(|a| a.alias == party)
            .map(AccountConfig::address)
            .with_context(|| format!("unknown account alias: {party:?}"))
    }

    /// The alias of `address`, if it is a configured account.
    pub fn alias_of(&self, address: &Address) -> Option<&str> {
        self.accounts
            .iter()
            .find(|a| a.address() == *address)
            .map(|a| a.alias.as_str())
    }

    /// `alias (0x…)` for known accounts, the bare address otherwise.
    pub fn label(&self, address: &Address) -> String {
        match self.alias_of(address) {
            Some(alias) => format!("{alias} ({address})"),
            None => address.to_string(),
        }
    }

    /// Owner used by `deploy` when none is given.
    pub fn default_owner(&self) -> Result<Address> {
        DEFAULT_OWNER_ALIASES
            .iter()
            .find_map(|alias| self.resolve_party(alias).ok())
            .or_else(|| self.accounts.first().map(AccountConfig::address))
            .context("no accounts configured; pass --owner")
    }

    /// Genesis allocations, in config order.
    pub fn allocations(&self) -> impl Iterator<Item = (Address, Amount)> + '_ {
        self.accounts.iter().map(|a| (a.address(), a.balance))
    }
}
