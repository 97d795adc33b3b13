//! Per-invocation context shared by every subcommand handler.

use std::path::{Path, PathBuf};

use anyhow::Result;

use selfescrow_core::Address;

use crate::chain::Chain;
use crate::config::CliConfig;

/// State directory used when `--state-dir` is absent.
pub const DEFAULT_STATE_DIR: &str = ".selfescrow";

/// Resolved config plus the directory holding the devnet chain.
#[derive(Debug, Clone)]
pub struct CliContext {
    /// Accounts from `selfescrow.yaml`, or the defaults.
    pub config: CliConfig,
    /// Directory holding `chain.json`; created on first save.
    pub state_dir: PathBuf,
}

impl CliContext {
    /// Bundle a loaded config with the state directory.
    pub fn new(config: CliConfig, state_dir: impl Into<PathBuf>) -> Self {
        Self {
            config,
            state_dir: state_dir.into(),
        }
    }

    /// Directory the chain is loaded from and saved to.
    pub fn state_dir(&self) -> &Path {
        &self.state_dir
    }

    /// The saved chain, or a genesis chain built from the config.
    pub fn load_chain(&self) -> Result<Chain> {
        match Chain::load(&self.state_dir)? {
            Some(chain) => Ok(chain),
            None => {
                tracing::info!(
                    state_dir = %self.state_dir.display(),
                    accounts = self.config.accounts.len(),
                    "no saved chain; starting from genesis"
                );
                Chain::genesis(self.config.allocations())
            }
        }
    }

    /// Persist `chain` into the state directory.
    pub fn save_chain(&self, chain: &Chain) -> Result<()> {
        chain.save(&self.state_dir)
    }

    /// Resolve an alias or `0x` address.
    pub fn party(&self, party: &str) -> Result<Address> {
        self.config.resolve_party(party)
    }

    /// `alias (0x…)` for configured accounts, otherwise the bare address.
    pub fn label(&self, address: &Address) -> String {
        self.config.label(address)
    }
}
