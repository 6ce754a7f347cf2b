//! Configuration for the proof submitter.

use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use proof_submit_rpc::types::CommitmentLevel;
use serde::{Deserialize, Serialize};
use serde_with::{DisplayFromStr, serde_as};
use solana_program::pubkey::Pubkey;
use url::Url;

use crate::{
    backoff::Backoff,
    connection::LedgerOptions,
    error::{Result, SubmitError},
    submitter::SubmitOptions,
};

/// Submitter configuration.
#[serde_as]
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Config {
    /// Ledger JSON-RPC URL.
    pub endpoint: Url,
    /// Program the proof is sent to (base58).
    #[serde_as(as = "DisplayFromStr")]
    pub program_id: Pubkey,
    /// State account the program records the proof in (base58).
    #[serde_as(as = "DisplayFromStr")]
    pub state_account: Pubkey,
    /// File holding the proof artifact.
    pub proof_path: PathBuf,
    /// Keypair file of the fee payer, in Solana CLI format.
    pub keypair_path: PathBuf,
    /// Confirmation deadline per attempt, in milliseconds.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Total number of submission attempts.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Commitment a transaction must reach to count as confirmed.
    #[serde(default)]
    pub commitment: CommitmentLevel,
    /// Delay between confirmation polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Backoff before the first retry, in milliseconds.
    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,
    /// Upper bound on the backoff between retries, in milliseconds.
    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,
    /// Skip the node's preflight simulation.
    #[serde(default)]
    pub skip_preflight: bool,
}

fn default_timeout_ms() -> u64 {
    60_000
}

fn default_max_retries() -> u32 {
    5
}

fn default_poll_interval_ms() -> u64 {
    500
}

fn default_base_delay_ms() -> u64 {
    500
}

fn default_max_delay_ms() -> u64 {
    8_000
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            SubmitError::Config(format!(
                "failed to read config file '{}': {}",
                path.as_ref().display(),
                e
            ))
        })?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml_edit::de::from_str(s)?)
    }

    /// Retry and confirmation settings derived from this configuration.
    pub fn submit_options(&self) -> SubmitOptions {
        SubmitOptions {
            ledger: LedgerOptions {
                commitment: self.commitment,
                poll_interval: Duration::from_millis(self.poll_interval_ms),
                skip_preflight: self.skip_preflight,
            },
            confirm_timeout: Duration::from_millis(self.timeout_ms),
            max_retries: self.max_retries,
            backoff: Backoff::new(
                Duration::from_millis(self.base_delay_ms),
                Duration::from_millis(self.max_delay_ms),
            ),
        }
    }
}
