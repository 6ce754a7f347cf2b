//! Per-attempt handle to a ledger endpoint.

use std::{str::FromStr, time::Duration};

use proof_submit_rpc::{
    Error as RpcError, RpcClient,
    types::{CommitmentLevel, SendTransactionConfig, TransactionStatus},
};
use solana_program::hash::Hash;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};
use url::Url;

use crate::{
    error::{RejectReason, Result, SubmitError},
    submitter::SubmissionResult,
    transaction::{BlockReference, SignedTransaction},
};

/// Commitment used for the block reference and preflight simulation.
const REFERENCE_COMMITMENT: CommitmentLevel = CommitmentLevel::Confirmed;

/// How the connection talks to the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LedgerOptions {
    /// Commitment a transaction must reach to count as confirmed.
    pub commitment: CommitmentLevel,
    /// Delay between signature status polls.
    pub poll_interval: Duration,
    /// Skip the node's preflight simulation on submit.
    pub skip_preflight: bool,
}

impl Default for LedgerOptions {
    fn default() -> Self {
        Self {
            commitment: CommitmentLevel::Finalized,
            poll_interval: Duration::from_millis(500),
            skip_preflight: false,
        }
    }
}

/// Logical handle to a ledger endpoint.
///
/// Acquired at the start of a submission attempt and released when dropped.
#[derive(Debug)]
pub struct Connection {
    rpc: RpcClient,
    options: LedgerOptions,
    node_version: String,
}

impl Connection {
    /// Connects to `endpoint` with default options.
    pub async fn connect(endpoint: &Url) -> Result<Self> {
        Self::connect_with(endpoint, LedgerOptions::default()).await
    }

    /// Connects to `endpoint`, using `getVersion` as the handshake.
    ///
    /// An unreachable endpoint yields a transient [`SubmitError::Connect`]; a
    /// reply that is not a version object yields a fatal one.
    pub async fn connect_with(endpoint: &Url, options: LedgerOptions) -> Result<Self> {
        let rpc = RpcClient::new(endpoint.clone()).map_err(|e| SubmitError::Connect {
            detail: e.to_string(),
            transient: false,
        })?;

        match rpc.get_version().await {
            Ok(version) => {
                debug!(
                    url = %endpoint,
                    version = %version.solana_core,
                    "Connected to ledger endpoint"
                );
                Ok(Self {
                    rpc,
                    options,
                    node_version: version.solana_core,
                })
            }
            Err(err) => {
                let malformed = matches!(err, RpcError::Parse(_) | RpcError::MissingResult(_));
                Err(SubmitError::Connect {
                    transient: err.is_transient() && !malformed,
                    detail: format!("{endpoint}: {err}"),
                })
            }
        }
    }

    pub fn url(&self) -> &Url {
        self.rpc.url()
    }

    /// Software version the node reported during the handshake.
    pub fn node_version(&self) -> &str {
        &self.node_version
    }

    /// Fetches a fresh block reference.
    pub async fn latest_block_reference(&self) -> Result<BlockReference> {
        let latest = self.rpc.get_latest_blockhash(REFERENCE_COMMITMENT).await?;
        let blockhash = Hash::from_str(&latest.value.blockhash).map_err(|e| {
            SubmitError::Network(format!(
                "malformed blockhash '{}': {e}",
                latest.value.blockhash
            ))
        })?;

        Ok(BlockReference {
            blockhash,
            last_valid_block_height: latest.value.last_valid_block_height,
            slot: latest.context.slot,
        })
    }

    /// Sends a signed transaction. Returns its id.
    pub async fn submit(&self, transaction: &SignedTransaction) -> Result<String> {
        let config = SendTransactionConfig {
            skip_preflight: self.options.skip_preflight,
            preflight_commitment: Some(REFERENCE_COMMITMENT),
            ..Default::default()
        };
        let id = self
            .rpc
            .send_transaction(transaction.wire(), &config)
            .await?;

        let expected = transaction.id();
        if id != expected {
            warn!(returned = %id, expected = %expected, "Node returned unexpected signature");
        }
        Ok(expected)
    }

    /// Waits until `transaction_id` reaches the configured commitment.
    ///
    /// Returns [`SubmissionResult::TimedOut`] once `timeout` elapses, immediately
    /// if it is zero. Returns `Rejected` when the transaction failed on chain or
    /// the chain moved past `last_valid_block_height` without it.
    pub async fn confirm(
        &self,
        transaction_id: &str,
        last_valid_block_height: u64,
        timeout: Duration,
        cancel: &CancellationToken,
    ) -> Result<SubmissionResult> {
        if timeout.is_zero() {
            return Ok(SubmissionResult::TimedOut);
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => Err(SubmitError::Cancelled),

            settled = tokio::time::timeout(
                timeout,
                self.poll_until_settled(transaction_id, last_valid_block_height),
            ) => Ok(settled.unwrap_or(SubmissionResult::TimedOut)),
        }
    }

    async fn poll_until_settled(
        &self,
        transaction_id: &str,
        last_valid_block_height: u64,
    ) -> SubmissionResult {
        let signatures = [transaction_id.to_string()];
        let mut interval = tokio::time::interval(self.options.poll_interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            interval.tick().await;

            let status = match self.rpc.get_signature_statuses(&signatures, false).await {
                Ok(statuses) => statuses.into_iter().next().flatten(),
                Err(e) => {
                    warn!(tx_id = %transaction_id, error = %e, "Failed to poll signature status");
                    continue;
                }
            };

            if let Some(status) = status {
                if let Some(result) = self.settle(transaction_id, &status) {
                    return result;
                }
                trace!(
                    tx_id = %transaction_id,
                    slot = status.slot,
                    status = ?status.confirmation_status,
                    "Transaction seen, waiting for commitment"
                );
                continue;
            }

            match self.rpc.get_block_height(REFERENCE_COMMITMENT).await {
                Ok(height) if height > last_valid_block_height => {
                    debug!(
                        tx_id = %transaction_id,
                        height,
                        last_valid_block_height,
                        "Block reference expired before transaction landed"
                    );
                    return SubmissionResult::Rejected {
                        reason: RejectReason::BlockhashExpired,
                    };
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "Failed to fetch block height"),
            }
        }
    }

    /// Returns the index of the first of `transaction_ids` the ledger has seen,
    /// at any commitment level and whether or not it failed.
    pub async fn find_landed(&self, transaction_ids: &[String]) -> Result<Option<usize>> {
        let statuses = self
            .rpc
            .get_signature_statuses(transaction_ids, true)
            .await?;

        Ok(statuses.iter().position(Option::is_some))
    }

    /// Maps a reported status to a final result, or `None` if still pending.
    fn settle(&self, transaction_id: &str, status: &TransactionStatus) -> Option<SubmissionResult> {
        if let Some(err) = &status.err {
            return Some(SubmissionResult::Rejected {
                reason: RejectReason::ProgramFailed(err.to_string()),
            });
        }
        status
            .satisfies(self.options.commitment)
            .then(|| SubmissionResult::Confirmed {
                transaction_id: transaction_id.to_string(),
                slot: status.slot,
            })
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        trace!(url = %self.rpc.url(), "Releasing ledger connection");
    }
}
