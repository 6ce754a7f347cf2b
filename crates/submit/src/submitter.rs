//! Submission pipeline with retries.
//!
//! Every attempt runs the full pipeline against a fresh connection:
//!
//! ```text
//! connect -> fetch block reference -> build -> sign -> submit -> confirm
//! ```
//!
//! Network errors, confirmation timeouts and expired block references start a
//! new attempt after a jittered backoff. Any other rejection, an oversized
//! payload or a signing failure ends the submission immediately.

use std::{fmt, sync::Arc, time::Duration};

use solana_program::{hash::Hash, pubkey::Pubkey};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use crate::{
    artifact::ProofArtifact,
    backoff::Backoff,
    config::Config,
    connection::{Connection, LedgerOptions},
    credential::Credential,
    error::{RejectReason, Result, SubmitError},
    transaction::{SubmissionRequest, build_transaction, sign},
};

/// Final outcome of a submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmissionResult {
    /// The transaction reached the configured commitment.
    Confirmed { transaction_id: String, slot: u64 },
    /// The ledger refused the transaction.
    Rejected { reason: RejectReason },
    /// No confirmation arrived within the deadline.
    TimedOut,
    /// The endpoint could not be reached or answered unusably.
    NetworkError { detail: String },
}

impl SubmissionResult {
    pub fn is_confirmed(&self) -> bool {
        matches!(self, Self::Confirmed { .. })
    }

    /// Process exit status reported for this outcome.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Confirmed { .. } => 0,
            Self::Rejected { .. } => 2,
            Self::TimedOut => 3,
            Self::NetworkError { .. } => 4,
        }
    }

    /// Whether a fresh attempt may change the outcome.
    fn is_retryable(&self) -> bool {
        match self {
            Self::Confirmed { .. } => false,
            Self::Rejected { reason } => reason.is_retryable(),
            Self::TimedOut | Self::NetworkError { .. } => true,
        }
    }
}

impl fmt::Display for SubmissionResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Confirmed {
                transaction_id,
                slot,
            } => write!(f, "confirmed {transaction_id} at slot {slot}"),
            Self::Rejected { reason } => write!(f, "rejected: {reason}"),
            Self::TimedOut => f.write_str("timed out waiting for confirmation"),
            Self::NetworkError { detail } => write!(f, "network error: {detail}"),
        }
    }
}

/// Retry and confirmation settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubmitOptions {
    pub ledger: LedgerOptions,
    /// Confirmation deadline for each attempt.
    pub confirm_timeout: Duration,
    /// Total number of pipeline attempts; zero is treated as one.
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl Default for SubmitOptions {
    fn default() -> Self {
        Self {
            ledger: LedgerOptions::default(),
            confirm_timeout: Duration::from_secs(60),
            max_retries: 5,
            backoff: Backoff::default(),
        }
    }
}

/// Submits proof artifacts to one program and state account.
///
/// Holds no per-submission state, so one submitter may drive several
/// submissions concurrently.
#[derive(Debug, Clone)]
pub struct Submitter {
    endpoint: Url,
    program_id: Pubkey,
    state_account: Pubkey,
    credential: Arc<Credential>,
    options: SubmitOptions,
    cancel: CancellationToken,
}

impl Submitter {
    pub fn new(
        endpoint: Url,
        program_id: Pubkey,
        state_account: Pubkey,
        credential: Arc<Credential>,
        options: SubmitOptions,
    ) -> Self {
        Self {
            endpoint,
            program_id,
            state_account,
            credential,
            options,
            cancel: CancellationToken::new(),
        }
    }

    /// Creates a submitter from loaded configuration.
    pub fn from_config(config: &Config, credential: Arc<Credential>) -> Self {
        Self::new(
            config.endpoint.clone(),
            config.program_id,
            config.state_account,
            credential,
            config.submit_options(),
        )
    }

    /// Aborts in-flight submissions when `cancel` fires.
    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Submits `proof` and waits for confirmation, retrying transient failures.
    ///
    /// Ledger outcomes, including exhausted retries, are reported as a
    /// [`SubmissionResult`]. Client-side failures (oversized payload, bad
    /// credential, malformed handshake, cancellation) are returned as errors.
    pub async fn submit(&self, proof: &ProofArtifact) -> Result<SubmissionResult> {
        let max_attempts = self.options.max_retries.max(1);
        let mut history = History::default();
        let mut attempt = 1;

        loop {
            let result = tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SubmitError::Cancelled),
                result = self.attempt(proof, attempt, &mut history) => result?,
            };

            if !result.is_retryable() || attempt >= max_attempts {
                return Ok(result);
            }

            let delay = self.options.backoff.delay(attempt, &mut rand::rng());
            warn!(
                attempt,
                max_attempts,
                outcome = %result,
                delay_ms = delay.as_millis() as u64,
                "Submission attempt failed, retrying"
            );

            tokio::select! {
                biased;
                _ = self.cancel.cancelled() => return Err(SubmitError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }

            attempt += 1;
        }
    }

    /// Runs the pipeline once. Transient failures come back as results so the
    /// caller can decide whether to retry.
    async fn attempt(
        &self,
        proof: &ProofArtifact,
        attempt: u32,
        history: &mut History,
    ) -> Result<SubmissionResult> {
        let connection = match Connection::connect_with(&self.endpoint, self.options.ledger).await
        {
            Ok(connection) => connection,
            Err(SubmitError::Connect {
                detail,
                transient: true,
            }) => return Ok(SubmissionResult::NetworkError { detail }),
            Err(e) => return Err(e),
        };

        // A transaction from an earlier attempt may have landed after we gave up on it.
        if !history.sent.is_empty() {
            let transaction_ids: Vec<_> = history
                .sent
                .iter()
                .map(|sent| sent.transaction_id.clone())
                .collect();
            match connection.find_landed(&transaction_ids).await {
                Ok(Some(index)) => {
                    let sent = history.sent[index].clone();
                    info!(
                        attempt,
                        tx_id = %sent.transaction_id,
                        "Earlier transaction landed, resuming confirmation"
                    );
                    let result = connection
                        .confirm(
                            &sent.transaction_id,
                            sent.last_valid_block_height,
                            self.options.confirm_timeout,
                            &self.cancel,
                        )
                        .await?;
                    history.record(&result, sent.blockhash);
                    return Ok(result);
                }
                Ok(None) => {}
                Err(e) => warn!(error = %e, "Failed to check earlier attempts"),
            }
        }

        let block_reference = match connection.latest_block_reference().await {
            Ok(block_reference) => block_reference,
            Err(e) => return outcome_of(e),
        };
        if history.expired_blockhash == Some(block_reference.blockhash) {
            warn!(
                attempt,
                blockhash = %block_reference.blockhash,
                "Node returned an expired blockhash again"
            );
            return Ok(SubmissionResult::Rejected {
                reason: RejectReason::BlockhashExpired,
            });
        }
        debug!(
            attempt,
            blockhash = %block_reference.blockhash,
            last_valid_block_height = block_reference.last_valid_block_height,
            "Fetched block reference"
        );

        let request = SubmissionRequest {
            proof,
            program_id: self.program_id,
            state_account: self.state_account,
            credential: &self.credential,
        };
        let transaction = build_transaction(&request, &block_reference)?;
        let signed = sign(transaction, &self.credential)?;

        let result = match connection.submit(&signed).await {
            Ok(transaction_id) => {
                history.sent.push(Sent {
                    transaction_id: transaction_id.clone(),
                    blockhash: block_reference.blockhash,
                    last_valid_block_height: block_reference.last_valid_block_height,
                });
                info!(
                    attempt,
                    tx_id = %transaction_id,
                    proof_len = proof.len(),
                    "Submitted proof transaction"
                );

                connection
                    .confirm(
                        &transaction_id,
                        block_reference.last_valid_block_height,
                        self.options.confirm_timeout,
                        &self.cancel,
                    )
                    .await?
            }
            Err(e) => outcome_of(e)?,
        };

        history.record(&result, block_reference.blockhash);
        Ok(result)
    }
}

/// Transaction sent by an earlier attempt.
#[derive(Debug, Clone)]
struct Sent {
    transaction_id: String,
    blockhash: Hash,
    last_valid_block_height: u64,
}

/// What earlier attempts for one proof left behind.
#[derive(Debug, Default)]
struct History {
    sent: Vec<Sent>,
    /// Blockhash the ledger last reported as expired. Never built on again.
    expired_blockhash: Option<Hash>,
}

impl History {
    fn record(&mut self, result: &SubmissionResult, blockhash: Hash) {
        if let SubmissionResult::Rejected {
            reason: RejectReason::BlockhashExpired,
        } = result
        {
            self.expired_blockhash = Some(blockhash);
        }
    }
}

/// Turns ledger-side errors into outcomes and passes client-side errors through.
fn outcome_of(err: SubmitError) -> Result<SubmissionResult> {
    match err {
        SubmitError::Network(detail) => Ok(SubmissionResult::NetworkError { detail }),
        SubmitError::Rejected(reason) => Ok(SubmissionResult::Rejected { reason }),
        other => Err(other),
    }
}
