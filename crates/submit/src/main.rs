//! Submits a proof artifact to a ledger program and waits for confirmation.
//!
//! ```text
//!   proof-submit            Ledger endpoint            Program
//!        |                         |                      |
//!        |--getLatestBlockhash---->|                      |
//!        |<-------blockhash--------|                      |
//!        |                         |                      |
//!   (build + sign tx)              |                      |
//!        |                         |                      |
//!        |--sendTransaction------->|--instruction(proof)->|
//!        |<------signature---------|                      |
//!        |                         |                      |
//!        |--getSignatureStatuses-->|                      |
//!        |<-------confirmed--------|                      |
//! ```
//!
//! Exit status: 0 confirmed, 1 setup failure, 2 rejected, 3 timed out,
//! 4 network error, 130 interrupted.

use std::{path::PathBuf, process::ExitCode, str::FromStr, sync::Arc};

use anyhow::Context;
use clap::Parser;
use proof_submit::{
    CommitmentLevel, Config, Credential, ProofArtifact, Pubkey, SubmitError, Submitter,
};
use tokio::signal::unix::{SignalKind, signal};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use url::Url;

#[derive(Parser, Debug)]
#[command(name = "proof-submit")]
#[command(about = "Submit a proof artifact to a ledger program and wait for confirmation")]
struct Cli {
    #[arg(long, short, default_value = "config.toml")]
    config: PathBuf,
    /// Ledger JSON-RPC URL.
    #[arg(long)]
    endpoint: Option<Url>,
    /// Target program id (base58).
    #[arg(long)]
    program_id: Option<String>,
    /// Target state account (base58).
    #[arg(long)]
    state_account: Option<String>,
    /// Proof artifact file.
    #[arg(long)]
    proof: Option<PathBuf>,
    /// Fee payer keypair file.
    #[arg(long)]
    keypair: Option<PathBuf>,
    /// Confirmation deadline per attempt, in milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,
    /// Total number of submission attempts.
    #[arg(long)]
    max_retries: Option<u32>,
    /// Commitment level to wait for: processed, confirmed or finalized.
    #[arg(long)]
    commitment: Option<CommitmentLevel>,
    /// Delay between confirmation polls, in milliseconds.
    #[arg(long)]
    poll_interval_ms: Option<u64>,
    /// Backoff before the first retry, in milliseconds.
    #[arg(long)]
    base_delay_ms: Option<u64>,
    /// Upper bound on the backoff between retries, in milliseconds.
    #[arg(long)]
    max_delay_ms: Option<u64>,
    /// Skip the node's preflight simulation.
    #[arg(long)]
    skip_preflight: bool,
}

impl Cli {
    /// Applies command line overrides on top of the config file.
    fn apply(&self, mut config: Config) -> anyhow::Result<Config> {
        if let Some(endpoint) = &self.endpoint {
            config.endpoint = endpoint.clone();
        }
        if let Some(program_id) = &self.program_id {
            config.program_id = Pubkey::from_str(program_id)
                .with_context(|| format!("Invalid program id {program_id}"))?;
        }
        if let Some(state_account) = &self.state_account {
            config.state_account = Pubkey::from_str(state_account)
                .with_context(|| format!("Invalid state account {state_account}"))?;
        }
        if let Some(proof) = &self.proof {
            config.proof_path = proof.clone();
        }
        if let Some(keypair) = &self.keypair {
            config.keypair_path = keypair.clone();
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(commitment) = self.commitment {
            config.commitment = commitment;
        }
        if let Some(poll_interval_ms) = self.poll_interval_ms {
            config.poll_interval_ms = poll_interval_ms;
        }
        if let Some(base_delay_ms) = self.base_delay_ms {
            config.base_delay_ms = base_delay_ms;
        }
        if let Some(max_delay_ms) = self.max_delay_ms {
            config.max_delay_ms = max_delay_ms;
        }
        if self.skip_preflight {
            config.skip_preflight = true;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(1)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<ExitCode> {
    let config = cli.apply(Config::load(&cli.config)?)?;

    info!(
        endpoint = %config.endpoint,
        program_id = %config.program_id,
        state_account = %config.state_account,
        max_retries = config.max_retries,
        "Loaded configuration"
    );

    let credential = Arc::new(Credential::load(&config.keypair_path)?);
    let proof = ProofArtifact::load(&config.proof_path)
        .await
        .with_context(|| format!("Failed to read proof {}", config.proof_path.display()))?;

    info!(
        payer = %credential.pubkey(),
        proof_len = proof.len(),
        "Loaded proof artifact"
    );

    let shutdown_token = CancellationToken::new();
    {
        let shutdown_token = shutdown_token.clone();
        tokio::spawn(async move {
            match shutdown_signal().await {
                Ok(()) => {
                    info!("Received shutdown signal, cancelling submission");
                    shutdown_token.cancel();
                }
                Err(e) => warn!(error = %e, "No shutdown signals could be registered"),
            }
        });
    }

    let submitter = Submitter::from_config(&config, credential).with_cancellation(shutdown_token);

    let code = match submitter.submit(&proof).await {
        Ok(result) if result.is_confirmed() => {
            println!("{result}");
            result.exit_code()
        }
        Ok(result) => {
            eprintln!("{result}");
            result.exit_code()
        }
        Err(e @ SubmitError::Cancelled) => {
            eprintln!("{e}");
            e.exit_code()
        }
        Err(e) => {
            eprintln!("submission failed: {e}");
            e.exit_code()
        }
    };

    Ok(ExitCode::from(code))
}

/// Resolves on the first SIGINT or SIGTERM.
async fn shutdown_signal() -> std::io::Result<()> {
    let mut interrupt = signal(SignalKind::interrupt())?;
    let mut terminate = signal(SignalKind::terminate())?;

    tokio::select! {
        _ = interrupt.recv() => {}
        _ = terminate.recv() => {}
    }

    Ok(())
}
