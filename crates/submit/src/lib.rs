//! Submits proof artifacts to a program on a Solana-compatible ledger.
//!
//! This crate provides functionality to:
//! - Load a proof artifact and a fee payer keypair
//! - Build a single-instruction transaction carrying the proof bytes
//! - Sign, submit and confirm it, retrying transient failures with backoff
//!
//! ## Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use proof_submit::{Config, Credential, ProofArtifact, Submitter};
//!
//! # async fn example() -> proof_submit::Result<()> {
//! let config = Config::load("config.toml")?;
//! let credential = Arc::new(Credential::load(&config.keypair_path)?);
//! let proof = ProofArtifact::load(&config.proof_path).await?;
//!
//! let result = Submitter::from_config(&config, credential).submit(&proof).await?;
//! println!("{result}");
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod backoff;
pub mod config;
pub mod connection;
pub mod credential;
pub mod error;
pub mod submitter;
pub mod transaction;

// Re-export main types at crate root for convenience.
pub use artifact::ProofArtifact;
pub use backoff::Backoff;
pub use config::Config;
pub use connection::{Connection, LedgerOptions};
pub use credential::Credential;
pub use error::{RejectReason, Result, SubmitError};
pub use submitter::{SubmissionResult, SubmitOptions, Submitter};
pub use transaction::{
    BlockReference, MAX_PROOF_LEN, PACKET_DATA_SIZE, SignedTransaction, SubmissionRequest,
    Transaction, build_transaction, sign,
};

// Re-export types that appear in our public API.
pub use proof_submit_rpc::types::CommitmentLevel;
pub use solana_program::{hash::Hash, pubkey::Pubkey};
