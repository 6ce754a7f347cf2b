//! JSON-RPC client for Solana-compatible ledger endpoints.
//!
//! Covers the handful of methods a transaction submitter needs: a version
//! handshake, fetching a recent blockhash, sending a signed transaction and
//! polling signature statuses and block height.
//!
//! ## Example
//!
//! ```no_run
//! use proof_submit_rpc::{RpcClient, types::CommitmentLevel};
//!
//! # async fn example() -> proof_submit_rpc::Result<()> {
//! let client = RpcClient::new("https://api.devnet.solana.com")?;
//!
//! let version = client.get_version().await?;
//! println!("node runs {}", version.solana_core);
//!
//! let latest = client.get_latest_blockhash(CommitmentLevel::Confirmed).await?;
//! println!("blockhash {} at slot {}", latest.value.blockhash, latest.context.slot);
//! # Ok(())
//! # }
//! ```

pub use client::RpcClient;
pub use error::{Error, Result};

pub mod error;
pub mod types;

mod client;
