//! Request and response types for the ledger JSON-RPC API.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use serde_with::{base64::Base64, serde_as};
use thiserror::Error;

/// How settled a block must be before the node reports it.
///
/// Ordered from weakest to strongest, so `status >= wanted` means the wanted
/// level has been reached.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize,
)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentLevel {
    /// Block has been processed by the node.
    Processed,
    /// Block has been voted on by a supermajority.
    Confirmed,
    /// Block is rooted and cannot be rolled back.
    #[default]
    Finalized,
}

impl CommitmentLevel {
    /// Returns the wire name of the level.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl fmt::Display for CommitmentLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown commitment level.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown commitment level '{0}', expected processed, confirmed or finalized")]
pub struct ParseCommitmentLevelError(String);

impl FromStr for CommitmentLevel {
    type Err = ParseCommitmentLevelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            other => Err(ParseCommitmentLevelError(other.to_string())),
        }
    }
}

/// Commitment parameter object.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CommitmentConfig {
    pub commitment: CommitmentLevel,
}

/// Response wrapper for methods that report the slot they were evaluated at.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcResponse<T> {
    pub context: RpcContext,
    pub value: T,
}

/// Slot at which a response was evaluated.
#[derive(Debug, Clone, Copy, Deserialize)]
pub struct RpcContext {
    pub slot: u64,
}

/// Result of `getVersion`.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcVersionInfo {
    /// Software version of the node.
    #[serde(rename = "solana-core")]
    pub solana_core: String,
    /// Unique identifier of the node's feature set.
    #[serde(rename = "feature-set")]
    pub feature_set: Option<u32>,
}

/// Result value of `getLatestBlockhash`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LatestBlockhash {
    /// Base58 blockhash.
    pub blockhash: String,
    /// Last block height at which a transaction using this blockhash is valid.
    pub last_valid_block_height: u64,
}

/// Signed transaction bytes, base64 encoded on the wire.
#[serde_as]
#[derive(Debug, Clone, Serialize)]
#[serde(transparent)]
pub struct EncodedTransaction(#[serde_as(as = "Base64")] pub Vec<u8>);

/// Wire encoding of a transaction passed to `sendTransaction`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionEncoding {
    #[default]
    Base64,
}

/// Options for `sendTransaction`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SendTransactionConfig {
    pub encoding: TransactionEncoding,
    pub skip_preflight: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preflight_commitment: Option<CommitmentLevel>,
    /// Node-side rebroadcast attempts. `Some(0)` leaves retrying to the caller.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_retries: Option<usize>,
}

/// Options for `getSignatureStatuses`.
#[derive(Debug, Clone, Copy, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureStatusConfig {
    pub search_transaction_history: bool,
}

/// Status of a signature as reported by `getSignatureStatuses`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionStatus {
    /// Slot the transaction was processed in.
    pub slot: u64,
    /// Number of blocks since confirmation, `None` once rooted.
    pub confirmations: Option<usize>,
    /// Execution error, `None` if the transaction succeeded.
    pub err: Option<serde_json::Value>,
    /// Commitment level the transaction has reached.
    pub confirmation_status: Option<CommitmentLevel>,
}

impl TransactionStatus {
    /// Whether the transaction has reached at least `commitment`.
    ///
    /// Older nodes omit `confirmationStatus`; a `None` confirmation count then
    /// means the block is rooted.
    pub fn satisfies(&self, commitment: CommitmentLevel) -> bool {
        match self.confirmation_status {
            Some(status) => status >= commitment,
            None => self.confirmations.is_none() || commitment != CommitmentLevel::Finalized,
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn commitment_level_parses_wire_names() {
        for level in [
            CommitmentLevel::Processed,
            CommitmentLevel::Confirmed,
            CommitmentLevel::Finalized,
        ] {
            assert_eq!(level.as_str().parse::<CommitmentLevel>(), Ok(level));
        }
        assert!("rooted".parse::<CommitmentLevel>().is_err());
    }

    #[test]
    fn send_config_serializes_camel_case_and_skips_unset() {
        let config = SendTransactionConfig {
            skip_preflight: true,
            preflight_commitment: Some(CommitmentLevel::Confirmed),
            ..Default::default()
        };
        assert_eq!(
            serde_json::to_value(config).unwrap(),
            json!({
                "encoding": "base64",
                "skipPreflight": true,
                "preflightCommitment": "confirmed",
            })
        );
    }

    #[test]
    fn encoded_transaction_is_a_base64_string() {
        let encoded = EncodedTransaction(vec![1, 2, 3]);
        assert_eq!(serde_json::to_value(encoded).unwrap(), json!("AQID"));
    }

    #[test]
    fn status_satisfies_weaker_or_equal_commitment() {
        let status: TransactionStatus = serde_json::from_value(json!({
            "slot": 72,
            "confirmations": 10,
            "err": null,
            "confirmationStatus": "confirmed",
        }))
        .unwrap();

        assert!(status.satisfies(CommitmentLevel::Processed));
        assert!(status.satisfies(CommitmentLevel::Confirmed));
        assert!(!status.satisfies(CommitmentLevel::Finalized));
    }

    #[test]
    fn status_without_confirmation_status_falls_back_to_confirmations() {
        let rooted: TransactionStatus = serde_json::from_value(json!({
            "slot": 72,
            "confirmations": null,
            "err": null,
        }))
        .unwrap();
        assert!(rooted.satisfies(CommitmentLevel::Finalized));
    }

    #[test]
    fn latest_blockhash_response_parses() {
        let response: RpcResponse<LatestBlockhash> = serde_json::from_value(json!({
            "context": { "slot": 2792 },
            "value": {
                "blockhash": "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N",
                "lastValidBlockHeight": 3090,
            },
        }))
        .unwrap();

        assert_eq!(response.context.slot, 2792);
        assert_eq!(response.value.last_valid_block_height, 3090);
    }
}
