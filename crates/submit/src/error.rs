//! Error types for proof submission.

use std::{fmt, io};

use proof_submit_rpc::error::{
    Error as RpcError, SEND_TRANSACTION_PREFLIGHT_FAILURE,
    TRANSACTION_SIGNATURE_VERIFICATION_FAILURE,
};
use serde_json::Value;
use thiserror::Error;

/// Why the ledger refused a transaction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RejectReason {
    /// The block reference is older than the ledger's validity window.
    BlockhashExpired,
    /// The fee payer cannot cover the transaction fee.
    InsufficientFee,
    /// The program refused the instruction during preflight.
    InvalidInstruction(String),
    /// The transaction signature did not verify.
    SignatureFailure,
    /// The transaction landed but the program returned an error.
    ProgramFailed(String),
    /// Any other refusal, with the node's message.
    Other(String),
}

impl RejectReason {
    /// Whether rebuilding against a fresh block reference can succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::BlockhashExpired)
    }

    /// Decode a `sendTransaction` preflight failure.
    ///
    /// The node puts the transaction error in `data.err`, either as a bare
    /// string (`"BlockhashNotFound"`) or as an object
    /// (`{"InstructionError": [0, "InvalidInstructionData"]}`).
    pub(crate) fn from_preflight(message: &str, data: Option<&Value>) -> Self {
        match data.and_then(|data| data.get("err")) {
            Some(Value::String(err)) if err == "BlockhashNotFound" => Self::BlockhashExpired,
            Some(Value::String(err)) if err == "InsufficientFundsForFee" => Self::InsufficientFee,
            Some(err @ Value::Object(map)) if map.contains_key("InstructionError") => {
                Self::InvalidInstruction(err["InstructionError"].to_string())
            }
            _ if message.contains("Blockhash not found") => Self::BlockhashExpired,
            _ => Self::Other(message.to_string()),
        }
    }
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BlockhashExpired => f.write_str("blockhash expired"),
            Self::InsufficientFee => f.write_str("insufficient funds for fee"),
            Self::InvalidInstruction(detail) => write!(f, "invalid instruction: {detail}"),
            Self::SignatureFailure => f.write_str("signature verification failed"),
            Self::ProgramFailed(detail) => write!(f, "program failed: {detail}"),
            Self::Other(detail) => f.write_str(detail),
        }
    }
}

/// Errors that can occur while submitting a proof.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The endpoint could not be reached or answered the handshake with garbage.
    #[error("connect error: {detail}")]
    Connect {
        /// What went wrong.
        detail: String,
        /// Whether a later attempt may succeed.
        transient: bool,
    },

    /// The transaction does not fit in a single ledger packet.
    #[error("transaction of {size} bytes exceeds the {limit} byte packet limit")]
    Encoding {
        /// Wire size of the signed transaction.
        size: usize,
        /// Maximum wire size the ledger accepts.
        limit: usize,
    },

    /// Failed to serialize the transaction framing.
    #[error("serialization error: {0}")]
    Serialize(#[from] bincode::Error),

    /// The credential is missing, malformed, or not the fee payer.
    #[error("signing error: {0}")]
    Signing(String),

    /// Transport failure or an unusable response.
    #[error("network error: {0}")]
    Network(String),

    /// The ledger refused the transaction.
    #[error("rejected: {0}")]
    Rejected(RejectReason),

    /// The submission was cancelled by the caller.
    #[error("submission cancelled")]
    Cancelled,

    /// Failed to load or parse configuration.
    #[error("config error: {0}")]
    Config(String),

    /// I/O error while reading the proof artifact.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml_edit::de::Error),
}

impl SubmitError {
    /// Process exit status reported for this error.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::Rejected(_) | Self::Encoding { .. } => 2,
            Self::Network(_) | Self::Connect { transient: true, .. } => 4,
            Self::Cancelled => 130,
            Self::Connect { .. }
            | Self::Serialize(_)
            | Self::Signing(_)
            | Self::Config(_)
            | Self::Io(_)
            | Self::Toml(_) => 1,
        }
    }
}

impl From<RpcError> for SubmitError {
    fn from(err: RpcError) -> Self {
        if err.is_transient() {
            return Self::Network(err.to_string());
        }

        match err {
            RpcError::Rpc {
                code: SEND_TRANSACTION_PREFLIGHT_FAILURE,
                message,
                data,
            } => Self::Rejected(RejectReason::from_preflight(&message, data.as_ref())),
            RpcError::Rpc {
                code: TRANSACTION_SIGNATURE_VERIFICATION_FAILURE,
                ..
            } => Self::Rejected(RejectReason::SignatureFailure),
            RpcError::InvalidUrl(err) => Self::Config(err.to_string()),
            other => Self::Rejected(RejectReason::Other(other.to_string())),
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, SubmitError>;
