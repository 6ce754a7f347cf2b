//! Error types for the ledger JSON-RPC client.

use thiserror::Error;

/// JSON-RPC error code reported by a node that is behind or otherwise unhealthy.
pub const NODE_UNHEALTHY: i64 = -32005;

/// JSON-RPC error code for a transaction that failed preflight simulation.
pub const SEND_TRANSACTION_PREFLIGHT_FAILURE: i64 = -32002;

/// JSON-RPC error code for a transaction whose signatures failed verification.
pub const TRANSACTION_SIGNATURE_VERIFICATION_FAILURE: i64 = -32003;

/// Errors that can occur while talking to a ledger endpoint.
#[derive(Debug, Error)]
pub enum Error {
    /// HTTP request failed before a response was received.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Endpoint answered with a non-success status and no JSON-RPC error body.
    #[error("HTTP status {code}: {body}")]
    Status {
        /// HTTP status code.
        code: u16,
        /// Response body, possibly empty.
        body: String,
    },

    /// JSON-RPC error returned by the node.
    #[error("RPC error {code}: {message}")]
    Rpc {
        /// Error code.
        code: i64,
        /// Error message.
        message: String,
        /// Structured error payload, if any.
        data: Option<serde_json::Value>,
    },

    /// Failed to parse response.
    #[error("parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// URL parsing failed.
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Response carried neither a result nor an error.
    #[error("RPC method {0} returned no result")]
    MissingResult(&'static str),
}

impl Error {
    /// Whether retrying the same call later may succeed.
    ///
    /// Transport failures, throttling, server errors, unhealthy nodes and
    /// garbled responses are transient. Everything the node deliberately
    /// rejected is not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Parse(_) | Self::MissingResult(_) => true,
            Self::Status { code, .. } => *code == 429 || *code >= 500,
            Self::Rpc { code, .. } => *code == NODE_UNHEALTHY,
            Self::InvalidUrl(_) => false,
        }
    }
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
