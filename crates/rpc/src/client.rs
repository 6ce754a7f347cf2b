use std::{
    sync::atomic::{AtomicU64, Ordering},
    time::Duration,
};

use reqwest::{Client, IntoUrl, Url};
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use tracing::trace;

use crate::{
    Error, Result,
    types::{
        CommitmentConfig, CommitmentLevel, EncodedTransaction, LatestBlockhash, RpcResponse,
        RpcVersionInfo, SendTransactionConfig, SignatureStatusConfig, TransactionStatus,
    },
};

/// Upper bound on a single HTTP round trip.
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// JSON-RPC request structure.
#[derive(Debug, Clone, Serialize)]
struct JsonRpcRequest<T> {
    jsonrpc: &'static str,
    method: &'static str,
    params: T,
    id: u64,
}

/// JSON-RPC response structure.
#[derive(Debug, Clone, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

/// JSON-RPC error structure.
#[derive(Debug, Clone, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
    data: Option<serde_json::Value>,
}

impl From<JsonRpcError> for Error {
    fn from(error: JsonRpcError) -> Self {
        Error::Rpc {
            code: error.code,
            message: error.message,
            data: error.data,
        }
    }
}

/// JSON-RPC client for a ledger endpoint.
#[derive(Debug)]
pub struct RpcClient {
    url: Url,
    http_client: Client,
    next_id: AtomicU64,
}

impl RpcClient {
    /// Creates a new client for the endpoint at `url`.
    pub fn new(url: impl IntoUrl) -> Result<Self> {
        let http_client = Client::builder().timeout(DEFAULT_REQUEST_TIMEOUT).build()?;
        Self::with_client(url, http_client)
    }

    /// Creates a new client with a custom [`reqwest::Client`].
    pub fn with_client(url: impl IntoUrl, http_client: Client) -> Result<Self> {
        Ok(Self {
            url: url.into_url()?,
            http_client,
            next_id: AtomicU64::new(1),
        })
    }

    /// Return url of the endpoint.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Send a JSON-RPC request to the endpoint.
    ///
    /// Nodes may report JSON-RPC errors with a non-2xx status, so the body is
    /// inspected for an error object before falling back to [`Error::Status`].
    async fn request<P: Serialize, R: DeserializeOwned>(
        &self,
        method: &'static str,
        params: P,
    ) -> Result<R> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            method,
            params,
            id,
        };

        trace!(method, id, url = %self.url, "Sending RPC request");

        let response = self
            .http_client
            .post(self.url.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            let parsed: serde_json::Result<JsonRpcResponse<serde_json::Value>> =
                serde_json::from_str(&body);
            if let Ok(JsonRpcResponse {
                error: Some(error), ..
            }) = parsed
            {
                return Err(error.into());
            }
            return Err(Error::Status {
                code: status.as_u16(),
                body,
            });
        }

        let rpc_response: JsonRpcResponse<R> = serde_json::from_str(&body)?;

        if let Some(error) = rpc_response.error {
            return Err(error.into());
        }

        rpc_response.result.ok_or(Error::MissingResult(method))
    }

    /// Fetch the node's software version.
    pub async fn get_version(&self) -> Result<RpcVersionInfo> {
        self.request("getVersion", [(); 0]).await
    }

    /// Fetch the most recent blockhash and the height up to which it stays valid.
    pub async fn get_latest_blockhash(
        &self,
        commitment: CommitmentLevel,
    ) -> Result<RpcResponse<LatestBlockhash>> {
        self.request("getLatestBlockhash", (CommitmentConfig { commitment },))
            .await
    }

    /// Submit a signed, serialized transaction. Returns its base58 signature.
    pub async fn send_transaction(
        &self,
        transaction: &[u8],
        config: &SendTransactionConfig,
    ) -> Result<String> {
        self.request(
            "sendTransaction",
            (EncodedTransaction(transaction.to_vec()), config),
        )
        .await
    }

    /// Fetch statuses of the given signatures, in the same order.
    ///
    /// A `None` entry means the node has not seen the signature.
    pub async fn get_signature_statuses(
        &self,
        signatures: &[String],
        search_transaction_history: bool,
    ) -> Result<Vec<Option<TransactionStatus>>> {
        let response: RpcResponse<Vec<Option<TransactionStatus>>> = self
            .request(
                "getSignatureStatuses",
                (
                    signatures,
                    SignatureStatusConfig {
                        search_transaction_history,
                    },
                ),
            )
            .await?;
        Ok(response.value)
    }

    /// Fetch the current block height.
    pub async fn get_block_height(&self, commitment: CommitmentLevel) -> Result<u64> {
        self.request("getBlockHeight", (CommitmentConfig { commitment },))
            .await
    }
}
