//! In-process mock of a ledger JSON-RPC endpoint.

#![allow(dead_code)]

use std::{
    collections::{HashMap, VecDeque},
    sync::{Arc, Mutex},
};

use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
use base64::{Engine, engine::general_purpose::STANDARD};
use serde_json::{Value, json};
use url::Url;

/// Slot reported for confirmed transactions.
pub const CONFIRMED_SLOT: u64 = 4242;

/// Scripted ledger behaviour.
#[derive(Debug, Clone)]
pub struct Script {
    /// Answer every request with HTTP 503.
    pub unavailable: bool,
    /// Error objects returned by successive `sendTransaction` calls before
    /// submissions are accepted.
    pub send_errors: VecDeque<Value>,
    /// HTTP status answering every `sendTransaction` with a bare, non JSON-RPC body.
    pub send_status: Option<u16>,
    /// Number of status polls before a submitted transaction is reported
    /// finalized. `None` never confirms.
    pub polls_until_confirmed: Option<usize>,
    /// Status reported for an accepted transaction before it is finalized.
    /// `None` reports it as unknown.
    pub pending_status: Option<&'static str>,
    /// Execution error reported instead of finalization.
    pub program_error: Option<Value>,
    /// Number of leading `getSignatureStatuses` calls answered with an error.
    pub failing_polls: usize,
    /// Number of extra `getLatestBlockhash` calls that repeat the first blockhash.
    pub stale_blockhash_calls: u8,
    /// Block height reported by `getBlockHeight`.
    pub block_height: u64,
    /// Validity bound reported with every blockhash.
    pub last_valid_block_height: u64,
    /// Reply to `getVersion` with something that is not a version object.
    pub garbled_version: bool,
}

impl Default for Script {
    fn default() -> Self {
        Self {
            unavailable: false,
            send_errors: VecDeque::new(),
            send_status: None,
            polls_until_confirmed: Some(1),
            pending_status: None,
            program_error: None,
            failing_polls: 0,
            stale_blockhash_calls: 0,
            block_height: 100,
            last_valid_block_height: 250,
            garbled_version: false,
        }
    }
}

#[derive(Debug, Default)]
struct LedgerState {
    script: Script,
    calls: Vec<String>,
    blockhash_calls: u8,
    status_calls: usize,
    received: Vec<Vec<u8>>,
    accepted: Vec<String>,
    polls: HashMap<String, usize>,
}

/// Shared handle to the mock ledger.
#[derive(Debug, Clone, Default)]
pub struct MockLedger {
    state: Arc<Mutex<LedgerState>>,
}

impl MockLedger {
    pub fn new(script: Script) -> Self {
        let ledger = Self::default();
        ledger.state.lock().unwrap().script = script;
        ledger
    }

    /// Serves the ledger on an ephemeral local port.
    pub async fn spawn(&self) -> Url {
        let app = Router::new()
            .route("/", post(handle))
            .with_state(self.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        Url::parse(&format!("http://{addr}/")).unwrap()
    }

    /// Number of calls made to `method`.
    pub fn calls(&self, method: &str) -> usize {
        self.state
            .lock()
            .unwrap()
            .calls
            .iter()
            .filter(|m| *m == method)
            .count()
    }

    /// Wire bytes of every `sendTransaction` call, in order.
    pub fn received(&self) -> Vec<Vec<u8>> {
        self.state.lock().unwrap().received.clone()
    }

    pub fn set_block_height(&self, height: u64) {
        self.state.lock().unwrap().script.block_height = height;
    }
}

/// `n`th distinct blockhash issued by `getLatestBlockhash` (1-based).
pub fn issued_blockhash(n: u8) -> [u8; 32] {
    [n; 32]
}

/// Extracts the recent blockhash from a single-signature wire transaction.
pub fn blockhash_of(wire: &[u8]) -> [u8; 32] {
    // signature count + signature + message header
    let keys_at = 1 + 64 + 3;
    let num_keys = wire[keys_at] as usize;
    let blockhash_at = keys_at + 1 + num_keys * 32;
    wire[blockhash_at..blockhash_at + 32].try_into().unwrap()
}

/// Extracts the single instruction's data from a single-signature wire transaction.
pub fn instruction_data_of(wire: &[u8]) -> Vec<u8> {
    let keys_at = 1 + 64 + 3;
    let num_keys = wire[keys_at] as usize;
    // blockhash, instruction count, program index
    let mut at = keys_at + 1 + num_keys * 32 + 32 + 1 + 1;
    let num_accounts = wire[at] as usize;
    at += 1 + num_accounts;

    let mut len = 0usize;
    let mut shift = 0;
    loop {
        let byte = wire[at];
        at += 1;
        len |= ((byte & 0x7f) as usize) << shift;
        if byte & 0x80 == 0 {
            break;
        }
        shift += 7;
    }
    wire[at..at + len].to_vec()
}

fn ok(id: &Value, result: Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "jsonrpc": "2.0", "result": result, "id": id })),
    )
}

fn rpc_error(id: &Value, error: Value) -> (StatusCode, Json<Value>) {
    (
        StatusCode::OK,
        Json(json!({ "jsonrpc": "2.0", "error": error, "id": id })),
    )
}

async fn handle(
    State(ledger): State<MockLedger>,
    Json(request): Json<Value>,
) -> (StatusCode, Json<Value>) {
    let id = request["id"].clone();
    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].clone();

    let mut state = ledger.state.lock().unwrap();
    state.calls.push(method.clone());

    if state.script.unavailable {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!("service unavailable")),
        );
    }

    match method.as_str() {
        "getVersion" if state.script.garbled_version => ok(&id, json!("not a version")),
        "getVersion" => ok(&id, json!({ "solana-core": "2.2.0", "feature-set": 3294202862u32 })),
        "getLatestBlockhash" => {
            state.blockhash_calls += 1;
            let issued = state
                .blockhash_calls
                .saturating_sub(state.script.stale_blockhash_calls)
                .max(1);
            let blockhash = bs58::encode(issued_blockhash(issued)).into_string();
            ok(
                &id,
                json!({
                    "context": { "slot": 1000 + state.blockhash_calls as u64 },
                    "value": {
                        "blockhash": blockhash,
                        "lastValidBlockHeight": state.script.last_valid_block_height,
                    },
                }),
            )
        }
        "sendTransaction" => {
            let encoded = params[0].as_str().unwrap_or_default();
            let wire = STANDARD.decode(encoded).unwrap();
            state.received.push(wire.clone());

            if let Some(code) = state.script.send_status {
                let status = StatusCode::from_u16(code).unwrap();
                return (status, Json(json!("malformed request")));
            }
            if let Some(error) = state.script.send_errors.pop_front() {
                return rpc_error(&id, error);
            }

            let signature = bs58::encode(&wire[1..65]).into_string();
            state.accepted.push(signature.clone());
            ok(&id, json!(signature))
        }
        "getSignatureStatuses" => {
            state.status_calls += 1;
            if state.status_calls <= state.script.failing_polls {
                return rpc_error(&id, json!({ "code": -32005, "message": "Node is unhealthy" }));
            }

            let signatures: Vec<String> =
                serde_json::from_value(params[0].clone()).unwrap_or_default();
            let accepted = state.accepted.clone();

            let mut value = Vec::new();
            for signature in signatures {
                if !accepted.contains(&signature) {
                    value.push(Value::Null);
                    continue;
                }
                let polls = state.polls.entry(signature).or_default();
                *polls += 1;
                let polls = *polls;

                let settled = state
                    .script
                    .polls_until_confirmed
                    .is_some_and(|needed| polls >= needed);
                let status = match (&state.script.program_error, state.script.pending_status) {
                    (Some(err), _) if settled => json!({
                        "slot": CONFIRMED_SLOT,
                        "confirmations": 0,
                        "err": err,
                        "confirmationStatus": "processed",
                    }),
                    (None, _) if settled => json!({
                        "slot": CONFIRMED_SLOT,
                        "confirmations": null,
                        "err": null,
                        "confirmationStatus": "finalized",
                    }),
                    (_, Some(level)) => json!({
                        "slot": CONFIRMED_SLOT,
                        "confirmations": 1,
                        "err": null,
                        "confirmationStatus": level,
                    }),
                    (_, None) => Value::Null,
                };
                value.push(status);
            }

            ok(&id, json!({ "context": { "slot": 2000 }, "value": value }))
        }
        "getBlockHeight" => ok(&id, json!(state.script.block_height)),
        _ => rpc_error(&id, json!({ "code": -32601, "message": "Method not found" })),
    }
}

/// Error object a node returns when the blockhash is unknown.
pub fn blockhash_not_found() -> Value {
    json!({
        "code": -32002,
        "message": "Transaction simulation failed: Blockhash not found",
        "data": { "err": "BlockhashNotFound", "logs": [], "accounts": null },
    })
}

/// Error object a node returns when the program refuses the instruction.
pub fn invalid_instruction_data() -> Value {
    json!({
        "code": -32002,
        "message": "Transaction simulation failed: Error processing Instruction 0: invalid instruction data",
        "data": { "err": { "InstructionError": [0, "InvalidInstructionData"] }, "logs": [] },
    })
}
