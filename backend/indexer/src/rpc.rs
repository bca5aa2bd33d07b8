//! Soroban RPC client — polls `getEvents` and decodes FundMe events.
//!
//! ## Resilience
//!
//! * Exponential back-off is applied when the RPC returns an error or rate-limit
//!   response, up to [`MAX_BACKOFF_SECS`] seconds.
//! * Transient network errors (connection reset, timeout) are retried silently.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, warn};

use crate::errors::{IndexerError, Result};
use crate::events::{EventKind, FundMeEvent};

const MAX_BACKOFF_SECS: u64 = 60;
const INITIAL_BACKOFF_SECS: u64 = 2;

/// `ScValType::Symbol` discriminant in XDR.
const SCV_SYMBOL: u32 = 15;

// ─────────────────────────────────────────────────────────
// JSON-RPC response shapes
// ─────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct RpcResponse<T> {
    pub result: Option<T>,
    pub error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

#[derive(Debug, Deserialize)]
pub struct EventsResult {
    pub events: Vec<RawEvent>,
    pub cursor: Option<String>,
    #[serde(rename = "latestLedger")]
    pub latest_ledger: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct LatestLedgerResult {
    pub sequence: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[allow(dead_code)]
pub struct RawEvent {
    /// Topic list as JSON `ScVal`s (`topicJson`, since we request `xdrFormat: json`)
    #[serde(default, alias = "topicJson")]
    pub topic: Vec<Value>,
    /// Event data as a JSON `ScVal` (`valueJson`)
    #[serde(default, alias = "valueJson")]
    pub value: Value,
    #[serde(rename = "contractId")]
    pub contract_id: Option<String>,
    #[serde(rename = "txHash")]
    pub tx_hash: Option<String>,
    pub id: Option<String>,
    pub ledger: Option<u64>,
    #[serde(rename = "ledgerClosedAt")]
    pub ledger_closed_at: Option<String>,
    #[serde(rename = "inSuccessfulContractCall")]
    pub in_successful_contract_call: Option<bool>,
    #[serde(rename = "pagingToken")]
    pub paging_token: Option<String>,
}

// ─────────────────────────────────────────────────────────
// Public API
// ─────────────────────────────────────────────────────────

/// Fetch a page of events from the RPC.
///
/// * `start_ledger` — the ledger sequence to scan from (inclusive).
/// * `cursor`       — optional opaque pagination cursor from a previous response.
/// * `limit`        — maximum number of events to return.
///
/// Returns `(events, next_cursor, latest_ledger)`.
pub async fn fetch_events(
    client: &Client,
    rpc_url: &str,
    contract_id: &str,
    start_ledger: u32,
    cursor: Option<&str>,
    limit: u32,
) -> Result<(Vec<RawEvent>, Option<String>, Option<u64>)> {
    let params = build_params(contract_id, start_ledger, cursor, limit);
    let result: EventsResult = call(client, rpc_url, "getEvents", params).await?;

    debug!(
        "Fetched {} events (latest_ledger={:?})",
        result.events.len(),
        result.latest_ledger
    );

    Ok((result.events, result.cursor, result.latest_ledger))
}

/// Sequence number of the most recently closed ledger.
pub async fn fetch_latest_ledger(client: &Client, rpc_url: &str) -> Result<u64> {
    let result: LatestLedgerResult = call(client, rpc_url, "getLatestLedger", json!({})).await?;
    Ok(result.sequence)
}

/// Issue a JSON-RPC call, retrying transient failures with back-off.
async fn call<T: DeserializeOwned>(
    client: &Client,
    rpc_url: &str,
    method: &str,
    params: Value,
) -> Result<T> {
    let mut backoff = INITIAL_BACKOFF_SECS;

    loop {
        let response = client
            .post(rpc_url)
            .json(&json!({
                "jsonrpc": "2.0",
                "id": 1,
                "method": method,
                "params": params,
            }))
            .send()
            .await;

        match response {
            Err(e) => {
                warn!("RPC {method} failed (will retry in {backoff}s): {e}");
                tokio::time::sleep(Duration::from_secs(backoff)).await;
                backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                continue;
            }
            Ok(resp) => {
                let status = resp.status();
                if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                    warn!("Rate-limited by RPC (will retry in {backoff}s)");
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                let body: RpcResponse<T> = resp.json().await?;

                if let Some(err) = body.error {
                    // Code -32600 / -32601 / -32602 are hard failures; everything else we retry
                    if matches!(err.code, -32600 | -32601 | -32602) {
                        return Err(IndexerError::Rpc {
                            code: err.code,
                            message: err.message,
                        });
                    }
                    warn!(
                        "RPC soft error (will retry in {backoff}s): {} {}",
                        err.code, err.message
                    );
                    tokio::time::sleep(Duration::from_secs(backoff)).await;
                    backoff = (backoff * 2).min(MAX_BACKOFF_SECS);
                    continue;
                }

                return body.result.ok_or_else(|| {
                    IndexerError::EventParse(format!("Empty result from {method}"))
                });
            }
        }
    }
}

fn build_params(contract_id: &str, start_ledger: u32, cursor: Option<&str>, limit: u32) -> Value {
    let mut params = json!({
        "filters": [
            {
                "type": "contract",
                "contractIds": [contract_id]
            }
        ],
        "pagination": {
            "limit": limit
        },
        "xdrFormat": "json"
    });

    if let Some(cur) = cursor {
        params["pagination"]["cursor"] = json!(cur);
    } else {
        params["startLedger"] = json!(start_ledger);
    }

    params
}

// ─────────────────────────────────────────────────────────
// Event decoding
// ─────────────────────────────────────────────────────────

/// Decode a list of raw RPC events into [`FundMeEvent`] structs.
///
/// Events from failed contract calls are dropped: their effects were rolled back.
pub fn decode_events(raw: &[RawEvent], contract_id: &str) -> Vec<FundMeEvent> {
    raw.iter()
        .filter(|e| e.in_successful_contract_call.unwrap_or(true))
        .filter_map(|e| decode_single(e, contract_id))
        .collect()
}

fn decode_single(raw: &RawEvent, contract_id: &str) -> Option<FundMeEvent> {
    // Extract leading topic symbol to determine event type.
    let first_topic = raw.topic.first()?;
    let kind = symbol(first_topic).map_or(EventKind::Unknown, |s| EventKind::from_topic(&s));

    let ledger = raw.ledger.unwrap_or(0) as i64;
    let timestamp = raw
        .ledger_closed_at
        .as_deref()
        .and_then(parse_iso_to_unix)
        .unwrap_or(0);

    let (actor, amount) = decode_data(&raw.value, kind);
    // The second topic carries the funder / owner address.
    let actor = actor.or_else(|| raw.topic.get(1).and_then(address));

    let event_id = raw
        .id
        .clone()
        .or_else(|| raw.paging_token.clone())
        .unwrap_or_else(|| {
            format!(
                "{}-{}-{}",
                ledger,
                raw.tx_hash.as_deref().unwrap_or("-"),
                kind.as_str()
            )
        });

    Some(FundMeEvent {
        event_id,
        event_type: kind.as_str().to_string(),
        actor,
        amount,
        ledger,
        timestamp,
        contract_id: raw
            .contract_id
            .clone()
            .unwrap_or_else(|| contract_id.to_string()),
        tx_hash: raw.tx_hash.clone(),
    })
}

/// Pull the actor and amount out of the event's `ScMap` payload:
/// `{"map":[{"key":{"symbol":"amount"},"val":{"i128":"…"}}, …]}`.
fn decode_data(value: &Value, kind: EventKind) -> (Option<String>, Option<String>) {
    let actor_key = match kind {
        EventKind::Funded => "funder",
        EventKind::Withdrawn => "owner",
        EventKind::Unknown => return (None, None),
    };
    let actor = map_get(value, actor_key).and_then(address);
    let amount = map_get(value, "amount")
        .and_then(int_value)
        .map(|a| a.to_string());
    (actor, amount)
}

/// Value stored under the symbol `key` of a JSON `ScMap`.
fn map_get<'a>(value: &'a Value, key: &str) -> Option<&'a Value> {
    value
        .get("map")?
        .as_array()?
        .iter()
        .find(|entry| entry.get("key").and_then(symbol).as_deref() == Some(key))
        .and_then(|entry| entry.get("val"))
}

/// Symbol from a JSON `ScVal` (`{"symbol":"funded"}`), or from a base64 XDR
/// `ScVal` when the RPC ignored `xdrFormat`.
fn symbol(value: &Value) -> Option<String> {
    match value {
        Value::Object(map) => map.get("symbol").and_then(Value::as_str).map(String::from),
        Value::String(raw) => decode_xdr_symbol(raw),
        _ => None,
    }
}

/// Strkey of a JSON `ScVal` address (`{"address":"G…"}`).
fn address(value: &Value) -> Option<String> {
    value
        .get("address")
        .and_then(Value::as_str)
        .map(String::from)
}

/// Integer `ScVal`s. `i128` comes as a decimal string, or as `{"hi":…,"lo":…}`
/// parts from older RPC releases.
fn int_value(value: &Value) -> Option<i128> {
    let inner = ["i128", "u128", "i64", "u64", "i32", "u32"]
        .iter()
        .find_map(|ty| value.get(*ty))?;
    match inner {
        Value::String(s) => s.parse().ok(),
        Value::Number(n) => n
            .as_i64()
            .map(i128::from)
            .or_else(|| n.as_u64().map(i128::from)),
        Value::Object(parts) => {
            let hi = parts.get("hi")?.as_i64()?;
            let lo = parts.get("lo")?.as_u64()?;
            Some(((hi as i128) << 64) | lo as i128)
        }
        _ => None,
    }
}

/// Decode a base64 XDR `ScVal::Symbol`: a 4-byte type tag, a 4-byte length,
/// then the symbol bytes.
fn decode_xdr_symbol(raw: &str) -> Option<String> {
    let bytes = BASE64.decode(raw.trim()).ok()?;
    let tag = u32::from_be_bytes(bytes.get(0..4)?.try_into().ok()?);
    if tag != SCV_SYMBOL {
        return None;
    }
    let len = u32::from_be_bytes(bytes.get(4..8)?.try_into().ok()?) as usize;
    let symbol = bytes.get(8..8 + len)?;
    std::str::from_utf8(symbol).ok().map(String::from)
}

/// Parse an ISO-8601 timestamp string into a Unix epoch (seconds).
fn parse_iso_to_unix(s: &str) -> Option<i64> {
    use chrono::DateTime;
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.timestamp())
}

// ─────────────────────────────────────────────────────────
// Unit tests
// ─────────────────────────────────────────────────────────
