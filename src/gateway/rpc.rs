//! JSON-RPC 2.0 gateway over HTTP.

use super::{GatewayError, LogFilter, RawLog, ReadGateway};
use crate::domain::{Address, TxHash};
use async_trait::async_trait;
use backoff::future::retry;
use backoff::ExponentialBackoff;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

/// Shared read-only JSON-RPC client against one canonical endpoint.
///
/// Transient failures (transport, 429, 5xx) retry with a fixed delay up to a
/// bounded elapsed time; everything else surfaces immediately.
#[derive(Debug)]
pub struct RpcGateway {
    client: Client,
    endpoint: String,
    next_id: AtomicU64,
    retry_delay: Duration,
    retry_max_elapsed: Duration,
}

impl RpcGateway {
    pub fn new(endpoint: String, retry_delay: Duration, retry_max_elapsed: Duration) -> Self {
        Self {
            client: Client::new(),
            endpoint,
            next_id: AtomicU64::new(1),
            retry_delay,
            retry_max_elapsed,
        }
    }

    /// Fixed-interval bounded retry policy.
    fn retry_policy(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            initial_interval: self.retry_delay,
            max_interval: self.retry_delay,
            multiplier: 1.0,
            randomization_factor: 0.0,
            max_elapsed_time: Some(self.retry_max_elapsed),
            ..Default::default()
        }
    }

    async fn request(&self, method: &str, params: Value) -> Result<Value, GatewayError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });
        debug!("rpc request method={} id={}", method, id);

        retry(self.retry_policy(), || async {
            let response = self
                .client
                .post(&self.endpoint)
                .json(&envelope)
                .send()
                .await
                .map_err(|e| backoff::Error::transient(GatewayError::Transport(e.to_string())))?;

            let status = response.status();
            if status == 429 {
                return Err(backoff::Error::transient(GatewayError::RateLimited));
            }
            if status.is_server_error() {
                return Err(backoff::Error::transient(GatewayError::Http {
                    status: status.as_u16(),
                    message: "server error".to_string(),
                }));
            }
            if !status.is_success() {
                return Err(backoff::Error::permanent(GatewayError::Http {
                    status: status.as_u16(),
                    message: "client error".to_string(),
                }));
            }

            let body: Value = response
                .json()
                .await
                .map_err(|e| backoff::Error::permanent(GatewayError::Decode(e.to_string())))?;

            if let Some(err) = body.get("error") {
                let code = err.get("code").and_then(|c| c.as_i64()).unwrap_or(0);
                let message = err
                    .get("message")
                    .and_then(|m| m.as_str())
                    .unwrap_or("unknown")
                    .to_string();
                // -32005 is the conventional "limit exceeded" code.
                if code == -32005 {
                    return Err(backoff::Error::transient(GatewayError::RateLimited));
                }
                return Err(backoff::Error::permanent(GatewayError::Rpc { code, message }));
            }

            body.get("result")
                .cloned()
                .ok_or_else(|| {
                    backoff::Error::permanent(GatewayError::Decode(
                        "response missing result".to_string(),
                    ))
                })
        })
        .await
    }
}

#[async_trait]
impl ReadGateway for RpcGateway {
    async fn block_number(&self) -> Result<u64, GatewayError> {
        let result = self.request("eth_blockNumber", json!([])).await?;
        let hex = result
            .as_str()
            .ok_or_else(|| GatewayError::Decode("blockNumber is not a string".to_string()))?;
        parse_hex_u64(hex)
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, GatewayError> {
        let from_block = match filter.from_block {
            Some(block) => hex_quantity(block),
            None => "earliest".to_string(),
        };
        let mut topics = vec![Value::String(filter.topic0.clone())];
        for topic in &filter.topics {
            topics.push(match topic {
                Some(t) => Value::String(t.clone()),
                None => Value::Null,
            });
        }
        // Trailing wildcards are noise to the endpoint.
        while matches!(topics.last(), Some(Value::Null)) {
            topics.pop();
        }

        let params = json!([{
            "address": filter.address.as_str(),
            "fromBlock": from_block,
            "toBlock": hex_quantity(filter.to_block),
            "topics": topics,
        }]);

        let result = self.request("eth_getLogs", params).await?;
        let entries = result
            .as_array()
            .ok_or_else(|| GatewayError::Decode("expected log array".to_string()))?;

        let mut logs = Vec::with_capacity(entries.len());
        for entry in entries {
            match parse_raw_log(entry) {
                Ok(log) => logs.push(log),
                Err(e) => {
                    warn!("skipping malformed log entry: {}", e);
                }
            }
        }
        Ok(logs)
    }

    async fn call(&self, to: &Address, calldata: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        let params = json!([
            {
                "to": to.as_str(),
                "data": format!("0x{}", hex::encode(&calldata)),
            },
            "latest",
        ]);
        let result = self.request("eth_call", params).await?;
        let hex_str = result
            .as_str()
            .ok_or_else(|| GatewayError::Decode("call result is not a string".to_string()))?;
        decode_hex_bytes(hex_str)
    }
}

fn parse_raw_log(entry: &Value) -> Result<RawLog, GatewayError> {
    let address = entry
        .get("address")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Decode("log missing address".to_string()))?;
    let topics = entry
        .get("topics")
        .and_then(|v| v.as_array())
        .ok_or_else(|| GatewayError::Decode("log missing topics".to_string()))?
        .iter()
        .map(|t| {
            t.as_str()
                .map(|s| s.to_lowercase())
                .ok_or_else(|| GatewayError::Decode("topic is not a string".to_string()))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let data = entry
        .get("data")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Decode("log missing data".to_string()))?;
    let block_number = entry
        .get("blockNumber")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Decode("log missing blockNumber".to_string()))
        .and_then(parse_hex_u64)?;
    let log_index = entry
        .get("logIndex")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Decode("log missing logIndex".to_string()))
        .and_then(parse_hex_u64)?;
    let tx_hash = entry
        .get("transactionHash")
        .and_then(|v| v.as_str())
        .ok_or_else(|| GatewayError::Decode("log missing transactionHash".to_string()))?;

    Ok(RawLog {
        address: Address::new(address),
        topics,
        data: data.to_lowercase(),
        block_number,
        log_index,
        tx_hash: TxHash::new(tx_hash),
    })
}

/// Parse a 0x-prefixed hex quantity.
fn parse_hex_u64(s: &str) -> Result<u64, GatewayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    u64::from_str_radix(digits, 16)
        .map_err(|_| GatewayError::Decode(format!("invalid hex quantity: {}", s)))
}

fn hex_quantity(value: u64) -> String {
    format!("0x{:x}", value)
}

/// Decode 0x-prefixed hex into bytes.
pub fn decode_hex_bytes(s: &str) -> Result<Vec<u8>, GatewayError> {
    let digits = s.strip_prefix("0x").unwrap_or(s);
    hex::decode(digits).map_err(|_| GatewayError::Decode(format!("invalid hex data: {}", s)))
}
