//! Mock gateway for testing without network calls.

use super::{GatewayError, LogFilter, RawLog, ReadGateway};
use crate::domain::Address;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// Mock gateway serving canned logs and call results.
///
/// Interior mutability lets tests keep feeding it after it has been shared
/// behind an Arc; call counters let cache tests assert what actually hit the
/// "network".
#[derive(Debug, Default)]
pub struct MockGateway {
    logs: Mutex<Vec<RawLog>>,
    call_results: Mutex<HashMap<(Address, Vec<u8>), Vec<u8>>>,
    block_number: AtomicU64,
    /// topic0 values whose queries fail with a transport error.
    failing_topics: Mutex<HashSet<String>>,
    get_logs_calls: AtomicU64,
    call_calls: AtomicU64,
}

impl MockGateway {
    /// Create a new mock gateway with no data.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the head block height.
    pub fn with_block_number(self, block_number: u64) -> Self {
        self.block_number.store(block_number, Ordering::Relaxed);
        self
    }

    /// Add a canned log.
    pub fn with_log(self, log: RawLog) -> Self {
        self.logs.lock().expect("mock lock poisoned").push(log);
        self
    }

    /// Add multiple canned logs.
    pub fn with_logs(self, logs: Vec<RawLog>) -> Self {
        self.logs.lock().expect("mock lock poisoned").extend(logs);
        self
    }

    /// Register a call result for exact (contract, calldata).
    pub fn with_call_result(self, to: Address, calldata: Vec<u8>, result: Vec<u8>) -> Self {
        self.call_results
            .lock()
            .expect("mock lock poisoned")
            .insert((to, calldata), result);
        self
    }

    /// Make every query for the given topic0 fail with a transport error.
    pub fn with_failing_topic(self, topic0: impl Into<String>) -> Self {
        self.failing_topics
            .lock()
            .expect("mock lock poisoned")
            .insert(topic0.into());
        self
    }

    /// Append a log after construction (post-Arc).
    pub fn push_log(&self, log: RawLog) {
        self.logs.lock().expect("mock lock poisoned").push(log);
    }

    /// Move the head block after construction (post-Arc).
    pub fn set_block_number(&self, block_number: u64) {
        self.block_number.store(block_number, Ordering::Relaxed);
    }

    /// Number of get_logs invocations so far.
    pub fn get_logs_count(&self) -> u64 {
        self.get_logs_calls.load(Ordering::Relaxed)
    }

    /// Number of call invocations so far.
    pub fn call_count(&self) -> u64 {
        self.call_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl ReadGateway for MockGateway {
    async fn block_number(&self) -> Result<u64, GatewayError> {
        Ok(self.block_number.load(Ordering::Relaxed))
    }

    async fn get_logs(&self, filter: &LogFilter) -> Result<Vec<RawLog>, GatewayError> {
        self.get_logs_calls.fetch_add(1, Ordering::Relaxed);

        if self
            .failing_topics
            .lock()
            .expect("mock lock poisoned")
            .contains(&filter.topic0)
        {
            return Err(GatewayError::Transport("injected failure".to_string()));
        }

        let from = filter.from_block.unwrap_or(0);
        let logs = self.logs.lock().expect("mock lock poisoned");
        Ok(logs
            .iter()
            .filter(|log| {
                log.address == filter.address
                    && log.topics.first() == Some(&filter.topic0)
                    && log.block_number >= from
                    && log.block_number <= filter.to_block
                    && filter.topics.iter().enumerate().all(|(i, want)| {
                        match want {
                            Some(topic) => log.topics.get(i + 1) == Some(topic),
                            None => true,
                        }
                    })
            })
            .cloned()
            .collect())
    }

    async fn call(&self, to: &Address, calldata: Vec<u8>) -> Result<Vec<u8>, GatewayError> {
        self.call_calls.fetch_add(1, Ordering::Relaxed);
        self.call_results
            .lock()
            .expect("mock lock poisoned")
            .get(&(to.clone(), calldata))
            .cloned()
            .ok_or_else(|| GatewayError::Rpc {
                code: -32000,
                message: "execution reverted".to_string(),
            })
    }
}
