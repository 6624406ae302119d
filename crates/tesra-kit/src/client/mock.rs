//! An in-memory [`Transport`] for tests.

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::Value;

use super::transport::Transport;
use crate::error::RpcError;

enum Reply {
    Result(Value),
    NodeError { code: i64, desc: String },
    NetworkError(String),
}

impl Reply {
    fn to_result(&self, method: &str, qid: usize) -> Result<Value, RpcError> {
        match self {
            Reply::Result(value) => Ok(value.clone()),
            Reply::NodeError { code, desc } => Err(RpcError::Node {
                method: method.to_string(),
                qid: qid.to_string(),
                code: *code,
                desc: desc.clone(),
                result: String::new(),
            }),
            Reply::NetworkError(message) => Err(RpcError::network(message.clone(), None)),
        }
    }
}

/// Canned node responses keyed by method name.
///
/// Queued replies are consumed in order; once a method's queue is empty the
/// fixed response for that method (if any) is returned on every call. Every
/// call is recorded.
pub struct MockTransport {
    queued: Mutex<HashMap<String, VecDeque<Reply>>>,
    fixed: HashMap<String, Value>,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl MockTransport {
    pub fn builder() -> MockTransportBuilder {
        MockTransportBuilder {
            queued: HashMap::new(),
            fixed: HashMap::new(),
        }
    }

    /// All calls made so far, as `(method, params)`.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Number of calls made to `method`.
    pub fn calls_to(&self, method: &str) -> usize {
        self.calls
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .iter()
            .filter(|(m, _)| m == method)
            .count()
    }
}

pub struct MockTransportBuilder {
    queued: HashMap<String, VecDeque<Reply>>,
    fixed: HashMap<String, Value>,
}

impl MockTransportBuilder {
    /// Answer every call to `method` with `result` once its queue is empty.
    pub fn with_response(mut self, method: &str, result: Value) -> Self {
        self.fixed.insert(method.to_string(), result);
        self
    }

    /// Queue results for successive calls to `method`.
    pub fn with_sequence(mut self, method: &str, results: impl IntoIterator<Item = Value>) -> Self {
        self.queue(method)
            .extend(results.into_iter().map(Reply::Result));
        self
    }

    /// Queue a node-reported error for the next call to `method`.
    pub fn with_node_error(mut self, method: &str, code: i64, desc: &str) -> Self {
        self.queue(method).push_back(Reply::NodeError {
            code,
            desc: desc.to_string(),
        });
        self
    }

    /// Queue a transport failure for the next call to `method`.
    pub fn with_network_error(mut self, method: &str, message: &str) -> Self {
        self.queue(method)
            .push_back(Reply::NetworkError(message.to_string()));
        self
    }

    /// Report `height` as the current block height.
    pub fn with_block_height(self, height: u32) -> Self {
        self.with_response("getblockcount", Value::from(u64::from(height) + 1))
    }

    fn queue(&mut self, method: &str) -> &mut VecDeque<Reply> {
        self.queued.entry(method.to_string()).or_default()
    }

    pub fn build(self) -> MockTransport {
        MockTransport {
            queued: Mutex::new(self.queued),
            fixed: self.fixed,
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, method: &str, params: Vec<Value>) -> Result<Value, RpcError> {
        let qid = {
            let mut calls = self
                .calls
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            calls.push((method.to_string(), params));
            calls.len()
        };

        let queued = self
            .queued
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .get_mut(method)
            .and_then(VecDeque::pop_front);

        match (queued, self.fixed.get(method)) {
            (Some(reply), _) => reply.to_result(method, qid),
            (None, Some(value)) => Ok(value.clone()),
            (None, None) => Err(RpcError::InvalidResponse {
                method: method.to_string(),
                message: "no mock response configured".to_string(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queue_then_fixed() {
        let mock = MockTransport::builder()
            .with_sequence("getblockcount", [Value::from(1), Value::from(2)])
            .with_response("getblockcount", Value::from(9))
            .build();
        for expected in [1, 2, 9, 9] {
            let value = mock.call("getblockcount", vec![]).await.unwrap();
            assert_eq!(value, Value::from(expected));
        }
        assert_eq!(mock.calls_to("getblockcount"), 4);
    }

    #[tokio::test]
    async fn test_errors_are_classified() {
        let mock = MockTransport::builder()
            .with_node_error("getblock", 42002, "INVALID PARAMS")
            .with_network_error("getblock", "refused")
            .build();
        let err = mock.call("getblock", vec![]).await.unwrap_err();
        assert_eq!(err.code(), Some(42002));
        let err = mock.call("getblock", vec![]).await.unwrap_err();
        assert!(err.is_transport_error());
    }

    #[tokio::test]
    async fn test_unconfigured_method() {
        let mock = MockTransport::builder().build();
        let err = mock.call("getversion", vec![]).await.unwrap_err();
        assert!(matches!(err, RpcError::InvalidResponse { .. }));
    }
}
