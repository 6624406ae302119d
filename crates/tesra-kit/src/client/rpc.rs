//! Low-level JSON-RPC client for a Tesra node.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::transport::Transport;
use crate::error::RpcError;

/// Default per-request HTTP timeout.
pub const DEFAULT_RPC_TIMEOUT: Duration = Duration::from_secs(300);

/// JSON-RPC request structure.
#[derive(Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: &'a str,
    method: &'a str,
    params: &'a [serde_json::Value],
}

/// JSON-RPC response structure. A non-zero `error` is an application error
/// reported by the node.
#[derive(Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    desc: String,
    #[serde(default)]
    error: i64,
    #[serde(default)]
    result: serde_json::Value,
}

/// Low-level JSON-RPC client.
pub struct RpcClient {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
    request_id: AtomicU64,
}

impl RpcClient {
    /// Create a new RPC client with the default timeout.
    pub fn new(url: impl Into<String>) -> Self {
        Self::with_timeout(url, DEFAULT_RPC_TIMEOUT)
    }

    /// Create a new RPC client with a custom per-request timeout.
    pub fn with_timeout(url: impl Into<String>, timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_default();
        Self {
            url: url.into(),
            client,
            timeout,
            request_id: AtomicU64::new(0),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Next request correlation id. Unique per client, also under
    /// concurrent use.
    pub fn next_qid(&self) -> String {
        (self.request_id.fetch_add(1, Ordering::Relaxed) + 1).to_string()
    }

    /// Make a raw RPC call. No retries.
    pub async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        let qid = self.next_qid();
        debug!(method, qid = %qid, "rpc request");

        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: &qid,
            method,
            params: &params,
        };

        let response = self
            .client
            .post(&self.url)
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(RpcError::network(
                format!("HTTP {}: {}", status, body),
                Some(status.as_u16()),
            ));
        }

        parse_response(method, &qid, &body)
    }
}

fn parse_response(method: &str, qid: &str, body: &str) -> Result<serde_json::Value, RpcError> {
    let response: JsonRpcResponse =
        serde_json::from_str(body).map_err(|e| RpcError::InvalidResponse {
            method: method.to_string(),
            message: format!("{e}: {}", snippet(body)),
        })?;

    if response.error != 0 {
        return Err(RpcError::Node {
            method: method.to_string(),
            qid: qid.to_string(),
            code: response.error,
            desc: response.desc,
            result: snippet(&response.result.to_string()),
        });
    }

    Ok(response.result)
}

/// First part of a response body, for error context.
fn snippet(s: &str) -> String {
    const MAX: usize = 256;
    match s.char_indices().nth(MAX) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

#[async_trait]
impl Transport for RpcClient {
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError> {
        RpcClient::call(self, method, params).await
    }
}

impl Clone for RpcClient {
    fn clone(&self) -> Self {
        Self {
            url: self.url.clone(),
            client: self.client.clone(),
            timeout: self.timeout,
            request_id: AtomicU64::new(0),
        }
    }
}

impl std::fmt::Debug for RpcClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RpcClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::sync::Arc;

    use super::*;

    // ========================================================================
    // RpcClient tests
    // ========================================================================

    #[test]
    fn test_rpc_client_new() {
        let client = RpcClient::new("http://127.0.0.1:20336");
        assert_eq!(client.url(), "http://127.0.0.1:20336");
        assert_eq!(client.timeout(), DEFAULT_RPC_TIMEOUT);
    }

    #[test]
    fn test_rpc_client_debug() {
        let client = RpcClient::with_timeout("http://polaris1.tsr.io:20336", Duration::from_secs(5));
        let debug = format!("{:?}", client);
        assert!(debug.contains("RpcClient"));
        assert!(debug.contains("polaris1.tsr.io"));
    }

    #[test]
    fn test_qids_are_sequential() {
        let client = RpcClient::new("http://127.0.0.1:20336");
        assert_eq!(client.next_qid(), "1");
        assert_eq!(client.next_qid(), "2");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_qids_are_unique() {
        let client = Arc::new(RpcClient::new("http://127.0.0.1:20336"));
        let mut handles = Vec::new();
        for _ in 0..8 {
            let client = client.clone();
            handles.push(tokio::spawn(async move {
                (0..250).map(|_| client.next_qid()).collect::<Vec<_>>()
            }));
        }
        let mut seen = HashSet::new();
        for handle in handles {
            for qid in handle.await.unwrap() {
                assert!(seen.insert(qid), "duplicate qid");
            }
        }
        assert_eq!(seen.len(), 2000);
    }

    // ========================================================================
    // Response parsing
    // ========================================================================

    #[test]
    fn test_parse_response_success() {
        let body = r#"{"desc":"SUCCESS","error":0,"id":"1","jsonrpc":"2.0","result":1234}"#;
        let result = parse_response("getblockcount", "1", body).unwrap();
        assert_eq!(result, serde_json::json!(1234));
    }

    #[test]
    fn test_parse_response_node_error() {
        let body = r#"{"desc":"INVALID PARAMS","error":42002,"id":"7","jsonrpc":"2.0","result":""}"#;
        let err = parse_response("getblock", "7", body).unwrap_err();
        match err {
            RpcError::Node {
                method,
                qid,
                code,
                desc,
                ..
            } => {
                assert_eq!(method, "getblock");
                assert_eq!(qid, "7");
                assert_eq!(code, 42002);
                assert_eq!(desc, "INVALID PARAMS");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_parse_response_malformed_body() {
        let err = parse_response("getversion", "3", "<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, RpcError::InvalidResponse { .. }));
        assert!(err.is_transport_error());
    }

    #[test]
    fn test_snippet_truncates() {
        let long = "x".repeat(1000);
        let s = snippet(&long);
        assert!(s.len() < 300);
        assert!(s.ends_with("..."));
        assert_eq!(snippet("short"), "short");
    }
}
