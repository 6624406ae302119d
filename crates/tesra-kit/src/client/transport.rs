//! The seam between the client and the node.

use async_trait::async_trait;

use crate::error::RpcError;

/// Something that can execute a node RPC method.
///
/// [`RpcClient`](super::RpcClient) is the HTTP JSON-RPC implementation.
/// Implementations must be safe to call concurrently and must keep
/// transport failures ([`RpcError::is_transport_error`]) distinct from
/// node-reported errors ([`RpcError::Node`]).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Execute `method` and return the `result` field of the response.
    async fn call(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<serde_json::Value, RpcError>;
}
