//! Error types for tesra-kit.
//!
//! # Error Hierarchy
//!
//! - [`Error`](enum@Error) - Main error type, returned by most operations
//!   - [`RpcError`] - Transport failures and node-reported application errors
//!   - [`EncodeError`] - Invocation scripts or transactions that cannot be built
//!   - [`DecodeError`] - Truncated, malformed or mistyped bytes
//!   - [`ParseAddressError`] - Invalid base58 or hex address
//!   - [`ParseKeyError`] - Invalid key format
//!   - [`ParseHashError`] - Invalid transaction or block hash
//!   - [`SignerError`] - Signing operation failures
//!
//! # Transport vs. node errors
//!
//! A request that never produced a well-formed JSON-RPC response is a
//! transport error. A well-formed response carrying a non-zero error code is
//! a node error and is surfaced verbatim with its code and description.
//!
//! ```rust,no_run
//! use tesra_kit::*;
//!
//! # async fn example() -> Result<(), Error> {
//! let tesra = Tesra::testnet().build();
//!
//! match tesra.get_current_block_height().await {
//!     Ok(height) => println!("Height: {}", height),
//!     Err(Error::Rpc(e)) if e.is_node_error() => {
//!         println!("Node rejected the request: {:?}", e.code());
//!     }
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```

use thiserror::Error;

use crate::types::TxHash;

/// Error parsing an address.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseAddressError {
    #[error("Invalid base58 encoding: {0}")]
    InvalidBase58(String),

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("Invalid address length: expected 20 bytes, got {0}")]
    InvalidLength(usize),

    #[error("Invalid address version byte: 0x{0:02x}")]
    InvalidVersion(u8),

    #[error("Address checksum mismatch")]
    ChecksumMismatch,
}

/// Error parsing a public or secret key.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseKeyError {
    #[error("Invalid key format: expected '<hex>' or '<p256|secp256k1|ed25519>:<hex>'")]
    InvalidFormat,

    #[error("Unknown key type: '{0}'")]
    UnknownKeyType(String),

    #[error("Unknown curve label: {0}")]
    UnknownCurve(u8),

    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("Invalid key length: expected {expected} bytes, got {actual}")]
    InvalidLength { expected: usize, actual: usize },

    #[error("Invalid curve point: key bytes do not represent a valid point on the curve")]
    InvalidCurvePoint,
}

/// Error parsing a 32-byte hash.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ParseHashError {
    #[error("Invalid hex encoding: {0}")]
    InvalidHex(String),

    #[error("Invalid hash length: expected 32 bytes, got {0}")]
    InvalidLength(usize),
}

/// Error during signing operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignerError {
    #[error("Signing failed: {0}")]
    SigningFailed(String),

    #[error("Signature scheme {scheme} cannot be used with a {key_type} key")]
    SchemeMismatch {
        scheme: &'static str,
        key_type: &'static str,
    },
}

// ============================================================================
// Encoding / Decoding Errors
// ============================================================================

/// Failure while building an invocation script or a transaction.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EncodeError {
    #[error("Unsupported parameter type: {0}")]
    UnsupportedParameterType(String),

    #[error("Invalid multi-signature threshold: m = {m}, n = {n}")]
    InvalidMultiSig { m: usize, n: usize },

    #[error("Too many signatures: a transaction carries at most {max}")]
    TooManySignatures { max: usize },

    #[error("Signer's public key is not part of the multi-signature key set")]
    SignerNotInKeySet,
}

/// Failure while reading bytes produced by the node or by another SDK.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Truncated input: needed {needed} bytes, {remaining} remaining")]
    TruncatedInput { needed: usize, remaining: usize },

    #[error("Invalid hex: {0}")]
    InvalidHex(String),

    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: String,
    },

    #[error("Unexpected opcode 0x{opcode:02x} at offset {offset}")]
    UnexpectedOpcode { opcode: u8, offset: usize },

    #[error("Stack underflow at offset {0}")]
    StackUnderflow(usize),

    #[error("Collection of {count} items at offset {offset} exceeds the limit of {max}")]
    TooManyItems {
        count: usize,
        max: usize,
        offset: usize,
    },

    #[error("Invalid address: {0} bytes")]
    InvalidAddress(usize),

    #[error("Invalid public key: {0}")]
    InvalidPublicKey(#[from] ParseKeyError),

    #[error("Invalid signature: {0}")]
    InvalidSignature(String),

    #[error("Integer does not fit into {0}")]
    IntegerOverflow(&'static str),

    #[error("Not a native contract invocation")]
    NotNativeInvoke,

    #[error("Unsupported transaction type: 0x{0:02x}")]
    UnsupportedTransactionType(u8),

    #[error("Unsupported program: {0}")]
    UnsupportedProgram(String),

    #[error("{0} trailing bytes after the end of the value")]
    TrailingBytes(usize),
}

// ============================================================================
// RPC Errors
// ============================================================================

/// RPC-specific errors.
#[derive(Debug, Error)]
pub enum RpcError {
    // ─── Transport ───
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Network error: {message}")]
    Network {
        message: String,
        status_code: Option<u16>,
    },

    #[error("JSON parse error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid response to {method}: {message}")]
    InvalidResponse { method: String, message: String },

    // ─── Node application ───
    #[error("{method} failed (qid {qid}): error code {code}, desc {desc}, result {result}")]
    Node {
        method: String,
        qid: String,
        code: i64,
        desc: String,
        result: String,
    },
}

impl RpcError {
    /// Create a network error.
    pub fn network(message: impl Into<String>, status_code: Option<u16>) -> Self {
        RpcError::Network {
            message: message.into(),
            status_code,
        }
    }

    /// True if the request failed before a well-formed response was received.
    pub fn is_transport_error(&self) -> bool {
        !self.is_node_error()
    }

    /// True if the node answered with a non-zero error code.
    pub fn is_node_error(&self) -> bool {
        matches!(self, RpcError::Node { .. })
    }

    /// The node's error code, for node errors.
    pub fn code(&self) -> Option<i64> {
        match self {
            RpcError::Node { code, .. } => Some(*code),
            _ => None,
        }
    }
}

// ============================================================================
// Main Error Type
// ============================================================================

/// Main error type for tesra-kit operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Rpc(#[from] RpcError),

    #[error("Encoding error: {0}")]
    Encode(#[from] EncodeError),

    #[error("Decoding error: {0}")]
    Decode(#[from] DecodeError),

    #[error("Timed out after {waited_secs}s waiting for {target}")]
    Timeout { waited_secs: u64, target: String },

    #[error("Transaction {tx_hash} failed on chain (state {state}, gas consumed {gas_consumed})")]
    ExecutionFailed {
        tx_hash: TxHash,
        state: u8,
        gas_consumed: u64,
    },

    #[error("Pre-execution of {method} failed (state {state}, gas {gas})")]
    PreExecFailed { method: String, state: u8, gas: u64 },

    #[error("No signer configured. Use .credentials() or .signer() on TesraBuilder.")]
    NoSigner,

    #[error("Signing error: {0}")]
    Signing(#[from] SignerError),

    #[error(transparent)]
    ParseKey(#[from] ParseKeyError),

    #[error(transparent)]
    ParseAddress(#[from] ParseAddressError),

    #[error(transparent)]
    ParseHash(#[from] ParseHashError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    /// True for the "gave up waiting" case, which callers may simply re-poll.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Error::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================================================
    // Display
    // ========================================================================

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::TruncatedInput {
            needed: 8,
            remaining: 3,
        };
        assert_eq!(
            err.to_string(),
            "Truncated input: needed 8 bytes, 3 remaining"
        );

        let err = DecodeError::UnexpectedOpcode {
            opcode: 0xab,
            offset: 12,
        };
        assert_eq!(err.to_string(), "Unexpected opcode 0xab at offset 12");
    }

    #[test]
    fn test_encode_error_display() {
        let err = EncodeError::InvalidMultiSig { m: 3, n: 2 };
        assert_eq!(
            err.to_string(),
            "Invalid multi-signature threshold: m = 3, n = 2"
        );
    }

    #[test]
    fn test_node_error_display_keeps_context() {
        let err = RpcError::Node {
            method: "sendrawtransaction".to_string(),
            qid: "7".to_string(),
            code: 43001,
            desc: "INVALID TRANSACTION".to_string(),
            result: "\"\"".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("sendrawtransaction"));
        assert!(msg.contains("qid 7"));
        assert!(msg.contains("43001"));
        assert!(msg.contains("INVALID TRANSACTION"));
    }

    // ========================================================================
    // Classification
    // ========================================================================

    #[test]
    fn test_rpc_error_classification() {
        let node = RpcError::Node {
            method: "getblockcount".to_string(),
            qid: "1".to_string(),
            code: 42001,
            desc: "INVALID PARAMS".to_string(),
            result: String::new(),
        };
        assert!(node.is_node_error());
        assert!(!node.is_transport_error());
        assert_eq!(node.code(), Some(42001));

        let net = RpcError::network("connection refused", None);
        assert!(net.is_transport_error());
        assert_eq!(net.code(), None);
    }

    #[test]
    fn test_error_from_conversions() {
        let err: Error = DecodeError::InvalidHex("zz".to_string()).into();
        assert!(matches!(err, Error::Decode(DecodeError::InvalidHex(_))));

        let err: Error = EncodeError::UnsupportedParameterType("empty struct".to_string()).into();
        assert!(matches!(err, Error::Encode(_)));

        let err: Error = RpcError::network("down", Some(502)).into();
        assert!(matches!(err, Error::Rpc(RpcError::Network { .. })));
    }

    #[test]
    fn test_timeout_is_timeout() {
        let err = Error::Timeout {
            waited_secs: 5,
            target: "2 new blocks".to_string(),
        };
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timed out after 5s waiting for 2 new blocks");
    }
}
