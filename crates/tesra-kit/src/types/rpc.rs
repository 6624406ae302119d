//! RPC response types.
//!
//! Field names follow the node's JSON, which uses PascalCase.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use serde::{Deserialize, Serialize};

use super::{Address, TxHash};
use crate::error::DecodeError;

// ============================================================================
// Pre-execution results
// ============================================================================

/// A raw result value returned by the node, decoded on demand.
///
/// Byte results arrive as hex strings. Nested results arrive as arrays.
#[derive(Clone, Debug, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResultItem(pub serde_json::Value);

impl ResultItem {
    pub fn new(value: serde_json::Value) -> Self {
        Self(value)
    }

    pub fn as_value(&self) -> &serde_json::Value {
        &self.0
    }

    fn kind(&self) -> String {
        match &self.0 {
            serde_json::Value::Null => "null",
            serde_json::Value::Bool(_) => "bool",
            serde_json::Value::Number(_) => "number",
            serde_json::Value::String(_) => "string",
            serde_json::Value::Array(_) => "array",
            serde_json::Value::Object(_) => "object",
        }
        .to_string()
    }

    /// Hex-decodes a string result.
    pub fn to_byte_array(&self) -> Result<Vec<u8>, DecodeError> {
        match &self.0 {
            serde_json::Value::String(s) => {
                hex::decode(s).map_err(|e| DecodeError::InvalidHex(format!("{s:?}: {e}")))
            }
            _ => Err(DecodeError::TypeMismatch {
                expected: "hex string",
                found: self.kind(),
            }),
        }
    }

    /// Hex-decodes, then reads the bytes as UTF-8.
    pub fn to_string(&self) -> Result<String, DecodeError> {
        let bytes = self.to_byte_array()?;
        String::from_utf8(bytes).map_err(|e| DecodeError::TypeMismatch {
            expected: "utf-8 string",
            found: e.to_string(),
        })
    }

    /// Little-endian two's-complement integer. The empty string is zero.
    pub fn to_integer(&self) -> Result<BigInt, DecodeError> {
        match &self.0 {
            serde_json::Value::Number(n) => {
                if let Some(v) = n.as_u64() {
                    Ok(BigInt::from(v))
                } else if let Some(v) = n.as_i64() {
                    Ok(BigInt::from(v))
                } else {
                    Err(DecodeError::TypeMismatch {
                        expected: "integer",
                        found: n.to_string(),
                    })
                }
            }
            _ => Ok(BigInt::from_signed_bytes_le(&self.to_byte_array()?)),
        }
    }

    /// [`ResultItem::to_integer`] narrowed to `u64`.
    pub fn to_u64(&self) -> Result<u64, DecodeError> {
        self.to_integer()?
            .to_u64()
            .ok_or(DecodeError::IntegerOverflow("u64"))
    }

    /// JSON booleans as-is; byte results are true when any byte is non-zero.
    pub fn to_bool(&self) -> Result<bool, DecodeError> {
        match &self.0 {
            serde_json::Value::Bool(b) => Ok(*b),
            _ => Ok(self.to_byte_array()?.iter().any(|b| *b != 0)),
        }
    }

    pub fn to_array(&self) -> Result<Vec<ResultItem>, DecodeError> {
        match &self.0 {
            serde_json::Value::Array(items) => {
                Ok(items.iter().cloned().map(ResultItem).collect())
            }
            _ => Err(DecodeError::TypeMismatch {
                expected: "array",
                found: self.kind(),
            }),
        }
    }
}

/// Outcome of a dry-run invocation.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PreExecResult {
    /// 1 on success, 0 on failure.
    #[serde(rename = "State")]
    pub state: u8,
    #[serde(rename = "Gas")]
    pub gas: u64,
    #[serde(rename = "Result", default)]
    pub result: ResultItem,
    #[serde(rename = "Notify", default, deserialize_with = "null_as_default")]
    pub notify: Vec<NotifyEventInfo>,
}

impl PreExecResult {
    pub fn is_success(&self) -> bool {
        self.state != 0
    }
}

// ============================================================================
// Events
// ============================================================================

/// A notification raised by a contract during execution.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct NotifyEventInfo {
    /// Reversed-hex contract address.
    #[serde(rename = "ContractAddress")]
    pub contract_address: String,
    #[serde(rename = "States")]
    pub states: serde_json::Value,
}

impl NotifyEventInfo {
    /// The emitting contract, if the address parses.
    pub fn contract(&self) -> Option<Address> {
        Address::from_hex_string(&self.contract_address).ok()
    }
}

/// Execution record of a confirmed transaction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SmartContractEvent {
    #[serde(rename = "TxHash")]
    pub tx_hash: TxHash,
    /// 1 on success, 0 on failure.
    #[serde(rename = "State")]
    pub state: u8,
    #[serde(rename = "GasConsumed")]
    pub gas_consumed: u64,
    #[serde(rename = "Notify", default, deserialize_with = "null_as_default")]
    pub notify: Vec<NotifyEventInfo>,
}

impl SmartContractEvent {
    pub fn is_success(&self) -> bool {
        self.state != 0
    }
}

// ============================================================================
// Blocks
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockHeader {
    pub version: u32,
    pub prev_block_hash: TxHash,
    pub transactions_root: TxHash,
    pub blocks_root: TxHash,
    pub timestamp: u32,
    pub height: u32,
    pub consensus_data: u64,
    #[serde(default)]
    pub next_bookkeeper: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub bookkeepers: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub sig_data: Vec<String>,
    pub hash: TxHash,
}

/// A transaction as listed in a verbose block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockTransaction {
    #[serde(default)]
    pub version: u8,
    pub nonce: u32,
    pub gas_price: u64,
    pub gas_limit: u64,
    pub payer: Address,
    pub tx_type: u8,
    pub hash: TxHash,
    #[serde(default)]
    pub payload: serde_json::Value,
}

/// Verbose block as returned by `getblock` with the verbose flag.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Block {
    pub hash: TxHash,
    #[serde(default)]
    pub size: u64,
    pub header: BlockHeader,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<BlockTransaction>,
}

/// Transaction hashes contained in a block.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockTxHashes {
    pub hash: TxHash,
    pub height: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub transactions: Vec<TxHash>,
}

// ============================================================================
// Proofs, mempool and contracts
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MerkleProof {
    #[serde(rename = "Type")]
    pub proof_type: String,
    pub transactions_root: String,
    pub block_height: u32,
    pub cur_block_root: String,
    pub cur_block_height: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub target_hashes: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct MemPoolTxStateItem {
    pub height: u32,
    #[serde(rename = "Type")]
    pub state_type: u8,
    pub err_code: i64,
}

/// Verification progress of a transaction waiting in the mempool.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MemPoolTxState {
    #[serde(rename = "State", default, deserialize_with = "null_as_default")]
    pub state: Vec<MemPoolTxStateItem>,
}

/// `[verified, verifying]` transaction counts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemPoolTxCount(pub [u32; 2]);

impl MemPoolTxCount {
    pub fn verified(&self) -> u32 {
        self.0[0]
    }

    pub fn verifying(&self) -> u32 {
        self.0[1]
    }
}

/// Deployed contract metadata returned by `getcontractstate`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ContractState {
    /// Hex-encoded contract code.
    pub code: String,
    #[serde(default)]
    pub vm_type: Option<u8>,
    #[serde(default)]
    pub need_storage: Option<bool>,
    pub name: String,
    pub code_version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl ContractState {
    pub fn code_bytes(&self) -> Result<Vec<u8>, DecodeError> {
        hex::decode(&self.code).map_err(|e| DecodeError::InvalidHex(e.to_string()))
    }
}

fn null_as_default<'de, D, T>(d: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(d)?.unwrap_or_default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    // ========================================================================
    // ResultItem
    // ========================================================================

    #[test]
    fn test_empty_string_is_zero_and_empty_bytes() {
        let item = ResultItem::new(json!(""));
        assert_eq!(item.to_integer().unwrap(), BigInt::from(0));
        assert_eq!(item.to_byte_array().unwrap(), Vec::<u8>::new());
        assert_eq!(item.to_string().unwrap(), "");
        assert!(!item.to_bool().unwrap());
    }

    #[test]
    fn test_to_integer_little_endian() {
        assert_eq!(
            ResultItem::new(json!("00ca9a3b")).to_integer().unwrap(),
            BigInt::from(1_000_000_000u64)
        );
        assert_eq!(
            ResultItem::new(json!("ff")).to_integer().unwrap(),
            BigInt::from(-1)
        );
        assert_eq!(ResultItem::new(json!(42)).to_u64().unwrap(), 42);
        assert_eq!(
            ResultItem::new(json!("ff")).to_u64(),
            Err(DecodeError::IntegerOverflow("u64"))
        );
    }

    #[test]
    fn test_to_string_decodes_hex_utf8() {
        let item = ResultItem::new(json!(hex::encode("Tesra Token")));
        assert_eq!(item.to_string().unwrap(), "Tesra Token");
        // repeated access is fine
        assert_eq!(item.to_string().unwrap(), "Tesra Token");
    }

    #[test]
    fn test_to_string_rejects_invalid_utf8() {
        let item = ResultItem::new(json!("fffe"));
        assert!(matches!(
            item.to_string(),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_to_byte_array_invalid_hex() {
        assert!(matches!(
            ResultItem::new(json!("abc")).to_byte_array(),
            Err(DecodeError::InvalidHex(_))
        ));
        assert!(matches!(
            ResultItem::new(json!("zz")).to_byte_array(),
            Err(DecodeError::InvalidHex(_))
        ));
        assert!(matches!(
            ResultItem::new(json!([1])).to_byte_array(),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_to_bool() {
        assert!(ResultItem::new(json!(true)).to_bool().unwrap());
        assert!(ResultItem::new(json!("01")).to_bool().unwrap());
        assert!(!ResultItem::new(json!("00")).to_bool().unwrap());
    }

    #[test]
    fn test_to_array() {
        let item = ResultItem::new(json!(["01", ["02"]]));
        let items = item.to_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].to_u64().unwrap(), 1);
        assert_eq!(items[1].to_array().unwrap()[0].to_u64().unwrap(), 2);
        assert!(ResultItem::new(json!("01")).to_array().is_err());
    }

    // ========================================================================
    // Response shapes
    // ========================================================================

    #[test]
    fn test_pre_exec_result_deserialize() {
        let result: PreExecResult = serde_json::from_value(json!({
            "State": 1,
            "Gas": 20000,
            "Result": "0a",
            "Notify": null
        }))
        .unwrap();
        assert!(result.is_success());
        assert_eq!(result.result.to_u64().unwrap(), 10);
        assert!(result.notify.is_empty());
    }

    #[test]
    fn test_smart_contract_event_deserialize() {
        let hash = TxHash::hash(b"x");
        let event: SmartContractEvent = serde_json::from_value(json!({
            "TxHash": hash.to_string(),
            "State": 1,
            "GasConsumed": 10000000,
            "Notify": [{
                "ContractAddress": "0200000000000000000000000000000000000000",
                "States": ["transfer", "AFmseVrdL9f9oyCzZefL9tG6UbvhUMqNMV", "AFmseVrdL9f9oyCzZefL9tG6UbvhUMqNMV", 10000000]
            }]
        }))
        .unwrap();
        assert_eq!(event.tx_hash, hash);
        assert_eq!(event.notify.len(), 1);
        assert_eq!(event.notify[0].contract(), Some(Address::native(2)));
    }

    #[test]
    fn test_mempool_shapes() {
        let count: MemPoolTxCount = serde_json::from_value(json!([3, 1])).unwrap();
        assert_eq!(count.verified(), 3);
        assert_eq!(count.verifying(), 1);

        let state: MemPoolTxState = serde_json::from_value(json!({
            "State": [{"Height": 10, "Type": 1, "ErrCode": 0}]
        }))
        .unwrap();
        assert_eq!(state.state[0].height, 10);
    }

    #[test]
    fn test_merkle_proof_deserialize() {
        let proof: MerkleProof = serde_json::from_value(json!({
            "Type": "MerkleProof",
            "TransactionsRoot": "aa",
            "BlockHeight": 5,
            "CurBlockRoot": "bb",
            "CurBlockHeight": 9,
            "TargetHashes": ["cc", "dd"]
        }))
        .unwrap();
        assert_eq!(proof.block_height, 5);
        assert_eq!(proof.target_hashes.len(), 2);
    }

    #[test]
    fn test_contract_state_deserialize() {
        let state: ContractState = serde_json::from_value(json!({
            "Code": "51c3",
            "NeedStorage": true,
            "Name": "tep1",
            "CodeVersion": "1.0",
            "Author": "dev",
            "Email": "dev@tesra.io",
            "Description": "token"
        }))
        .unwrap();
        assert_eq!(state.code_bytes().unwrap(), vec![0x51, 0xc3]);
        assert_eq!(state.need_storage, Some(true));
        assert_eq!(state.vm_type, None);
    }
}
