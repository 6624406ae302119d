//! Node queries.
//!
//! Thin typed wrappers over the node's JSON-RPC read methods. Each one is a
//! single request with no retries.

use serde_json::{Value, json};

use crate::error::{DecodeError, Error};
use crate::types::{
    Address, Block, BlockTxHashes, ContractState, MemPoolTxCount, MemPoolTxState, MerkleProof,
    SmartContractEvent, Transaction, TxHash,
};

use super::tesra::{Tesra, decode_result};

/// `true` for the empty answers the node gives for unknown records.
fn is_empty_result(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        _ => false,
    }
}

fn decode_hex(value: &str) -> Result<Vec<u8>, Error> {
    hex::decode(value).map_err(|e| DecodeError::InvalidHex(e.to_string()).into())
}

impl Tesra {
    // ========================================================================
    // Node
    // ========================================================================

    /// Version string of the node software.
    pub async fn get_version(&self) -> Result<String, Error> {
        self.request("getversion", vec![]).await
    }

    /// Network id the node is configured for.
    pub async fn get_network_id(&self) -> Result<u32, Error> {
        self.request("getnetworkid", vec![]).await
    }

    // ========================================================================
    // Blocks
    // ========================================================================

    /// Height of the latest block (block count minus one).
    pub async fn get_current_block_height(&self) -> Result<u32, Error> {
        let count: u32 = self.request("getblockcount", vec![]).await?;
        Ok(count.saturating_sub(1))
    }

    pub async fn get_current_block_hash(&self) -> Result<TxHash, Error> {
        self.request("getbestblockhash", vec![]).await
    }

    pub async fn get_block_hash(&self, height: u32) -> Result<TxHash, Error> {
        self.request("getblockhash", vec![json!(height)]).await
    }

    pub async fn get_block_by_height(&self, height: u32) -> Result<Block, Error> {
        self.request("getblock", vec![json!(height), json!(1)]).await
    }

    pub async fn get_block_by_hash(&self, hash: &TxHash) -> Result<Block, Error> {
        self.request("getblock", vec![json!(hash.to_string()), json!(1)])
            .await
    }

    /// Hashes of the transactions in the block at `height`.
    pub async fn get_block_tx_hashes_by_height(&self, height: u32) -> Result<BlockTxHashes, Error> {
        self.request("getblocktxsbyheight", vec![json!(height)])
            .await
    }

    pub async fn get_block_height_by_tx_hash(&self, hash: &TxHash) -> Result<u32, Error> {
        self.request("getblockheightbytxhash", vec![json!(hash.to_string())])
            .await
    }

    // ========================================================================
    // Transactions and events
    // ========================================================================

    /// A confirmed transaction, decoded from its raw bytes.
    pub async fn get_transaction(&self, hash: &TxHash) -> Result<Transaction, Error> {
        let raw: String = self
            .request("getrawtransaction", vec![json!(hash.to_string())])
            .await?;
        Ok(Transaction::from_hex(&raw)?)
    }

    /// Execution record of a transaction, or `None` while it is unknown to
    /// the node.
    pub async fn get_smart_contract_event(
        &self,
        hash: &TxHash,
    ) -> Result<Option<SmartContractEvent>, Error> {
        let value: Value = self
            .request("getsmartcodeevent", vec![json!(hash.to_string())])
            .await?;
        if is_empty_result(&value) {
            return Ok(None);
        }
        Ok(Some(decode_result("getsmartcodeevent", value)?))
    }

    /// Execution records of every transaction in the block at `height`.
    pub async fn get_smart_contract_events_by_height(
        &self,
        height: u32,
    ) -> Result<Vec<SmartContractEvent>, Error> {
        let value: Value = self
            .request("getsmartcodeevent", vec![json!(height)])
            .await?;
        if is_empty_result(&value) {
            return Ok(Vec::new());
        }
        decode_result("getsmartcodeevent", value)
    }

    pub async fn get_merkle_proof(&self, hash: &TxHash) -> Result<MerkleProof, Error> {
        self.request("getmerkleproof", vec![json!(hash.to_string())])
            .await
    }

    pub async fn get_mem_pool_tx_state(&self, hash: &TxHash) -> Result<MemPoolTxState, Error> {
        self.request("getmempooltxstate", vec![json!(hash.to_string())])
            .await
    }

    pub async fn get_mem_pool_tx_count(&self) -> Result<MemPoolTxCount, Error> {
        self.request("getmempooltxcount", vec![]).await
    }

    // ========================================================================
    // Contracts
    // ========================================================================

    /// Raw storage value under `key` of `contract`. Empty when unset.
    pub async fn get_storage(&self, contract: &Address, key: &[u8]) -> Result<Vec<u8>, Error> {
        let value: Value = self
            .request(
                "getstorage",
                vec![json!(contract.to_hex_string()), json!(hex::encode(key))],
            )
            .await?;
        match value {
            Value::String(s) => decode_hex(&s),
            Value::Null => Ok(Vec::new()),
            other => Err(DecodeError::TypeMismatch {
                expected: "hex string",
                found: other.to_string(),
            }
            .into()),
        }
    }

    /// Metadata and code of a deployed contract.
    pub async fn get_contract_state(&self, contract: &Address) -> Result<ContractState, Error> {
        self.request(
            "getcontractstate",
            vec![json!(contract.to_hex_string()), json!(1)],
        )
        .await
    }
}
