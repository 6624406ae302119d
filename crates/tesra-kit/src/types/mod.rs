//! Core types for Tesra.
//!
//! Addresses, hashes, keys, transactions and the JSON shapes returned by
//! the node.

mod address;
mod hash;
mod key;
mod network;
pub mod program;
mod rpc;
mod transaction;

pub use address::{ADDRESS_VERSION, Address};
pub use hash::TxHash;
pub use key::{KeyType, PublicKey, SecretKey, Signature, SignatureScheme, sort_public_keys};
pub use network::{LOCAL_RPC_URL, Network, TESTNET_RPC_URL};
pub use rpc::{
    Block, BlockHeader, BlockTransaction, BlockTxHashes, ContractState, MemPoolTxCount,
    MemPoolTxState, MemPoolTxStateItem, MerkleProof, NotifyEventInfo, PreExecResult, ResultItem,
    SmartContractEvent,
};
pub use transaction::{DeployCode, Payload, Sig, TX_MAX_SIG_SIZE, Transaction, TxType, VmType};
