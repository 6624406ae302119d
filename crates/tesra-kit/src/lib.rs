//! A clean, ergonomic Rust client for the Tesra blockchain.
//!
//! **tesra-kit** talks to a Tesra node over JSON-RPC, builds and signs
//! transactions, and wraps the built-in native contracts and Tep1 tokens in
//! typed APIs.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use tesra_kit::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), tesra_kit::Error> {
//!     // Configure once
//!     let tesra = Tesra::testnet().build();
//!
//!     // Query the chain
//!     let height = tesra.get_current_block_height().await?;
//!     println!("Height: {}", height);
//!
//!     // Read a native token balance
//!     let address: Address = "AFmseVrdL9f9oyCzZefL9tG6UbvhPbdYzM".parse()?;
//!     let balance = tesra.tsr().balance_of(&address).await?;
//!     println!("Balance: {} TSR", balance);
//!
//!     Ok(())
//! }
//! ```
//!
//! # Design Principles
//!
//! 1. **Single entry point**: Everything hangs off the [`Tesra`] client
//! 2. **Configure once**: Network, signer and gas set at client creation
//! 3. **Writes are builders**: Every write returns an [`InvokeBuilder`] that
//!    can be awaited directly or given a payer, extra signers and gas first
//! 4. **Offline first**: Transactions can be built, signed and decoded
//!    without a node
//!
//! # Core Types
//!
//! - [`Address`] - 20-byte account or contract address
//! - [`TxHash`] - Transaction and block hash
//! - [`PublicKey`], [`SecretKey`] - Cryptographic keys
//! - [`Transaction`] - Wire-format transaction with signatures
//! - [`InvokeParam`] - A typed contract call argument
//!
//! # Native Contracts
//!
//! ```rust,no_run
//! use tesra_kit::*;
//!
//! # async fn example(to: Address) -> Result<(), tesra_kit::Error> {
//! let tesra = Tesra::testnet().credentials("p256:<hex secret key>")?.build();
//!
//! let hash = tesra.tsr().transfer(&to, 10).await?;
//! let event = tesra.wait_for_transaction(&hash, std::time::Duration::from_secs(30)).await?;
//! println!("gas consumed: {}", event.gas_consumed);
//! # Ok(())
//! # }
//! ```
//!
//! # Offline Payload Decoding
//!
//! ```rust,no_run
//! use tesra_kit::*;
//!
//! # fn example(raw_tx: &[u8]) -> Result<(), tesra_kit::Error> {
//! let decoded = parse_native_tx_payload(raw_tx)?;
//! if let PayloadParam::Transfer(states) = decoded.param {
//!     for state in states {
//!         println!("{} -> {}: {}", state.from, state.to, state.value);
//!     }
//! }
//! # Ok(())
//! # }
//! ```

pub mod client;
pub mod codec;
pub mod contract;
pub mod error;
pub mod native;
pub mod tokens;
pub mod types;
pub mod vm;

// Re-export commonly used types at crate root
pub use error::{
    DecodeError, EncodeError, Error, ParseAddressError, ParseHashError, ParseKeyError, RpcError,
    SignerError,
};
pub use types::*;

// Re-export client types
pub use client::{
    Account, DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE, DEFAULT_RPC_TIMEOUT, DEFAULT_WAIT_BLOCKS,
    GasSettings, InvokeBuilder, RpcClient, Signer, SigningKey, Tesra, TesraBuilder, Transport,
};

// Re-export contract types
pub use contract::{ContractMetadata, TeoVmContract};
pub use native::{
    Auth, Ddo, DdoAttribute, DdoOwner, DecodedPayload, GlobalParams, NativeCall, NativeContract,
    NativeToken, PayloadParam, StateInfo, TransferFromInfo, Tsg, TsrId, parse_native_tx_payload,
    parse_payload,
};
pub use vm::{InvokeParam, StackItem};

// Re-export token types
pub use tokens::{Tep1, Tep1TransferEvent, TransferState};
