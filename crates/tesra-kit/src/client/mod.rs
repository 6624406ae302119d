//! Client module for interacting with a Tesra node.
//!
//! - [`Tesra`]: the main client, the single entry point for all operations
//! - [`TesraBuilder`]: fluent builder for configuring the client
//! - [`Transport`]: the seam between the client and the node
//! - [`RpcClient`]: the HTTP JSON-RPC transport
//!
//! # Signers
//!
//! | Signer | Use Case |
//! |--------|----------|
//! | [`Account`] | A key held in memory (P-256, secp256k1 or Ed25519) |
//! | custom [`Signer`] | Anything that can produce a [`SigningKey`] |
//!
//! # Writes
//!
//! Every contract write returns an [`InvokeBuilder`], which can be awaited
//! directly or configured with a payer, extra signers and gas first.

pub mod mock;
mod query;
mod rpc;
mod signer;
mod tesra;
mod transaction;
mod transport;

pub use rpc::{DEFAULT_RPC_TIMEOUT, RpcClient};
pub use signer::{Account, Signer, SigningKey};
pub use tesra::{
    DEFAULT_GAS_LIMIT, DEFAULT_GAS_PRICE, DEFAULT_WAIT_BLOCKS, GasSettings, Tesra, TesraBuilder,
};
pub use transaction::InvokeBuilder;
pub use transport::Transport;
