//! Network identification for Tesra.

use std::fmt;
use std::str::FromStr;

/// Public testnet JSON-RPC endpoint.
pub const TESTNET_RPC_URL: &str = "http://polaris1.tsr.io:20336";

/// JSON-RPC endpoint of a node running on this machine.
pub const LOCAL_RPC_URL: &str = "http://127.0.0.1:20336";

/// The Tesra network the client is connected to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum Network {
    /// Public test network.
    #[default]
    Testnet,
    /// A node on localhost.
    Local,
    /// Any other endpoint.
    Custom,
}

impl Network {
    pub fn is_testnet(&self) -> bool {
        matches!(self, Network::Testnet)
    }

    pub fn is_local(&self) -> bool {
        matches!(self, Network::Local)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Network::Testnet => "testnet",
            Network::Local => "local",
            Network::Custom => "custom",
        }
    }

    /// Default JSON-RPC endpoint, if the network has one.
    pub fn rpc_url(&self) -> Option<&'static str> {
        match self {
            Network::Testnet => Some(TESTNET_RPC_URL),
            Network::Local => Some(LOCAL_RPC_URL),
            Network::Custom => None,
        }
    }
}

impl FromStr for Network {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "testnet" => Ok(Network::Testnet),
            "local" | "localnet" => Ok(Network::Local),
            "custom" => Ok(Network::Custom),
            other => Err(format!("unknown network '{other}'")),
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
