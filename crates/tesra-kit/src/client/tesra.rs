//! The main Tesra client.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use crate::contract::TeoVmContract;
use crate::error::{EncodeError, Error, RpcError};
use crate::native::{Auth, GlobalParams, NativeContract, NativeToken, Tsg, TsrId};
use crate::tokens::Tep1;
use crate::types::program::MULTI_SIG_MAX_KEYS;
use crate::types::{
    Address, DeployCode, Network, PreExecResult, PublicKey, Sig, SmartContractEvent,
    TX_MAX_SIG_SIZE, Transaction, TxHash, sort_public_keys,
};

use super::rpc::{DEFAULT_RPC_TIMEOUT, RpcClient};
use super::signer::{Account, Signer};
use super::transport::Transport;

/// Default gas price for new transactions.
pub const DEFAULT_GAS_PRICE: u64 = 500;

/// Default gas limit for new transactions.
pub const DEFAULT_GAS_LIMIT: u64 = 20_000;

/// Number of new blocks [`Tesra::wait_for_blocks`] waits for when no count
/// is given.
pub const DEFAULT_WAIT_BLOCKS: u32 = 2;

/// Gas price and limit attached to new transactions.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GasSettings {
    pub price: u64,
    pub limit: u64,
}

impl GasSettings {
    pub const fn new(price: u64, limit: u64) -> Self {
        Self { price, limit }
    }

    /// Zero price and limit, used for pre-execution.
    pub const ZERO: Self = Self::new(0, 0);
}

impl Default for GasSettings {
    fn default() -> Self {
        Self::new(DEFAULT_GAS_PRICE, DEFAULT_GAS_LIMIT)
    }
}

/// The main client for interacting with a Tesra node.
///
/// `Tesra` is the single entry point: node queries, transaction building and
/// signing, and the native-contract, TeoVM and Tep1 wrappers all hang off
/// it. It is cheap to clone; clones share the transport and signer.
///
/// # Example
///
/// ```rust,no_run
/// use tesra_kit::*;
///
/// #[tokio::main]
/// async fn main() -> Result<(), tesra_kit::Error> {
///     // Read-only client (no signer)
///     let tesra = Tesra::testnet().build();
///     let height = tesra.get_current_block_height().await?;
///     println!("Height: {}", height);
///
///     // Client with signer for transactions
///     let tesra = Tesra::testnet()
///         .credentials("c19f16785b8f3543bbaf5e1dbb5d398dfa6c85aaad54fc9d71203ce83e505c07")?
///         .build();
///     let to: Address = "AFmseVrdL9f9oyCzZefL9tG6UbvhUMqNMV".parse()?;
///     let hash = tesra.tsr().transfer(&to, 100).await?;
///     tesra.wait_for_transaction(&hash, std::time::Duration::from_secs(30)).await?;
///
///     Ok(())
/// }
/// ```
#[derive(Clone)]
pub struct Tesra {
    transport: Arc<dyn Transport>,
    rpc_url: Option<String>,
    signer: Option<Arc<dyn Signer>>,
    network: Network,
    gas: GasSettings,
}

impl Tesra {
    /// Create a builder for the public testnet.
    pub fn testnet() -> TesraBuilder {
        TesraBuilder::new(crate::types::TESTNET_RPC_URL, Network::Testnet)
    }

    /// Create a builder for a node on localhost.
    pub fn local() -> TesraBuilder {
        TesraBuilder::new(crate::types::LOCAL_RPC_URL, Network::Local)
    }

    /// Create a builder with a custom RPC URL.
    pub fn custom(rpc_url: impl Into<String>) -> TesraBuilder {
        TesraBuilder::new(rpc_url, Network::Custom)
    }

    /// Create a configured client from environment variables.
    ///
    /// - `TESRA_NETWORK` (optional): `"testnet"`, `"local"`, or a custom RPC
    ///   URL. Defaults to `"testnet"`.
    /// - `TESRA_PRIVATE_KEY` (optional): key for signing, in any format
    ///   accepted by [`Account::new`].
    ///
    /// Without a private key the client is read-only.
    ///
    /// # Errors
    ///
    /// [`Error::Config`] if `TESRA_PRIVATE_KEY` is set but cannot be parsed.
    pub fn from_env() -> Result<Tesra, Error> {
        let network = std::env::var("TESRA_NETWORK").ok();
        let private_key = std::env::var("TESRA_PRIVATE_KEY").ok();
        Self::from_config(network.as_deref(), private_key.as_deref())
    }

    fn from_config(network: Option<&str>, private_key: Option<&str>) -> Result<Tesra, Error> {
        let mut builder = match network {
            Some("testnet") | None => Tesra::testnet(),
            Some("local") | Some("localnet") => Tesra::local(),
            Some(url) => Tesra::custom(url),
        };

        if let Some(key) = private_key {
            builder = builder
                .credentials(key)
                .map_err(|e| Error::Config(format!("TESRA_PRIVATE_KEY is invalid: {e}")))?;
        }

        Ok(builder.build())
    }

    /// The transport used for node requests.
    pub fn transport(&self) -> &Arc<dyn Transport> {
        &self.transport
    }

    /// The RPC URL, unless a custom transport was installed.
    pub fn rpc_url(&self) -> Option<&str> {
        self.rpc_url.as_deref()
    }

    pub fn network(&self) -> Network {
        self.network
    }

    /// Gas settings used for transactions built by the wrappers.
    pub fn gas(&self) -> GasSettings {
        self.gas
    }

    /// The configured signer, if any.
    pub fn signer(&self) -> Option<&Arc<dyn Signer>> {
        self.signer.as_ref()
    }

    /// Address of the configured signer.
    pub fn signer_address(&self) -> Result<Address, Error> {
        self.signer
            .as_ref()
            .map(|s| *s.address())
            .ok_or(Error::NoSigner)
    }

    /// Execute a node method and deserialize its result.
    pub(crate) async fn request<T: DeserializeOwned>(
        &self,
        method: &str,
        params: Vec<serde_json::Value>,
    ) -> Result<T, Error> {
        let value = self.transport.call(method, params).await?;
        decode_result(method, value)
    }

    // ========================================================================
    // Transaction Building
    // ========================================================================

    /// An unsigned invoke transaction carrying `code`.
    pub fn new_invoke_transaction(&self, gas: GasSettings, code: Vec<u8>) -> Transaction {
        Transaction::new_invoke(gas.price, gas.limit, code)
    }

    /// An unsigned contract deployment transaction.
    pub fn new_deploy_transaction(&self, gas: GasSettings, deploy: DeployCode) -> Transaction {
        Transaction::new_deploy(gas.price, gas.limit, deploy)
    }

    /// Set the account charged for gas. Must happen before signing: the
    /// payer is part of the signed hash.
    pub fn set_payer(&self, tx: &mut Transaction, payer: Address) {
        tx.payer = payer;
    }

    // ========================================================================
    // Signing
    // ========================================================================

    /// Add a single-key signature to `tx`.
    ///
    /// Sets the payer to the signer if none is set yet. A key that already
    /// signed `tx` is skipped. On failure `tx` is left unchanged.
    pub async fn sign_to_transaction(
        &self,
        tx: &mut Transaction,
        signer: &dyn Signer,
    ) -> Result<(), Error> {
        let key = signer.key();
        let public_key = key.public_key().clone();

        if tx
            .sigs
            .iter()
            .any(|sig| sig.pub_keys.len() == 1 && sig.pub_keys[0] == public_key)
        {
            debug!(signer = %signer.address(), "transaction already signed by this key");
            return Ok(());
        }
        if tx.sigs.len() >= TX_MAX_SIG_SIZE {
            return Err(EncodeError::TooManySignatures {
                max: TX_MAX_SIG_SIZE,
            }
            .into());
        }

        let payer = if tx.payer == Address::ZERO {
            *signer.address()
        } else {
            tx.payer
        };
        let hash = hash_with_payer(tx, payer);
        let signature = key.sign(hash.as_bytes()).await?;

        tx.payer = payer;
        tx.sigs.push(Sig {
            pub_keys: vec![public_key],
            m: 1,
            sig_data: vec![signature.to_bytes()],
        });
        Ok(())
    }

    /// Add one signature to the M-of-N group for `pub_keys`.
    ///
    /// Requires `1 <= m <= n <= 16` and the signer's key among `pub_keys`.
    /// Sets the payer to the multi-signature address if none is set yet.
    /// A group that already holds `m` signatures, or one from this key, is
    /// left as is. On failure `tx` is left unchanged.
    pub async fn multi_sign_to_transaction(
        &self,
        tx: &mut Transaction,
        m: usize,
        pub_keys: &[PublicKey],
        signer: &dyn Signer,
    ) -> Result<(), Error> {
        let n = pub_keys.len();
        if m == 0 || m > n || n > MULTI_SIG_MAX_KEYS {
            return Err(EncodeError::InvalidMultiSig { m, n }.into());
        }
        let key = signer.key();
        if !pub_keys.contains(key.public_key()) {
            return Err(EncodeError::SignerNotInKeySet.into());
        }
        let sorted = sort_public_keys(pub_keys);

        let payer = if tx.payer == Address::ZERO {
            Address::from_multi_pub_keys(m, &sorted)?
        } else {
            tx.payer
        };
        let hash = hash_with_payer(tx, payer);

        let group = tx.sigs.iter().position(|sig| sig.pub_keys == sorted);
        if let Some(idx) = group {
            let sig = &tx.sigs[idx];
            if sig.sig_data.len() >= sig.m || sig.is_signed_by(key.public_key(), hash.as_bytes()) {
                debug!(signer = %signer.address(), "multi-signature group needs no further signature");
                return Ok(());
            }
        } else if tx.sigs.len() >= TX_MAX_SIG_SIZE {
            return Err(EncodeError::TooManySignatures {
                max: TX_MAX_SIG_SIZE,
            }
            .into());
        }

        let signature = key.sign(hash.as_bytes()).await?;

        tx.payer = payer;
        match group {
            Some(idx) => tx.sigs[idx].sig_data.push(signature.to_bytes()),
            None => tx.sigs.push(Sig {
                pub_keys: sorted,
                m,
                sig_data: vec![signature.to_bytes()],
            }),
        }
        Ok(())
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Submit a signed transaction. Returns its hash once the node accepts
    /// it into the pool.
    pub async fn send_transaction(&self, tx: &Transaction) -> Result<TxHash, Error> {
        let hex = tx.to_hex()?;
        let hash: TxHash = self
            .request("sendrawtransaction", vec![serde_json::Value::String(hex)])
            .await?;
        info!(tx_hash = %hash, "transaction submitted");
        Ok(hash)
    }

    /// Execute a transaction against the current state without committing
    /// it. Signatures are optional.
    pub async fn pre_exec_transaction(&self, tx: &Transaction) -> Result<PreExecResult, Error> {
        let hex = tx.to_hex()?;
        self.request(
            "sendrawtransaction",
            vec![serde_json::Value::String(hex), serde_json::json!(1)],
        )
        .await
    }

    // ========================================================================
    // Waiting
    // ========================================================================

    /// Wait until `count` new blocks (default [`DEFAULT_WAIT_BLOCKS`], also
    /// used for a count of zero) have been produced.
    ///
    /// Checks the height once per second, at least once and at most
    /// `timeout` seconds worth of times. A failed height query during the
    /// wait is logged and skipped.
    pub async fn wait_for_blocks(
        &self,
        timeout: Duration,
        count: impl Into<Option<u32>>,
    ) -> Result<(), Error> {
        let count = count
            .into()
            .filter(|c| *c > 0)
            .unwrap_or(DEFAULT_WAIT_BLOCKS);
        let checks = timeout.as_secs().max(1);
        let start = self.get_current_block_height().await?;

        for _ in 0..checks {
            tokio::time::sleep(Duration::from_secs(1)).await;
            match self.get_current_block_height().await {
                Ok(current) if current.saturating_sub(start) >= count => return Ok(()),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "block height query failed while waiting"),
            }
        }

        Err(Error::Timeout {
            waited_secs: checks,
            target: format!("{count} new blocks"),
        })
    }

    /// Poll the event record of `hash` once per second until it appears.
    ///
    /// # Errors
    ///
    /// [`Error::ExecutionFailed`] if the transaction executed with state 0,
    /// [`Error::Timeout`] if no record appeared in time.
    pub async fn wait_for_transaction(
        &self,
        hash: &TxHash,
        timeout: Duration,
    ) -> Result<SmartContractEvent, Error> {
        let checks = timeout.as_secs().max(1);

        for _ in 0..checks {
            tokio::time::sleep(Duration::from_secs(1)).await;
            match self.get_smart_contract_event(hash).await {
                Ok(Some(event)) if event.is_success() => return Ok(event),
                Ok(Some(event)) => {
                    return Err(Error::ExecutionFailed {
                        tx_hash: *hash,
                        state: event.state,
                        gas_consumed: event.gas_consumed,
                    });
                }
                Ok(None) => {}
                Err(e) => debug!(tx_hash = %hash, error = %e, "event not available yet"),
            }
        }

        Err(Error::Timeout {
            waited_secs: checks,
            target: format!("transaction {hash}"),
        })
    }

    // ========================================================================
    // Contract Wrappers
    // ========================================================================

    /// Dispatcher for raw native-contract calls.
    pub fn native(&self) -> NativeContract {
        NativeContract::new(self.clone())
    }

    /// The TSR native token.
    pub fn tsr(&self) -> NativeToken {
        NativeToken::tsr(self.native())
    }

    /// The TSG native gas token.
    pub fn tsg(&self) -> Tsg {
        Tsg::new(self.native())
    }

    /// The TsrId identity contract.
    pub fn tsr_id(&self) -> TsrId {
        TsrId::new(self.native())
    }

    /// The global parameters contract.
    pub fn global_params(&self) -> GlobalParams {
        GlobalParams::new(self.native())
    }

    /// The authorization contract.
    pub fn auth(&self) -> Auth {
        Auth::new(self.native())
    }

    /// Deploy and invoke TeoVM contracts.
    pub fn teovm(&self) -> TeoVmContract {
        TeoVmContract::new(self.clone())
    }

    /// A Tep1 token deployed at `contract`.
    pub fn tep1(&self, contract: Address) -> Tep1 {
        Tep1::new(self.teovm(), contract)
    }
}

/// Deserialize the `result` of `method`.
pub(crate) fn decode_result<T: DeserializeOwned>(
    method: &str,
    value: serde_json::Value,
) -> Result<T, Error> {
    serde_json::from_value(value).map_err(|e| {
        Error::Rpc(RpcError::InvalidResponse {
            method: method.to_string(),
            message: e.to_string(),
        })
    })
}

/// Hash `tx` as it will be once `payer` is set.
fn hash_with_payer(tx: &Transaction, payer: Address) -> TxHash {
    if tx.payer == payer {
        return tx.hash();
    }
    let mut preview = tx.clone();
    preview.payer = payer;
    preview.hash()
}

impl std::fmt::Debug for Tesra {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tesra")
            .field("rpc_url", &self.rpc_url)
            .field("network", &self.network)
            .field("signer", &self.signer.as_ref().map(|s| *s.address()))
            .field("gas", &self.gas)
            .finish()
    }
}

/// Builder for creating a [`Tesra`] client.
///
/// # Example
///
/// ```rust,ignore
/// use tesra_kit::*;
///
/// // Read-only client
/// let tesra = Tesra::testnet().build();
///
/// // Client with credentials and custom gas
/// let tesra = Tesra::local()
///     .credentials("secp256k1:...")?
///     .gas(GasSettings::new(2500, 30_000))
///     .build();
/// ```
pub struct TesraBuilder {
    rpc_url: String,
    signer: Option<Arc<dyn Signer>>,
    transport: Option<Arc<dyn Transport>>,
    timeout: Duration,
    gas: GasSettings,
    network: Network,
}

impl TesraBuilder {
    fn new(rpc_url: impl Into<String>, network: Network) -> Self {
        Self {
            rpc_url: rpc_url.into(),
            signer: None,
            transport: None,
            timeout: DEFAULT_RPC_TIMEOUT,
            gas: GasSettings::default(),
            network,
        }
    }

    /// Set the signer used by the contract wrappers.
    pub fn signer(mut self, signer: impl Signer + 'static) -> Self {
        self.signer = Some(Arc::new(signer));
        self
    }

    /// Set up signing from a private key string. Creates an [`Account`].
    pub fn credentials(mut self, private_key: impl AsRef<str>) -> Result<Self, Error> {
        let account = Account::new(private_key)?;
        self.signer = Some(Arc::new(account));
        Ok(self)
    }

    /// Gas settings for transactions built by the wrappers.
    pub fn gas(mut self, gas: GasSettings) -> Self {
        self.gas = gas;
        self
    }

    /// Per-request HTTP timeout. Ignored when a custom transport is set.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Replace the HTTP JSON-RPC transport.
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Build the client.
    pub fn build(self) -> Tesra {
        let (transport, rpc_url): (Arc<dyn Transport>, _) = match self.transport {
            Some(transport) => (transport, None),
            None => (
                Arc::new(RpcClient::with_timeout(self.rpc_url.clone(), self.timeout)),
                Some(self.rpc_url),
            ),
        };
        Tesra {
            transport,
            rpc_url,
            signer: self.signer,
            network: self.network,
            gas: self.gas,
        }
    }
}

impl From<TesraBuilder> for Tesra {
    fn from(builder: TesraBuilder) -> Self {
        builder.build()
    }
}
