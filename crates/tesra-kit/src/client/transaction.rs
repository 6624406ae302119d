//! Fluent builder for invoke transactions.
//!
//! Every contract write in this crate returns an [`InvokeBuilder`]. Awaiting
//! it builds, signs and submits the transaction and resolves to its hash:
//!
//! ```rust,no_run
//! # use tesra_kit::*;
//! # async fn example(tesra: Tesra, payer: Account, to: Address) -> Result<(), Error> {
//! // Signed by the client's signer
//! let hash = tesra.tsr().transfer(&to, 100).await?;
//!
//! // Gas paid by another account, then wait for execution
//! let event = tesra
//!     .tsr()
//!     .transfer(&to, 100)
//!     .payer(payer)
//!     .gas_price(2500)
//!     .send_and_wait(std::time::Duration::from_secs(60))
//!     .await?;
//! # Ok(())
//! # }
//! ```

use std::future::{Future, IntoFuture};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::Error;
use crate::types::{DeployCode, Payload, PublicKey, SmartContractEvent, Transaction, TxHash};

use super::signer::Signer;
use super::tesra::{GasSettings, Tesra};

fn new_transaction(tesra: &Tesra, gas: GasSettings, payload: Payload) -> Transaction {
    match payload {
        Payload::Invoke { code } => tesra.new_invoke_transaction(gas, code),
        Payload::Deploy(deploy) => tesra.new_deploy_transaction(gas, deploy),
    }
}

/// An M-of-N signature to add.
struct MultiSign {
    m: usize,
    pub_keys: Vec<PublicKey>,
    signer: Arc<dyn Signer>,
}

/// Builder for a single invoke (or deploy) transaction.
///
/// Signing order: the payer (if set) signs first, then every signer added
/// with [`sign_with`](Self::sign_with) (or the client's signer when there are
/// none), then co-signers, then the multi-signature contributions.
pub struct InvokeBuilder {
    tesra: Tesra,
    payload: Result<Payload, Error>,
    gas: GasSettings,
    payer: Option<Arc<dyn Signer>>,
    signers: Vec<Arc<dyn Signer>>,
    co_signers: Vec<Arc<dyn Signer>>,
    multi_signers: Vec<MultiSign>,
}

impl InvokeBuilder {
    /// A builder for `code`. An encoding error is reported when the builder
    /// is consumed.
    pub(crate) fn new(tesra: Tesra, code: Result<Vec<u8>, Error>) -> Self {
        Self::with_payload(tesra, code.map(|code| Payload::Invoke { code }))
    }

    /// A builder deploying `deploy`.
    pub(crate) fn deploy(tesra: Tesra, deploy: DeployCode) -> Self {
        Self::with_payload(tesra, Ok(Payload::Deploy(deploy)))
    }

    fn with_payload(tesra: Tesra, payload: Result<Payload, Error>) -> Self {
        let gas = tesra.gas();
        Self {
            tesra,
            payload,
            gas,
            payer: None,
            signers: Vec::new(),
            co_signers: Vec::new(),
            multi_signers: Vec::new(),
        }
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    /// Account paying for gas. Signs before every other signer.
    pub fn payer(mut self, payer: impl Signer + 'static) -> Self {
        self.payer = Some(Arc::new(payer));
        self
    }

    /// Add a signer. The first call replaces the client's default signer.
    pub fn sign_with(mut self, signer: impl Signer + 'static) -> Self {
        self.signers.push(Arc::new(signer));
        self
    }

    /// Add a signature after the primary signers without displacing the
    /// client's signer.
    pub fn co_sign(mut self, signer: impl Signer + 'static) -> Self {
        self.co_signers.push(Arc::new(signer));
        self
    }

    /// Add one signature to the M-of-N group over `pub_keys`.
    pub fn multi_sign(
        mut self,
        m: usize,
        pub_keys: impl Into<Vec<PublicKey>>,
        signer: impl Signer + 'static,
    ) -> Self {
        self.multi_signers.push(MultiSign {
            m,
            pub_keys: pub_keys.into(),
            signer: Arc::new(signer),
        });
        self
    }

    pub fn gas_price(mut self, price: u64) -> Self {
        self.gas.price = price;
        self
    }

    pub fn gas_limit(mut self, limit: u64) -> Self {
        self.gas.limit = limit;
        self
    }

    pub fn gas(mut self, gas: GasSettings) -> Self {
        self.gas = gas;
        self
    }

    // ========================================================================
    // Execution
    // ========================================================================

    /// The unsigned transaction, with the payer set if one was given.
    ///
    /// A deferred encoding or missing-signer error is returned as the same
    /// variant [`sign`](Self::sign) would return.
    pub fn build(&self) -> Result<Transaction, Error> {
        let payload = match &self.payload {
            Ok(payload) => payload.clone(),
            Err(Error::Encode(e)) => return Err(Error::Encode(e.clone())),
            Err(Error::NoSigner) => return Err(Error::NoSigner),
            Err(e) => return Err(Error::InvalidArgument(e.to_string())),
        };
        let mut tx = new_transaction(&self.tesra, self.gas, payload);
        if let Some(payer) = &self.payer {
            self.tesra.set_payer(&mut tx, *payer.address());
        }
        Ok(tx)
    }

    /// The fully signed transaction, not yet submitted.
    pub async fn sign(self) -> Result<Transaction, Error> {
        let mut tx = new_transaction(&self.tesra, self.gas, self.payload?);

        if let Some(payer) = &self.payer {
            self.tesra.set_payer(&mut tx, *payer.address());
            self.tesra.sign_to_transaction(&mut tx, payer.as_ref()).await?;
        }

        let default_signer = if self.signers.is_empty() && self.multi_signers.is_empty() {
            Some(self.tesra.signer().cloned().ok_or(Error::NoSigner)?)
        } else {
            None
        };
        for signer in self
            .signers
            .iter()
            .chain(default_signer.iter())
            .chain(self.co_signers.iter())
        {
            self.tesra.sign_to_transaction(&mut tx, signer.as_ref()).await?;
        }

        for multi in &self.multi_signers {
            self.tesra
                .multi_sign_to_transaction(&mut tx, multi.m, &multi.pub_keys, multi.signer.as_ref())
                .await?;
        }

        Ok(tx)
    }

    /// Submit and wait for the execution record.
    pub async fn send_and_wait(self, timeout: Duration) -> Result<SmartContractEvent, Error> {
        let tesra = self.tesra.clone();
        let hash = self.await?;
        tesra.wait_for_transaction(&hash, timeout).await
    }
}

impl IntoFuture for InvokeBuilder {
    type Output = Result<TxHash, Error>;
    type IntoFuture = Pin<Box<dyn Future<Output = Self::Output> + Send>>;

    fn into_future(self) -> Self::IntoFuture {
        Box::pin(async move {
            let tesra = self.tesra.clone();
            let tx = self.sign().await?;
            tesra.send_transaction(&tx).await
        })
    }
}

impl std::fmt::Debug for InvokeBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InvokeBuilder")
            .field("gas", &self.gas)
            .field("payer", &self.payer.as_ref().map(|p| *p.address()))
            .field(
                "signers",
                &self.signers.iter().map(|s| *s.address()).collect::<Vec<_>>(),
            )
            .field(
                "co_signers",
                &self.co_signers.iter().map(|s| *s.address()).collect::<Vec<_>>(),
            )
            .field("multi_signers", &self.multi_signers.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::signer::Account;
    use crate::error::EncodeError;
    use crate::types::{Address, KeyType};

    fn builder(tesra: &Tesra) -> InvokeBuilder {
        InvokeBuilder::new(tesra.clone(), Ok(vec![0x00, 0x01]))
    }

    // ========================================================================
    // Configuration
    // ========================================================================

    #[test]
    fn test_build_applies_gas_and_payer() {
        let tesra = Tesra::testnet().build();
        let payer = Account::random(KeyType::P256).unwrap();
        let payer_address = *payer.address();

        let tx = builder(&tesra)
            .gas_price(2500)
            .gas_limit(30_000)
            .payer(payer)
            .build()
            .unwrap();
        assert_eq!(tx.gas_price, 2500);
        assert_eq!(tx.gas_limit, 30_000);
        assert_eq!(tx.payer, payer_address);
        assert!(tx.sigs.is_empty());
    }

    #[test]
    fn test_build_reports_encoding_error() {
        let tesra = Tesra::testnet().build();
        let err = InvokeBuilder::new(
            tesra,
            Err(EncodeError::UnsupportedParameterType("empty struct".to_string()).into()),
        )
        .build()
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Encode(EncodeError::UnsupportedParameterType(_))
        ));
    }

    #[tokio::test]
    async fn test_build_and_sign_agree_on_errors() {
        let tesra = Tesra::testnet().build();
        let invalid = || {
            InvokeBuilder::new(
                tesra.clone(),
                Err(EncodeError::InvalidMultiSig { m: 3, n: 2 }.into()),
            )
        };
        assert!(matches!(
            invalid().build(),
            Err(Error::Encode(EncodeError::InvalidMultiSig { m: 3, n: 2 }))
        ));
        assert!(matches!(
            invalid().sign().await,
            Err(Error::Encode(EncodeError::InvalidMultiSig { m: 3, n: 2 }))
        ));

        let unsigned = InvokeBuilder::new(tesra.clone(), Err(Error::NoSigner));
        assert!(matches!(unsigned.build(), Err(Error::NoSigner)));
    }

    #[test]
    fn test_build_reports_empty_struct_from_contract_call() {
        let tesra = Tesra::testnet().build();
        let err = tesra
            .teovm()
            .invoke(
                &Address::native(0x42),
                "put",
                vec![crate::vm::InvokeParam::Struct(vec![])],
            )
            .build()
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Encode(EncodeError::UnsupportedParameterType(_))
        ));
    }

    // ========================================================================
    // Signing
    // ========================================================================

    #[tokio::test]
    async fn test_sign_without_signer() {
        let tesra = Tesra::testnet().build();
        assert!(matches!(builder(&tesra).sign().await, Err(Error::NoSigner)));
    }

    #[tokio::test]
    async fn test_sign_uses_default_signer() {
        let account = Account::random(KeyType::Secp256k1).unwrap();
        let address = *account.address();
        let tesra = Tesra::testnet().signer(account).build();

        let tx = builder(&tesra).sign().await.unwrap();
        assert_eq!(tx.payer, address);
        assert!(tx.verify_signatures());
    }

    #[tokio::test]
    async fn test_payer_signs_first() {
        let payer = Account::random(KeyType::P256).unwrap();
        let signer = Account::random(KeyType::Ed25519).unwrap();
        let (payer_address, signer_address) = (*payer.address(), *signer.address());
        let tesra = Tesra::testnet().build();

        let tx = builder(&tesra)
            .payer(payer)
            .sign_with(signer)
            .sign()
            .await
            .unwrap();
        assert_eq!(tx.payer, payer_address);
        assert_eq!(
            tx.signer_addresses().unwrap(),
            vec![payer_address, signer_address]
        );
        assert!(tx.verify_signatures());
    }

    #[tokio::test]
    async fn test_co_signer_follows_default_signer() {
        let account = Account::random(KeyType::P256).unwrap();
        let controller = Account::random(KeyType::Secp256k1).unwrap();
        let (account_address, controller_address) = (*account.address(), *controller.address());
        let tesra = Tesra::testnet().signer(account).build();

        let tx = builder(&tesra).co_sign(controller).sign().await.unwrap();
        assert_eq!(tx.payer, account_address);
        assert_eq!(
            tx.signer_addresses().unwrap(),
            vec![account_address, controller_address]
        );
    }

    #[tokio::test]
    async fn test_multi_sign_only() {
        let accounts: Vec<_> = (0..3)
            .map(|_| Account::random(KeyType::P256).unwrap())
            .collect();
        let keys: Vec<_> = accounts.iter().map(|a| a.public_key().clone()).collect();
        let tesra = Tesra::testnet().build();

        let tx = builder(&tesra)
            .multi_sign(2, keys.clone(), accounts[0].clone())
            .multi_sign(2, keys, accounts[1].clone())
            .sign()
            .await
            .unwrap();
        assert_eq!(tx.sigs.len(), 1);
        assert_ne!(tx.payer, Address::ZERO);
        assert!(tx.verify_signatures());
    }

    // ========================================================================
    // Submission
    // ========================================================================

    #[tokio::test(start_paused = true)]
    async fn test_await_and_wait() {
        let account = Account::random(KeyType::P256).unwrap();
        let hash = TxHash::hash(b"submitted");
        let mock = Arc::new(
            MockTransport::builder()
                .with_response("sendrawtransaction", serde_json::json!(hash.to_string()))
                .with_response(
                    "getsmartcodeevent",
                    serde_json::json!({
                        "TxHash": hash.to_string(),
                        "State": 1,
                        "GasConsumed": 10000000,
                        "Notify": []
                    }),
                )
                .build(),
        );
        let tesra = Tesra::local().transport(mock.clone()).signer(account).build();

        assert_eq!(builder(&tesra).await.unwrap(), hash);

        let event = builder(&tesra)
            .send_and_wait(Duration::from_secs(10))
            .await
            .unwrap();
        assert_eq!(event.gas_consumed, 10_000_000);
        assert_eq!(mock.calls_to("sendrawtransaction"), 2);
    }

    #[tokio::test]
    async fn test_rejected_submission_is_node_error() {
        let account = Account::random(KeyType::P256).unwrap();
        let mock = Arc::new(
            MockTransport::builder()
                .with_node_error("sendrawtransaction", 43001, "INVALID TRANSACTION")
                .build(),
        );
        let tesra = Tesra::local().transport(mock).signer(account).build();

        match builder(&tesra).await.unwrap_err() {
            Error::Rpc(e) => assert_eq!(e.code(), Some(43001)),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
