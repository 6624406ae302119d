//! Tep1 fungible token client.

use num_bigint::BigInt;
use num_traits::ToPrimitive;
use tokio::sync::OnceCell;
use tracing::debug;

use crate::client::{InvokeBuilder, Signer};
use crate::contract::TeoVmContract;
use crate::error::{DecodeError, Error};
use crate::types::{Address, PublicKey, ResultItem, SmartContractEvent, TxHash};
use crate::vm::InvokeParam;

use super::types::{Tep1TransferEvent, TransferState};

/// Client for a Tep1 token contract.
///
/// Create via [`Tesra::tep1()`](crate::Tesra::tep1).
///
/// # Caching
///
/// `decimals` is fetched on first use and cached.
///
/// # Example
///
/// ```rust,no_run
/// use tesra_kit::*;
///
/// # async fn example(tesra: Tesra, contract: Address, to: Address) -> Result<(), Error> {
/// let token = tesra.tep1(contract);
/// println!("{} has {} decimals", token.symbol().await?, token.decimals().await?);
///
/// let hash = token.transfer(&to, 1_000).await?;
/// for event in token.fetch_tx_transfer_events(&hash).await? {
///     println!("{event}");
/// }
/// # Ok(())
/// # }
/// ```
pub struct Tep1 {
    teovm: TeoVmContract,
    contract: Address,
    decimals: OnceCell<u8>,
}

impl Tep1 {
    pub(crate) fn new(teovm: TeoVmContract, contract: Address) -> Self {
        Self {
            teovm,
            contract,
            decimals: OnceCell::new(),
        }
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    fn invoke(&self, method: &str, args: Vec<InvokeParam>) -> InvokeBuilder {
        self.teovm.invoke(&self.contract, method, args)
    }

    /// Like [`invoke`](Self::invoke), for calls whose arguments need the
    /// client's signer address.
    fn invoke_as_signer(
        &self,
        method: &str,
        args: impl FnOnce(Address) -> Vec<InvokeParam>,
    ) -> InvokeBuilder {
        match self.teovm.tesra().signer_address() {
            Ok(address) => self.invoke(method, args(address)),
            Err(e) => InvokeBuilder::new(self.teovm.tesra().clone(), Err(e)),
        }
    }

    /// Builder for a call made by the M-of-N account over `signers`' keys,
    /// with every signer contributing.
    fn invoke_multi<S: Signer + 'static>(
        &self,
        method: &str,
        m: usize,
        signers: Vec<S>,
        args: impl FnOnce(Address) -> Vec<InvokeParam>,
    ) -> InvokeBuilder {
        let keys: Vec<PublicKey> = signers
            .iter()
            .map(|s| s.key().public_key().clone())
            .collect();
        let account = match Address::from_multi_pub_keys(m, &keys) {
            Ok(account) => account,
            Err(e) => return InvokeBuilder::new(self.teovm.tesra().clone(), Err(e.into())),
        };
        signers
            .into_iter()
            .fold(self.invoke(method, args(account)), |builder, signer| {
                builder.multi_sign(m, keys.clone(), signer)
            })
    }

    async fn read(&self, method: &str, args: Vec<InvokeParam>) -> Result<ResultItem, Error> {
        let result = self.teovm.pre_exec(&self.contract, method, args).await?;
        if !result.is_success() {
            return Err(Error::PreExecFailed {
                method: method.to_string(),
                state: result.state,
                gas: result.gas,
            });
        }
        Ok(result.result)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn name(&self) -> Result<String, Error> {
        Ok(self.read("name", vec![]).await?.to_string()?)
    }

    pub async fn symbol(&self) -> Result<String, Error> {
        Ok(self.read("symbol", vec![]).await?.to_string()?)
    }

    /// Decimal places of the token. Cached after the first call.
    pub async fn decimals(&self) -> Result<u8, Error> {
        self.decimals
            .get_or_try_init(|| async {
                let value = self
                    .read("decimals", vec![])
                    .await?
                    .to_integer()
                    .map_err(Error::from)?;
                value
                    .to_u8()
                    .ok_or(Error::from(DecodeError::IntegerOverflow("u8")))
            })
            .await
            .copied()
    }

    pub async fn total_supply(&self) -> Result<BigInt, Error> {
        Ok(self.read("totalSupply", vec![]).await?.to_integer()?)
    }

    pub async fn balance_of(&self, account: &Address) -> Result<BigInt, Error> {
        Ok(self
            .read("balanceOf", vec![account.into()])
            .await?
            .to_integer()?)
    }

    /// How much `spender` may still spend from `owner`.
    pub async fn allowance(&self, owner: &Address, spender: &Address) -> Result<BigInt, Error> {
        Ok(self
            .read("allowance", vec![owner.into(), spender.into()])
            .await?
            .to_integer()?)
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Send `amount` from the client's signer to `to`.
    pub fn transfer(&self, to: &Address, amount: impl Into<BigInt>) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_as_signer("transfer", |from| {
            vec![from.into(), to.into(), amount.into()]
        })
    }

    /// Several transfers in one transaction. Every distinct `from` must sign,
    /// via [`InvokeBuilder::sign_with`].
    pub fn transfer_multi(&self, states: &[TransferState]) -> InvokeBuilder {
        let states = InvokeParam::list(states.iter().map(TransferState::to_param));
        self.invoke("transferMulti", vec![states])
    }

    /// Allow `spender` to spend up to `amount` of the client's signer's
    /// tokens.
    pub fn approve(&self, spender: &Address, amount: impl Into<BigInt>) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_as_signer("approve", |owner| {
            vec![owner.into(), spender.into(), amount.into()]
        })
    }

    /// Spend `amount` of `from`'s allowance to the client's signer.
    pub fn transfer_from(
        &self,
        from: &Address,
        to: &Address,
        amount: impl Into<BigInt>,
    ) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_as_signer("transferFrom", |spender| {
            vec![spender.into(), from.into(), to.into(), amount.into()]
        })
    }

    // ========================================================================
    // Multi-signature writes
    // ========================================================================

    /// Transfer from the M-of-N account over `signers`' keys. All of
    /// `signers` sign; at least `m` are required.
    pub fn multi_sign_transfer<S: Signer + 'static>(
        &self,
        m: usize,
        signers: Vec<S>,
        to: &Address,
        amount: impl Into<BigInt>,
    ) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_multi("transfer", m, signers, |from| {
            vec![from.into(), to.into(), amount.into()]
        })
    }

    pub fn multi_sign_approve<S: Signer + 'static>(
        &self,
        m: usize,
        signers: Vec<S>,
        spender: &Address,
        amount: impl Into<BigInt>,
    ) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_multi("approve", m, signers, |owner| {
            vec![owner.into(), spender.into(), amount.into()]
        })
    }

    pub fn multi_sign_transfer_from<S: Signer + 'static>(
        &self,
        m: usize,
        signers: Vec<S>,
        from: &Address,
        to: &Address,
        amount: impl Into<BigInt>,
    ) -> InvokeBuilder {
        let amount = amount.into();
        self.invoke_multi("transferFrom", m, signers, |spender| {
            vec![spender.into(), from.into(), to.into(), amount.into()]
        })
    }

    // ========================================================================
    // Events
    // ========================================================================

    /// Transfers this token recorded in the execution of `hash`. Empty while
    /// the transaction is unknown to the node.
    pub async fn fetch_tx_transfer_events(
        &self,
        hash: &TxHash,
    ) -> Result<Vec<Tep1TransferEvent>, Error> {
        let event = self.teovm.tesra().get_smart_contract_event(hash).await?;
        Ok(event
            .map(|event| self.transfer_events(&event))
            .unwrap_or_default())
    }

    /// Transfers this token recorded in the block at `height`.
    pub async fn fetch_block_transfer_events(
        &self,
        height: u32,
    ) -> Result<Vec<Tep1TransferEvent>, Error> {
        let events = self
            .teovm
            .tesra()
            .get_smart_contract_events_by_height(height)
            .await?;
        Ok(events
            .iter()
            .flat_map(|event| self.transfer_events(event))
            .collect())
    }

    /// Notifications from this contract that decode as transfers; others are
    /// skipped.
    fn transfer_events(&self, event: &SmartContractEvent) -> Vec<Tep1TransferEvent> {
        event
            .notify
            .iter()
            .filter(|notify| notify.contract() == Some(self.contract))
            .filter_map(|notify| match Tep1TransferEvent::from_notify(notify) {
                Ok(transfer) => Some(transfer),
                Err(e) => {
                    debug!(tx_hash = %event.tx_hash, error = %e, "skipping notification");
                    None
                }
            })
            .collect()
    }
}

impl std::fmt::Debug for Tep1 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Tep1")
            .field("contract", &self.contract)
            .field("decimals", &self.decimals.get())
            .finish()
    }
}
