//! The TSR and TSG native tokens.

use std::ops::Deref;

use num_traits::ToPrimitive;

use super::payload::{StateInfo, TransferFromInfo};
use super::{NativeCall, NativeContract, TSG_CONTRACT, TSR_CONTRACT};
use crate::client::{GasSettings, InvokeBuilder};
use crate::error::{DecodeError, Error};
use crate::types::{Address, Transaction};
use crate::vm::InvokeParam;

/// A native token contract.
///
/// Writes default to the client's signer as the owner of the funds. To move
/// another account's funds, build the call with
/// [`multi_transfer`](Self::multi_transfer) and add that account with
/// [`InvokeBuilder::sign_with`].
#[derive(Clone, Debug)]
pub struct NativeToken {
    native: NativeContract,
    contract: Address,
}

impl NativeToken {
    pub(crate) fn tsr(native: NativeContract) -> Self {
        Self {
            native,
            contract: TSR_CONTRACT,
        }
    }

    pub(crate) fn tsg(native: NativeContract) -> Self {
        Self {
            native,
            contract: TSG_CONTRACT,
        }
    }

    pub fn contract(&self) -> &Address {
        &self.contract
    }

    fn call(&self, method: &str, params: Vec<InvokeParam>) -> NativeCall {
        NativeCall::new(self.contract, method, params)
    }

    fn transfer_call(&self, states: &[StateInfo]) -> NativeCall {
        let states = InvokeParam::list(states.iter().map(StateInfo::to_param));
        self.call("transfer", vec![states])
    }

    fn transfer_from_call(&self, info: &TransferFromInfo) -> NativeCall {
        self.call("transferFrom", vec![info.to_param()])
    }

    fn approve_call(&self, state: &StateInfo) -> NativeCall {
        self.call("approve", vec![state.to_param()])
    }

    fn own_address(&self) -> Result<Address, Error> {
        self.native.tesra().signer_address()
    }

    // ========================================================================
    // Transactions
    // ========================================================================

    pub fn new_transfer_transaction(
        &self,
        gas: GasSettings,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Transaction, Error> {
        self.new_multi_transfer_transaction(gas, &[StateInfo::new(*from, *to, amount)])
    }

    /// One transaction moving every state at once. Each distinct `from` must
    /// sign.
    pub fn new_multi_transfer_transaction(
        &self,
        gas: GasSettings,
        states: &[StateInfo],
    ) -> Result<Transaction, Error> {
        self.native
            .new_native_invoke_transaction(gas, &self.transfer_call(states))
    }

    pub fn new_transfer_from_transaction(
        &self,
        gas: GasSettings,
        sender: &Address,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Transaction, Error> {
        let info = TransferFromInfo {
            sender: *sender,
            from: *from,
            to: *to,
            value: amount,
        };
        self.native
            .new_native_invoke_transaction(gas, &self.transfer_from_call(&info))
    }

    pub fn new_approve_transaction(
        &self,
        gas: GasSettings,
        from: &Address,
        to: &Address,
        amount: u64,
    ) -> Result<Transaction, Error> {
        self.native
            .new_native_invoke_transaction(gas, &self.approve_call(&StateInfo::new(*from, *to, amount)))
    }

    // ========================================================================
    // Writes
    // ========================================================================

    /// Send `amount` from the client's signer to `to`.
    pub fn transfer(&self, to: &Address, amount: u64) -> InvokeBuilder {
        let call = self
            .own_address()
            .map(|from| self.transfer_call(&[StateInfo::new(from, *to, amount)]));
        self.native.invoke_with(call)
    }

    /// Several movements in one transaction. Signers for each `from` other
    /// than the client's signer must be added to the returned builder.
    pub fn multi_transfer(&self, states: &[StateInfo]) -> InvokeBuilder {
        self.native.invoke(self.transfer_call(states))
    }

    /// Spend `amount` of `from`'s allowance to the client's signer.
    pub fn transfer_from(&self, from: &Address, to: &Address, amount: u64) -> InvokeBuilder {
        let call = self.own_address().map(|sender| {
            self.transfer_from_call(&TransferFromInfo {
                sender,
                from: *from,
                to: *to,
                value: amount,
            })
        });
        self.native.invoke_with(call)
    }

    /// Allow `to` to spend up to `amount` of the client's signer's funds.
    pub fn approve(&self, to: &Address, amount: u64) -> InvokeBuilder {
        let call = self
            .own_address()
            .map(|from| self.approve_call(&StateInfo::new(from, *to, amount)));
        self.native.invoke_with(call)
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn balance_of(&self, address: &Address) -> Result<u64, Error> {
        let result = self
            .native
            .read(self.call("balanceOf", vec![address.into()]))
            .await?;
        Ok(result.to_u64()?)
    }

    /// How much `to` may still spend from `from`.
    pub async fn allowance(&self, from: &Address, to: &Address) -> Result<u64, Error> {
        let param = InvokeParam::structure([*from, *to]);
        let result = self.native.read(self.call("allowance", vec![param])).await?;
        Ok(result.to_u64()?)
    }

    pub async fn name(&self) -> Result<String, Error> {
        let result = self.native.read(self.call("name", vec![])).await?;
        Ok(result.to_string()?)
    }

    pub async fn symbol(&self) -> Result<String, Error> {
        let result = self.native.read(self.call("symbol", vec![])).await?;
        Ok(result.to_string()?)
    }

    pub async fn decimals(&self) -> Result<u8, Error> {
        let result = self.native.read(self.call("decimals", vec![])).await?;
        Ok(result
            .to_integer()?
            .to_u8()
            .ok_or(DecodeError::IntegerOverflow("u8"))?)
    }

    pub async fn total_supply(&self) -> Result<u64, Error> {
        let result = self.native.read(self.call("totalSupply", vec![])).await?;
        Ok(result.to_u64()?)
    }
}

/// The TSG gas token.
///
/// Holding TSR accrues TSG, which sits as an allowance from the TSR contract
/// until withdrawn.
#[derive(Clone, Debug)]
pub struct Tsg {
    token: NativeToken,
}

impl Tsg {
    pub(crate) fn new(native: NativeContract) -> Self {
        Self {
            token: NativeToken::tsg(native),
        }
    }

    /// TSG accrued by `address` and not yet withdrawn.
    pub async fn unbound_tsg(&self, address: &Address) -> Result<u64, Error> {
        self.token.allowance(&TSR_CONTRACT, address).await
    }

    /// Withdraw `amount` of accrued TSG to the client's signer.
    pub fn withdraw_tsg(&self, amount: u64) -> InvokeBuilder {
        let call = self.token.own_address().map(|address| {
            self.token.transfer_from_call(&TransferFromInfo {
                sender: address,
                from: TSR_CONTRACT,
                to: address,
                value: amount,
            })
        });
        self.token.native.invoke_with(call)
    }

    pub fn new_withdraw_tsg_transaction(
        &self,
        gas: GasSettings,
        address: &Address,
        amount: u64,
    ) -> Result<Transaction, Error> {
        self.token
            .new_transfer_from_transaction(gas, address, &TSR_CONTRACT, address, amount)
    }
}

impl Deref for Tsg {
    type Target = NativeToken;

    fn deref(&self) -> &NativeToken {
        &self.token
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::mock::MockTransport;
    use crate::client::{Account, Tesra};
    use crate::native::PayloadParam;
    use crate::native::test_utils::*;
    use crate::types::KeyType;

    // ========================================================================
    // Writes
    // ========================================================================

    #[tokio::test]
    async fn test_transfer_signed_by_sender() {
        let (tesra, account, mock) = signed_client(MockTransport::builder());
        let to = Address::native(9);

        tesra.tsr().transfer(&to, 100).await.unwrap();

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.contract, TSR_CONTRACT);
        assert_eq!(
            payload.param,
            PayloadParam::Transfer(vec![StateInfo::new(address_of(&account), to, 100)])
        );
        let tx = sent_transaction(&mock, "sendrawtransaction", 0);
        assert_eq!(tx.signer_addresses().unwrap(), vec![address_of(&account)]);
    }

    #[tokio::test]
    async fn test_transfer_without_signer() {
        let tesra = Tesra::testnet().build();
        let err = tesra.tsr().transfer(&Address::native(9), 1).await.unwrap_err();
        assert!(matches!(err, Error::NoSigner));
    }

    #[tokio::test]
    async fn test_multi_transfer_with_extra_signer() {
        let (tesra, account, mock) = signed_client(MockTransport::builder());
        let other = Account::random(KeyType::Ed25519).unwrap();
        let states = [
            StateInfo::new(address_of(&account), Address::native(9), 1),
            StateInfo::new(address_of(&other), Address::native(9), 2),
        ];

        tesra
            .tsg()
            .multi_transfer(&states)
            .sign_with(account.clone())
            .sign_with(other.clone())
            .await
            .unwrap();

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.contract, TSG_CONTRACT);
        assert_eq!(payload.param, PayloadParam::Transfer(states.to_vec()));
        let tx = sent_transaction(&mock, "sendrawtransaction", 0);
        assert_eq!(tx.sigs.len(), 2);
        assert!(tx.verify_signatures());
    }

    #[tokio::test]
    async fn test_approve_and_transfer_from() {
        let (tesra, account, mock) = signed_client(MockTransport::builder());
        let owner = Address::native(8);
        let to = Address::native(9);

        tesra.tsr().approve(&to, 5).await.unwrap();
        tesra.tsr().transfer_from(&owner, &to, 5).await.unwrap();

        assert_eq!(
            sent_payload(&mock, "sendrawtransaction", 0).param,
            PayloadParam::Approve(StateInfo::new(address_of(&account), to, 5))
        );
        assert_eq!(
            sent_payload(&mock, "sendrawtransaction", 1).param,
            PayloadParam::TransferFrom(TransferFromInfo {
                sender: address_of(&account),
                from: owner,
                to,
                value: 5,
            })
        );
    }

    #[tokio::test]
    async fn test_withdraw_tsg() {
        let (tesra, account, mock) = signed_client(MockTransport::builder());
        tesra.tsg().withdraw_tsg(42).await.unwrap();

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.contract, TSG_CONTRACT);
        assert_eq!(
            payload.param,
            PayloadParam::TransferFrom(TransferFromInfo {
                sender: address_of(&account),
                from: TSR_CONTRACT,
                to: address_of(&account),
                value: 42,
            })
        );
    }

    #[test]
    fn test_offline_transfer_transaction() {
        let tesra = Tesra::testnet().build();
        let from = Address::native(8);
        let tx = tesra
            .tsr()
            .new_transfer_transaction(GasSettings::new(2500, 20000), &from, &Address::native(9), 7)
            .unwrap();
        assert_eq!(tx.gas_price, 2500);
        assert_eq!(tx.payer, Address::ZERO);
        assert!(tx.sigs.is_empty());
    }

    // ========================================================================
    // Reads
    // ========================================================================

    #[tokio::test]
    async fn test_balance_of() {
        let (tesra, _, mock) = signed_client(
            MockTransport::builder()
                .with_sequence("sendrawtransaction", [pre_exec_ok(json!("00ca9a3b"))]),
        );
        let who = Address::native(9);
        assert_eq!(tesra.tsr().balance_of(&who).await.unwrap(), 1_000_000_000);

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.function_name, "balanceOf");
        assert_eq!(
            payload.param,
            PayloadParam::Raw(vec![crate::vm::StackItem::Bytes(who.to_vec())])
        );
    }

    #[tokio::test]
    async fn test_metadata_reads() {
        let (tesra, _, _) = signed_client(MockTransport::builder().with_sequence(
            "sendrawtransaction",
            [
                pre_exec_ok(json!(hex::encode("TSR Token"))),
                pre_exec_ok(json!(hex::encode("TSR"))),
                pre_exec_ok(json!("09")),
                pre_exec_ok(json!("00ca9a3b")),
            ],
        ));
        let tsr = tesra.tsr();
        assert_eq!(tsr.name().await.unwrap(), "TSR Token");
        assert_eq!(tsr.symbol().await.unwrap(), "TSR");
        assert_eq!(tsr.decimals().await.unwrap(), 9);
        assert_eq!(tsr.total_supply().await.unwrap(), 1_000_000_000);
    }

    #[tokio::test]
    async fn test_unbound_tsg_reads_allowance_from_tsr() {
        let (tesra, account, mock) = signed_client(
            MockTransport::builder().with_sequence("sendrawtransaction", [pre_exec_ok(json!("e803"))]),
        );
        assert_eq!(
            tesra.tsg().unbound_tsg(&address_of(&account)).await.unwrap(),
            1000
        );

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.contract, TSG_CONTRACT);
        assert_eq!(payload.function_name, "allowance");
    }
}
