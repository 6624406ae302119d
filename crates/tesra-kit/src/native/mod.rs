//! Native contracts.
//!
//! Native contracts live at fixed addresses and are invoked through the
//! `Ontology.Native.Invoke` syscall. [`NativeContract`] is the raw
//! dispatcher; the typed wrappers build on it:
//!
//! - [`NativeToken`] / [`Tsg`]: the TSR and TSG tokens
//! - [`TsrId`]: decentralized identities
//! - [`GlobalParams`]: chain-wide parameters
//! - [`Auth`]: role-based authorization of contract functions
//!
//! ```rust,no_run
//! # use tesra_kit::*;
//! # async fn example(tesra: Tesra, to: Address) -> Result<(), Error> {
//! let balance = tesra.tsr().balance_of(&to).await?;
//! let hash = tesra.tsg().transfer(&to, 1_000_000_000).await?;
//! # Ok(())
//! # }
//! ```

mod auth;
mod global_params;
mod identity;
mod payload;
mod token;

pub use auth::Auth;
pub use global_params::GlobalParams;
pub use identity::{Ddo, DdoAttribute, DdoOwner, TsrId};
pub use payload::{
    DecodedPayload, PayloadParam, StateInfo, TransferFromInfo, parse_native_tx_payload,
    parse_payload,
};
pub use token::{NativeToken, Tsg};

use tracing::debug;

use crate::client::{GasSettings, InvokeBuilder, Tesra};
use crate::error::{EncodeError, Error};
use crate::types::{Address, PreExecResult, ResultItem, Transaction};
use crate::vm::{InvokeParam, build_native_invoke_code};

pub const TSR_CONTRACT: Address = Address::native(1);
pub const TSG_CONTRACT: Address = Address::native(2);
pub const TSR_ID_CONTRACT: Address = Address::native(3);
pub const GLOBAL_PARAMS_CONTRACT: Address = Address::native(4);
pub const AUTH_CONTRACT: Address = Address::native(6);
pub const GOVERNANCE_CONTRACT: Address = Address::native(7);

/// Version byte every native invocation carries.
pub const NATIVE_CONTRACT_VERSION: u8 = 0;

/// One native method invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NativeCall {
    pub contract: Address,
    pub version: u8,
    pub method: String,
    /// Top-level arguments, in declaration order.
    pub params: Vec<InvokeParam>,
}

impl NativeCall {
    pub fn new(contract: Address, method: impl Into<String>, params: Vec<InvokeParam>) -> Self {
        Self {
            contract,
            version: NATIVE_CONTRACT_VERSION,
            method: method.into(),
            params,
        }
    }

    pub fn with_version(mut self, version: u8) -> Self {
        self.version = version;
        self
    }

    /// The invocation script.
    pub fn encode(&self) -> Result<Vec<u8>, EncodeError> {
        build_native_invoke_code(&self.contract, self.version, &self.method, &self.params)
    }
}

/// Raw access to native contracts.
#[derive(Clone, Debug)]
pub struct NativeContract {
    tesra: Tesra,
}

impl NativeContract {
    pub(crate) fn new(tesra: Tesra) -> Self {
        Self { tesra }
    }

    pub fn tesra(&self) -> &Tesra {
        &self.tesra
    }

    /// An unsigned transaction carrying `call`.
    pub fn new_native_invoke_transaction(
        &self,
        gas: GasSettings,
        call: &NativeCall,
    ) -> Result<Transaction, Error> {
        Ok(self.tesra.new_invoke_transaction(gas, call.encode()?))
    }

    /// Builder that signs and submits `call`.
    pub fn invoke(&self, call: NativeCall) -> InvokeBuilder {
        self.invoke_with(Ok(call))
    }

    /// Like [`invoke`](Self::invoke), deferring an error in assembling the
    /// call until the builder is consumed.
    pub(crate) fn invoke_with(&self, call: Result<NativeCall, Error>) -> InvokeBuilder {
        let code = call.and_then(|call| call.encode().map_err(Error::from));
        InvokeBuilder::new(self.tesra.clone(), code)
    }

    /// Dry-run `call` on the node. The result is returned whatever the
    /// execution state.
    pub async fn pre_exec_invoke(&self, call: NativeCall) -> Result<PreExecResult, Error> {
        let tx = self.new_native_invoke_transaction(GasSettings::ZERO, &call)?;
        self.tesra.pre_exec_transaction(&tx).await
    }

    /// Dry-run a read-only method and return its value.
    pub(crate) async fn read(&self, call: NativeCall) -> Result<ResultItem, Error> {
        let method = call.method.clone();
        let result = self.pre_exec_invoke(call).await?;
        if !result.is_success() {
            debug!(method = %method, state = result.state, "native read failed");
            return Err(Error::PreExecFailed {
                method,
                state: result.state,
                gas: result.gas,
            });
        }
        Ok(result.result)
    }
}


#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::test_utils::*;
    use super::*;
    use crate::client::mock::MockTransport;

    // ========================================================================
    // NativeCall
    // ========================================================================

    #[test]
    fn test_native_addresses() {
        assert_eq!(
            hex::encode(TSG_CONTRACT.as_bytes()),
            "0000000000000000000000000000000000000002"
        );
        assert_eq!(TSR_ID_CONTRACT.as_bytes()[19], 3);
        assert_eq!(GOVERNANCE_CONTRACT.as_bytes()[19], 7);
    }

    #[test]
    fn test_empty_call_pushes_empty_string() {
        let code = NativeCall::new(GLOBAL_PARAMS_CONTRACT, "createSnapshot", vec![])
            .encode()
            .unwrap();
        let decoded = parse_payload(&code).unwrap();
        assert_eq!(decoded.function_name, "createSnapshot");
        assert_eq!(decoded.contract, GLOBAL_PARAMS_CONTRACT);
        match decoded.param {
            PayloadParam::Raw(items) => {
                assert_eq!(items, vec![crate::vm::StackItem::Bytes(vec![])]);
            }
            other => panic!("unexpected param: {other:?}"),
        }
    }

    #[test]
    fn test_call_version_is_encoded() {
        let code = NativeCall::new(TSR_CONTRACT, "name", vec![])
            .with_version(1)
            .encode()
            .unwrap();
        assert_eq!(parse_payload(&code).unwrap().version, 1);
    }

    // ========================================================================
    // Dispatch
    // ========================================================================

    #[tokio::test]
    async fn test_read_reports_failed_pre_exec() {
        let (tesra, _, _) = signed_client(MockTransport::builder().with_sequence(
            "sendrawtransaction",
            [json!({"State": 0, "Gas": 20000, "Result": "", "Notify": []})],
        ));
        let err = tesra
            .native()
            .read(NativeCall::new(TSR_CONTRACT, "name", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::PreExecFailed { state: 0, .. }));
    }

    #[tokio::test]
    async fn test_pre_exec_uses_zero_gas() {
        let mock = std::sync::Arc::new(
            MockTransport::builder()
                .with_response("sendrawtransaction", pre_exec_ok(json!("01")))
                .build(),
        );
        let tesra = Tesra::local().transport(mock.clone()).build();
        let result = tesra
            .native()
            .pre_exec_invoke(NativeCall::new(TSR_CONTRACT, "decimals", vec![]))
            .await
            .unwrap();
        assert!(result.is_success());

        let (_, params) = &mock.calls()[0];
        assert_eq!(params[1], json!(1));
        let tx = Transaction::from_hex(params[0].as_str().unwrap()).unwrap();
        assert_eq!((tx.gas_price, tx.gas_limit), (0, 0));
        assert!(tx.sigs.is_empty());
    }

    #[tokio::test]
    async fn test_invoke_with_defers_error() {
        let (tesra, _, mock) = signed_client(MockTransport::builder());
        let err = tesra
            .native()
            .invoke_with(Err(Error::NoSigner))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoSigner));
        assert!(mock.calls().is_empty());
    }
}
