//! Deployed TeoVM contracts.
//!
//! A TeoVM contract is called with a method name and a list of arguments:
//!
//! ```rust,no_run
//! # use tesra_kit::*;
//! # async fn example(tesra: &Tesra, contract: Address, to: Address) -> Result<(), Error> {
//! let teovm = tesra.teovm();
//!
//! // Read
//! let result = teovm.pre_exec(&contract, "balanceOf", vec![to.into()]).await?;
//! let balance = result.result.to_integer()?;
//!
//! // Write
//! let hash = teovm
//!     .invoke(&contract, "transfer", vec![tesra.signer_address()?.into(), to.into(), 10u64.into()])
//!     .await?;
//! # Ok(())
//! # }
//! ```

use crate::client::{GasSettings, InvokeBuilder, Tesra};
use crate::error::Error;
use crate::types::{Address, DeployCode, PreExecResult, Transaction, VmType};
use crate::vm::{InvokeParam, build_teovm_invoke_code};

/// Contract metadata for [`TeoVmContract::deploy`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ContractMetadata {
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

/// Deploy and call TeoVM contracts.
#[derive(Clone, Debug)]
pub struct TeoVmContract {
    tesra: Tesra,
}

impl TeoVmContract {
    pub(crate) fn new(tesra: Tesra) -> Self {
        Self { tesra }
    }

    pub fn tesra(&self) -> &Tesra {
        &self.tesra
    }

    /// An unsigned transaction calling `method` on `contract`.
    pub fn new_invoke_transaction(
        &self,
        gas: GasSettings,
        contract: &Address,
        method: &str,
        args: &[InvokeParam],
    ) -> Result<Transaction, Error> {
        let code = build_teovm_invoke_code(contract, method, args)?;
        Ok(self.tesra.new_invoke_transaction(gas, code))
    }

    /// Builder that signs and submits a call to `method`.
    pub fn invoke(&self, contract: &Address, method: &str, args: Vec<InvokeParam>) -> InvokeBuilder {
        let code = build_teovm_invoke_code(contract, method, &args).map_err(Error::from);
        InvokeBuilder::new(self.tesra.clone(), code)
    }

    /// Dry-run a call. The result is returned whatever the execution state.
    pub async fn pre_exec(
        &self,
        contract: &Address,
        method: &str,
        args: Vec<InvokeParam>,
    ) -> Result<PreExecResult, Error> {
        let tx = self.new_invoke_transaction(GasSettings::ZERO, contract, method, &args)?;
        self.tesra.pre_exec_transaction(&tx).await
    }

    /// An unsigned deployment of `code`.
    pub fn new_deploy_transaction(
        &self,
        gas: GasSettings,
        code: Vec<u8>,
        metadata: ContractMetadata,
    ) -> Transaction {
        self.tesra.new_deploy_transaction(gas, deploy_code(code, metadata))
    }

    /// Builder that signs and submits a deployment of `code`. The contract's
    /// address is [`Address::from_program`] of the code.
    pub fn deploy(&self, code: Vec<u8>, metadata: ContractMetadata) -> InvokeBuilder {
        InvokeBuilder::deploy(self.tesra.clone(), deploy_code(code, metadata))
    }
}

fn deploy_code(code: Vec<u8>, metadata: ContractMetadata) -> DeployCode {
    DeployCode {
        code,
        vm_type: VmType::TeoVm,
        name: metadata.name,
        version: metadata.version,
        author: metadata.author,
        email: metadata.email,
        description: metadata.description,
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;

    use super::*;
    use crate::client::mock::{MockTransport, MockTransportBuilder};
    use crate::client::{Account, Signer};
    use crate::types::{KeyType, Payload, TxHash};
    use crate::vm::{CallTarget, StackItem, replay};

    fn client(mock: MockTransportBuilder) -> (Tesra, Account, Arc<MockTransport>) {
        let account = Account::random(KeyType::P256).unwrap();
        let mock = Arc::new(mock.build());
        let tesra = Tesra::local()
            .transport(mock.clone())
            .signer(account.clone())
            .build();
        (tesra, account, mock)
    }

    fn submitted(mock: &MockTransport, index: usize) -> Transaction {
        let raw = mock.calls()[index].1[0].as_str().unwrap().to_string();
        Transaction::from_hex(&raw).unwrap()
    }

    // ========================================================================
    // Invocation
    // ========================================================================

    #[tokio::test]
    async fn test_invoke_targets_contract() {
        let contract = Address::native(0x42);
        let (tesra, account, mock) = client(MockTransport::builder().with_response(
            "sendrawtransaction",
            json!(TxHash::hash(b"x").to_string()),
        ));

        tesra
            .teovm()
            .invoke(&contract, "transfer", vec![(*account.address()).into(), 10u64.into()])
            .await
            .unwrap();

        let tx = submitted(&mock, 0);
        let replayed = replay(tx.payload.invoke_code().unwrap()).unwrap();
        assert_eq!(replayed.call, Some(CallTarget::AppCall(contract)));
        assert_eq!(
            replayed.stack,
            vec![
                StackItem::Array(vec![
                    StackItem::Bytes(account.address().to_vec()),
                    StackItem::Integer(10.into()),
                ]),
                StackItem::Bytes(b"transfer".to_vec()),
            ]
        );
        assert_eq!(tx.payer, *account.address());
    }

    #[tokio::test]
    async fn test_pre_exec_is_unsigned() {
        let (tesra, _, mock) = client(MockTransport::builder().with_response(
            "sendrawtransaction",
            json!({"State": 1, "Gas": 20000, "Result": "0a", "Notify": []}),
        ));
        let result = tesra
            .teovm()
            .pre_exec(&Address::native(0x42), "decimals", vec![])
            .await
            .unwrap();
        assert_eq!(result.result.to_u64().unwrap(), 10);
        assert!(submitted(&mock, 0).sigs.is_empty());
    }

    // ========================================================================
    // Deployment
    // ========================================================================

    #[tokio::test]
    async fn test_deploy_submits_signed_deploy() {
        let (tesra, account, mock) = client(MockTransport::builder().with_response(
            "sendrawtransaction",
            json!(TxHash::hash(b"x").to_string()),
        ));
        let code = vec![0x00, 0xc5, 0x6b, 0x66];
        let metadata = ContractMetadata {
            name: "demo".to_string(),
            version: "1.0".to_string(),
            ..Default::default()
        };

        tesra
            .teovm()
            .deploy(code.clone(), metadata)
            .gas_limit(20_000_000)
            .await
            .unwrap();

        let tx = submitted(&mock, 0);
        assert_eq!(tx.gas_limit, 20_000_000);
        assert_eq!(tx.signer_addresses().unwrap(), vec![*account.address()]);
        match tx.payload {
            Payload::Deploy(deploy) => {
                assert_eq!(deploy.code, code);
                assert_eq!(deploy.vm_type, VmType::TeoVm);
                assert_eq!(deploy.name, "demo");
                assert_eq!(deploy.address(), Address::from_program(&code));
            }
            other => panic!("unexpected payload: {other:?}"),
        }
    }

    #[test]
    fn test_offline_deploy_transaction() {
        let tesra = Tesra::testnet().build();
        let tx = tesra.teovm().new_deploy_transaction(
            GasSettings::new(500, 20_000_000),
            vec![0x51],
            ContractMetadata::default(),
        );
        assert!(matches!(tx.payload, Payload::Deploy(_)));
        assert!(tx.sigs.is_empty());
    }
}
