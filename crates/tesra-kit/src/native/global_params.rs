//! Chain-wide parameters such as the minimum gas price.

use std::collections::BTreeMap;

use crate::client::InvokeBuilder;
use crate::codec::Source;
use crate::error::{DecodeError, Error};
use crate::types::Address;
use crate::vm::InvokeParam;

use super::{GLOBAL_PARAMS_CONTRACT, NativeCall, NativeContract};

/// Name/value pairs as the contract serializes them.
fn parse_params(data: &[u8]) -> Result<Vec<(String, String)>, DecodeError> {
    let mut source = Source::new(data);
    let count = source.read_var_uint()?;
    let mut params = Vec::new();
    for _ in 0..count {
        let key = source.read_var_str()?;
        let value = source.read_var_str()?;
        params.push((key, value));
    }
    Ok(params)
}

/// The global parameters native contract.
///
/// Writes are restricted to the contract's operator or admin; the node
/// rejects them from anyone else.
#[derive(Clone, Debug)]
pub struct GlobalParams {
    native: NativeContract,
}

impl GlobalParams {
    pub(crate) fn new(native: NativeContract) -> Self {
        Self { native }
    }

    fn call(method: &str, params: Vec<InvokeParam>) -> NativeCall {
        NativeCall::new(GLOBAL_PARAMS_CONTRACT, method, params)
    }

    /// Current values of the named parameters. Names the chain does not know
    /// are absent from the result.
    pub async fn get_global_params(&self, names: &[&str]) -> Result<BTreeMap<String, String>, Error> {
        let call = Self::call(
            "getGlobalParam",
            vec![InvokeParam::list(names.iter().copied())],
        );
        let result = self.native.read(call).await?;
        let params = parse_params(&result.to_byte_array()?)?;
        Ok(params
            .into_iter()
            .filter(|(key, _)| names.contains(&key.as_str()))
            .collect())
    }

    /// Set parameters, applied in the given order.
    pub fn set_global_params<I, K, V>(&self, params: I) -> InvokeBuilder
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let params = InvokeParam::list(params.into_iter().map(|(key, value)| {
            InvokeParam::structure([InvokeParam::String(key.into()), InvokeParam::String(value.into())])
        }));
        self.native.invoke(Self::call("setGlobalParam", vec![params]))
    }

    /// Nominate a new admin. Takes effect once they call
    /// [`accept_admin`](Self::accept_admin).
    pub fn transfer_admin(&self, new_admin: &Address) -> InvokeBuilder {
        self.native
            .invoke(Self::call("transferAdmin", vec![new_admin.into()]))
    }

    /// Accept a pending admin nomination for the client's signer.
    pub fn accept_admin(&self) -> InvokeBuilder {
        let call = self
            .native
            .tesra()
            .signer_address()
            .map(|address| Self::call("acceptAdmin", vec![address.into()]));
        self.native.invoke_with(call)
    }

    pub fn set_operator(&self, operator: &Address) -> InvokeBuilder {
        self.native
            .invoke(Self::call("setOperator", vec![operator.into()]))
    }

    /// Snapshot the current parameters so changes apply from the next
    /// block.
    pub fn create_snapshot(&self) -> InvokeBuilder {
        self.native.invoke(Self::call("createSnapshot", vec![]))
    }
}
