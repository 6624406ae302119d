//! Role-based authorization of contract functions.
//!
//! A contract's admin (an identity) groups function names into roles and
//! assigns roles to other identities, who may in turn delegate them for a
//! limited period. `key_index` selects which of the acting identity's keys
//! the client's signer holds.

use crate::client::InvokeBuilder;
use crate::types::Address;
use crate::vm::InvokeParam;

use super::{AUTH_CONTRACT, NativeCall, NativeContract};

/// The authorization native contract.
#[derive(Clone, Debug)]
pub struct Auth {
    native: NativeContract,
}

impl Auth {
    pub(crate) fn new(native: NativeContract) -> Self {
        Self { native }
    }

    fn invoke(&self, method: &str, params: Vec<InvokeParam>) -> InvokeBuilder {
        self.native
            .invoke(NativeCall::new(AUTH_CONTRACT, method, params))
    }

    /// Grant `role` the right to call `funcs` on `contract`.
    pub fn assign_funcs_to_role(
        &self,
        contract: &Address,
        admin_id: &[u8],
        role: &[u8],
        funcs: &[&str],
        key_index: u32,
    ) -> InvokeBuilder {
        self.invoke(
            "assignFuncsToRole",
            vec![
                contract.into(),
                admin_id.into(),
                role.into(),
                InvokeParam::list(funcs.iter().copied()),
                key_index.into(),
            ],
        )
    }

    /// Lend `role` from `from` to `to` for `period` seconds. `level` bounds
    /// how far the role may be re-delegated.
    #[allow(clippy::too_many_arguments)]
    pub fn delegate(
        &self,
        contract: &Address,
        from: &[u8],
        to: &[u8],
        role: &[u8],
        period: u32,
        level: u32,
        key_index: u32,
    ) -> InvokeBuilder {
        self.invoke(
            "delegate",
            vec![
                contract.into(),
                from.into(),
                to.into(),
                role.into(),
                period.into(),
                level.into(),
                key_index.into(),
            ],
        )
    }

    /// Take back a delegated role.
    pub fn withdraw(
        &self,
        contract: &Address,
        initiator: &[u8],
        delegate: &[u8],
        role: &[u8],
        key_index: u32,
    ) -> InvokeBuilder {
        self.invoke(
            "withdraw",
            vec![
                contract.into(),
                initiator.into(),
                delegate.into(),
                role.into(),
                key_index.into(),
            ],
        )
    }

    /// Give `role` to each identity in `persons`.
    pub fn assign_ids_to_role<P: AsRef<[u8]>>(
        &self,
        contract: &Address,
        admin_id: &[u8],
        role: &[u8],
        persons: &[P],
        key_index: u32,
    ) -> InvokeBuilder {
        self.invoke(
            "assignTesraIDsToRole",
            vec![
                contract.into(),
                admin_id.into(),
                role.into(),
                InvokeParam::list(persons.iter().map(|p| p.as_ref())),
                key_index.into(),
            ],
        )
    }

    /// Hand admin rights over `contract` to another identity.
    pub fn transfer(&self, contract: &Address, new_admin_id: &[u8], key_index: u32) -> InvokeBuilder {
        self.invoke(
            "transfer",
            vec![contract.into(), new_admin_id.into(), key_index.into()],
        )
    }

    /// Check that `caller` may call `func_name` on `contract`.
    pub fn verify_token(
        &self,
        contract: &Address,
        caller: &[u8],
        func_name: &str,
        key_index: u32,
    ) -> InvokeBuilder {
        self.invoke(
            "verifyToken",
            vec![contract.into(), caller.into(), func_name.into(), key_index.into()],
        )
    }
}
