//! Decoding native-contract invocations back into typed calls.
//!
//! Accepts scripts built by this crate and by the other SDKs, which differ
//! in how they lay out struct fields (see [`crate::vm::replay`]).

use num_traits::ToPrimitive;

use super::{TSG_CONTRACT, TSR_CONTRACT};
use crate::error::DecodeError;
use crate::types::{Address, Transaction};
use crate::vm::{CallTarget, InvokeParam, NATIVE_INVOKE_NAME, ReplayedScript, StackItem, replay};

/// A token movement: `value` units from `from` to `to`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct StateInfo {
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

impl StateInfo {
    pub fn new(from: Address, to: Address, value: u64) -> Self {
        Self { from, to, value }
    }

    pub(crate) fn to_param(&self) -> InvokeParam {
        InvokeParam::structure([
            InvokeParam::from(self.from),
            InvokeParam::from(self.to),
            InvokeParam::from(self.value),
        ])
    }

    fn from_item(item: &StackItem) -> Result<Self, DecodeError> {
        let [from, to, value] = fields(item)?;
        Ok(Self {
            from: from.to_address()?,
            to: to.to_address()?,
            value: value.to_u64()?,
        })
    }
}

/// A delegated movement: `sender` spends `value` of `from`'s allowance.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TransferFromInfo {
    pub sender: Address,
    pub from: Address,
    pub to: Address,
    pub value: u64,
}

impl TransferFromInfo {
    pub(crate) fn to_param(&self) -> InvokeParam {
        InvokeParam::structure([
            InvokeParam::from(self.sender),
            InvokeParam::from(self.from),
            InvokeParam::from(self.to),
            InvokeParam::from(self.value),
        ])
    }

    fn from_item(item: &StackItem) -> Result<Self, DecodeError> {
        let [sender, from, to, value] = fields(item)?;
        Ok(Self {
            sender: sender.to_address()?,
            from: from.to_address()?,
            to: to.to_address()?,
            value: value.to_u64()?,
        })
    }
}

/// Arguments of a decoded call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PayloadParam {
    Transfer(Vec<StateInfo>),
    TransferFrom(TransferFromInfo),
    Approve(StateInfo),
    /// Any other method: the arguments as replayed, in declaration order.
    Raw(Vec<StackItem>),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecodedPayload {
    pub function_name: String,
    pub contract: Address,
    pub version: u8,
    pub param: PayloadParam,
}

/// Exactly `N` fields of a struct.
fn fields<const N: usize>(item: &StackItem) -> Result<&[StackItem; N], DecodeError> {
    let items = item.as_items()?;
    items.try_into().map_err(|_| DecodeError::TypeMismatch {
        expected: "struct field count",
        found: format!("{} fields", items.len()),
    })
}

fn first_param(params: &[StackItem], method: &str) -> Result<StackItem, DecodeError> {
    params
        .first()
        .cloned()
        .ok_or_else(|| DecodeError::TypeMismatch {
            expected: "argument",
            found: format!("no arguments to {method}"),
        })
}

fn is_token_contract(contract: &Address) -> bool {
    *contract == TSR_CONTRACT || *contract == TSG_CONTRACT
}

/// Arguments of a call on TSR or TSG. Token methods with a malformed shape
/// are errors; any other method is kept raw.
fn token_param(method: &str, params: Vec<StackItem>) -> Result<PayloadParam, DecodeError> {
    Ok(match method {
        "transfer" => PayloadParam::Transfer(
            first_param(&params, method)?
                .as_items()?
                .iter()
                .map(StateInfo::from_item)
                .collect::<Result<_, _>>()?,
        ),
        "transferFrom" => {
            PayloadParam::TransferFrom(TransferFromInfo::from_item(&first_param(&params, method)?)?)
        }
        "approve" => PayloadParam::Approve(StateInfo::from_item(&first_param(&params, method)?)?),
        _ => PayloadParam::Raw(params),
    })
}

/// Decode a native invocation script.
///
/// Only TSR and TSG calls to `transfer`, `transferFrom` and `approve` decode
/// into typed arguments. Everything else, including same-named methods of
/// other native contracts, is returned as [`PayloadParam::Raw`].
pub fn parse_payload(code: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let ReplayedScript { mut stack, call } = replay(code)?;
    match call {
        Some(CallTarget::Syscall(name)) if name == NATIVE_INVOKE_NAME => {}
        _ => return Err(DecodeError::NotNativeInvoke),
    }

    let mut pop = || stack.pop().ok_or(DecodeError::StackUnderflow(code.len()));
    let version = pop()?
        .to_integer()?
        .to_u8()
        .ok_or(DecodeError::IntegerOverflow("u8"))?;
    let contract = pop()?.to_address()?;
    let function_name = pop()?.to_utf8()?;

    // Arguments are pushed last-first.
    stack.reverse();
    let param = if is_token_contract(&contract) {
        token_param(&function_name, stack)?
    } else {
        PayloadParam::Raw(stack)
    };

    Ok(DecodedPayload {
        function_name,
        contract,
        version,
        param,
    })
}

/// Decode the invocation carried by a serialized transaction.
pub fn parse_native_tx_payload(raw_tx: &[u8]) -> Result<DecodedPayload, DecodeError> {
    let tx = Transaction::from_bytes(raw_tx)?;
    match tx.payload.invoke_code() {
        Some(code) => parse_payload(code),
        None => Err(DecodeError::NotNativeInvoke),
    }
}
