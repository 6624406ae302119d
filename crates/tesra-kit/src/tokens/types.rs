//! Types for Tep1 token operations.

use std::fmt;

use num_bigint::BigInt;

use crate::error::DecodeError;
use crate::types::{Address, NotifyEventInfo};
use crate::vm::InvokeParam;

/// One leg of a Tep1 `transferMulti`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransferState {
    pub from: Address,
    pub to: Address,
    pub amount: BigInt,
}

impl TransferState {
    pub fn new(from: Address, to: Address, amount: impl Into<BigInt>) -> Self {
        Self {
            from,
            to,
            amount: amount.into(),
        }
    }

    pub(crate) fn to_param(&self) -> InvokeParam {
        InvokeParam::structure([
            InvokeParam::from(self.from),
            InvokeParam::from(self.to),
            InvokeParam::from(self.amount.clone()),
        ])
    }
}

/// A `transfer` notification raised by a Tep1 contract.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tep1TransferEvent {
    pub name: String,
    pub from: Address,
    pub to: Address,
    pub amount: BigInt,
}

impl Tep1TransferEvent {
    /// Decode notification states `[name, from, to, amount]`, each a hex
    /// string.
    pub fn from_notify(notify: &NotifyEventInfo) -> Result<Self, DecodeError> {
        let states = notify
            .states
            .as_array()
            .ok_or_else(|| DecodeError::TypeMismatch {
                expected: "state array",
                found: notify.states.to_string(),
            })?;
        let [name, from, to, amount] = states.as_slice() else {
            return Err(DecodeError::TypeMismatch {
                expected: "4 states",
                found: format!("{} states", states.len()),
            });
        };

        let name = String::from_utf8(hex_state(name)?).map_err(|e| DecodeError::TypeMismatch {
            expected: "utf-8 event name",
            found: e.to_string(),
        })?;
        Ok(Self {
            name,
            from: Address::try_from(hex_state(from)?.as_slice())?,
            to: Address::try_from(hex_state(to)?.as_slice())?,
            amount: BigInt::from_signed_bytes_le(&hex_state(amount)?),
        })
    }
}

fn hex_state(value: &serde_json::Value) -> Result<Vec<u8>, DecodeError> {
    let s = value.as_str().ok_or_else(|| DecodeError::TypeMismatch {
        expected: "hex string",
        found: value.to_string(),
    })?;
    hex::decode(s).map_err(|e| DecodeError::InvalidHex(format!("{s:?}: {e}")))
}

impl fmt::Display for Tep1TransferEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "name {}, from {}, to {}, amount {}",
            self.name, self.from, self.to, self.amount
        )
    }
}
