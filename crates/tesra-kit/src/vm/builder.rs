//! Invocation script construction.

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::{InvokeParam, OpCode};
use crate::error::EncodeError;
use crate::types::Address;

/// Syscall name that routes an invocation to a native contract.
pub const NATIVE_INVOKE_NAME: &str = "Ontology.Native.Invoke";

/// Helps construct invocation scripts programmatically.
#[derive(Debug, Default, Clone)]
pub struct ScriptBuilder {
    script: Vec<u8>,
}

impl ScriptBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emits a single opcode.
    pub fn emit(&mut self, op: OpCode) -> &mut Self {
        self.script.push(op as u8);
        self
    }

    /// Emits raw bytes without a length prefix.
    pub fn emit_raw(&mut self, bytes: &[u8]) -> &mut Self {
        self.script.extend_from_slice(bytes);
        self
    }

    /// Pushes a byte string using the shortest length-prefixed form.
    pub fn push_bytes(&mut self, data: &[u8]) -> Result<&mut Self, EncodeError> {
        let len = data.len();
        if len == 0 {
            self.emit(OpCode::PUSH0);
        } else if len <= OpCode::PUSHBYTES75 as usize {
            self.script.push(len as u8);
        } else if len <= 0xFF {
            self.emit(OpCode::PUSHDATA1);
            self.script.push(len as u8);
        } else if len <= 0xFFFF {
            self.emit(OpCode::PUSHDATA2);
            self.script.extend_from_slice(&(len as u16).to_le_bytes());
        } else {
            let len = u32::try_from(len).map_err(|_| {
                EncodeError::UnsupportedParameterType(format!("{len}-byte push"))
            })?;
            self.emit(OpCode::PUSHDATA4);
            self.script.extend_from_slice(&len.to_le_bytes());
        }
        self.script.extend_from_slice(data);
        Ok(self)
    }

    /// Pushes an integer: small values use the dedicated opcodes, anything
    /// else its minimal little-endian two's-complement bytes.
    pub fn push_int(&mut self, value: &BigInt) -> Result<&mut Self, EncodeError> {
        if let Some(op) = value.to_i64().and_then(OpCode::push_small_int) {
            self.script.push(op);
            return Ok(self);
        }
        self.push_bytes(&value.to_signed_bytes_le())
    }

    pub fn push_bool(&mut self, value: bool) -> &mut Self {
        self.emit(if value { OpCode::PUSH1 } else { OpCode::PUSH0 })
    }

    /// Pushes a single parameter, recursing into lists and structs.
    pub fn push_param(&mut self, param: &InvokeParam) -> Result<&mut Self, EncodeError> {
        match param {
            InvokeParam::Bool(v) => {
                self.push_bool(*v);
            }
            InvokeParam::Integer(v) => {
                self.push_int(v)?;
            }
            InvokeParam::Bytes(v) => {
                self.push_bytes(v)?;
            }
            InvokeParam::String(v) => {
                self.push_bytes(v.as_bytes())?;
            }
            InvokeParam::Address(v) => {
                self.push_bytes(v.as_bytes())?;
            }
            InvokeParam::List(items) => {
                self.push_params(items)?;
                self.push_int(&BigInt::from(items.len()))?;
                self.emit(OpCode::PACK);
            }
            InvokeParam::Struct(fields) => {
                if fields.is_empty() {
                    return Err(EncodeError::UnsupportedParameterType(
                        "struct without fields".to_string(),
                    ));
                }
                self.emit(OpCode::PUSH0)
                    .emit(OpCode::NEWSTRUCT)
                    .emit(OpCode::TOALTSTACK);
                for field in fields {
                    self.emit(OpCode::DUPFROMALTSTACK);
                    self.push_param(field)?;
                    self.emit(OpCode::APPEND);
                }
                self.emit(OpCode::FROMALTSTACK);
            }
        }
        Ok(self)
    }

    /// Pushes a parameter list in reverse order, so the first parameter ends
    /// up on top of the stack.
    pub fn push_params(&mut self, params: &[InvokeParam]) -> Result<&mut Self, EncodeError> {
        for param in params.iter().rev() {
            self.push_param(param)?;
        }
        Ok(self)
    }

    pub fn len(&self) -> usize {
        self.script.len()
    }

    pub fn is_empty(&self) -> bool {
        self.script.is_empty()
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.script
    }
}

/// Builds the script invoking `method` on a native contract.
///
/// An empty parameter list is replaced by a single empty string; the node
/// rejects native invocations without arguments.
pub fn build_native_invoke_code(
    contract: &Address,
    version: u8,
    method: &str,
    params: &[InvokeParam],
) -> Result<Vec<u8>, EncodeError> {
    let substituted;
    let params = if params.is_empty() {
        substituted = [InvokeParam::String(String::new())];
        &substituted[..]
    } else {
        params
    };

    let mut builder = ScriptBuilder::new();
    builder
        .push_params(params)?
        .push_bytes(method.as_bytes())?
        .push_bytes(contract.as_bytes())?
        .push_int(&BigInt::from(version))?
        .emit(OpCode::SYSCALL)
        .push_bytes(NATIVE_INVOKE_NAME.as_bytes())?;
    Ok(builder.into_bytes())
}

/// Builds the script invoking `method` on a deployed TeoVM contract: the
/// pair `[method, [args...]]` followed by `APPCALL <address>`.
pub fn build_teovm_invoke_code(
    contract: &Address,
    method: &str,
    args: &[InvokeParam],
) -> Result<Vec<u8>, EncodeError> {
    let params = [
        InvokeParam::String(method.to_string()),
        InvokeParam::List(args.to_vec()),
    ];
    let mut builder = ScriptBuilder::new();
    builder
        .push_params(&params)?
        .emit(OpCode::APPCALL)
        .emit_raw(contract.as_bytes());
    Ok(builder.into_bytes())
}
