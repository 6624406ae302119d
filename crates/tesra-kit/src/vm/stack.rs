//! Forward replay of invocation scripts.
//!
//! Only the opcodes the SDKs emit when building invocations are understood.
//! Both struct layouts seen on the wire decode:
//!
//! - `DUPFROMALTSTACK <field> APPEND` (field pushed after the struct reference)
//! - `<field> DUPFROMALTSTACK SWAP APPEND` (field pushed first)

use num_bigint::BigInt;
use num_traits::ToPrimitive;

use super::OpCode;
use crate::codec::Source;
use crate::error::DecodeError;
use crate::types::Address;

/// Largest struct or array a replayed script may build.
pub const MAX_ITEMS: usize = 1024;

/// A value left on the stack by a replayed script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackItem {
    Bytes(Vec<u8>),
    Integer(BigInt),
    Struct(Vec<StackItem>),
    Array(Vec<StackItem>),
}

impl StackItem {
    pub fn kind(&self) -> &'static str {
        match self {
            StackItem::Bytes(_) => "bytes",
            StackItem::Integer(_) => "integer",
            StackItem::Struct(_) => "struct",
            StackItem::Array(_) => "array",
        }
    }

    fn mismatch(&self, expected: &'static str) -> DecodeError {
        DecodeError::TypeMismatch {
            expected,
            found: self.kind().to_string(),
        }
    }

    pub fn as_bytes(&self) -> Result<&[u8], DecodeError> {
        match self {
            StackItem::Bytes(b) => Ok(b),
            other => Err(other.mismatch("bytes")),
        }
    }

    /// Integer value; byte strings are little-endian two's complement and the
    /// empty string is zero.
    pub fn to_integer(&self) -> Result<BigInt, DecodeError> {
        match self {
            StackItem::Integer(v) => Ok(v.clone()),
            StackItem::Bytes(b) => Ok(BigInt::from_signed_bytes_le(b)),
            other => Err(other.mismatch("integer")),
        }
    }

    pub fn to_u64(&self) -> Result<u64, DecodeError> {
        self.to_integer()?
            .to_u64()
            .ok_or(DecodeError::IntegerOverflow("u64"))
    }

    pub fn to_address(&self) -> Result<Address, DecodeError> {
        Address::try_from(self.as_bytes()?)
    }

    pub fn to_utf8(&self) -> Result<String, DecodeError> {
        String::from_utf8(self.as_bytes()?.to_vec()).map_err(|e| DecodeError::TypeMismatch {
            expected: "utf-8 string",
            found: e.to_string(),
        })
    }

    /// Elements of a struct or array.
    pub fn as_items(&self) -> Result<&[StackItem], DecodeError> {
        match self {
            StackItem::Struct(items) | StackItem::Array(items) => Ok(items),
            other => Err(other.mismatch("struct or array")),
        }
    }
}

/// How a replayed script hands control over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallTarget {
    Syscall(String),
    AppCall(Address),
}

/// Result of replaying a script up to its call instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplayedScript {
    /// Evaluation stack, bottom first.
    pub stack: Vec<StackItem>,
    /// `None` if the script ended without a call.
    pub call: Option<CallTarget>,
}

#[derive(Debug, Clone)]
enum Slot {
    Item(StackItem),
    /// A `DUPFROMALTSTACK` reference to an entry of the alt stack.
    AltRef(usize),
}

struct Machine {
    stack: Vec<Slot>,
    alt: Vec<StackItem>,
}

impl Machine {
    fn pop(&mut self, offset: usize) -> Result<Slot, DecodeError> {
        self.stack.pop().ok_or(DecodeError::StackUnderflow(offset))
    }

    fn pop_item(&mut self, offset: usize) -> Result<StackItem, DecodeError> {
        match self.pop(offset)? {
            Slot::Item(item) => Ok(item),
            Slot::AltRef(_) => Err(DecodeError::TypeMismatch {
                expected: "value",
                found: "alt stack reference".to_string(),
            }),
        }
    }

    /// Element count for `NEWSTRUCT` or `PACK`, at most [`MAX_ITEMS`].
    fn pop_count(&mut self, offset: usize) -> Result<usize, DecodeError> {
        let count = self.pop_item(offset)?.to_integer()?;
        match count.to_usize() {
            Some(n) if n <= MAX_ITEMS => Ok(n),
            Some(n) => Err(DecodeError::TooManyItems {
                count: n,
                max: MAX_ITEMS,
                offset,
            }),
            None => Err(DecodeError::IntegerOverflow("usize")),
        }
    }

    fn push(&mut self, item: StackItem) {
        self.stack.push(Slot::Item(item));
    }

    fn append(&mut self, offset: usize) -> Result<(), DecodeError> {
        let item = self.pop_item(offset)?;
        let target = match self.pop(offset)? {
            Slot::AltRef(idx) => self
                .alt
                .get_mut(idx)
                .ok_or(DecodeError::StackUnderflow(offset))?,
            Slot::Item(_) => {
                return Err(DecodeError::TypeMismatch {
                    expected: "alt stack reference",
                    found: "value".to_string(),
                });
            }
        };
        match target {
            StackItem::Struct(items) | StackItem::Array(items) => {
                items.push(item);
                Ok(())
            }
            other => Err(other.mismatch("struct or array")),
        }
    }
}

/// Replays `script` until its first `SYSCALL` or `APPCALL`.
pub fn replay(script: &[u8]) -> Result<ReplayedScript, DecodeError> {
    let mut source = Source::new(script);
    let mut vm = Machine {
        stack: Vec::new(),
        alt: Vec::new(),
    };

    let call = loop {
        if source.is_empty() {
            break None;
        }
        let offset = source.position();
        let byte = source.read_u8()?;

        if let Some(len) = OpCode::push_len(byte) {
            vm.push(StackItem::Bytes(source.read_bytes(len)?.to_vec()));
            continue;
        }
        if let Some(v) = OpCode::small_int_value(byte) {
            vm.push(StackItem::Integer(BigInt::from(v)));
            continue;
        }

        let op = OpCode::from_u8(byte).ok_or(DecodeError::UnexpectedOpcode {
            opcode: byte,
            offset,
        })?;
        match op {
            OpCode::PUSH0 => vm.push(StackItem::Bytes(Vec::new())),
            OpCode::PUSHDATA1 => {
                let len = source.read_u8()? as usize;
                vm.push(StackItem::Bytes(source.read_bytes(len)?.to_vec()));
            }
            OpCode::PUSHDATA2 => {
                let len = source.read_u16()? as usize;
                vm.push(StackItem::Bytes(source.read_bytes(len)?.to_vec()));
            }
            OpCode::PUSHDATA4 => {
                let len = source.read_u32()? as usize;
                vm.push(StackItem::Bytes(source.read_bytes(len)?.to_vec()));
            }
            OpCode::NOP => {}
            OpCode::NEWSTRUCT => {
                let n = vm.pop_count(offset)?;
                vm.push(StackItem::Struct(vec![StackItem::Bytes(Vec::new()); n]));
            }
            OpCode::TOALTSTACK => {
                let item = vm.pop_item(offset)?;
                vm.alt.push(item);
            }
            OpCode::DUPFROMALTSTACK => {
                if vm.alt.is_empty() {
                    return Err(DecodeError::StackUnderflow(offset));
                }
                vm.stack.push(Slot::AltRef(vm.alt.len() - 1));
            }
            OpCode::FROMALTSTACK => {
                let item = vm.alt.pop().ok_or(DecodeError::StackUnderflow(offset))?;
                vm.push(item);
            }
            OpCode::SWAP => {
                let len = vm.stack.len();
                if len < 2 {
                    return Err(DecodeError::StackUnderflow(offset));
                }
                vm.stack.swap(len - 1, len - 2);
            }
            OpCode::APPEND => vm.append(offset)?,
            OpCode::PACK => {
                let n = vm.pop_count(offset)?;
                if n > vm.stack.len() {
                    return Err(DecodeError::StackUnderflow(offset));
                }
                let mut items = Vec::with_capacity(n);
                for _ in 0..n {
                    items.push(vm.pop_item(offset)?);
                }
                vm.push(StackItem::Array(items));
            }
            OpCode::SYSCALL => {
                let name = source.read_var_str()?;
                break Some(CallTarget::Syscall(name));
            }
            OpCode::APPCALL => {
                let address = source.read_address()?;
                break Some(CallTarget::AppCall(address));
            }
            _ => {
                return Err(DecodeError::UnexpectedOpcode {
                    opcode: byte,
                    offset,
                });
            }
        }
    };

    let stack = vm
        .stack
        .into_iter()
        .map(|slot| match slot {
            Slot::Item(item) => Ok(item),
            Slot::AltRef(_) => Err(DecodeError::TypeMismatch {
                expected: "value",
                found: "alt stack reference".to_string(),
            }),
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ReplayedScript { stack, call })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::vm::{InvokeParam, ScriptBuilder};

    fn built(params: &[InvokeParam]) -> Vec<u8> {
        let mut builder = ScriptBuilder::new();
        builder.push_params(params).unwrap();
        builder.into_bytes()
    }

    // ========================================================================
    // Pushes
    // ========================================================================

    #[test]
    fn test_replay_pushes() {
        let script = hex::decode("004f5160016403aabbcc").unwrap();
        let replayed = replay(&script).unwrap();
        assert_eq!(replayed.call, None);
        assert_eq!(
            replayed.stack,
            vec![
                StackItem::Bytes(vec![]),
                StackItem::Integer(BigInt::from(-1)),
                StackItem::Integer(BigInt::from(1)),
                StackItem::Integer(BigInt::from(16)),
                StackItem::Bytes(vec![0x64]),
                StackItem::Bytes(vec![0xaa, 0xbb, 0xcc]),
            ]
        );
    }

    #[test]
    fn test_truncated_push_fails() {
        let script = hex::decode("05aabb").unwrap();
        assert!(matches!(
            replay(&script),
            Err(DecodeError::TruncatedInput { .. })
        ));
    }

    #[test]
    fn test_unknown_opcode_fails() {
        let script = hex::decode("51ff").unwrap();
        assert_eq!(
            replay(&script),
            Err(DecodeError::UnexpectedOpcode {
                opcode: 0xff,
                offset: 1
            })
        );
    }

    // ========================================================================
    // Composite values
    // ========================================================================

    #[test]
    fn test_replay_struct_built_by_builder() {
        let script = built(&[InvokeParam::structure([
            InvokeParam::from(1u8),
            InvokeParam::from("a"),
        ])]);
        let replayed = replay(&script).unwrap();
        assert_eq!(
            replayed.stack,
            vec![StackItem::Struct(vec![
                StackItem::Integer(BigInt::from(1)),
                StackItem::Bytes(b"a".to_vec()),
            ])]
        );
    }

    #[test]
    fn test_replay_struct_swap_layout() {
        // field, DUPFROMALTSTACK, SWAP, APPEND
        let script = hex::decode(concat!("00c66b", "51", "6a7cc8", "0161", "6a7cc8", "6c")).unwrap();
        let replayed = replay(&script).unwrap();
        assert_eq!(
            replayed.stack,
            vec![StackItem::Struct(vec![
                StackItem::Integer(BigInt::from(1)),
                StackItem::Bytes(b"a".to_vec()),
            ])]
        );
    }

    #[test]
    fn test_replay_list_preserves_order() {
        let script = built(&[InvokeParam::list([1u64, 200, 3])]);
        let replayed = replay(&script).unwrap();
        let items = replayed.stack[0].as_items().unwrap();
        let values: Vec<u64> = items.iter().map(|i| i.to_u64().unwrap()).collect();
        assert_eq!(values, vec![1, 200, 3]);
    }

    #[test]
    fn test_append_without_alt_reference_fails() {
        let script = hex::decode("5152c8").unwrap();
        assert!(matches!(
            replay(&script),
            Err(DecodeError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_pack_underflow_fails() {
        let script = hex::decode("5153c1").unwrap();
        assert!(matches!(replay(&script), Err(DecodeError::StackUnderflow(2))));
    }

    // ========================================================================
    // Hostile input
    // ========================================================================

    #[test]
    fn test_huge_newstruct_count_fails() {
        // i64::MAX fields
        let script = hex::decode("08ffffffffffffff7fc6").unwrap();
        assert_eq!(
            replay(&script),
            Err(DecodeError::TooManyItems {
                count: i64::MAX as usize,
                max: MAX_ITEMS,
                offset: 9,
            })
        );

        // Just over the limit, within range of an allocation
        let script = hex::decode("020104c6").unwrap();
        assert!(matches!(
            replay(&script),
            Err(DecodeError::TooManyItems { count: 1025, .. })
        ));
    }

    #[test]
    fn test_negative_count_fails() {
        let script = hex::decode("4fc6").unwrap();
        assert_eq!(replay(&script), Err(DecodeError::IntegerOverflow("usize")));
        let script = hex::decode("4fc1").unwrap();
        assert_eq!(replay(&script), Err(DecodeError::IntegerOverflow("usize")));
    }

    #[test]
    fn test_huge_pack_count_fails() {
        let script = hex::decode("515108ffffffffffffff7fc1").unwrap();
        assert!(matches!(replay(&script), Err(DecodeError::TooManyItems { .. })));

        // Within the limit but deeper than the stack
        let script = hex::decode("51515102e803c1").unwrap();
        assert_eq!(replay(&script), Err(DecodeError::StackUnderflow(6)));
    }

    #[test]
    fn test_dangling_append_fails() {
        let script = hex::decode("c8").unwrap();
        assert_eq!(replay(&script), Err(DecodeError::StackUnderflow(0)));

        // Reference to a struct that was already taken off the alt stack
        let script = hex::decode("00c66b6a6c51c8").unwrap();
        assert!(replay(&script).is_err());
    }

    #[test]
    fn test_struct_at_the_limit_replays() {
        let script = hex::decode("020004c6").unwrap();
        let replayed = replay(&script).unwrap();
        assert_eq!(replayed.stack[0].as_items().unwrap().len(), MAX_ITEMS);
    }

    // ========================================================================
    // Call targets
    // ========================================================================

    #[test]
    fn test_replay_stops_at_syscall() {
        let script = hex::decode("0161680474657374ffff").unwrap();
        let replayed = replay(&script).unwrap();
        assert_eq!(replayed.call, Some(CallTarget::Syscall("test".to_string())));
        assert_eq!(replayed.stack, vec![StackItem::Bytes(b"a".to_vec())]);
    }

    #[test]
    fn test_replay_appcall_reads_address() {
        let mut script = vec![0x51, 0x67];
        script.extend_from_slice(&[9u8; 20]);
        let replayed = replay(&script).unwrap();
        assert_eq!(
            replayed.call,
            Some(CallTarget::AppCall(Address::from_bytes([9u8; 20])))
        );
    }
}
