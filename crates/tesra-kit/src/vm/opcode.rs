//! The subset of TeoVM opcodes the SDK emits or understands when replaying
//! an invocation script.

/// A TeoVM opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum OpCode {
    /// Pushes an empty byte array. Also the integer zero.
    PUSH0 = 0x00,
    /// Lowest direct-length push; `0x01..=0x4B` push that many following bytes.
    PUSHBYTES1 = 0x01,
    PUSHBYTES75 = 0x4B,
    PUSHDATA1 = 0x4C,
    PUSHDATA2 = 0x4D,
    PUSHDATA4 = 0x4E,
    PUSHM1 = 0x4F,
    PUSH1 = 0x51,
    PUSH2 = 0x52,
    PUSH3 = 0x53,
    PUSH4 = 0x54,
    PUSH5 = 0x55,
    PUSH6 = 0x56,
    PUSH7 = 0x57,
    PUSH8 = 0x58,
    PUSH9 = 0x59,
    PUSH10 = 0x5A,
    PUSH11 = 0x5B,
    PUSH12 = 0x5C,
    PUSH13 = 0x5D,
    PUSH14 = 0x5E,
    PUSH15 = 0x5F,
    PUSH16 = 0x60,
    NOP = 0x61,
    APPCALL = 0x67,
    SYSCALL = 0x68,
    DUPFROMALTSTACK = 0x6A,
    TOALTSTACK = 0x6B,
    FROMALTSTACK = 0x6C,
    SWAP = 0x7C,
    CHECKSIG = 0xAC,
    CHECKMULTISIG = 0xAE,
    PACK = 0xC1,
    NEWSTRUCT = 0xC6,
    APPEND = 0xC8,
}

impl OpCode {
    /// Decode an opcode byte. Direct-length pushes `0x02..=0x4A` have no
    /// variant of their own and are reported by [`OpCode::push_len`].
    pub fn from_u8(byte: u8) -> Option<Self> {
        use OpCode::*;
        Some(match byte {
            0x00 => PUSH0,
            0x01 => PUSHBYTES1,
            0x4B => PUSHBYTES75,
            0x4C => PUSHDATA1,
            0x4D => PUSHDATA2,
            0x4E => PUSHDATA4,
            0x4F => PUSHM1,
            0x51 => PUSH1,
            0x52 => PUSH2,
            0x53 => PUSH3,
            0x54 => PUSH4,
            0x55 => PUSH5,
            0x56 => PUSH6,
            0x57 => PUSH7,
            0x58 => PUSH8,
            0x59 => PUSH9,
            0x5A => PUSH10,
            0x5B => PUSH11,
            0x5C => PUSH12,
            0x5D => PUSH13,
            0x5E => PUSH14,
            0x5F => PUSH15,
            0x60 => PUSH16,
            0x61 => NOP,
            0x67 => APPCALL,
            0x68 => SYSCALL,
            0x6A => DUPFROMALTSTACK,
            0x6B => TOALTSTACK,
            0x6C => FROMALTSTACK,
            0x7C => SWAP,
            0xAC => CHECKSIG,
            0xAE => CHECKMULTISIG,
            0xC1 => PACK,
            0xC6 => NEWSTRUCT,
            0xC8 => APPEND,
            _ => return None,
        })
    }

    /// Number of data bytes pushed by a direct-length push opcode byte.
    pub fn push_len(byte: u8) -> Option<usize> {
        (OpCode::PUSHBYTES1 as u8..=OpCode::PUSHBYTES75 as u8)
            .contains(&byte)
            .then_some(byte as usize)
    }

    /// The small-integer push for `-1..=16`.
    pub fn push_small_int(value: i64) -> Option<u8> {
        match value {
            -1 => Some(OpCode::PUSHM1 as u8),
            0 => Some(OpCode::PUSH0 as u8),
            1..=16 => Some(OpCode::PUSH1 as u8 - 1 + value as u8),
            _ => None,
        }
    }

    /// Inverse of [`OpCode::push_small_int`] for `PUSHM1` and `PUSH1..=PUSH16`.
    pub fn small_int_value(byte: u8) -> Option<i64> {
        match byte {
            0x4F => Some(-1),
            0x51..=0x60 => Some(i64::from(byte - OpCode::PUSH1 as u8) + 1),
            _ => None,
        }
    }
}

impl From<OpCode> for u8 {
    fn from(op: OpCode) -> u8 {
        op as u8
    }
}
