//! Verification and invocation programs attached to transaction signatures.

use num_bigint::BigInt;

use super::key::{PublicKey, sort_public_keys};
use crate::error::{DecodeError, EncodeError};
use crate::vm::{OpCode, ScriptBuilder, StackItem, replay};

/// Largest key set a multi-signature program may carry.
pub const MULTI_SIG_MAX_KEYS: usize = 16;

/// `<pubkey> CHECKSIG`
pub fn single_sig_program(key: &PublicKey) -> Result<Vec<u8>, EncodeError> {
    let mut builder = ScriptBuilder::new();
    builder.push_bytes(&key.to_bytes())?.emit(OpCode::CHECKSIG);
    Ok(builder.into_bytes())
}

/// `<m> <sorted pubkeys...> <n> CHECKMULTISIG`
pub fn multi_sig_program(m: usize, keys: &[PublicKey]) -> Result<Vec<u8>, EncodeError> {
    let n = keys.len();
    if m == 0 || m > n || n > MULTI_SIG_MAX_KEYS {
        return Err(EncodeError::InvalidMultiSig { m, n });
    }
    let mut builder = ScriptBuilder::new();
    builder.push_int(&BigInt::from(m))?;
    for key in sort_public_keys(keys) {
        builder.push_bytes(&key.to_bytes())?;
    }
    builder
        .push_int(&BigInt::from(n))?
        .emit(OpCode::CHECKMULTISIG);
    Ok(builder.into_bytes())
}

/// Program pushing each signature in order.
pub fn invoke_program(sigs: &[Vec<u8>]) -> Result<Vec<u8>, EncodeError> {
    let mut builder = ScriptBuilder::new();
    for sig in sigs {
        builder.push_bytes(sig)?;
    }
    Ok(builder.into_bytes())
}

/// Signatures pushed by an invocation program.
pub fn parse_invoke_program(program: &[u8]) -> Result<Vec<Vec<u8>>, DecodeError> {
    let replayed = replay(program)?;
    if replayed.call.is_some() {
        return Err(DecodeError::UnsupportedProgram(
            "invocation program contains a call".to_string(),
        ));
    }
    replayed
        .stack
        .iter()
        .map(|item| item.as_bytes().map(<[u8]>::to_vec))
        .collect()
}

/// Key set and threshold of a verification program.
pub fn parse_verify_program(program: &[u8]) -> Result<(Vec<PublicKey>, usize), DecodeError> {
    let (last, body) = program
        .split_last()
        .ok_or_else(|| DecodeError::UnsupportedProgram("empty program".to_string()))?;
    let items = replay(body)?.stack;

    match OpCode::from_u8(*last) {
        Some(OpCode::CHECKSIG) => {
            let [key] = items.as_slice() else {
                return Err(DecodeError::UnsupportedProgram(
                    "single-signature program must push one key".to_string(),
                ));
            };
            Ok((vec![PublicKey::from_bytes(key.as_bytes()?)?], 1))
        }
        Some(OpCode::CHECKMULTISIG) => {
            let (Some(first), Some(last)) = (items.first(), items.last()) else {
                return Err(DecodeError::UnsupportedProgram(
                    "multi-signature program is empty".to_string(),
                ));
            };
            let m = small_count(first)?;
            let n = small_count(last)?;
            let keys = items
                .get(1..items.len().saturating_sub(1))
                .unwrap_or_default()
                .iter()
                .map(|item| Ok(PublicKey::from_bytes(item.as_bytes()?)?))
                .collect::<Result<Vec<_>, DecodeError>>()?;
            if keys.len() != n || m == 0 || m > n {
                return Err(DecodeError::UnsupportedProgram(format!(
                    "inconsistent multi-signature program: m = {m}, n = {n}, {} keys",
                    keys.len()
                )));
            }
            Ok((keys, m))
        }
        _ => Err(DecodeError::UnsupportedProgram(format!(
            "unknown verification opcode 0x{last:02x}"
        ))),
    }
}

fn small_count(item: &StackItem) -> Result<usize, DecodeError> {
    let value = item.to_u64()?;
    usize::try_from(value).map_err(|_| DecodeError::IntegerOverflow("usize"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{KeyType, SecretKey};

    fn keys(n: usize) -> Vec<PublicKey> {
        (0..n)
            .map(|_| SecretKey::generate(KeyType::P256).public_key())
            .collect()
    }

    #[test]
    fn test_single_sig_program_layout() {
        let key = keys(1).remove(0);
        let program = single_sig_program(&key).unwrap();
        assert_eq!(program.len(), 35);
        assert_eq!(program[0], 0x21);
        assert_eq!(program[34], 0xac);

        let (parsed, m) = parse_verify_program(&program).unwrap();
        assert_eq!(parsed, vec![key]);
        assert_eq!(m, 1);
    }

    #[test]
    fn test_multi_sig_program_round_trip() {
        let set = keys(3);
        let program = multi_sig_program(2, &set).unwrap();
        assert_eq!(program[0], 0x52);
        assert_eq!(program[program.len() - 2], 0x53);
        assert_eq!(program[program.len() - 1], 0xae);

        let (parsed, m) = parse_verify_program(&program).unwrap();
        assert_eq!(m, 2);
        assert_eq!(parsed, sort_public_keys(&set));
    }

    #[test]
    fn test_multi_sig_program_independent_of_key_order() {
        let set = keys(4);
        let mut shuffled = set.clone();
        shuffled.rotate_left(2);
        assert_eq!(
            multi_sig_program(3, &set).unwrap(),
            multi_sig_program(3, &shuffled).unwrap()
        );
    }

    #[test]
    fn test_multi_sig_threshold_bounds() {
        let set = keys(2);
        assert_eq!(
            multi_sig_program(0, &set),
            Err(EncodeError::InvalidMultiSig { m: 0, n: 2 })
        );
        assert_eq!(
            multi_sig_program(3, &set),
            Err(EncodeError::InvalidMultiSig { m: 3, n: 2 })
        );
        let many = keys(17);
        assert_eq!(
            multi_sig_program(1, &many),
            Err(EncodeError::InvalidMultiSig { m: 1, n: 17 })
        );
    }

    #[test]
    fn test_invoke_program_round_trip() {
        let sigs = vec![vec![1u8; 65], vec![2u8; 65]];
        let program = invoke_program(&sigs).unwrap();
        assert_eq!(program[0], 0x41);
        assert_eq!(parse_invoke_program(&program).unwrap(), sigs);
    }

    #[test]
    fn test_parse_verify_program_rejects_unknown() {
        assert!(parse_verify_program(&[]).is_err());
        assert!(parse_verify_program(&[0x51, 0x61]).is_err());
    }
}
