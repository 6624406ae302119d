//! Transaction types.

use std::collections::HashSet;

use super::program::{
    MULTI_SIG_MAX_KEYS, invoke_program, multi_sig_program, parse_invoke_program,
    parse_verify_program, single_sig_program,
};
use super::{Address, PublicKey, Signature, TxHash};
use crate::codec::{Sink, Source};
use crate::error::{DecodeError, EncodeError};

/// Most signature groups a transaction may carry.
pub const TX_MAX_SIG_SIZE: usize = 16;

/// Transaction kind byte.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum TxType {
    Deploy = 0xd0,
    Invoke = 0xd1,
}

impl TryFrom<u8> for TxType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0xd0 => Ok(TxType::Deploy),
            0xd1 => Ok(TxType::Invoke),
            other => Err(DecodeError::UnsupportedTransactionType(other)),
        }
    }
}

/// Virtual machine a deployed contract targets.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum VmType {
    TeoVm = 1,
    WasmVm = 3,
}

impl TryFrom<u8> for VmType {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(VmType::TeoVm),
            3 => Ok(VmType::WasmVm),
            other => Err(DecodeError::TypeMismatch {
                expected: "vm type",
                found: other.to_string(),
            }),
        }
    }
}

/// Contract code and metadata carried by a deploy transaction.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DeployCode {
    pub code: Vec<u8>,
    pub vm_type: VmType,
    pub name: String,
    pub version: String,
    pub author: String,
    pub email: String,
    pub description: String,
}

impl DeployCode {
    /// Address of the deployed contract.
    pub fn address(&self) -> Address {
        Address::from_program(&self.code)
    }
}

/// Transaction body.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Payload {
    Invoke { code: Vec<u8> },
    Deploy(DeployCode),
}

impl Payload {
    pub fn tx_type(&self) -> TxType {
        match self {
            Payload::Invoke { .. } => TxType::Invoke,
            Payload::Deploy(_) => TxType::Deploy,
        }
    }

    /// The invocation script, for invoke transactions.
    pub fn invoke_code(&self) -> Option<&[u8]> {
        match self {
            Payload::Invoke { code } => Some(code),
            Payload::Deploy(_) => None,
        }
    }
}

/// One signature group: a single key (`m == 1`) or an M-of-N key set.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Sig {
    pub pub_keys: Vec<PublicKey>,
    pub m: usize,
    /// Serialized signatures (scheme byte + raw signature).
    pub sig_data: Vec<Vec<u8>>,
}

impl Sig {
    pub fn verification_program(&self) -> Result<Vec<u8>, EncodeError> {
        match self.pub_keys.as_slice() {
            [key] => single_sig_program(key),
            keys => multi_sig_program(self.m, keys),
        }
    }

    /// Address this group authorizes.
    pub fn address(&self) -> Result<Address, EncodeError> {
        Ok(Address::from_program(&self.verification_program()?))
    }

    /// True if `key` already has a valid signature over `message` here.
    pub fn is_signed_by(&self, key: &PublicKey, message: &[u8]) -> bool {
        self.sig_data.iter().any(|raw| {
            Signature::from_bytes(raw)
                .map(|sig| key.verify(message, &sig))
                .unwrap_or(false)
        })
    }

    /// Number of listed keys with a valid signature over `message`. Each
    /// key is counted at most once.
    pub fn valid_signers(&self, message: &[u8]) -> usize {
        let mut matched = HashSet::new();
        for raw in &self.sig_data {
            let Ok(sig) = Signature::from_bytes(raw) else {
                continue;
            };
            if let Some(idx) = (0..self.pub_keys.len())
                .find(|i| !matched.contains(i) && self.pub_keys[*i].verify(message, &sig))
            {
                matched.insert(idx);
            }
        }
        matched.len()
    }
}

/// A transaction, signed or not.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Transaction {
    pub version: u8,
    pub nonce: u32,
    pub gas_price: u64,
    pub gas_limit: u64,
    /// Account charged for gas. [`Address::ZERO`] until set.
    pub payer: Address,
    pub payload: Payload,
    pub sigs: Vec<Sig>,
}

impl Transaction {
    /// An unsigned invoke transaction with a random nonce.
    pub fn new_invoke(gas_price: u64, gas_limit: u64, code: Vec<u8>) -> Self {
        Self::new(gas_price, gas_limit, Payload::Invoke { code })
    }

    /// An unsigned deploy transaction with a random nonce.
    pub fn new_deploy(gas_price: u64, gas_limit: u64, deploy: DeployCode) -> Self {
        Self::new(gas_price, gas_limit, Payload::Deploy(deploy))
    }

    fn new(gas_price: u64, gas_limit: u64, payload: Payload) -> Self {
        Self {
            version: 0,
            nonce: rand::random(),
            gas_price,
            gas_limit,
            payer: Address::ZERO,
            payload,
            sigs: Vec::new(),
        }
    }

    pub fn tx_type(&self) -> TxType {
        self.payload.tx_type()
    }

    /// Hash of the unsigned part. This is what signers sign.
    pub fn hash(&self) -> TxHash {
        let mut sink = Sink::new();
        self.write_unsigned(&mut sink);
        TxHash::hash(sink.as_slice())
    }

    fn write_unsigned(&self, sink: &mut Sink) {
        sink.write_u8(self.version);
        sink.write_u8(self.tx_type() as u8);
        sink.write_u32(self.nonce);
        sink.write_u64(self.gas_price);
        sink.write_u64(self.gas_limit);
        sink.write_address(&self.payer);
        match &self.payload {
            Payload::Invoke { code } => sink.write_var_bytes(code),
            Payload::Deploy(deploy) => {
                sink.write_var_bytes(&deploy.code);
                sink.write_u8(deploy.vm_type as u8);
                sink.write_var_str(&deploy.name);
                sink.write_var_str(&deploy.version);
                sink.write_var_str(&deploy.author);
                sink.write_var_str(&deploy.email);
                sink.write_var_str(&deploy.description);
            }
        }
        // attributes
        sink.write_var_uint(0);
    }

    /// Full wire serialization, signatures included.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        if self.sigs.len() > TX_MAX_SIG_SIZE {
            return Err(EncodeError::TooManySignatures {
                max: TX_MAX_SIG_SIZE,
            });
        }
        let mut sink = Sink::with_capacity(256);
        self.write_unsigned(&mut sink);
        sink.write_var_uint(self.sigs.len() as u64);
        for sig in &self.sigs {
            sink.write_var_bytes(&invoke_program(&sig.sig_data)?);
            sink.write_var_bytes(&sig.verification_program()?);
        }
        Ok(sink.into_bytes())
    }

    pub fn to_hex(&self) -> Result<String, EncodeError> {
        self.to_bytes().map(hex::encode)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut source = Source::new(bytes);
        let tx = Self::read(&mut source)?;
        source.finish()?;
        Ok(tx)
    }

    pub fn from_hex(s: &str) -> Result<Self, DecodeError> {
        let bytes = hex::decode(s).map_err(|e| DecodeError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }

    fn read(source: &mut Source<'_>) -> Result<Self, DecodeError> {
        let version = source.read_u8()?;
        let tx_type = TxType::try_from(source.read_u8()?)?;
        let nonce = source.read_u32()?;
        let gas_price = source.read_u64()?;
        let gas_limit = source.read_u64()?;
        let payer = source.read_address()?;
        let payload = match tx_type {
            TxType::Invoke => Payload::Invoke {
                code: source.read_var_bytes()?.to_vec(),
            },
            TxType::Deploy => Payload::Deploy(DeployCode {
                code: source.read_var_bytes()?.to_vec(),
                vm_type: VmType::try_from(source.read_u8()?)?,
                name: source.read_var_str()?,
                version: source.read_var_str()?,
                author: source.read_var_str()?,
                email: source.read_var_str()?,
                description: source.read_var_str()?,
            }),
        };
        let attributes = source.read_var_uint()?;
        if attributes != 0 {
            return Err(DecodeError::TypeMismatch {
                expected: "no transaction attributes",
                found: format!("{attributes} attributes"),
            });
        }

        let count = source.read_var_uint()?;
        if count > TX_MAX_SIG_SIZE as u64 {
            return Err(DecodeError::UnsupportedProgram(format!(
                "{count} signature groups"
            )));
        }
        let mut sigs = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let sig_data = parse_invoke_program(source.read_var_bytes()?)?;
            let (pub_keys, m) = parse_verify_program(source.read_var_bytes()?)?;
            sigs.push(Sig {
                pub_keys,
                m,
                sig_data,
            });
        }

        Ok(Self {
            version,
            nonce,
            gas_price,
            gas_limit,
            payer,
            payload,
            sigs,
        })
    }

    /// Addresses of all signature groups, in order.
    pub fn signer_addresses(&self) -> Result<Vec<Address>, EncodeError> {
        self.sigs.iter().map(Sig::address).collect()
    }

    /// Local signature check: every group carries at least `m` valid
    /// signatures from distinct listed keys, and the payer is one of the
    /// signing addresses.
    pub fn verify_signatures(&self) -> bool {
        if self.sigs.is_empty() || self.sigs.len() > TX_MAX_SIG_SIZE {
            return false;
        }
        let hash = self.hash();
        let all_groups_valid = self.sigs.iter().all(|sig| {
            sig.m >= 1
                && sig.m <= sig.pub_keys.len()
                && sig.pub_keys.len() <= MULTI_SIG_MAX_KEYS
                && sig.valid_signers(hash.as_bytes()) >= sig.m
        });
        let payer_signed = self
            .signer_addresses()
            .map(|addrs| addrs.contains(&self.payer))
            .unwrap_or(false);
        all_groups_valid && payer_signed
    }
}
