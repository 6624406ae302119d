//! Account and contract addresses.

use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use ripemd::Ripemd160;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};

use super::key::PublicKey;
use super::program::multi_sig_program;
use crate::error::{DecodeError, EncodeError, ParseAddressError};

/// Version byte prefixed to the address before base58check encoding.
pub const ADDRESS_VERSION: u8 = 0x17;

/// A 20-byte account or contract address.
///
/// Account addresses are the RIPEMD-160 of the SHA-256 of the account's
/// verification program. Displayed as base58check.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Address([u8; 20]);

impl Address {
    pub const ZERO: Self = Self([0; 20]);

    /// Address of the built-in contract with the given id: nineteen zero
    /// bytes followed by the id.
    pub const fn native(id: u8) -> Self {
        let mut bytes = [0u8; 20];
        bytes[19] = id;
        Self(bytes)
    }

    pub const fn from_bytes(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }

    pub const fn as_bytes(&self) -> &[u8; 20] {
        &self.0
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.0.to_vec()
    }

    /// Address controlled by a verification program.
    pub fn from_program(program: &[u8]) -> Self {
        let sha = Sha256::digest(program);
        let digest = Ripemd160::digest(sha);
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&digest);
        Self(bytes)
    }

    /// Address of the M-of-N account over `keys`, in any order.
    pub fn from_multi_pub_keys(m: usize, keys: &[PublicKey]) -> Result<Self, EncodeError> {
        Ok(Self::from_program(&multi_sig_program(m, keys)?))
    }

    /// Hex of the byte-reversed address, as used for contract addresses in
    /// RPC parameters and event records.
    pub fn to_hex_string(&self) -> String {
        let mut reversed = self.0;
        reversed.reverse();
        hex::encode(reversed)
    }

    /// Inverse of [`Address::to_hex_string`].
    pub fn from_hex_string(s: &str) -> Result<Self, ParseAddressError> {
        let mut bytes = hex::decode(s).map_err(|e| ParseAddressError::InvalidHex(e.to_string()))?;
        bytes.reverse();
        let arr: [u8; 20] = bytes
            .as_slice()
            .try_into()
            .map_err(|_| ParseAddressError::InvalidLength(bytes.len()))?;
        Ok(Self(arr))
    }

    /// Base58check encoding.
    pub fn to_base58(&self) -> String {
        let mut data = Vec::with_capacity(25);
        data.push(ADDRESS_VERSION);
        data.extend_from_slice(&self.0);
        let checksum = checksum(&data);
        data.extend_from_slice(&checksum);
        bs58::encode(data).into_string()
    }

    pub fn from_base58(s: &str) -> Result<Self, ParseAddressError> {
        let data = bs58::decode(s)
            .into_vec()
            .map_err(|e| ParseAddressError::InvalidBase58(e.to_string()))?;
        if data.len() != 25 {
            return Err(ParseAddressError::InvalidLength(data.len().saturating_sub(5)));
        }
        if data[0] != ADDRESS_VERSION {
            return Err(ParseAddressError::InvalidVersion(data[0]));
        }
        if checksum(&data[..21]) != data[21..] {
            return Err(ParseAddressError::ChecksumMismatch);
        }
        let mut bytes = [0u8; 20];
        bytes.copy_from_slice(&data[1..21]);
        Ok(Self(bytes))
    }
}

fn checksum(data: &[u8]) -> [u8; 4] {
    let hash = Sha256::digest(Sha256::digest(data));
    let mut out = [0u8; 4];
    out.copy_from_slice(&hash[..4]);
    out
}

impl FromStr for Address {
    type Err = ParseAddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_base58(s)
    }
}

impl TryFrom<&str> for Address {
    type Error = ParseAddressError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl TryFrom<&[u8]> for Address {
    type Error = DecodeError;

    fn try_from(bytes: &[u8]) -> Result<Self, Self::Error> {
        let arr: [u8; 20] = bytes
            .try_into()
            .map_err(|_| DecodeError::InvalidAddress(bytes.len()))?;
        Ok(Self(arr))
    }
}

impl From<[u8; 20]> for Address {
    fn from(bytes: [u8; 20]) -> Self {
        Self(bytes)
    }
}

impl AsRef<[u8]> for Address {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_base58())
    }
}

impl Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Address({})", self)
    }
}

impl Serialize for Address {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for Address {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}
