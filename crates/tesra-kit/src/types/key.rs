//! Cryptographic key types for Tesra.
//!
//! Three key types are supported: ECDSA over P-256 (the default) or
//! secp256k1, and Ed25519.

use std::cmp::Ordering;
use std::fmt::{self, Debug, Display};
use std::str::FromStr;

use ed25519_dalek::{Signer as _, Verifier as _};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use rand::rngs::OsRng;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use sha3::Sha3_256;

use crate::error::{DecodeError, ParseKeyError, SignerError};

/// Algorithm tag for ECDSA keys in the serialized form.
const ALGORITHM_ECDSA: u8 = 0x12;
/// Algorithm tag for EdDSA keys in the serialized form.
const ALGORITHM_EDDSA: u8 = 0x14;
/// Curve label for Ed25519 keys.
const CURVE_ED25519: u8 = 0x19;

/// Key type identifier.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// ECDSA on NIST P-256. Serialized as a bare compressed point.
    P256,
    /// ECDSA on secp256k1.
    Secp256k1,
    /// Ed25519.
    Ed25519,
}

impl KeyType {
    pub fn as_str(&self) -> &'static str {
        match self {
            KeyType::P256 => "p256",
            KeyType::Secp256k1 => "secp256k1",
            KeyType::Ed25519 => "ed25519",
        }
    }

    fn algorithm(&self) -> u8 {
        match self {
            KeyType::P256 | KeyType::Secp256k1 => ALGORITHM_ECDSA,
            KeyType::Ed25519 => ALGORITHM_EDDSA,
        }
    }

    /// Curve label carried in the serialized public key.
    pub fn curve_label(&self) -> u8 {
        match self {
            KeyType::P256 => 2,
            KeyType::Secp256k1 => 5,
            KeyType::Ed25519 => CURVE_ED25519,
        }
    }

    /// Scheme used when no scheme is requested explicitly.
    pub fn default_scheme(&self) -> SignatureScheme {
        match self {
            KeyType::P256 | KeyType::Secp256k1 => SignatureScheme::Sha256WithEcdsa,
            KeyType::Ed25519 => SignatureScheme::Sha512WithEdDsa,
        }
    }
}

impl FromStr for KeyType {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "p256" => Ok(KeyType::P256),
            "secp256k1" => Ok(KeyType::Secp256k1),
            "ed25519" => Ok(KeyType::Ed25519),
            other => Err(ParseKeyError::UnknownKeyType(other.to_string())),
        }
    }
}

/// Signature scheme identifier, the first byte of a serialized signature.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum SignatureScheme {
    Sha256WithEcdsa = 1,
    Sha3_256WithEcdsa = 5,
    Sha512WithEdDsa = 10,
}

impl SignatureScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignatureScheme::Sha256WithEcdsa => "SHA256withECDSA",
            SignatureScheme::Sha3_256WithEcdsa => "SHA3-256withECDSA",
            SignatureScheme::Sha512WithEdDsa => "SHA512withEdDSA",
        }
    }

    fn supports(&self, key_type: KeyType) -> bool {
        match self {
            SignatureScheme::Sha256WithEcdsa | SignatureScheme::Sha3_256WithEcdsa => {
                key_type != KeyType::Ed25519
            }
            SignatureScheme::Sha512WithEdDsa => key_type == KeyType::Ed25519,
        }
    }

    fn prehash(&self, message: &[u8]) -> Vec<u8> {
        match self {
            SignatureScheme::Sha256WithEcdsa => Sha256::digest(message).to_vec(),
            SignatureScheme::Sha3_256WithEcdsa => Sha3_256::digest(message).to_vec(),
            SignatureScheme::Sha512WithEdDsa => message.to_vec(),
        }
    }
}

impl TryFrom<u8> for SignatureScheme {
    type Error = DecodeError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(SignatureScheme::Sha256WithEcdsa),
            5 => Ok(SignatureScheme::Sha3_256WithEcdsa),
            10 => Ok(SignatureScheme::Sha512WithEdDsa),
            other => Err(DecodeError::InvalidSignature(format!(
                "unsupported signature scheme {other}"
            ))),
        }
    }
}

// ============================================================================
// PublicKey
// ============================================================================

/// A validated public key.
///
/// `data` holds the compressed SEC1 point for ECDSA keys and the raw 32
/// bytes for Ed25519.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct PublicKey {
    key_type: KeyType,
    data: Vec<u8>,
}

impl PublicKey {
    fn new(key_type: KeyType, data: &[u8]) -> Result<Self, ParseKeyError> {
        let data = match key_type {
            KeyType::P256 => p256::PublicKey::from_sec1_bytes(data)
                .map_err(|_| ParseKeyError::InvalidCurvePoint)?
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
            KeyType::Secp256k1 => k256::PublicKey::from_sec1_bytes(data)
                .map_err(|_| ParseKeyError::InvalidCurvePoint)?
                .to_encoded_point(true)
                .as_bytes()
                .to_vec(),
            KeyType::Ed25519 => {
                let bytes: [u8; 32] =
                    data.try_into()
                        .map_err(|_| ParseKeyError::InvalidLength {
                            expected: 32,
                            actual: data.len(),
                        })?;
                ed25519_dalek::VerifyingKey::from_bytes(&bytes)
                    .map_err(|_| ParseKeyError::InvalidCurvePoint)?;
                bytes.to_vec()
            }
        };
        Ok(Self { key_type, data })
    }

    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Compressed point or raw Ed25519 bytes.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Serialized form used in programs and contract parameters.
    pub fn to_bytes(&self) -> Vec<u8> {
        match self.key_type {
            KeyType::P256 => self.data.clone(),
            other => {
                let mut out = Vec::with_capacity(self.data.len() + 2);
                out.push(other.algorithm());
                out.push(other.curve_label());
                out.extend_from_slice(&self.data);
                out
            }
        }
    }

    /// Parses the serialized form produced by [`PublicKey::to_bytes`].
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, ParseKeyError> {
        match bytes.first() {
            Some(0x02 | 0x03 | 0x04) => Self::new(KeyType::P256, bytes),
            Some(&ALGORITHM_ECDSA) => {
                let label = *bytes.get(1).ok_or(ParseKeyError::InvalidLength {
                    expected: 35,
                    actual: bytes.len(),
                })?;
                let key_type = match label {
                    2 => KeyType::P256,
                    5 => KeyType::Secp256k1,
                    other => return Err(ParseKeyError::UnknownCurve(other)),
                };
                Self::new(key_type, &bytes[2..])
            }
            Some(&ALGORITHM_EDDSA) => match bytes.get(1) {
                Some(&CURVE_ED25519) => Self::new(KeyType::Ed25519, &bytes[2..]),
                Some(other) => Err(ParseKeyError::UnknownCurve(*other)),
                None => Err(ParseKeyError::InvalidLength {
                    expected: 34,
                    actual: bytes.len(),
                }),
            },
            Some(other) => Err(ParseKeyError::UnknownKeyType(format!("0x{other:02x}"))),
            None => Err(ParseKeyError::InvalidLength {
                expected: 33,
                actual: 0,
            }),
        }
    }

    /// Verify `signature` over `message`.
    pub fn verify(&self, message: &[u8], signature: &Signature) -> bool {
        use k256::ecdsa::signature::hazmat::PrehashVerifier;

        if !signature.scheme.supports(self.key_type) {
            return false;
        }
        let prehash = signature.scheme.prehash(message);
        match self.key_type {
            KeyType::P256 => {
                let (Ok(key), Ok(sig)) = (
                    p256::ecdsa::VerifyingKey::from_sec1_bytes(&self.data),
                    p256::ecdsa::Signature::from_slice(&signature.data),
                ) else {
                    return false;
                };
                key.verify_prehash(&prehash, &sig).is_ok()
            }
            KeyType::Secp256k1 => {
                let (Ok(key), Ok(sig)) = (
                    k256::ecdsa::VerifyingKey::from_sec1_bytes(&self.data),
                    k256::ecdsa::Signature::from_slice(&signature.data),
                ) else {
                    return false;
                };
                key.verify_prehash(&prehash, &sig).is_ok()
            }
            KeyType::Ed25519 => {
                let Ok(bytes) = <[u8; 32]>::try_from(self.data.as_slice()) else {
                    return false;
                };
                let Ok(key) = ed25519_dalek::VerifyingKey::from_bytes(&bytes) else {
                    return false;
                };
                let Ok(sig) = ed25519_dalek::Signature::from_slice(&signature.data) else {
                    return false;
                };
                key.verify(&prehash, &sig).is_ok()
            }
        }
    }

    /// Ordering key: algorithm, curve label, then the uncompressed X and Y
    /// coordinates. Ed25519 keys compare by their raw bytes.
    fn sort_key(&self) -> (u8, u8, Vec<u8>, Vec<u8>) {
        let (x, y) = match self.key_type {
            KeyType::P256 => p256::PublicKey::from_sec1_bytes(&self.data)
                .map(|k| split_point(k.to_encoded_point(false).as_bytes()))
                .unwrap_or_default(),
            KeyType::Secp256k1 => k256::PublicKey::from_sec1_bytes(&self.data)
                .map(|k| split_point(k.to_encoded_point(false).as_bytes()))
                .unwrap_or_default(),
            KeyType::Ed25519 => (self.data.clone(), Vec::new()),
        };
        (
            self.key_type.algorithm(),
            self.key_type.curve_label(),
            x,
            y,
        )
    }
}

fn split_point(uncompressed: &[u8]) -> (Vec<u8>, Vec<u8>) {
    // 0x04 || X || Y
    let coords = &uncompressed[1..];
    let (x, y) = coords.split_at(coords.len() / 2);
    (x.to_vec(), y.to_vec())
}

impl Ord for PublicKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.sort_key().cmp(&other.sort_key())
    }
}

impl PartialOrd for PublicKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Sorts keys into the canonical order used by multi-signature programs.
pub fn sort_public_keys(keys: &[PublicKey]) -> Vec<PublicKey> {
    let mut sorted = keys.to_vec();
    sorted.sort();
    sorted
}

impl FromStr for PublicKey {
    type Err = ParseKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = hex::decode(s).map_err(|e| ParseKeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(&bytes)
    }
}

impl TryFrom<&str> for PublicKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PublicKey({}:{})", self.key_type.as_str(), self)
    }
}

impl Serialize for PublicKey {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let s: String = Deserialize::deserialize(d)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

// ============================================================================
// SecretKey
// ============================================================================

#[derive(Clone)]
enum SecretInner {
    P256(p256::ecdsa::SigningKey),
    Secp256k1(k256::ecdsa::SigningKey),
    Ed25519(ed25519_dalek::SigningKey),
}

/// A private key.
#[derive(Clone)]
pub struct SecretKey {
    inner: SecretInner,
}

impl SecretKey {
    /// Generate a new random key of the given type.
    pub fn generate(key_type: KeyType) -> Self {
        let inner = match key_type {
            KeyType::P256 => SecretInner::P256(p256::ecdsa::SigningKey::random(&mut OsRng)),
            KeyType::Secp256k1 => {
                SecretInner::Secp256k1(k256::ecdsa::SigningKey::random(&mut OsRng))
            }
            KeyType::Ed25519 => {
                SecretInner::Ed25519(ed25519_dalek::SigningKey::generate(&mut OsRng))
            }
        };
        Self { inner }
    }

    /// Create from a 32-byte scalar (ECDSA) or seed (Ed25519).
    pub fn from_bytes(key_type: KeyType, bytes: &[u8]) -> Result<Self, ParseKeyError> {
        let arr: [u8; 32] = bytes.try_into().map_err(|_| ParseKeyError::InvalidLength {
            expected: 32,
            actual: bytes.len(),
        })?;
        let inner = match key_type {
            KeyType::P256 => SecretInner::P256(
                p256::ecdsa::SigningKey::from_slice(&arr)
                    .map_err(|_| ParseKeyError::InvalidCurvePoint)?,
            ),
            KeyType::Secp256k1 => SecretInner::Secp256k1(
                k256::ecdsa::SigningKey::from_slice(&arr)
                    .map_err(|_| ParseKeyError::InvalidCurvePoint)?,
            ),
            KeyType::Ed25519 => SecretInner::Ed25519(ed25519_dalek::SigningKey::from_bytes(&arr)),
        };
        Ok(Self { inner })
    }

    pub fn key_type(&self) -> KeyType {
        match self.inner {
            SecretInner::P256(_) => KeyType::P256,
            SecretInner::Secp256k1(_) => KeyType::Secp256k1,
            SecretInner::Ed25519(_) => KeyType::Ed25519,
        }
    }

    /// Raw 32 secret bytes.
    pub fn to_bytes(&self) -> [u8; 32] {
        match &self.inner {
            SecretInner::P256(k) => k.to_bytes().into(),
            SecretInner::Secp256k1(k) => k.to_bytes().into(),
            SecretInner::Ed25519(k) => k.to_bytes(),
        }
    }

    /// Derive the public key.
    pub fn public_key(&self) -> PublicKey {
        let (key_type, data) = match &self.inner {
            SecretInner::P256(k) => (
                KeyType::P256,
                k.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            ),
            SecretInner::Secp256k1(k) => (
                KeyType::Secp256k1,
                k.verifying_key().to_encoded_point(true).as_bytes().to_vec(),
            ),
            SecretInner::Ed25519(k) => (KeyType::Ed25519, k.verifying_key().to_bytes().to_vec()),
        };
        PublicKey { key_type, data }
    }

    /// Sign with the key type's default scheme.
    pub fn sign(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.sign_with_scheme(self.key_type().default_scheme(), message)
    }

    /// Sign with an explicit scheme.
    pub fn sign_with_scheme(
        &self,
        scheme: SignatureScheme,
        message: &[u8],
    ) -> Result<Signature, SignerError> {
        use k256::ecdsa::signature::hazmat::PrehashSigner;

        if !scheme.supports(self.key_type()) {
            return Err(SignerError::SchemeMismatch {
                scheme: scheme.as_str(),
                key_type: self.key_type().as_str(),
            });
        }
        let prehash = scheme.prehash(message);
        let data = match &self.inner {
            SecretInner::P256(k) => {
                let sig: p256::ecdsa::Signature = k
                    .sign_prehash(&prehash)
                    .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
                sig.to_bytes().to_vec()
            }
            SecretInner::Secp256k1(k) => {
                let sig: k256::ecdsa::Signature = k
                    .sign_prehash(&prehash)
                    .map_err(|e| SignerError::SigningFailed(e.to_string()))?;
                sig.to_bytes().to_vec()
            }
            SecretInner::Ed25519(k) => k.sign(&prehash).to_bytes().to_vec(),
        };
        Ok(Signature { scheme, data })
    }
}

impl FromStr for SecretKey {
    type Err = ParseKeyError;

    /// Accepts `<hex>` (P-256) or `<p256|secp256k1|ed25519>:<hex>`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (key_type, data_str) = match s.split_once(':') {
            Some((key_type, data)) => (key_type.parse()?, data),
            None => (KeyType::P256, s),
        };
        let data = hex::decode(data_str).map_err(|e| ParseKeyError::InvalidHex(e.to_string()))?;
        Self::from_bytes(key_type, &data)
    }
}

impl TryFrom<&str> for SecretKey {
    type Error = ParseKeyError;

    fn try_from(s: &str) -> Result<Self, Self::Error> {
        s.parse()
    }
}

impl Display for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}",
            self.key_type().as_str(),
            hex::encode(self.to_bytes())
        )
    }
}

impl Debug for SecretKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretKey({}:***)", self.key_type().as_str())
    }
}

// ============================================================================
// Signature
// ============================================================================

/// A signature tagged with its scheme.
#[derive(Clone, PartialEq, Eq)]
pub struct Signature {
    scheme: SignatureScheme,
    data: Vec<u8>,
}

impl Signature {
    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }

    /// The 64 raw signature bytes (`r || s` for ECDSA).
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Scheme byte followed by the raw signature.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.data.len() + 1);
        out.push(self.scheme as u8);
        out.extend_from_slice(&self.data);
        out
    }

    /// Parses the serialized form. A bare 64-byte value is taken as
    /// SHA256withECDSA.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        match bytes.len() {
            64 => Ok(Self {
                scheme: SignatureScheme::Sha256WithEcdsa,
                data: bytes.to_vec(),
            }),
            65 => Ok(Self {
                scheme: SignatureScheme::try_from(bytes[0])?,
                data: bytes[1..].to_vec(),
            }),
            n => Err(DecodeError::InvalidSignature(format!(
                "expected 64 or 65 bytes, got {n}"
            ))),
        }
    }
}

impl Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.to_bytes()))
    }
}

impl Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Signature({}:{})", self.scheme.as_str(), self)
    }
}
