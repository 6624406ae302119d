//! Signer trait and implementations.
//!
//! A `Signer` knows which address it signs for and provides keys for signing.
//! The `key()` method returns a `SigningKey` that bundles together the public
//! key and signing capability.
//!
//! # Example
//!
//! ```rust,no_run
//! use tesra_kit::{Account, Tesra};
//!
//! # async fn example() -> Result<(), tesra_kit::Error> {
//! let account = Account::new(
//!     "c19f16785b8f3543bbaf5e1dbb5d398dfa6c85aaad54fc9d71203ce83e505c07",
//! )?;
//!
//! let tesra = Tesra::testnet()
//!     .signer(account)
//!     .build();
//!
//! let balance = tesra.tsr().balance_of(&tesra.signer_address()?).await?;
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use futures::future::{self, BoxFuture};

use crate::error::{EncodeError, SignerError};
use crate::types::program::single_sig_program;
use crate::types::{Address, KeyType, PublicKey, SecretKey, Signature, SignatureScheme};

// ============================================================================
// Signer Trait
// ============================================================================

/// Something that signs on behalf of one account.
///
/// Multi-signature accounts are not signers themselves; each member signs
/// through [`InvokeBuilder::multi_sign`](crate::InvokeBuilder::multi_sign).
///
/// # Example Implementation
///
/// ```rust,ignore
/// use tesra_kit::{Address, SecretKey, Signer, SigningKey, SignatureScheme};
///
/// /// Signs with SHA3-256 for an account created by another wallet.
/// struct Sha3Wallet {
///     address: Address,
///     secret_key: SecretKey,
/// }
///
/// impl Signer for Sha3Wallet {
///     fn address(&self) -> &Address {
///         &self.address
///     }
///
///     fn key(&self) -> SigningKey {
///         SigningKey::with_scheme(self.secret_key.clone(), SignatureScheme::Sha3_256WithEcdsa)
///     }
/// }
/// ```
pub trait Signer: Send + Sync {
    /// The address this signer signs for.
    fn address(&self) -> &Address;

    /// A key for the next signature.
    fn key(&self) -> SigningKey;
}

impl Signer for Arc<dyn Signer> {
    fn address(&self) -> &Address {
        (**self).address()
    }

    fn key(&self) -> SigningKey {
        (**self).key()
    }
}

// ============================================================================
// SigningKey
// ============================================================================

/// A key that can sign messages.
///
/// Bundles a public key with the ability to sign using the matching private
/// key. Signing is async so remote backends fit behind the same interface.
pub struct SigningKey {
    public_key: PublicKey,
    backend: Arc<dyn SigningBackend>,
}

impl SigningKey {
    /// Signs with the key type's default scheme.
    pub fn new(secret_key: SecretKey) -> Self {
        let scheme = secret_key.key_type().default_scheme();
        Self::with_scheme(secret_key, scheme)
    }

    pub fn with_scheme(secret_key: SecretKey, scheme: SignatureScheme) -> Self {
        let public_key = secret_key.public_key();
        Self {
            public_key,
            backend: Arc::new(SecretKeyBackend { secret_key, scheme }),
        }
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub async fn sign(&self, message: &[u8]) -> Result<Signature, SignerError> {
        self.backend.sign(message).await
    }
}

impl Clone for SigningKey {
    fn clone(&self) -> Self {
        Self {
            public_key: self.public_key.clone(),
            backend: self.backend.clone(),
        }
    }
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningKey")
            .field("public_key", &self.public_key)
            .finish()
    }
}

// ============================================================================
// SigningBackend (internal)
// ============================================================================

trait SigningBackend: Send + Sync {
    fn sign(
        &self,
        message: &[u8],
    ) -> BoxFuture<'_, Result<Signature, SignerError>>;
}

struct SecretKeyBackend {
    secret_key: SecretKey,
    scheme: SignatureScheme,
}

impl SigningBackend for SecretKeyBackend {
    fn sign(
        &self,
        message: &[u8],
    ) -> BoxFuture<'_, Result<Signature, SignerError>> {
        let sig = self.secret_key.sign_with_scheme(self.scheme, message);
        Box::pin(future::ready(sig))
    }
}

// ============================================================================
// Account
// ============================================================================

/// A single key held in memory, together with the address it controls.
#[derive(Clone)]
pub struct Account {
    address: Address,
    secret_key: SecretKey,
    public_key: PublicKey,
    scheme: SignatureScheme,
}

impl Account {
    /// Create an account from a secret key string.
    ///
    /// Accepts bare hex (P-256) or `<p256|secp256k1|ed25519>:<hex>`.
    pub fn new(secret_key: impl AsRef<str>) -> Result<Self, crate::error::Error> {
        let secret_key: SecretKey = secret_key.as_ref().parse()?;
        Ok(Self::from_secret_key(secret_key)?)
    }

    pub fn from_secret_key(secret_key: SecretKey) -> Result<Self, EncodeError> {
        let public_key = secret_key.public_key();
        let address = Address::from_program(&single_sig_program(&public_key)?);
        Ok(Self {
            address,
            scheme: secret_key.key_type().default_scheme(),
            secret_key,
            public_key,
        })
    }

    /// A fresh random account.
    pub fn random(key_type: KeyType) -> Result<Self, EncodeError> {
        Self::from_secret_key(SecretKey::generate(key_type))
    }

    /// Use a non-default signature scheme (e.g. SHA3-256 with ECDSA).
    pub fn with_scheme(mut self, scheme: SignatureScheme) -> Self {
        self.scheme = scheme;
        self
    }

    pub fn public_key(&self) -> &PublicKey {
        &self.public_key
    }

    pub fn scheme(&self) -> SignatureScheme {
        self.scheme
    }
}

impl std::fmt::Debug for Account {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Account")
            .field("address", &self.address)
            .field("public_key", &self.public_key)
            .finish()
    }
}

impl Signer for Account {
    fn address(&self) -> &Address {
        &self.address
    }

    fn key(&self) -> SigningKey {
        SigningKey::with_scheme(self.secret_key.clone(), self.scheme)
    }
}
