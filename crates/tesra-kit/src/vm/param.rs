//! Invocation parameters.

use num_bigint::BigInt;

use crate::types::{Address, PublicKey};

/// A value passed to a contract method.
///
/// The builder walks this tree recursively. `Struct` is encoded as a VM
/// struct (fields appended one by one) while `List` is encoded as a packed
/// array.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeParam {
    Bool(bool),
    Integer(BigInt),
    Bytes(Vec<u8>),
    String(String),
    Address(Address),
    List(Vec<InvokeParam>),
    Struct(Vec<InvokeParam>),
}

impl InvokeParam {
    /// Convenience for building a struct from anything convertible.
    pub fn structure<I, P>(fields: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<InvokeParam>,
    {
        InvokeParam::Struct(fields.into_iter().map(Into::into).collect())
    }

    /// Convenience for building a packed list from anything convertible.
    pub fn list<I, P>(items: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<InvokeParam>,
    {
        InvokeParam::List(items.into_iter().map(Into::into).collect())
    }

    /// Short type name used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            InvokeParam::Bool(_) => "bool",
            InvokeParam::Integer(_) => "integer",
            InvokeParam::Bytes(_) => "bytes",
            InvokeParam::String(_) => "string",
            InvokeParam::Address(_) => "address",
            InvokeParam::List(_) => "list",
            InvokeParam::Struct(_) => "struct",
        }
    }
}

impl From<bool> for InvokeParam {
    fn from(v: bool) -> Self {
        InvokeParam::Bool(v)
    }
}

macro_rules! impl_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for InvokeParam {
                fn from(v: $t) -> Self {
                    InvokeParam::Integer(BigInt::from(v))
                }
            }
        )*
    };
}

impl_from_int!(u8, u16, u32, u64, u128, i8, i16, i32, i64, i128, usize);

impl From<BigInt> for InvokeParam {
    fn from(v: BigInt) -> Self {
        InvokeParam::Integer(v)
    }
}

impl From<Vec<u8>> for InvokeParam {
    fn from(v: Vec<u8>) -> Self {
        InvokeParam::Bytes(v)
    }
}

impl From<&[u8]> for InvokeParam {
    fn from(v: &[u8]) -> Self {
        InvokeParam::Bytes(v.to_vec())
    }
}

impl From<String> for InvokeParam {
    fn from(v: String) -> Self {
        InvokeParam::String(v)
    }
}

impl From<&str> for InvokeParam {
    fn from(v: &str) -> Self {
        InvokeParam::String(v.to_string())
    }
}

impl From<Address> for InvokeParam {
    fn from(v: Address) -> Self {
        InvokeParam::Address(v)
    }
}

impl From<&Address> for InvokeParam {
    fn from(v: &Address) -> Self {
        InvokeParam::Address(*v)
    }
}

/// Public keys travel as their serialized bytes.
impl From<&PublicKey> for InvokeParam {
    fn from(v: &PublicKey) -> Self {
        InvokeParam::Bytes(v.to_bytes())
    }
}

impl From<Vec<InvokeParam>> for InvokeParam {
    fn from(v: Vec<InvokeParam>) -> Self {
        InvokeParam::List(v)
    }
}
