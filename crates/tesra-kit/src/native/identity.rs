//! TsrId: decentralized identities.
//!
//! An identity is a string such as `did:tesra:<base58 address>` owning a
//! set of public keys, attributes and an optional recovery address. Every
//! change must be signed by a controller, an account holding one of the
//! identity's keys. The controller signs after the client's signer, which
//! pays for gas.

use crate::client::{GasSettings, InvokeBuilder, Signer};
use crate::codec::Source;
use crate::error::{DecodeError, Error};
use crate::types::{Address, KeyType, PublicKey};
use crate::vm::InvokeParam;

use super::{NativeCall, NativeContract, TSR_ID_CONTRACT};

/// A typed attribute attached to an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DdoAttribute {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
    pub value_type: Vec<u8>,
}

impl DdoAttribute {
    pub fn new(
        key: impl Into<Vec<u8>>,
        value: impl Into<Vec<u8>>,
        value_type: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
            value_type: value_type.into(),
        }
    }

    fn to_param(&self) -> InvokeParam {
        InvokeParam::structure([
            self.key.as_slice(),
            self.value.as_slice(),
            self.value_type.as_slice(),
        ])
    }
}

/// One of an identity's public keys.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DdoOwner {
    pub pub_key_index: u32,
    /// `<identity>#keys-<index>`.
    pub pub_key_id: String,
    pub key_type: String,
    pub curve: String,
    /// Hex of the serialized key.
    pub value: String,
}

/// The full description document of an identity.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Ddo {
    pub tsr_id: String,
    pub owners: Vec<DdoOwner>,
    pub attributes: Vec<DdoAttribute>,
    pub recovery: Option<Address>,
}

fn key_labels(key_type: KeyType) -> (&'static str, &'static str) {
    match key_type {
        KeyType::P256 => ("ECDSA", "P-256"),
        KeyType::Secp256k1 => ("ECDSA", "secp256k1"),
        KeyType::Ed25519 => ("EDDSA", "ed25519"),
    }
}

/// Index-prefixed public keys, as stored by the contract.
fn parse_public_keys(tsr_id: &str, data: &[u8]) -> Result<Vec<DdoOwner>, DecodeError> {
    let mut source = Source::new(data);
    let mut owners = Vec::new();
    while !source.is_empty() {
        let index = source.read_u32()?;
        let raw = source.read_var_bytes()?;
        let key = PublicKey::from_bytes(raw)?;
        let (key_type, curve) = key_labels(key.key_type());
        owners.push(DdoOwner {
            pub_key_index: index,
            pub_key_id: format!("{tsr_id}#keys-{index}"),
            key_type: key_type.to_string(),
            curve: curve.to_string(),
            value: hex::encode(raw),
        });
    }
    Ok(owners)
}

/// Attributes as stored by the contract, newest first; returned oldest first.
fn parse_attributes(data: &[u8]) -> Result<Vec<DdoAttribute>, DecodeError> {
    let mut source = Source::new(data);
    let mut attributes = Vec::new();
    while !source.is_empty() {
        let key = source.read_var_bytes()?.to_vec();
        let value_type = source.read_var_bytes()?.to_vec();
        let value = source.read_var_bytes()?.to_vec();
        attributes.push(DdoAttribute {
            key,
            value,
            value_type,
        });
    }
    attributes.reverse();
    Ok(attributes)
}

fn parse_ddo(tsr_id: &str, data: &[u8]) -> Result<Ddo, DecodeError> {
    let mut source = Source::new(data);
    let owners = parse_public_keys(tsr_id, source.read_var_bytes()?)?;
    let attributes = parse_attributes(source.read_var_bytes()?)?;
    let recovery = match source.read_var_bytes()? {
        [] => None,
        raw => Some(Address::try_from(raw)?),
    };
    Ok(Ddo {
        tsr_id: tsr_id.to_string(),
        owners,
        attributes,
        recovery,
    })
}

/// The TsrId native contract.
#[derive(Clone, Debug)]
pub struct TsrId {
    native: NativeContract,
}

impl TsrId {
    pub(crate) fn new(native: NativeContract) -> Self {
        Self { native }
    }

    fn call(method: &str, params: Vec<InvokeParam>) -> NativeCall {
        NativeCall::new(TSR_ID_CONTRACT, method, params)
    }

    /// A write whose single argument is a struct; co-signed by `controller`.
    fn controlled(
        &self,
        method: &str,
        fields: Vec<InvokeParam>,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        self.native
            .invoke(Self::call(method, vec![InvokeParam::Struct(fields)]))
            .co_sign(controller)
    }

    fn controller_key(controller: &impl Signer) -> PublicKey {
        controller.key().public_key().clone()
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `tsr_id` with the controller's key as its first owner.
    pub fn register_with_public_key(
        &self,
        tsr_id: &str,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "regIDWithPublicKey",
            vec![tsr_id.into(), (&key).into()],
            controller,
        )
    }

    pub fn register_with_attributes(
        &self,
        tsr_id: &str,
        controller: impl Signer + 'static,
        attributes: &[DdoAttribute],
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "regIDWithAttributes",
            vec![
                tsr_id.into(),
                (&key).into(),
                InvokeParam::list(attributes.iter().map(DdoAttribute::to_param)),
            ],
            controller,
        )
    }

    // ========================================================================
    // Keys and recovery
    // ========================================================================

    pub fn add_key(
        &self,
        tsr_id: &str,
        new_key: &PublicKey,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "addKey",
            vec![tsr_id.into(), new_key.into(), (&key).into()],
            controller,
        )
    }

    pub fn revoke_key(
        &self,
        tsr_id: &str,
        removed_key: &PublicKey,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "removeKey",
            vec![tsr_id.into(), removed_key.into(), (&key).into()],
            controller,
        )
    }

    pub fn set_recovery(
        &self,
        tsr_id: &str,
        recovery: &Address,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "addRecovery",
            vec![tsr_id.into(), recovery.into(), (&key).into()],
            controller,
        )
    }

    /// Replace the recovery address. Signed by the current recovery account
    /// rather than a key owner.
    pub fn change_recovery(
        &self,
        tsr_id: &str,
        new_recovery: &Address,
        old_recovery: &Address,
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        self.controlled(
            "changeRecovery",
            vec![tsr_id.into(), new_recovery.into(), old_recovery.into()],
            controller,
        )
    }

    // ========================================================================
    // Attributes
    // ========================================================================

    pub fn add_attributes(
        &self,
        tsr_id: &str,
        attributes: &[DdoAttribute],
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let key = Self::controller_key(&controller);
        self.controlled(
            "addAttributes",
            vec![
                tsr_id.into(),
                InvokeParam::list(attributes.iter().map(DdoAttribute::to_param)),
                (&key).into(),
            ],
            controller,
        )
    }

    pub fn remove_attribute(
        &self,
        tsr_id: &str,
        key: &[u8],
        controller: impl Signer + 'static,
    ) -> InvokeBuilder {
        let pub_key = Self::controller_key(&controller);
        self.controlled(
            "removeAttribute",
            vec![tsr_id.into(), key.into(), (&pub_key).into()],
            controller,
        )
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub async fn get_ddo(&self, tsr_id: &str) -> Result<Ddo, Error> {
        let result = self
            .native
            .read(Self::call("getDDO", vec![tsr_id.into()]))
            .await?;
        Ok(parse_ddo(tsr_id, &result.to_byte_array()?)?)
    }

    pub async fn get_public_keys(&self, tsr_id: &str) -> Result<Vec<DdoOwner>, Error> {
        let result = self
            .native
            .read(Self::call("getPublicKeys", vec![tsr_id.into()]))
            .await?;
        Ok(parse_public_keys(tsr_id, &result.to_byte_array()?)?)
    }

    pub async fn get_attributes(&self, tsr_id: &str) -> Result<Vec<DdoAttribute>, Error> {
        let result = self
            .native
            .read(Self::call("getAttributes", vec![tsr_id.into()]))
            .await?;
        Ok(parse_attributes(&result.to_byte_array()?)?)
    }

    /// State of the key at `key_index`, e.g. `"in use"` or `"revoked"`.
    pub async fn get_key_state(&self, tsr_id: &str, key_index: u32) -> Result<String, Error> {
        let param = InvokeParam::structure([InvokeParam::from(tsr_id), key_index.into()]);
        let result = self
            .native
            .read(Self::call("getKeyState", vec![param]))
            .await?;
        Ok(result.to_string()?)
    }

    /// Whether `controller` holds the key at `key_index` of `tsr_id`. The
    /// check runs as a signed dry run; nothing is submitted.
    pub async fn verify_signature(
        &self,
        tsr_id: &str,
        key_index: u32,
        controller: &dyn Signer,
    ) -> Result<bool, Error> {
        let call = Self::call("verifySignature", vec![tsr_id.into(), key_index.into()]);
        let mut tx = self
            .native
            .new_native_invoke_transaction(GasSettings::ZERO, &call)?;
        let tesra = self.native.tesra();
        tesra.sign_to_transaction(&mut tx, controller).await?;
        let result = tesra.pre_exec_transaction(&tx).await?;
        Ok(result.result.to_bool()?)
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::client::Account;
    use crate::client::mock::MockTransport;
    use crate::codec::Sink;
    use crate::native::PayloadParam;
    use crate::native::test_utils::*;
    use crate::vm::StackItem;

    const ID: &str = "did:tesra:TQNmpE3T5qxJfrCfwFrLhhnuqHRWjR1nh4";

    fn bytes(b: &[u8]) -> StackItem {
        StackItem::Bytes(b.to_vec())
    }

    fn raw_param(param: PayloadParam) -> Vec<StackItem> {
        match param {
            PayloadParam::Raw(items) => items,
            other => panic!("unexpected param: {other:?}"),
        }
    }

    // ========================================================================
    // Writes
    // ========================================================================

    #[tokio::test]
    async fn test_register_signed_by_payer_then_controller() {
        let (tesra, account, mock) = signed_client(MockTransport::builder());
        let controller = Account::random(KeyType::P256).unwrap();
        let controller_key = controller.public_key().to_bytes();

        tesra
            .tsr_id()
            .register_with_public_key(ID, controller.clone())
            .await
            .unwrap();

        let payload = sent_payload(&mock, "sendrawtransaction", 0);
        assert_eq!(payload.contract, TSR_ID_CONTRACT);
        assert_eq!(payload.function_name, "regIDWithPublicKey");
        assert_eq!(
            raw_param(payload.param),
            vec![StackItem::Struct(vec![
                bytes(ID.as_bytes()),
                bytes(&controller_key)
            ])]
        );

        let tx = sent_transaction(&mock, "sendrawtransaction", 0);
        assert_eq!(tx.payer, address_of(&account));
        assert_eq!(
            tx.signer_addresses().unwrap(),
            vec![address_of(&account), address_of(&controller)]
        );
        assert!(tx.verify_signatures());
    }

    #[tokio::test]
    async fn test_register_with_attributes() {
        let (tesra, _, mock) = signed_client(MockTransport::builder());
        let controller = Account::random(KeyType::Ed25519).unwrap();
        let attributes = [
            DdoAttribute::new("email", "a@b.c", "string"),
            DdoAttribute::new("age", "42", "int"),
        ];

        tesra
            .tsr_id()
            .register_with_attributes(ID, controller.clone(), &attributes)
            .await
            .unwrap();

        let items = raw_param(sent_payload(&mock, "sendrawtransaction", 0).param);
        let fields = items[0].as_items().unwrap();
        assert_eq!(fields.len(), 3);
        assert_eq!(
            fields[2],
            StackItem::Array(vec![
                StackItem::Struct(vec![bytes(b"email"), bytes(b"a@b.c"), bytes(b"string")]),
                StackItem::Struct(vec![bytes(b"age"), bytes(b"42"), bytes(b"int")]),
            ])
        );
    }

    #[tokio::test]
    async fn test_key_and_recovery_changes() {
        let (tesra, _, mock) = signed_client(MockTransport::builder());
        let controller = Account::random(KeyType::P256).unwrap();
        let new_key = Account::random(KeyType::Secp256k1).unwrap().public_key().clone();
        let recovery = Address::native(9);
        let tsr_id = tesra.tsr_id();

        tsr_id.add_key(ID, &new_key, controller.clone()).await.unwrap();
        tsr_id.revoke_key(ID, &new_key, controller.clone()).await.unwrap();
        tsr_id.set_recovery(ID, &recovery, controller.clone()).await.unwrap();
        tsr_id
            .change_recovery(ID, &Address::native(8), &recovery, controller.clone())
            .await
            .unwrap();
        tsr_id.remove_attribute(ID, b"email", controller).await.unwrap();

        let methods: Vec<_> = (0..5)
            .map(|i| sent_payload(&mock, "sendrawtransaction", i).function_name)
            .collect();
        assert_eq!(
            methods,
            ["addKey", "removeKey", "addRecovery", "changeRecovery", "removeAttribute"]
        );

        let change = raw_param(sent_payload(&mock, "sendrawtransaction", 3).param);
        assert_eq!(
            change,
            vec![StackItem::Struct(vec![
                bytes(ID.as_bytes()),
                bytes(Address::native(8).as_bytes()),
                bytes(recovery.as_bytes()),
            ])]
        );
    }

    // ========================================================================
    // Reads
    // ========================================================================

    fn stored_keys(keys: &[(u32, &PublicKey)]) -> Vec<u8> {
        let mut sink = Sink::new();
        for (index, key) in keys {
            sink.write_u32(*index);
            sink.write_var_bytes(&key.to_bytes());
        }
        sink.into_bytes()
    }

    fn stored_attributes(attributes: &[DdoAttribute]) -> Vec<u8> {
        let mut sink = Sink::new();
        for attr in attributes {
            sink.write_var_bytes(&attr.key);
            sink.write_var_bytes(&attr.value_type);
            sink.write_var_bytes(&attr.value);
        }
        sink.into_bytes()
    }

    #[test]
    fn test_parse_public_keys() {
        let p256 = Account::random(KeyType::P256).unwrap().public_key().clone();
        let ed = Account::random(KeyType::Ed25519).unwrap().public_key().clone();
        let owners = parse_public_keys(ID, &stored_keys(&[(1, &p256), (2, &ed)])).unwrap();

        assert_eq!(owners.len(), 2);
        assert_eq!(owners[0].pub_key_id, format!("{ID}#keys-1"));
        assert_eq!(owners[0].key_type, "ECDSA");
        assert_eq!(owners[0].curve, "P-256");
        assert_eq!(owners[0].value, hex::encode(p256.to_bytes()));
        assert_eq!(owners[1].pub_key_index, 2);
        assert_eq!(owners[1].key_type, "EDDSA");
    }

    #[test]
    fn test_parse_attributes_reverses_storage_order() {
        let stored = [
            DdoAttribute::new("b", "2", "int"),
            DdoAttribute::new("a", "1", "int"),
        ];
        let parsed = parse_attributes(&stored_attributes(&stored)).unwrap();
        assert_eq!(parsed, vec![stored[1].clone(), stored[0].clone()]);
    }

    #[test]
    fn test_parse_truncated_keys() {
        assert!(parse_public_keys(ID, &[0x01, 0x00]).is_err());
    }

    #[tokio::test]
    async fn test_get_ddo() {
        let key = Account::random(KeyType::P256).unwrap().public_key().clone();
        let recovery = Address::native(9);
        let mut sink = Sink::new();
        sink.write_var_bytes(&stored_keys(&[(1, &key)]));
        sink.write_var_bytes(&stored_attributes(&[DdoAttribute::new("k", "v", "string")]));
        sink.write_var_bytes(recovery.as_bytes());
        let data = hex::encode(sink.into_bytes());

        let (tesra, _, mock) = signed_client(
            MockTransport::builder().with_sequence("sendrawtransaction", [pre_exec_ok(json!(data))]),
        );
        let ddo = tesra.tsr_id().get_ddo(ID).await.unwrap();
        assert_eq!(ddo.tsr_id, ID);
        assert_eq!(ddo.owners.len(), 1);
        assert_eq!(ddo.attributes, vec![DdoAttribute::new("k", "v", "string")]);
        assert_eq!(ddo.recovery, Some(recovery));
        assert_eq!(
            sent_payload(&mock, "sendrawtransaction", 0).function_name,
            "getDDO"
        );
    }

    #[tokio::test]
    async fn test_get_ddo_without_recovery() {
        let mut sink = Sink::new();
        sink.write_var_bytes(&[]);
        sink.write_var_bytes(&[]);
        sink.write_var_bytes(&[]);
        let data = hex::encode(sink.into_bytes());
        let (tesra, _, _) = signed_client(
            MockTransport::builder().with_sequence("sendrawtransaction", [pre_exec_ok(json!(data))]),
        );
        let ddo = tesra.tsr_id().get_ddo(ID).await.unwrap();
        assert!(ddo.owners.is_empty());
        assert!(ddo.recovery.is_none());
    }

    #[tokio::test]
    async fn test_get_key_state() {
        let (tesra, _, mock) = signed_client(MockTransport::builder().with_sequence(
            "sendrawtransaction",
            [pre_exec_ok(json!(hex::encode("in use")))],
        ));
        assert_eq!(tesra.tsr_id().get_key_state(ID, 1).await.unwrap(), "in use");
        assert_eq!(
            raw_param(sent_payload(&mock, "sendrawtransaction", 0).param),
            vec![StackItem::Struct(vec![
                bytes(ID.as_bytes()),
                StackItem::Integer(1.into())
            ])]
        );
    }

    #[tokio::test]
    async fn test_verify_signature_is_signed_dry_run() {
        let controller = Account::random(KeyType::P256).unwrap();
        let (tesra, _, mock) = signed_client(
            MockTransport::builder().with_sequence("sendrawtransaction", [pre_exec_ok(json!("01"))]),
        );

        assert!(
            tesra
                .tsr_id()
                .verify_signature(ID, 1, &controller)
                .await
                .unwrap()
        );

        let (_, params) = &mock.calls()[0];
        assert_eq!(params.len(), 2);
        let tx = sent_transaction(&mock, "sendrawtransaction", 0);
        assert_eq!(tx.signer_addresses().unwrap(), vec![address_of(&controller)]);
        assert_eq!((tx.gas_price, tx.gas_limit), (0, 0));
    }
}
