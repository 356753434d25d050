//! Typed values of every lock characteristic
//!
//! Commands share one authenticated shape:
//!
//! ```text
//! [subject id 16][nonce 16][fields ...][tag 64]
//! ```
//!
//! where `tag = HMAC-SHA512(subject key, characteristic uuid || nonce || fields)`.
//! The UUID is not sent; it binds the tag to the characteristic the command
//! was written for. Encrypted fields use AES-256-CTR and carry their IV
//! inside `fields`, so the tag covers it.

use uuid::Uuid;

use crate::ble;
use crate::codec::{expect_len, CodecError, Reader};
use crate::crypto::{self, KEY_LEN};
use crate::key::{InitializationVector, Key, KeyData, KeyEntry, KeyName, Nonce, Tag};
use crate::permission::Permission;
use crate::secret::SharedSecret;
use crate::status::{Model, PackageVersion, Status};

/// A value carried by one GATT characteristic
pub trait Characteristic: Sized {
    const UUID: Uuid;
    const NAME: &'static str;

    fn to_bytes(&self) -> Vec<u8>;
    fn from_bytes(data: &[u8]) -> Result<Self, CodecError>;
}

/// A command authenticated with the key of its subject
pub trait Authenticated: Characteristic {
    /// Key (or pending child) the tag is computed with
    fn identifier(&self) -> Uuid;
    fn nonce(&self) -> &Nonce;
    fn tag(&self) -> &Tag;

    /// The authenticated bytes: nonce followed by every field up to the tag
    fn message(&self) -> Vec<u8>;

    /// What the tag is computed over: [`message`](Self::message) prefixed
    /// with the characteristic UUID
    fn signed_message(&self) -> Vec<u8> {
        signed(&Self::UUID, &self.message())
    }

    fn authenticated_with(&self, key: &KeyData) -> bool {
        crypto::verify(key, &self.signed_message(), self.tag())
    }
}

fn signed(uuid: &Uuid, message: &[u8]) -> Vec<u8> {
    let mut buf = Vec::with_capacity(ID_LEN + message.len());
    buf.extend_from_slice(uuid.as_bytes());
    buf.extend_from_slice(message);
    buf
}

/// Exact length of a write to `uuid`, if it is a command characteristic
pub fn command_length(uuid: &Uuid) -> Option<usize> {
    Some(match *uuid {
        ble::SETUP_UUID => SetupCommand::LENGTH,
        ble::UNLOCK_UUID => UnlockCommand::LENGTH,
        ble::NEW_KEY_PARENT_UUID => NewKeyParentCommand::LENGTH,
        ble::NEW_KEY_CHILD_UUID => NewKeyChildCommand::LENGTH,
        ble::HOMEKIT_ENABLE_UUID => HomeKitEnableCommand::LENGTH,
        ble::UPDATE_UUID => UpdateCommand::LENGTH,
        ble::LIST_KEYS_COMMAND_UUID => ListKeysCommand::LENGTH,
        ble::REMOVE_KEY_UUID => RemoveKeyCommand::LENGTH,
        _ => return None,
    })
}

const ID_LEN: usize = 16;
const HEADER_LEN: usize = ID_LEN + Nonce::LENGTH;

fn to_wire<A: Authenticated>(command: &A, capacity: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(capacity);
    buf.extend_from_slice(command.identifier().as_bytes());
    buf.extend_from_slice(&command.message());
    buf.extend_from_slice(command.tag().as_bytes());
    buf
}

fn read_nonce(reader: &mut Reader<'_>) -> Result<Nonce, CodecError> {
    Ok(Nonce::from(reader.array::<{ Nonce::LENGTH }>()?))
}

fn read_iv(reader: &mut Reader<'_>) -> Result<InitializationVector, CodecError> {
    Ok(InitializationVector::from(
        reader.array::<{ InitializationVector::LENGTH }>()?,
    ))
}

fn read_tag(reader: &mut Reader<'_>) -> Result<Tag, CodecError> {
    Ok(Tag::from(reader.array::<{ Tag::LENGTH }>()?))
}

fn placeholder_tag() -> Tag {
    Tag::from([0u8; Tag::LENGTH])
}

/// Lock identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdentifierValue(pub Uuid);

impl Characteristic for IdentifierValue {
    const UUID: Uuid = ble::IDENTIFIER_UUID;
    const NAME: &'static str = "Identifier";

    fn to_bytes(&self) -> Vec<u8> {
        self.0.as_bytes().to_vec()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, ID_LEN)?;
        Reader::new(Self::NAME, data).uuid().map(Self)
    }
}

/// Hardware model
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ModelValue(pub Model);

impl Characteristic for ModelValue {
    const UUID: Uuid = ble::MODEL_UUID;
    const NAME: &'static str = "Model";

    fn to_bytes(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, 1)?;
        Model::try_from(data[0]).map(Self)
    }
}

/// Protocol version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionValue(pub u64);

impl Characteristic for VersionValue {
    const UUID: Uuid = ble::VERSION_UUID;
    const NAME: &'static str = "Version";

    fn to_bytes(&self) -> Vec<u8> {
        self.0.to_be_bytes().to_vec()
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, 8)?;
        Reader::new(Self::NAME, data).u64().map(Self)
    }
}

/// Software package version
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackageVersionValue(pub PackageVersion);

impl Characteristic for PackageVersionValue {
    const UUID: Uuid = ble::PACKAGE_VERSION_UUID;
    const NAME: &'static str = "PackageVersion";

    fn to_bytes(&self) -> Vec<u8> {
        let v = &self.0;
        let mut buf = Vec::with_capacity(6);
        buf.extend_from_slice(&v.major.to_be_bytes());
        buf.extend_from_slice(&v.minor.to_be_bytes());
        buf.extend_from_slice(&v.patch.to_be_bytes());
        buf
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, 6)?;
        let mut r = Reader::new(Self::NAME, data);
        Ok(Self(PackageVersion {
            major: r.u16()?,
            minor: r.u16()?,
            patch: r.u16()?,
        }))
    }
}

/// Lock status
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusValue(pub Status);

impl Characteristic for StatusValue {
    const UUID: Uuid = ble::STATUS_UUID;
    const NAME: &'static str = "Status";

    fn to_bytes(&self) -> Vec<u8> {
        vec![self.0 as u8]
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, 1)?;
        Status::try_from(data[0]).map(Self)
    }
}

/// Install the owner key
///
/// The new key's secret travels encrypted under the lock's setup secret,
/// which also authenticates the command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SetupCommand {
    pub identifier: Uuid,
    pub nonce: Nonce,
    pub iv: InitializationVector,
    pub encrypted_key: [u8; KEY_LEN],
    pub tag: Tag,
}

impl SetupCommand {
    pub const LENGTH: usize = HEADER_LEN + InitializationVector::LENGTH + KEY_LEN + Tag::LENGTH;

    pub fn new(setup_secret: &KeyData, key: &Key) -> Self {
        let (ciphertext, iv) = crypto::encrypt(setup_secret, key.data.as_bytes());
        let mut encrypted_key = [0u8; KEY_LEN];
        encrypted_key.copy_from_slice(&ciphertext);
        let mut command = Self {
            identifier: key.identifier,
            nonce: Nonce::random(),
            iv,
            encrypted_key,
            tag: placeholder_tag(),
        };
        command.tag = crypto::authenticate(setup_secret, &command.signed_message());
        command
    }

    pub fn decrypt(&self, setup_secret: &KeyData) -> KeyData {
        let plain = crypto::decrypt(setup_secret, &self.iv, &self.encrypted_key);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&plain);
        KeyData::from(bytes)
    }
}

impl Authenticated for SetupCommand {
    fn identifier(&self) -> Uuid {
        self.identifier
    }

    fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LENGTH - ID_LEN - Tag::LENGTH);
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(self.iv.as_bytes());
        buf.extend_from_slice(&self.encrypted_key);
        buf
    }
}

impl Characteristic for SetupCommand {
    const UUID: Uuid = ble::SETUP_UUID;
    const NAME: &'static str = "Setup";

    fn to_bytes(&self) -> Vec<u8> {
        to_wire(self, Self::LENGTH)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, Self::LENGTH)?;
        let mut r = Reader::new(Self::NAME, data);
        let command = Self {
            identifier: r.uuid()?,
            nonce: read_nonce(&mut r)?,
            iv: read_iv(&mut r)?,
            encrypted_key: r.array()?,
            tag: read_tag(&mut r)?,
        };
        r.finish()?;
        Ok(command)
    }
}

/// Commands whose only field is the subject key's identifier
macro_rules! bare_command {
    ($(#[$meta:meta])* $name:ident, $uuid:expr, $label:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub struct $name {
            pub identifier: Uuid,
            pub nonce: Nonce,
            pub tag: Tag,
        }

        impl $name {
            pub const LENGTH: usize = HEADER_LEN + Tag::LENGTH;

            pub fn new(identifier: Uuid, key: &KeyData) -> Self {
                let mut command = Self {
                    identifier,
                    nonce: Nonce::random(),
                    tag: placeholder_tag(),
                };
                command.tag = crypto::authenticate(key, &command.signed_message());
                command
            }
        }

        impl Authenticated for $name {
            fn identifier(&self) -> Uuid {
                self.identifier
            }

            fn nonce(&self) -> &Nonce {
                &self.nonce
            }

            fn tag(&self) -> &Tag {
                &self.tag
            }

            fn message(&self) -> Vec<u8> {
                self.nonce.as_bytes().to_vec()
            }
        }

        impl Characteristic for $name {
            const UUID: Uuid = $uuid;
            const NAME: &'static str = $label;

            fn to_bytes(&self) -> Vec<u8> {
                to_wire(self, Self::LENGTH)
            }

            fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
                expect_len(Self::NAME, data, Self::LENGTH)?;
                let mut r = Reader::new(Self::NAME, data);
                let command = Self {
                    identifier: r.uuid()?,
                    nonce: read_nonce(&mut r)?,
                    tag: read_tag(&mut r)?,
                };
                r.finish()?;
                Ok(command)
            }
        }
    };
}

bare_command!(
    /// Open the lock
    UnlockCommand,
    ble::UNLOCK_UUID,
    "Unlock"
);

bare_command!(
    /// Ask the lock to update its software (administrators only)
    UpdateCommand,
    ble::UPDATE_UUID,
    "Update"
);

bare_command!(
    /// Ask for the key directory; the answer is published as [`ListKeysValue`]
    ListKeysCommand,
    ble::LIST_KEYS_COMMAND_UUID,
    "ListKeysCommand"
);

/// First half of a key delegation, written by an administrator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKeyParentCommand {
    /// Key of the administrator creating the new key
    pub parent: Uuid,
    pub nonce: Nonce,
    pub child: Uuid,
    pub permission: Permission,
    pub name: Option<KeyName>,
    pub iv: InitializationVector,
    pub encrypted_secret: [u8; SharedSecret::LENGTH],
    pub tag: Tag,
}

impl NewKeyParentCommand {
    pub const LENGTH: usize = HEADER_LEN
        + ID_LEN
        + Permission::LENGTH
        + KeyName::WIRE_LENGTH
        + InitializationVector::LENGTH
        + SharedSecret::LENGTH
        + Tag::LENGTH;

    pub fn new(
        parent: Uuid,
        parent_key: &KeyData,
        child: Uuid,
        permission: Permission,
        name: Option<KeyName>,
        secret: &SharedSecret,
    ) -> Self {
        let (ciphertext, iv) = crypto::encrypt(parent_key, &secret.to_bytes());
        let mut encrypted_secret = [0u8; SharedSecret::LENGTH];
        encrypted_secret.copy_from_slice(&ciphertext);
        let mut command = Self {
            parent,
            nonce: Nonce::random(),
            child,
            permission,
            name,
            iv,
            encrypted_secret,
            tag: placeholder_tag(),
        };
        command.tag = crypto::authenticate(parent_key, &command.signed_message());
        command
    }

    pub fn decrypt(&self, parent_key: &KeyData) -> Result<SharedSecret, CodecError> {
        SharedSecret::from_bytes(&crypto::decrypt(
            parent_key,
            &self.iv,
            &self.encrypted_secret,
        ))
    }
}

impl Authenticated for NewKeyParentCommand {
    fn identifier(&self) -> Uuid {
        self.parent
    }

    fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LENGTH - ID_LEN - Tag::LENGTH);
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(self.child.as_bytes());
        buf.extend_from_slice(&self.permission.to_bytes());
        KeyName::write(self.name.as_ref(), &mut buf);
        buf.extend_from_slice(self.iv.as_bytes());
        buf.extend_from_slice(&self.encrypted_secret);
        buf
    }
}

impl Characteristic for NewKeyParentCommand {
    const UUID: Uuid = ble::NEW_KEY_PARENT_UUID;
    const NAME: &'static str = "NewKeyParent";

    fn to_bytes(&self) -> Vec<u8> {
        to_wire(self, Self::LENGTH)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, Self::LENGTH)?;
        let mut r = Reader::new(Self::NAME, data);
        let command = Self {
            parent: r.uuid()?,
            nonce: read_nonce(&mut r)?,
            child: r.uuid()?,
            permission: Permission::read(&mut r)?,
            name: KeyName::read(&mut r)?,
            iv: read_iv(&mut r)?,
            encrypted_secret: r.array()?,
            tag: read_tag(&mut r)?,
        };
        r.finish()?;
        Ok(command)
    }
}

/// Second half of a key delegation, written by the new key's device
///
/// Both the tag and the encryption of the new key use the working key
/// derived from the shared secret.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewKeyChildCommand {
    pub child: Uuid,
    pub nonce: Nonce,
    pub iv: InitializationVector,
    pub encrypted_key: [u8; KEY_LEN],
    pub tag: Tag,
}

impl NewKeyChildCommand {
    pub const LENGTH: usize = HEADER_LEN + InitializationVector::LENGTH + KEY_LEN + Tag::LENGTH;

    pub fn new(child: Uuid, key: &KeyData, secret: &SharedSecret) -> Self {
        let working = secret.key_data();
        let (ciphertext, iv) = crypto::encrypt(&working, key.as_bytes());
        let mut encrypted_key = [0u8; KEY_LEN];
        encrypted_key.copy_from_slice(&ciphertext);
        let mut command = Self {
            child,
            nonce: Nonce::random(),
            iv,
            encrypted_key,
            tag: placeholder_tag(),
        };
        command.tag = crypto::authenticate(&working, &command.signed_message());
        command
    }

    pub fn decrypt(&self, secret: &SharedSecret) -> KeyData {
        let plain = crypto::decrypt(&secret.key_data(), &self.iv, &self.encrypted_key);
        let mut bytes = [0u8; KEY_LEN];
        bytes.copy_from_slice(&plain);
        KeyData::from(bytes)
    }
}

impl Authenticated for NewKeyChildCommand {
    fn identifier(&self) -> Uuid {
        self.child
    }

    fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::LENGTH - ID_LEN - Tag::LENGTH);
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(self.iv.as_bytes());
        buf.extend_from_slice(&self.encrypted_key);
        buf
    }
}

impl Characteristic for NewKeyChildCommand {
    const UUID: Uuid = ble::NEW_KEY_CHILD_UUID;
    const NAME: &'static str = "NewKeyChild";

    fn to_bytes(&self) -> Vec<u8> {
        to_wire(self, Self::LENGTH)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, Self::LENGTH)?;
        let mut r = Reader::new(Self::NAME, data);
        let command = Self {
            child: r.uuid()?,
            nonce: read_nonce(&mut r)?,
            iv: read_iv(&mut r)?,
            encrypted_key: r.array()?,
            tag: read_tag(&mut r)?,
        };
        r.finish()?;
        Ok(command)
    }
}

/// Turn HomeKit support on or off
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HomeKitEnableCommand {
    pub identifier: Uuid,
    pub nonce: Nonce,
    pub enable: bool,
    pub tag: Tag,
}

impl HomeKitEnableCommand {
    pub const LENGTH: usize = HEADER_LEN + 1 + Tag::LENGTH;

    pub fn new(identifier: Uuid, key: &KeyData, enable: bool) -> Self {
        let mut command = Self {
            identifier,
            nonce: Nonce::random(),
            enable,
            tag: placeholder_tag(),
        };
        command.tag = crypto::authenticate(key, &command.signed_message());
        command
    }
}

impl Authenticated for HomeKitEnableCommand {
    fn identifier(&self) -> Uuid {
        self.identifier
    }

    fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = self.nonce.as_bytes().to_vec();
        buf.push(self.enable as u8);
        buf
    }
}

impl Characteristic for HomeKitEnableCommand {
    const UUID: Uuid = ble::HOMEKIT_ENABLE_UUID;
    const NAME: &'static str = "HomeKitEnable";

    fn to_bytes(&self) -> Vec<u8> {
        to_wire(self, Self::LENGTH)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, Self::LENGTH)?;
        let mut r = Reader::new(Self::NAME, data);
        let command = Self {
            identifier: r.uuid()?,
            nonce: read_nonce(&mut r)?,
            enable: r.bool()?,
            tag: read_tag(&mut r)?,
        };
        r.finish()?;
        Ok(command)
    }
}

/// Remove the key `target`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveKeyCommand {
    pub identifier: Uuid,
    pub nonce: Nonce,
    pub target: Uuid,
    pub tag: Tag,
}

impl RemoveKeyCommand {
    pub const LENGTH: usize = HEADER_LEN + ID_LEN + Tag::LENGTH;

    pub fn new(identifier: Uuid, key: &KeyData, target: Uuid) -> Self {
        let mut command = Self {
            identifier,
            nonce: Nonce::random(),
            target,
            tag: placeholder_tag(),
        };
        command.tag = crypto::authenticate(key, &command.signed_message());
        command
    }
}

impl Authenticated for RemoveKeyCommand {
    fn identifier(&self) -> Uuid {
        self.identifier
    }

    fn nonce(&self) -> &Nonce {
        &self.nonce
    }

    fn tag(&self) -> &Tag {
        &self.tag
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = self.nonce.as_bytes().to_vec();
        buf.extend_from_slice(self.target.as_bytes());
        buf
    }
}

impl Characteristic for RemoveKeyCommand {
    const UUID: Uuid = ble::REMOVE_KEY_UUID;
    const NAME: &'static str = "RemoveKey";

    fn to_bytes(&self) -> Vec<u8> {
        to_wire(self, Self::LENGTH)
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        expect_len(Self::NAME, data, Self::LENGTH)?;
        let mut r = Reader::new(Self::NAME, data);
        let command = Self {
            identifier: r.uuid()?,
            nonce: read_nonce(&mut r)?,
            target: r.uuid()?,
            tag: read_tag(&mut r)?,
        };
        r.finish()?;
        Ok(command)
    }
}

/// Encrypted key directory, the lock's answer to [`ListKeysCommand`]
///
/// `nonce` echoes the request so the reader can bind the answer to it. The
/// directory is encrypted and authenticated with the requester's key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListKeysValue {
    pub nonce: Nonce,
    pub iv: InitializationVector,
    pub encrypted: Vec<u8>,
    pub tag: Tag,
}

impl ListKeysValue {
    const MIN_LENGTH: usize = Nonce::LENGTH + InitializationVector::LENGTH + 2 + Tag::LENGTH;

    pub fn new(request: Nonce, key: &KeyData, entries: &[KeyEntry]) -> Result<Self, CodecError> {
        let size = 2 + entries.len() * KeyEntry::LENGTH;
        let count = u16::try_from(entries.len()).ok().filter(|_| size <= u16::MAX as usize);
        let Some(count) = count else {
            return Err(CodecError::InvalidLength {
                name: Self::NAME,
                expected: u16::MAX as usize,
                got: size,
            });
        };

        let mut plain = Vec::with_capacity(size);
        plain.extend_from_slice(&count.to_be_bytes());
        for entry in entries {
            entry.write(&mut plain);
        }
        let (encrypted, iv) = crypto::encrypt(key, &plain);
        let mut value = Self {
            nonce: request,
            iv,
            encrypted,
            tag: placeholder_tag(),
        };
        value.tag = crypto::authenticate(key, &signed(&Self::UUID, &value.message()));
        Ok(value)
    }

    fn message(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(Self::MIN_LENGTH + self.encrypted.len());
        buf.extend_from_slice(self.nonce.as_bytes());
        buf.extend_from_slice(self.iv.as_bytes());
        buf.extend_from_slice(&(self.encrypted.len() as u16).to_be_bytes());
        buf.extend_from_slice(&self.encrypted);
        buf
    }

    pub fn authenticated_with(&self, key: &KeyData) -> bool {
        crypto::verify(key, &signed(&Self::UUID, &self.message()), &self.tag)
    }

    /// Verify, decrypt and decode the directory
    pub fn decrypt(&self, key: &KeyData) -> Result<Vec<KeyEntry>, CodecError> {
        if !self.authenticated_with(key) {
            return Err(CodecError::Unauthenticated);
        }
        let plain = crypto::decrypt(key, &self.iv, &self.encrypted);
        let mut r = Reader::new("key directory", &plain);
        let count = r.u16()? as usize;
        expect_len("key directory", &plain, 2 + count * KeyEntry::LENGTH)?;
        let entries = (0..count)
            .map(|_| KeyEntry::read(&mut r))
            .collect::<Result<Vec<_>, _>>()?;
        r.finish()?;
        Ok(entries)
    }
}

impl Characteristic for ListKeysValue {
    const UUID: Uuid = ble::LIST_KEYS_VALUE_UUID;
    const NAME: &'static str = "ListKeysValue";

    fn to_bytes(&self) -> Vec<u8> {
        let mut buf = self.message();
        buf.extend_from_slice(self.tag.as_bytes());
        buf
    }

    fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let mut r = Reader::new(Self::NAME, data);
        let nonce = read_nonce(&mut r)?;
        let iv = read_iv(&mut r)?;
        let len = r.u16()? as usize;
        expect_len(Self::NAME, data, Self::MIN_LENGTH + len)?;
        let encrypted = r.bytes(len)?.to_vec();
        let tag = read_tag(&mut r)?;
        r.finish()?;
        Ok(Self {
            nonce,
            iv,
            encrypted,
            tag,
        })
    }
}
