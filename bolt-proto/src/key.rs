//! Keys and the fixed-size secure values that travel with them

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::codec::{CodecError, Reader};
use crate::crypto::{self, IV_LEN, KEY_LEN, TAG_LEN};
use crate::permission::Permission;

/// Symmetric secret bound to one key (32 bytes)
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyData(#[serde(with = "hex_bytes")] [u8; KEY_LEN]);

impl KeyData {
    pub const LENGTH: usize = KEY_LEN;

    /// Generate fresh random key material
    pub fn random() -> Self {
        Self(crypto::random_array())
    }

    pub fn from_slice(data: &[u8]) -> Option<Self> {
        Some(Self(data.try_into().ok()?))
    }

    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        data_encoding::HEXLOWER.encode(&self.0)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let bytes = data_encoding::HEXLOWER_PERMISSIVE.decode(hex.as_bytes()).ok()?;
        Self::from_slice(&bytes)
    }
}

impl From<[u8; KEY_LEN]> for KeyData {
    fn from(bytes: [u8; KEY_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for KeyData {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("KeyData(..)")
    }
}

/// Single-use random value binding a tag to one request (16 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nonce(#[serde(with = "hex_bytes")] [u8; 16]);

impl Nonce {
    pub const LENGTH: usize = 16;

    pub fn random() -> Self {
        Self(crypto::random_array())
    }

    pub fn as_bytes(&self) -> &[u8; 16] {
        &self.0
    }
}

impl From<[u8; 16]> for Nonce {
    fn from(bytes: [u8; 16]) -> Self {
        Self(bytes)
    }
}

/// AES initialization vector (16 bytes, not secret)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitializationVector([u8; IV_LEN]);

impl InitializationVector {
    pub const LENGTH: usize = IV_LEN;

    pub fn random() -> Self {
        Self(crypto::random_array())
    }

    pub fn as_bytes(&self) -> &[u8; IV_LEN] {
        &self.0
    }
}

impl From<[u8; IV_LEN]> for InitializationVector {
    fn from(bytes: [u8; IV_LEN]) -> Self {
        Self(bytes)
    }
}

/// HMAC-SHA512 authentication tag (64 bytes)
#[derive(Clone, Copy, PartialEq, Eq)]
pub struct Tag([u8; TAG_LEN]);

impl Tag {
    pub const LENGTH: usize = TAG_LEN;

    pub fn as_bytes(&self) -> &[u8; TAG_LEN] {
        &self.0
    }
}

impl From<[u8; TAG_LEN]> for Tag {
    fn from(bytes: [u8; TAG_LEN]) -> Self {
        Self(bytes)
    }
}

impl std::fmt::Debug for Tag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Tag({}..)", data_encoding::HEXLOWER.encode(&self.0[..4]))
    }
}

/// Human readable key name, at most 64 bytes of UTF-8
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct KeyName(String);

impl KeyName {
    pub const MAX_LENGTH: usize = 64;

    /// Length on the wire: length byte + zero padded name
    pub const WIRE_LENGTH: usize = 1 + Self::MAX_LENGTH;

    pub fn new(name: impl Into<String>) -> Option<Self> {
        let name = name.into();
        if name.is_empty() || name.len() > Self::MAX_LENGTH {
            return None;
        }
        Some(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Encode an optional name; `None` is a zero length byte
    pub fn write(name: Option<&KeyName>, buf: &mut Vec<u8>) {
        let mut field = [0u8; Self::WIRE_LENGTH];
        if let Some(name) = name {
            let bytes = name.0.as_bytes();
            field[0] = bytes.len() as u8;
            field[1..1 + bytes.len()].copy_from_slice(bytes);
        }
        buf.extend_from_slice(&field);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Option<KeyName>, CodecError> {
        let field: [u8; Self::WIRE_LENGTH] = reader.array()?;
        let len = field[0] as usize;
        if len > Self::MAX_LENGTH {
            return Err(CodecError::InvalidName);
        }
        if field[1 + len..].iter().any(|b| *b != 0) {
            return Err(CodecError::InvalidName);
        }
        if len == 0 {
            return Ok(None);
        }
        let name = std::str::from_utf8(&field[1..1 + len]).map_err(|_| CodecError::InvalidName)?;
        Ok(Some(KeyName(name.to_string())))
    }
}

impl TryFrom<String> for KeyName {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        KeyName::new(value).ok_or(CodecError::InvalidName)
    }
}

impl From<KeyName> for String {
    fn from(name: KeyName) -> Self {
        name.0
    }
}

impl std::fmt::Display for KeyName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A lock key used for unlocking and administration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub identifier: Uuid,
    pub data: KeyData,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<KeyName>,
}

impl Key {
    /// A fresh owner key, as installed by setup
    pub fn new_owner() -> Self {
        Self {
            identifier: Uuid::new_v4(),
            data: KeyData::random(),
            permission: Permission::Owner,
            name: None,
        }
    }

    /// The public part of this key
    pub fn entry(&self) -> KeyEntry {
        KeyEntry {
            identifier: self.identifier,
            permission: self.permission.clone(),
            name: self.name.clone(),
        }
    }
}

/// Key directory entry: everything about a key except its secret
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyEntry {
    pub identifier: Uuid,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<KeyName>,
}

impl KeyEntry {
    pub const LENGTH: usize = 16 + Permission::LENGTH + KeyName::WIRE_LENGTH;

    pub fn write(&self, buf: &mut Vec<u8>) {
        buf.extend_from_slice(self.identifier.as_bytes());
        buf.extend_from_slice(&self.permission.to_bytes());
        KeyName::write(self.name.as_ref(), buf);
    }

    pub fn read(reader: &mut Reader<'_>) -> Result<Self, CodecError> {
        let identifier = reader.uuid()?;
        let permission = Permission::read(reader)?;
        let name = KeyName::read(reader)?;
        Ok(Self {
            identifier,
            permission,
            name,
        })
    }
}

mod hex_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S, const N: usize>(bytes: &[u8; N], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&data_encoding::HEXLOWER.encode(bytes))
    }

    pub fn deserialize<'de, D, const N: usize>(deserializer: D) -> Result<[u8; N], D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        let bytes = data_encoding::HEXLOWER
            .decode(s.as_bytes())
            .map_err(serde::de::Error::custom)?;
        bytes
            .try_into()
            .map_err(|_| serde::de::Error::custom(format!("expected {N} bytes")))
    }
}
