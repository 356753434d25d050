//! BLE GATT profile of the Bolt lock
//!
//! One primary service with fourteen characteristics. Read-only values
//! describe the lock; every write carries an authenticated command.

use uuid::Uuid;

use crate::status::Status;

/// Lock service UUID: b01d1000-5e7c-4c6b-0000-000000000000
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0xb01d1000_5e7c_4c6b_0000_000000000000);

/// Lock identifier (read)
pub const IDENTIFIER_UUID: Uuid = Uuid::from_u128(0xb01d1001_5e7c_4c6b_0000_000000000000);

/// Hardware model (read)
pub const MODEL_UUID: Uuid = Uuid::from_u128(0xb01d1002_5e7c_4c6b_0000_000000000000);

/// Protocol version (read)
pub const VERSION_UUID: Uuid = Uuid::from_u128(0xb01d1003_5e7c_4c6b_0000_000000000000);

/// Software package version (read)
pub const PACKAGE_VERSION_UUID: Uuid = Uuid::from_u128(0xb01d1004_5e7c_4c6b_0000_000000000000);

/// Lock status (read/notify)
pub const STATUS_UUID: Uuid = Uuid::from_u128(0xb01d1005_5e7c_4c6b_0000_000000000000);

/// Install the owner key (write, Setup status only)
pub const SETUP_UUID: Uuid = Uuid::from_u128(0xb01d1006_5e7c_4c6b_0000_000000000000);

/// Open the lock (write)
pub const UNLOCK_UUID: Uuid = Uuid::from_u128(0xb01d1007_5e7c_4c6b_0000_000000000000);

/// Start a key delegation (write)
pub const NEW_KEY_PARENT_UUID: Uuid = Uuid::from_u128(0xb01d1008_5e7c_4c6b_0000_000000000000);

/// Complete a key delegation (write, NewKey status only)
pub const NEW_KEY_CHILD_UUID: Uuid = Uuid::from_u128(0xb01d1009_5e7c_4c6b_0000_000000000000);

/// Toggle HomeKit support (write)
pub const HOMEKIT_ENABLE_UUID: Uuid = Uuid::from_u128(0xb01d100a_5e7c_4c6b_0000_000000000000);

/// Trigger a software update (write)
pub const UPDATE_UUID: Uuid = Uuid::from_u128(0xb01d100b_5e7c_4c6b_0000_000000000000);

/// Request the key directory (write)
pub const LIST_KEYS_COMMAND_UUID: Uuid = Uuid::from_u128(0xb01d100c_5e7c_4c6b_0000_000000000000);

/// Encrypted key directory (read)
pub const LIST_KEYS_VALUE_UUID: Uuid = Uuid::from_u128(0xb01d100d_5e7c_4c6b_0000_000000000000);

/// Remove a key (write)
pub const REMOVE_KEY_UUID: Uuid = Uuid::from_u128(0xb01d100e_5e7c_4c6b_0000_000000000000);

/// Every characteristic of the lock service, in handle order
pub const CHARACTERISTICS: [Uuid; 14] = [
    IDENTIFIER_UUID,
    MODEL_UUID,
    VERSION_UUID,
    PACKAGE_VERSION_UUID,
    STATUS_UUID,
    SETUP_UUID,
    UNLOCK_UUID,
    NEW_KEY_PARENT_UUID,
    NEW_KEY_CHILD_UUID,
    HOMEKIT_ENABLE_UUID,
    UPDATE_UUID,
    LIST_KEYS_COMMAND_UUID,
    LIST_KEYS_VALUE_UUID,
    REMOVE_KEY_UUID,
];

/// Characteristics a central reads to describe a lock during a scan
pub const INFORMATION: [Uuid; 5] = [
    IDENTIFIER_UUID,
    MODEL_UUID,
    VERSION_UUID,
    PACKAGE_VERSION_UUID,
    STATUS_UUID,
];

/// Human readable characteristic name, for logs
pub fn name(uuid: &Uuid) -> Option<&'static str> {
    Some(match *uuid {
        IDENTIFIER_UUID => "Identifier",
        MODEL_UUID => "Model",
        VERSION_UUID => "Version",
        PACKAGE_VERSION_UUID => "PackageVersion",
        STATUS_UUID => "Status",
        SETUP_UUID => "Setup",
        UNLOCK_UUID => "Unlock",
        NEW_KEY_PARENT_UUID => "NewKeyParent",
        NEW_KEY_CHILD_UUID => "NewKeyChild",
        HOMEKIT_ENABLE_UUID => "HomeKitEnable",
        UPDATE_UUID => "Update",
        LIST_KEYS_COMMAND_UUID => "ListKeysCommand",
        LIST_KEYS_VALUE_UUID => "ListKeysValue",
        REMOVE_KEY_UUID => "RemoveKey",
        _ => return None,
    })
}

/// Whether `uuid` accepts writes while the lock is in `status`
pub fn is_writable(status: Status, uuid: &Uuid) -> bool {
    match status {
        Status::Setup => *uuid == SETUP_UUID,
        Status::Unlock => is_command(uuid),
        Status::NewKey => is_command(uuid) || *uuid == NEW_KEY_CHILD_UUID,
    }
}

fn is_command(uuid: &Uuid) -> bool {
    matches!(
        *uuid,
        UNLOCK_UUID
            | NEW_KEY_PARENT_UUID
            | HOMEKIT_ENABLE_UUID
            | UPDATE_UUID
            | LIST_KEYS_COMMAND_UUID
            | REMOVE_KEY_UUID
    )
}

/// Whether `uuid` is a value the lock serves to reads
pub fn is_readable(uuid: &Uuid) -> bool {
    INFORMATION.contains(uuid) || *uuid == LIST_KEYS_VALUE_UUID
}

/// ATT protocol error codes a lock returns to a rejected request
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AttError {
    #[error("read not permitted")]
    ReadNotPermitted,
    #[error("write not permitted")]
    WriteNotPermitted,
    #[error("insufficient authentication")]
    InsufficientAuthentication,
    #[error("invalid offset")]
    InvalidOffset,
    #[error("insufficient authorization")]
    InsufficientAuthorization,
    #[error("attribute not found")]
    AttributeNotFound,
    #[error("invalid attribute value length")]
    InvalidAttributeValueLength,
    #[error("unlikely error")]
    UnlikelyError,
}

impl AttError {
    /// Error code as defined by the Bluetooth core specification
    pub fn code(&self) -> u8 {
        match self {
            AttError::ReadNotPermitted => 0x02,
            AttError::WriteNotPermitted => 0x03,
            AttError::InsufficientAuthentication => 0x05,
            AttError::InvalidOffset => 0x07,
            AttError::InsufficientAuthorization => 0x08,
            AttError::AttributeNotFound => 0x0a,
            AttError::InvalidAttributeValueLength => 0x0d,
            AttError::UnlikelyError => 0x0e,
        }
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Some(match code {
            0x02 => AttError::ReadNotPermitted,
            0x03 => AttError::WriteNotPermitted,
            0x05 => AttError::InsufficientAuthentication,
            0x07 => AttError::InvalidOffset,
            0x08 => AttError::InsufficientAuthorization,
            0x0a => AttError::AttributeNotFound,
            0x0d => AttError::InvalidAttributeValueLength,
            0x0e => AttError::UnlikelyError,
            _ => return None,
        })
    }
}
