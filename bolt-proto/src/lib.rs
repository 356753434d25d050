//! Bolt lock protocol - crypto, key model and GATT characteristic codec
//!
//! Shared by the lock daemon (`bolt-lockd`) and the central side
//! (`bolt-ble-controller`). Everything here is synchronous and free of I/O so
//! it can run on the lock hardware as well as on phones and desktops.
//!
//! All multi-byte values on the wire are big-endian, whatever the host.

pub mod ble;
pub mod characteristic;
pub mod codec;
pub mod crypto;
mod invitation;
mod key;
mod permission;
mod secret;
mod status;

pub use characteristic::{Authenticated, Characteristic};
pub use codec::CodecError;
pub use invitation::{InvitationError, NewKeyInvitation};
pub use key::{InitializationVector, Key, KeyData, KeyEntry, KeyName, Nonce, Tag};
pub use permission::{Interval, Permission, Schedule, Weekdays};
pub use secret::SharedSecret;
pub use status::{Model, PackageVersion, Status, PACKAGE_VERSION, PROTOCOL_VERSION};

pub use uuid::Uuid;
