//! Lock status, hardware model and versions

use serde::{Deserialize, Serialize};

use crate::codec::CodecError;

/// Protocol version advertised by the Version characteristic
pub const PROTOCOL_VERSION: u64 = 1;

/// Version of the lock software package
pub const PACKAGE_VERSION: PackageVersion = PackageVersion {
    major: 0,
    minor: 1,
    patch: 0,
};

/// Lock status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// No owner key yet, only setup is accepted
    Setup = 0,
    /// Normal operation
    Unlock = 1,
    /// A key delegation is waiting for its child device
    NewKey = 2,
}

impl TryFrom<u8> for Status {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            0 => Ok(Status::Setup),
            1 => Ok(Status::Unlock),
            2 => Ok(Status::NewKey),
            other => Err(CodecError::InvalidStatus(other)),
        }
    }
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Status::Setup => "setup",
            Status::Unlock => "unlock",
            Status::NewKey => "new key",
        })
    }
}

/// Lock hardware model
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Model {
    #[default]
    Classic = 1,
}

impl Model {
    pub fn name(&self) -> &'static str {
        match self {
            Model::Classic => "Classic",
        }
    }
}

impl TryFrom<u8> for Model {
    type Error = CodecError;

    fn try_from(byte: u8) -> Result<Self, Self::Error> {
        match byte {
            1 => Ok(Model::Classic),
            other => Err(CodecError::InvalidModel(other)),
        }
    }
}

/// Software package version, three big-endian u16 on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PackageVersion {
    pub major: u16,
    pub minor: u16,
    pub patch: u16,
}

impl std::fmt::Display for PackageVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_bytes() {
        for status in [Status::Setup, Status::Unlock, Status::NewKey] {
            assert_eq!(Status::try_from(status as u8).unwrap(), status);
        }
        assert_eq!(Status::try_from(3), Err(CodecError::InvalidStatus(3)));
    }

    #[test]
    fn model_bytes() {
        assert_eq!(Model::try_from(1).unwrap(), Model::Classic);
        assert!(Model::try_from(0).is_err());
        assert_eq!(Model::Classic.name(), "Classic");
    }

    #[test]
    fn package_versions_order() {
        let older = PackageVersion { major: 0, minor: 9, patch: 12 };
        assert!(older < PACKAGE_VERSION);
        assert_eq!(PACKAGE_VERSION.to_string(), "0.1.0");
    }
}
