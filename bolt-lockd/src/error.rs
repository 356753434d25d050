use bolt_proto::ble::AttError;
use bolt_proto::{CodecError, Status, Uuid};

use crate::config::ConfigError;
use crate::hardware::HardwareError;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Why the lock refused or failed a request
///
/// Every variant leaves the key store as it was before the request.
#[derive(Debug, thiserror::Error)]
pub enum LockError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("authentication failed")]
    Authentication,
    #[error("not authorized: {0}")]
    Authorization(&'static str),
    #[error("not allowed while in {0} status")]
    State(Status),
    #[error("no key {0}")]
    NotFound(Uuid),
    #[error("storage error: {0}")]
    Storage(BoxError),
    #[error("hardware error: {0}")]
    Hardware(#[from] HardwareError),
}

impl LockError {
    /// ATT error returned to the central that sent the request
    pub fn att_error(&self) -> AttError {
        match self {
            LockError::Validation(_) => AttError::UnlikelyError,
            LockError::Authentication => AttError::InsufficientAuthentication,
            LockError::Authorization(_) => AttError::InsufficientAuthorization,
            LockError::State(_) => AttError::WriteNotPermitted,
            LockError::NotFound(_) => AttError::AttributeNotFound,
            LockError::Storage(_) | LockError::Hardware(_) => AttError::UnlikelyError,
        }
    }
}

impl From<CodecError> for LockError {
    fn from(e: CodecError) -> Self {
        LockError::Validation(e.to_string())
    }
}

impl From<ConfigError> for LockError {
    fn from(e: ConfigError) -> Self {
        LockError::Storage(Box::new(e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_map_to_att_codes() {
        assert_eq!(LockError::Authentication.att_error().code(), 0x05);
        assert_eq!(LockError::Authorization("x").att_error().code(), 0x08);
        assert_eq!(LockError::State(Status::Unlock).att_error().code(), 0x03);
        let codec: LockError = CodecError::InvalidBool(7).into();
        assert!(matches!(codec, LockError::Validation(_)));
        assert_eq!(codec.att_error(), AttError::UnlikelyError);
    }
}
