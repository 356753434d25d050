use bolt_proto::ble::AttError;
use bolt_proto::{Status, Uuid};

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("no lock found")]
    NoLock,
    #[error("lock service not found")]
    LockServiceNotFound,
    #[error("characteristic {0} not found")]
    CharacteristicNotFound(Uuid),
    #[error("invalid value for characteristic {0}")]
    InvalidCharacteristicValue(Uuid),
    #[error("lock is in {0} status")]
    InvalidStatus(Status),
    #[error("invalid shared secret")]
    InvalidSharedSecret,
    #[error("bluetooth is powered off")]
    PoweredOff,
    #[error("timed out")]
    Timeout,
    #[error("lock rejected the request: {0}")]
    Rejected(AttError),
    #[error("response failed authentication")]
    Authentication,
    #[error("bluetooth: {0}")]
    Transport(String),
}

impl From<btleplug::Error> for Error {
    fn from(e: btleplug::Error) -> Self {
        match e {
            btleplug::Error::TimedOut(_) => Error::Timeout,
            e => {
                let message = e.to_string();
                match att_error(&message) {
                    Some(att) => Error::Rejected(att),
                    None => Error::Transport(message),
                }
            }
        }
    }
}

/// Phrases the platform stacks use for ATT errors they do not report by code
const ATT_PHRASES: [(&str, AttError); 12] = [
    ("insufficient authentication", AttError::InsufficientAuthentication),
    ("authentication is insufficient", AttError::InsufficientAuthentication),
    ("insufficient authorization", AttError::InsufficientAuthorization),
    ("authorization is insufficient", AttError::InsufficientAuthorization),
    ("not authorized", AttError::InsufficientAuthorization),
    ("write not permitted", AttError::WriteNotPermitted),
    ("writing is not permitted", AttError::WriteNotPermitted),
    ("read not permitted", AttError::ReadNotPermitted),
    ("reading is not permitted", AttError::ReadNotPermitted),
    ("attribute not found", AttError::AttributeNotFound),
    ("invalid offset", AttError::InvalidOffset),
    ("unlikely error", AttError::UnlikelyError),
];

/// Recover the ATT error a remote rejection carried from btleplug's error text
///
/// btleplug flattens GATT failures into strings. BlueZ reports
/// `ATT error: 0x05`; CoreBluetooth and WinRT describe the error instead.
pub(crate) fn att_error(message: &str) -> Option<AttError> {
    let lower = message.to_ascii_lowercase();
    if let Some(at) = lower.find("att error") {
        let rest = &lower[at..];
        if let Some(hex) = rest.find("0x").map(|i| &rest[i + 2..]) {
            let digits: String = hex.chars().take_while(char::is_ascii_hexdigit).take(2).collect();
            if let Some(att) = u8::from_str_radix(&digits, 16).ok().and_then(AttError::from_code) {
                return Some(att);
            }
        }
    }
    ATT_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, att)| *att)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bluez_codes() {
        assert_eq!(
            att_error("Other(\"org.bluez.Error.Failed: Operation failed with ATT error: 0x05\")"),
            Some(AttError::InsufficientAuthentication)
        );
        assert_eq!(
            att_error("Operation failed with ATT error: 0x0e"),
            Some(AttError::UnlikelyError)
        );
        assert_eq!(att_error("ATT error: 0x03"), Some(AttError::WriteNotPermitted));
    }

    #[test]
    fn described_errors() {
        assert_eq!(
            att_error("Error Domain=CBATTErrorDomain Code=5 \"Authentication is insufficient.\""),
            Some(AttError::InsufficientAuthentication)
        );
        assert_eq!(
            att_error("org.bluez.Error.NotAuthorized: Not authorized"),
            Some(AttError::InsufficientAuthorization)
        );
        assert_eq!(
            att_error("org.bluez.Error.NotPermitted: Write not permitted"),
            Some(AttError::WriteNotPermitted)
        );
    }

    #[test]
    fn other_failures_stay_transport_errors() {
        assert_eq!(att_error("Device not connected"), None);
        assert_eq!(att_error("ATT error: 0x99"), None);
        assert_eq!(
            Error::from(btleplug::Error::NotConnected),
            Error::Transport(btleplug::Error::NotConnected.to_string())
        );
        assert_eq!(
            Error::from(btleplug::Error::Other("Operation failed with ATT error: 0x08".into())),
            Error::Rejected(AttError::InsufficientAuthorization)
        );
    }
}
