//! Invitation handed from the parent device to the new key's device

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::key::KeyName;
use crate::permission::Permission;
use crate::secret::SharedSecret;

#[derive(Debug, thiserror::Error)]
pub enum InvitationError {
    #[error("invalid base64url token")]
    Encoding(#[from] data_encoding::DecodeError),
    #[error("invalid invitation: {0}")]
    Json(#[from] serde_json::Error),
}

/// Everything the child needs to complete a key delegation
///
/// Produced by the first half of the handshake. The shared secret inside
/// must reach the child over a channel the parent trusts (shown on screen,
/// read aloud, or sent as a token).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewKeyInvitation {
    /// Lock the key is for
    pub lock: Uuid,
    /// Identifier reserved for the new key
    pub identifier: Uuid,
    pub permission: Permission,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<KeyName>,
    pub shared_secret: SharedSecret,
    #[serde(with = "chrono::serde::ts_seconds")]
    pub created: DateTime<Utc>,
}

impl NewKeyInvitation {
    /// Compact form for copy/paste: base64url (no padding) of the JSON
    pub fn to_token(&self) -> String {
        let json = serde_json::to_vec(self).expect("invitation serializes to JSON");
        data_encoding::BASE64URL_NOPAD.encode(&json)
    }

    pub fn from_token(token: &str) -> Result<Self, InvitationError> {
        let json = data_encoding::BASE64URL_NOPAD.decode(token.trim().as_bytes())?;
        Ok(serde_json::from_slice(&json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn invitation() -> NewKeyInvitation {
        NewKeyInvitation {
            lock: Uuid::from_u128(1),
            identifier: Uuid::from_u128(2),
            permission: Permission::Anytime,
            name: KeyName::new("Cleaner"),
            shared_secret: "314159".parse().unwrap(),
            created: Utc.with_ymd_and_hms(2026, 3, 1, 12, 0, 0).unwrap(),
        }
    }

    #[test]
    fn token_round_trip() {
        let invitation = invitation();
        let token = invitation.to_token();
        assert!(!token.contains('='));
        assert_eq!(NewKeyInvitation::from_token(&token).unwrap(), invitation);
        assert_eq!(
            NewKeyInvitation::from_token(&format!("  {token}\n")).unwrap(),
            invitation
        );
    }

    #[test]
    fn json_shape() {
        let json = serde_json::to_value(invitation()).unwrap();
        assert_eq!(json["shared_secret"], "314159");
        assert_eq!(json["permission"]["type"], "anytime");
        assert_eq!(json["name"], "Cleaner");
    }

    #[test]
    fn bad_tokens_are_rejected() {
        assert!(matches!(
            NewKeyInvitation::from_token("not base64!"),
            Err(InvitationError::Encoding(_))
        ));
        let token = data_encoding::BASE64URL_NOPAD.encode(b"{\"lock\":1}");
        assert!(matches!(
            NewKeyInvitation::from_token(&token),
            Err(InvitationError::Json(_))
        ));
    }
}
