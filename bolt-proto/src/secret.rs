//! Short numeric secret relayed out-of-band during key delegation

use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::codec::CodecError;
use crate::crypto;
use crate::key::KeyData;

const DERIVATION_CONTEXT: &[u8] = b"bolt new key shared secret";

/// Six decimal digits, read aloud or shown on screen
///
/// Only used for one delegation handshake and never stored as a key. The
/// digits are stretched with HKDF into the key that authenticates and
/// encrypts the child's half of the handshake.
#[derive(Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SharedSecret([u8; SharedSecret::LENGTH]);

impl SharedSecret {
    pub const LENGTH: usize = 6;

    /// Generate a random secret
    pub fn random() -> Self {
        let mut rng = rand::rngs::OsRng;
        let mut digits = [0u8; Self::LENGTH];
        for digit in digits.iter_mut() {
            *digit = rng.gen_range(0..10);
        }
        Self(digits)
    }

    /// Raw digit values (0-9), as carried encrypted on the wire
    pub fn to_bytes(&self) -> [u8; Self::LENGTH] {
        self.0
    }

    pub fn from_bytes(data: &[u8]) -> Result<Self, CodecError> {
        let digits: [u8; Self::LENGTH] =
            data.try_into().map_err(|_| CodecError::InvalidSharedSecret)?;
        if digits.iter().any(|d| *d > 9) {
            return Err(CodecError::InvalidSharedSecret);
        }
        Ok(Self(digits))
    }

    /// Working key for authenticating and encrypting with this secret
    pub fn key_data(&self) -> KeyData {
        crypto::derive_key(self.to_string().as_bytes(), DERIVATION_CONTEXT)
    }
}

impl std::fmt::Display for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for digit in self.0 {
            write!(f, "{digit}")?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for SharedSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SharedSecret(..)")
    }
}

impl FromStr for SharedSecret {
    type Err = CodecError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.len() != Self::LENGTH {
            return Err(CodecError::InvalidSharedSecret);
        }
        let mut digits = [0u8; Self::LENGTH];
        for (digit, c) in digits.iter_mut().zip(s.chars()) {
            *digit = c.to_digit(10).ok_or(CodecError::InvalidSharedSecret)? as u8;
        }
        Ok(Self(digits))
    }
}

impl TryFrom<String> for SharedSecret {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SharedSecret> for String {
    fn from(secret: SharedSecret) -> Self {
        secret.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_secret_is_six_digits() {
        let secret = SharedSecret::random();
        let text = secret.to_string();
        assert_eq!(text.len(), 6);
        assert!(text.chars().all(|c| c.is_ascii_digit()));
        assert_eq!(text.parse::<SharedSecret>().unwrap(), secret);
    }

    #[test]
    fn parse_rejects_malformed_input() {
        assert!("12345".parse::<SharedSecret>().is_err());
        assert!("1234567".parse::<SharedSecret>().is_err());
        assert!("12a456".parse::<SharedSecret>().is_err());
        assert!("١٢٣٤٥٦".parse::<SharedSecret>().is_err());
        assert_eq!(" 012345 ".parse::<SharedSecret>().unwrap().to_string(), "012345");
    }

    #[test]
    fn bytes_are_digit_values() {
        let secret: SharedSecret = "907315".parse().unwrap();
        assert_eq!(secret.to_bytes(), [9, 0, 7, 3, 1, 5]);
        assert_eq!(SharedSecret::from_bytes(&[9, 0, 7, 3, 1, 5]).unwrap(), secret);
        assert!(SharedSecret::from_bytes(&[9, 0, 7, 3, 1, 10]).is_err());
        assert!(SharedSecret::from_bytes(&[9, 0, 7]).is_err());
    }

    #[test]
    fn key_data_is_stable_per_secret() {
        let a: SharedSecret = "111111".parse().unwrap();
        let b: SharedSecret = "111112".parse().unwrap();
        assert_eq!(a.key_data(), a.key_data());
        assert_ne!(a.key_data(), b.key_data());
    }
}
