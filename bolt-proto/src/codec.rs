//! Big-endian field reader shared by all characteristic decoders

use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CodecError {
    #[error("{name}: expected {expected} bytes, got {got}")]
    InvalidLength {
        name: &'static str,
        expected: usize,
        got: usize,
    },
    #[error("{0} truncated")]
    Truncated(&'static str),
    #[error("invalid permission type {0:#04x}")]
    InvalidPermission(u8),
    #[error("invalid schedule: {0}")]
    InvalidSchedule(&'static str),
    #[error("invalid key name")]
    InvalidName,
    #[error("invalid status {0}")]
    InvalidStatus(u8),
    #[error("unknown model {0}")]
    InvalidModel(u8),
    #[error("invalid boolean {0:#04x}")]
    InvalidBool(u8),
    #[error("invalid shared secret")]
    InvalidSharedSecret,
    #[error("authentication tag mismatch")]
    Unauthenticated,
}

/// Fail unless `data` is exactly `expected` bytes long
pub fn expect_len(name: &'static str, data: &[u8], expected: usize) -> Result<(), CodecError> {
    if data.len() != expected {
        return Err(CodecError::InvalidLength {
            name,
            expected,
            got: data.len(),
        });
    }
    Ok(())
}

/// Cursor over a received value
///
/// Every accessor consumes bytes from the front and converts from network
/// (big-endian) order.
pub struct Reader<'a> {
    name: &'static str,
    data: &'a [u8],
}

impl<'a> Reader<'a> {
    pub fn new(name: &'static str, data: &'a [u8]) -> Self {
        Self { name, data }
    }

    pub fn remaining(&self) -> usize {
        self.data.len()
    }

    pub fn bytes(&mut self, len: usize) -> Result<&'a [u8], CodecError> {
        if self.data.len() < len {
            return Err(CodecError::Truncated(self.name));
        }
        let (head, tail) = self.data.split_at(len);
        self.data = tail;
        Ok(head)
    }

    pub fn array<const N: usize>(&mut self) -> Result<[u8; N], CodecError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.bytes(N)?);
        Ok(out)
    }

    pub fn u8(&mut self) -> Result<u8, CodecError> {
        Ok(self.array::<1>()?[0])
    }

    pub fn u16(&mut self) -> Result<u16, CodecError> {
        Ok(u16::from_be_bytes(self.array()?))
    }

    pub fn u64(&mut self) -> Result<u64, CodecError> {
        Ok(u64::from_be_bytes(self.array()?))
    }

    pub fn i64(&mut self) -> Result<i64, CodecError> {
        Ok(i64::from_be_bytes(self.array()?))
    }

    pub fn bool(&mut self) -> Result<bool, CodecError> {
        match self.u8()? {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(CodecError::InvalidBool(other)),
        }
    }

    /// UUIDs travel in RFC 4122 byte order, which is big-endian
    pub fn uuid(&mut self) -> Result<Uuid, CodecError> {
        Ok(Uuid::from_bytes(self.array()?))
    }

    /// Ensure the whole value was consumed
    pub fn finish(self) -> Result<(), CodecError> {
        if !self.data.is_empty() {
            return Err(CodecError::InvalidLength {
                name: self.name,
                expected: 0,
                got: self.data.len(),
            });
        }
        Ok(())
    }
}
