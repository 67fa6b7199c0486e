//! Selects the wire variant to use from the app's major version.

use crate::chunk::{ChunkSet, CHUNK_SIZE};
use crate::errors::{Error, Result};
use crate::path::{serialize_hrp, serialize_path};
use tracing::warn;

/// Wire variants this crate can speak.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V2,
}

impl ProtocolVersion {
    pub fn from_major(major: u8) -> Result<Self> {
        match major {
            2 => Ok(Self::V2),
            major => {
                warn!(major, "Unsupported app version");
                Err(Error::UnsupportedVersion(major))
            }
        }
    }

    pub fn protocol(self) -> &'static Protocol {
        match self {
            Self::V2 => &V2,
        }
    }
}

/// Serialization entry points of a wire variant.
pub struct Protocol {
    pub version: ProtocolVersion,
    pub chunk_size: usize,
    pub serialize_path: fn(&[u32]) -> Result<Vec<u8>>,
    pub serialize_hrp: fn(&str) -> Result<Vec<u8>>,
}

impl Protocol {
    /// Payload of an address query: the HRP, then the path.
    pub fn address_payload(&self, path: &[u32], hrp: &str) -> Result<Vec<u8>> {
        let mut data = (self.serialize_hrp)(hrp)?;
        data.extend_from_slice(&(self.serialize_path)(path)?);
        Ok(data)
    }

    pub fn chunks(&self, path: &[u32], message: &[u8]) -> Result<ChunkSet> {
        let path = (self.serialize_path)(path)?;
        ChunkSet::new(&path, message, self.chunk_size)
    }
}

fn serialize_path_v2(path: &[u32]) -> Result<Vec<u8>> {
    serialize_path(path).map(|buf| buf.to_vec())
}

pub static V2: Protocol = Protocol {
    version: ProtocolVersion::V2,
    chunk_size: CHUNK_SIZE,
    serialize_path: serialize_path_v2,
    serialize_hrp,
};

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn test_from_major() -> Result<()> {
        assert_eq!(ProtocolVersion::from_major(2)?, ProtocolVersion::V2);
        for major in [0, 1, 3, 255] {
            let err = ProtocolVersion::from_major(major).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
            assert_eq!(err.to_string(), format!("app version {} is not supported", major));
        }
        Ok(())
    }

    #[test]
    fn test_v2_address_payload() -> Result<()> {
        let data = ProtocolVersion::V2
            .protocol()
            .address_payload(&[44, 931, 0, 0, 0], "thor")?;
        assert_eq!(data.len(), 5 + 20);
        assert_eq!(&data[..5], &[0x04, b't', b'h', b'o', b'r']);
        assert_eq!(&data[5..9], &[0x2C, 0x00, 0x00, 0x80]);
        Ok(())
    }

    #[test]
    fn test_v2_address_payload_validates_first() {
        let v2 = ProtocolVersion::V2.protocol();
        assert_eq!(
            v2.address_payload(&[44, 931, 0, 0, 0], "th").unwrap_err().kind(),
            ErrorKind::HRPInvalid
        );
        assert_eq!(
            v2.address_payload(&[44, 931], "thor").unwrap_err().kind(),
            ErrorKind::InvalidArgument
        );
    }

    #[test]
    fn test_v2_chunks() -> Result<()> {
        let chunks = V2.chunks(&[44, 931, 0, 0, 0], &[0x00; 151])?;
        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks.payload()[1].len(), 1);
        Ok(())
    }
}
