//! BIP32 path and human-readable prefix encodings, as the app expects them.

use crate::errors::{Error, Result};
use byteorder::{ByteOrder, LittleEndian};

/// Number of components in a THORChain derivation path: m/44'/931'/account'/change/index.
pub const PATH_LEN: usize = 5;

/// Serialized size of a path, one little-endian u32 per component.
pub const SERIALIZED_PATH_LEN: usize = PATH_LEN * 4;

pub const HARDENED: u32 = 0x8000_0000;

pub const HRP_MIN_LEN: usize = 3;
pub const HRP_MAX_LEN: usize = 83;

/// Serializes a 5-component path. The first three components are always hardened.
///
/// Components that already have the hardened bit set wrap around (0x8000_0000 + x is
/// computed modulo 2^32); the app has always received them that way.
pub fn serialize_path(path: &[u32]) -> Result<[u8; SERIALIZED_PATH_LEN]> {
    if path.len() != PATH_LEN {
        return Err(Error::InvalidArgument(format!(
            "invalid path: expected {} components, got {}",
            PATH_LEN,
            path.len()
        )));
    }

    let mut buf = [0; SERIALIZED_PATH_LEN];
    for (i, (v, out)) in path.iter().zip(buf.chunks_exact_mut(4)).enumerate() {
        let v = if i < 3 { HARDENED.wrapping_add(*v) } else { *v };
        LittleEndian::write_u32(out, v);
    }
    Ok(buf)
}

/// Serializes a human-readable address prefix as a length byte followed by its bytes.
pub fn serialize_hrp(hrp: &str) -> Result<Vec<u8>> {
    let len = hrp.len();
    if !(HRP_MIN_LEN..=HRP_MAX_LEN).contains(&len) {
        return Err(Error::HRPInvalid(len));
    }

    let mut buf = Vec::with_capacity(1 + len);
    buf.push(len as u8);
    buf.extend_from_slice(hrp.as_bytes());
    Ok(buf)
}
