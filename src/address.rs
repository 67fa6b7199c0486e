//! Bech32 addresses from compressed secp256k1 public keys, the way the app derives them.

use crate::errors::{Error, Result};
use crate::response::PK_LEN;
use bech32::{ToBase32, Variant};
use ripemd::Ripemd160;
use sha2::{Digest, Sha256};

/// `bech32(hrp, ripemd160(sha256(pk)))`. The key must be compressed.
pub fn bech32_from_public_key(hrp: &str, pk: &[u8]) -> Result<String> {
    if pk.len() != PK_LEN {
        return Err(Error::InvalidArgument(format!(
            "expected compressed public key [{} bytes], got {}",
            PK_LEN,
            pk.len()
        )));
    }

    let hash = Ripemd160::digest(Sha256::digest(pk));
    Ok(bech32::encode(hrp, hash.to_base32(), Variant::Bech32)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use bech32::FromBase32;

    const PK: &str = "03028f0d5a9fd41600191cdefdea05e77a68dfbce286241c0190805b9346667d07";

    #[test]
    fn test_bech32_from_public_key() -> Result<()> {
        let pk = hex::decode(PK).expect("bad test key");
        let addr = bech32_from_public_key("thor", &pk)?;
        assert!(addr.starts_with("thor1"));
        // hrp, separator, 32 data characters, 6 checksum characters.
        assert_eq!(addr.len(), 4 + 1 + 32 + 6);

        let (hrp, data, variant) = bech32::decode(&addr)?;
        assert_eq!(hrp, "thor");
        assert_eq!(variant, Variant::Bech32);
        assert_eq!(
            Vec::<u8>::from_base32(&data)?,
            Ripemd160::digest(Sha256::digest(&pk)).to_vec()
        );
        Ok(())
    }

    #[test]
    fn test_bech32_is_deterministic_per_hrp() -> Result<()> {
        let pk = hex::decode(PK).expect("bad test key");
        let thor = bech32_from_public_key("thor", &pk)?;
        let tthor = bech32_from_public_key("tthor", &pk)?;
        assert_eq!(thor, bech32_from_public_key("thor", &pk)?);
        assert_ne!(thor[5..], tthor[6..]);
        Ok(())
    }

    #[test]
    fn test_bech32_rejects_uncompressed_key() {
        for len in [0, 32, 65] {
            let err = bech32_from_public_key("thor", &vec![0x04; len]).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::InvalidArgument);
        }
    }
}
