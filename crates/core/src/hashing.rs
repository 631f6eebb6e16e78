//! Content digests recorded in sidecars and the run manifest.
//!
//! The digest covers the exact bytes written, byte-order mark included, so
//! a reader can check a CSV against its `sha256` field with `sha256sum`.

use sha2::{Digest, Sha256};

/// Lowercase hex SHA-256 of `data`.
pub fn sha256_hex(data: &[u8]) -> String {
    format!("{:x}", Sha256::digest(data))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_header_csv_digest() {
        assert_eq!(
            sha256_hex(b"\xEF\xBB\xBF\r\n"),
            "f01a374e9c81e3db89b3a42940c4d6a5447684986a1296e42bf13f196eed6295"
        );
    }

    #[test]
    fn header_only_csv_digest_includes_bom() {
        let with_bom = sha256_hex(b"\xEF\xBB\xBFa,b\r\n");
        assert_eq!(
            with_bom,
            "90d502c334f7b377f13cbea755bfd33b1cdc8a999c4f6b0d0451f5be0de886c1"
        );
        assert_ne!(with_bom, sha256_hex(b"a,b\r\n"));
    }
}
