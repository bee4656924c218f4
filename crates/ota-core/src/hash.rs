// SPDX-License-Identifier: MIT OR Apache-2.0
//! Content-addressing primitives (C1).
//!
//! Every function here is pure: the output depends only on the input bytes,
//! with no length limit other than host memory.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use md5::{Digest as Md5Digest, Md5};
use sha2::{Digest, Sha256};

/// SHA-256 digest of `bytes`, encoded as URL-safe Base64 with no padding
/// (`+` → `-`, `/` → `_`, trailing `=` stripped).
///
/// # Examples
///
/// ```
/// use ota_core::hash::sha256_b64url;
/// let a = sha256_b64url(b"hello");
/// let b = sha256_b64url(b"hello");
/// assert_eq!(a, b);
/// assert!(!a.contains('+'));
/// assert!(!a.contains('/'));
/// assert!(!a.contains('='));
/// ```
pub fn sha256_b64url(bytes: &[u8]) -> String {
    let digest = Sha256::digest(bytes);
    URL_SAFE_NO_PAD.encode(digest)
}

/// MD5 digest of `bytes`, encoded as lowercase hex.
///
/// The wire protocol this server speaks fixes MD5 as the asset-key
/// algorithm; the field is not security-sensitive, but no certified-safe
/// crypto crate in the Rust ecosystem ships MD5 by default, so a dedicated
/// RustCrypto `md-5` dependency is required to reproduce it.
///
/// # Examples
///
/// ```
/// use ota_core::hash::md5_hex;
/// assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
/// ```
pub fn md5_hex(bytes: &[u8]) -> String {
    let digest = Md5::digest(bytes);
    hex::encode(digest)
}

/// Derive a UUID from a hash string (hex or the alphanumeric output of
/// [`sha256_b64url`]): retain the first 32 hex characters found in `input`
/// (right-padding with `'0'` if fewer than 32 are present), then insert
/// dashes in the standard 8-4-4-4-12 grouping.
///
/// # Examples
///
/// ```
/// use ota_core::hash::{hash_to_uuid, sha256_b64url};
/// let uuid = hash_to_uuid(&sha256_b64url(b"metadata:ios"));
/// assert_eq!(uuid.len(), 36);
/// assert_eq!(uuid.chars().filter(|&c| c == '-').count(), 4);
///
/// // Deterministic.
/// let again = hash_to_uuid(&sha256_b64url(b"metadata:ios"));
/// assert_eq!(uuid, again);
/// ```
pub fn hash_to_uuid(input: &str) -> String {
    let mut hex: String = input
        .chars()
        .filter(|c| c.is_ascii_hexdigit())
        .map(|c| c.to_ascii_lowercase())
        .take(32)
        .collect();
    while hex.len() < 32 {
        hex.push('0');
    }
    format!(
        "{}-{}-{}-{}-{}",
        &hex[0..8],
        &hex[8..12],
        &hex[12..16],
        &hex[16..20],
        &hex[20..32]
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sha256_b64url_is_stable() {
        let a = sha256_b64url(b"the quick brown fox");
        let b = sha256_b64url(b"the quick brown fox");
        assert_eq!(a, b);
    }

    #[test]
    fn sha256_b64url_differs_for_different_input() {
        assert_ne!(sha256_b64url(b"a"), sha256_b64url(b"b"));
    }

    #[test]
    fn sha256_b64url_known_vector() {
        // echo -n "" | openssl dgst -sha256 -binary | base64 | tr '+/' '-_' | tr -d '='
        assert_eq!(
            sha256_b64url(b""),
            "47DEQpj8HBSa-_TImW-5JCeuQeRkm5NMpJWZG3hSuFU"
        );
    }

    #[test]
    fn sha256_b64url_has_no_padding_characters() {
        for input in [&b""[..], b"a", b"ab", b"abc", b"abcd", b"abcde"] {
            let out = sha256_b64url(input);
            assert!(!out.contains('='));
            assert!(!out.contains('+'));
            assert!(!out.contains('/'));
        }
    }

    #[test]
    fn md5_hex_known_vector() {
        assert_eq!(md5_hex(b""), "d41d8cd98f00b204e9800998ecf8427e");
        assert_eq!(md5_hex(b"abc"), "900150983cd24fb0d6963f7d28e17f72");
    }

    #[test]
    fn md5_hex_is_lowercase() {
        let out = md5_hex(b"some asset bytes");
        assert_eq!(out, out.to_lowercase());
        assert_eq!(out.len(), 32);
    }

    #[test]
    fn hash_to_uuid_has_standard_shape() {
        let uuid = hash_to_uuid("0123456789abcdef0123456789abcdef");
        assert_eq!(uuid, "01234567-89ab-cdef-0123-456789abcdef");
    }

    #[test]
    fn hash_to_uuid_pads_short_input() {
        let uuid = hash_to_uuid("abc");
        assert_eq!(uuid, "abc00000-0000-0000-0000-000000000000");
    }

    #[test]
    fn hash_to_uuid_filters_non_hex_characters() {
        // Base64url output contains '-', '_' and letters outside a-f; only
        // hex digits are retained, in order, before padding/grouping.
        let uuid = hash_to_uuid("zz-z_1a2b3c");
        assert_eq!(uuid, "1a2b3c00-0000-0000-0000-000000000000");
    }

    #[test]
    fn hash_to_uuid_is_deterministic() {
        let input = sha256_b64url(b"metadata.json:ios");
        assert_eq!(hash_to_uuid(&input), hash_to_uuid(&input));
    }

    #[test]
    fn hash_to_uuid_truncates_long_input() {
        let uuid = hash_to_uuid(&"a".repeat(64));
        assert_eq!(uuid, "aaaaaaaa-aaaa-aaaa-aaaa-aaaaaaaaaaaa");
    }

    proptest::proptest! {
        #[test]
        fn sha256_b64url_always_alphanumeric_dash_underscore(s in ".*") {
            let out = sha256_b64url(s.as_bytes());
            proptest::prop_assert!(out.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
        }

        #[test]
        fn hash_to_uuid_always_36_chars_with_4_dashes(s in ".*") {
            let uuid = hash_to_uuid(&s);
            proptest::prop_assert_eq!(uuid.len(), 36);
            proptest::prop_assert_eq!(uuid.chars().filter(|&c| c == '-').count(), 4);
        }
    }
}
