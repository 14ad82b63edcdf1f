//! Wire encoding helpers: unpadded URL-safe base64 and HMAC-SHA1 URL signatures.

use crate::error::IssueError;
use crate::secret::SecretKey;
use base64::engine::general_purpose::{URL_SAFE, URL_SAFE_NO_PAD};
use base64::Engine;
use hmac::{Hmac, Mac};
use sha1::Sha1;

type HmacSha1 = Hmac<Sha1>;

/// URL-safe base64 with every trailing `=` removed.
pub fn encode_unpadded(bytes: &[u8]) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Inverse of [`encode_unpadded`]. Padding is re-derived from the length modulo 4,
/// the same way the edge restores it before decoding.
pub fn decode_unpadded(encoded: &str) -> Result<Vec<u8>, IssueError> {
    let pad = match encoded.len() % 4 {
        0 => 0,
        2 => 2,
        3 => 1,
        _ => {
            return Err(IssueError::Encoding(format!(
                "invalid unpadded base64 length {}",
                encoded.len()
            )))
        }
    };
    let mut padded = String::with_capacity(encoded.len() + pad);
    padded.push_str(encoded);
    padded.extend(std::iter::repeat('=').take(pad));
    URL_SAFE
        .decode(padded.as_bytes())
        .map_err(|e| IssueError::Encoding(format!("invalid base64: {}", e)))
}

/// Raw HMAC-SHA1 digest of `message` under `key`.
pub fn hmac_sha1(key: &SecretKey, message: &[u8]) -> Vec<u8> {
    // HMAC accepts keys of any length; oversized keys are hashed first.
    let mut mac = HmacSha1::new_from_slice(key.as_bytes())
        .unwrap_or_else(|_| unreachable!("HMAC can take key of any size"));
    mac.update(message);
    mac.finalize().into_bytes().to_vec()
}

/// Signature value for a candidate URL: unpadded URL-safe base64 of HMAC-SHA1 over its UTF-8 bytes.
pub fn sign_url(key: &SecretKey, url: &str) -> String {
    encode_unpadded(&hmac_sha1(key, url.as_bytes()))
}
