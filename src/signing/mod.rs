//! Per-vendor request-signing primitives (C2).
//!
//! Every scheme here is a pure function over explicit inputs — no internal
//! clock, no internal randomness — so callers inject `chrono::DateTime<Utc>`
//! and a nonce string, which keeps every signer deterministic and unit
//! testable without mocking time.

pub mod aliyun_hmac_sha1;
pub mod basic;
pub mod bce_v1;
pub mod md5_token;
pub mod sdk_hmac_sha256;
pub mod tc3_hmac_sha256;

/// Generic HMAC-SHA256 helper shared by several signers (TC3 key
/// derivation, BCE, SDK-HMAC-SHA256's single-step signature).
pub(crate) fn hmac_sha256(key: &[u8], data: &[u8]) -> Vec<u8> {
    use hmac::{Hmac, Mac};
    use sha2::Sha256;
    let mut mac = <Hmac<Sha256>>::new_from_slice(key).expect("HMAC accepts any key length");
    mac.update(data);
    mac.finalize().into_bytes().to_vec()
}

pub(crate) fn sha256_hex(data: &[u8]) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(data))
}
