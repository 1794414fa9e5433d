//! AES-128-CTR encryption of the signature payload, and the HMAC-SHA256
//! MACs used throughout the AKE and SMP transcripts.
//!
//! The encrypted-signature payload always uses a zero IV: the encryption
//! key `c`/`c'` is used exactly once per handshake, so key+nonce reuse
//! never occurs even without a random nonce. Grounded on the shape of
//! the teacher's `dl_crypto::aead` module (key-in, ciphertext-out helper
//! functions returning `Result<_, CryptoError>`), adapted to CTR mode
//! and a fixed nonce because that is what the wire format requires.

use aes::Aes128;
use ctr::cipher::{KeyIvInit, StreamCipher};
use hmac::{Hmac, Mac};
use sha2::Sha256;
use subtle::ConstantTimeEq;

use crate::error::CryptoError;

type Aes128Ctr = ctr::Ctr128BE<Aes128>;

/// Encrypt or decrypt (CTR is its own inverse) `data` in place with a
/// 16-byte key and an all-zero 16-byte IV.
pub fn aes_ctr_zero_iv(key: &[u8; 16], data: &mut [u8]) -> Result<(), CryptoError> {
    let mut cipher = Aes128Ctr::new(key.into(), &[0u8; 16].into());
    cipher.apply_keystream(data);
    Ok(())
}

/// HMAC-SHA256 over `data` with the given key, returning the full 32-byte
/// tag.
pub fn hmac_sha256(key: &[u8], data: &[u8]) -> [u8; 32] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("HMAC accepts keys of any length");
    mac.update(data);
    let result = mac.finalize().into_bytes();
    let mut out = [0u8; 32];
    out.copy_from_slice(&result);
    out
}

/// HMAC-SHA256 truncated to its first 20 bytes, used for the encrypted-
/// signature payload's MAC.
pub fn hmac_sha256_truncated20(key: &[u8], data: &[u8]) -> [u8; 20] {
    let full = hmac_sha256(key, data);
    let mut out = [0u8; 20];
    out.copy_from_slice(&full[..20]);
    out
}

/// Constant-time comparison of two MAC tags.
pub fn mac_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}
