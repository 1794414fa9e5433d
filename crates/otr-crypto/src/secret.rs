//! Scoped secret buffers.
//!
//! Every allocation that ever holds key material or a DH private exponent is
//! wrapped in one of these so the bytes are overwritten on every exit path —
//! success, error, or unwind. Mirrors `dl_crypto::identity::IdentityKeyPair`'s
//! `ZeroizeOnDrop` discipline, generalized to variable-length buffers and to
//! the big integers `otr-crypto::dh` produces.

use num_bigint::BigUint;
use zeroize::Zeroize;

/// A fixed- or variable-length byte buffer that is zeroized on drop.
///
/// Used for the 16-byte `r` commitment key, the expanded AES key copies used
/// to encrypt/decrypt the signature payload, and HMAC keys.
#[derive(Clone)]
pub struct SecretBytes(Vec<u8>);

impl SecretBytes {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Drop for SecretBytes {
    fn drop(&mut self) {
        self.0.zeroize();
    }
}

impl std::fmt::Debug for SecretBytes {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("SecretBytes(..)")
    }
}

/// A DH private exponent. `num-bigint::BigUint` keeps its digits in a
/// private `Vec<u32>` with no safe mutable access, so a `BigUint` field
/// can never be genuinely wiped on drop — replacing it just drops the old
/// allocation through the ordinary (non-zeroing) `Vec` destructor. The
/// exponent's big-endian bytes are therefore kept in a `SecretBytes`
/// instead, which does zeroize its backing `Vec<u8>` on drop; a `BigUint`
/// is reconstructed from those bytes only as a short-lived value at each
/// point of use, the same way `modexp_secret`'s own ladder registers are
/// transient and not individually wiped.
pub struct SecretExponent {
    bytes: SecretBytes,
}

impl SecretExponent {
    pub fn new(value: BigUint) -> Self {
        Self { bytes: SecretBytes::new(value.to_bytes_be()) }
    }

    pub fn value(&self) -> BigUint {
        BigUint::from_bytes_be(self.bytes.as_slice())
    }
}
