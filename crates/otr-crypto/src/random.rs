//! The single randomness seam every key-generation and AKE step draws
//! through, so a deterministic source can be injected in tests.
//!
//! Grounded on `dl_crypto::kdf::generate_salt`: a thin wrapper function
//! around `RngCore::fill_bytes`, kept separate from the call sites so the
//! fallible, injectable version (`random_fill`) is the only thing the
//! rest of the crate depends on rather than `rand::rngs::OsRng` directly.

use rand_core::RngCore;

use crate::error::CryptoError;

/// Fill `buf` with cryptographically random bytes from `rng`.
///
/// `rng` is a `dyn RngCore` rather than a generic so that `otr-ake` and
/// `otr-smp` can hold a single boxed random source per conversation
/// (deterministic in tests, `OsRng`-backed in production) without making
/// every call site generic.
pub fn random_fill(rng: &mut dyn RngCore, buf: &mut [u8]) -> Result<(), CryptoError> {
    rng.try_fill_bytes(buf)
        .map_err(|_| CryptoError::ShortRandomRead)
}

/// Generate a fresh random array of `N` bytes.
pub fn random_bytes<const N: usize>(rng: &mut dyn RngCore) -> Result<[u8; N], CryptoError> {
    let mut buf = [0u8; N];
    random_fill(rng, &mut buf)?;
    Ok(buf)
}
