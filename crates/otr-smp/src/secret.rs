//! Derivation of the SMP input `x` from the long-term fingerprints, the
//! AKE `ssid`, and the caller-supplied low-entropy secret.

use num_bigint::BigUint;
use otr_crypto::dh::subgroup_order;
use sha2::{Digest, Sha256};

/// `SHA256(0x01 ‖ initiator_fingerprint ‖ responder_fingerprint ‖ ssid ‖
/// user_secret) mod q`. Both sides compute the same bytes because
/// fingerprints are ordered by role (the SMP initiator's first),
/// regardless of which side of the AKE either party played.
pub fn derive_smp_secret(
    am_initiator: bool,
    our_fingerprint: &[u8; 20],
    their_fingerprint: &[u8; 20],
    ssid: &[u8; 8],
    user_secret: &[u8],
) -> BigUint {
    let (initiator_fp, responder_fp) = if am_initiator {
        (our_fingerprint, their_fingerprint)
    } else {
        (their_fingerprint, our_fingerprint)
    };

    let mut hasher = Sha256::new();
    hasher.update([0x01]);
    hasher.update(initiator_fp);
    hasher.update(responder_fp);
    hasher.update(ssid);
    hasher.update(user_secret);
    let digest = hasher.finalize();

    BigUint::from_bytes_be(&digest) % subgroup_order()
}
