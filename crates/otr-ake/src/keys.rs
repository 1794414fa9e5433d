//! Derivation of `ssid` and the six AKE-internal keys from the DH shared
//! secret, per the key schedule in the AKE engine's key-derivation rules:
//! each key is `SHA256(tag_byte ‖ secbytes)`, where `secbytes = MPI(s)`.

use num_bigint::BigUint;
use otr_crypto::mpi::append_mpi;
use sha2::{Digest, Sha256};
use zeroize::ZeroizeOnDrop;

/// The `(c, m1, m2)` triple used to encrypt and MAC one direction's
/// encrypted-signature payload (either the Reveal-Signature or the
/// Signature message).
#[derive(ZeroizeOnDrop)]
pub struct KeySet {
    pub c: [u8; 16],
    pub m1: [u8; 32],
    pub m2: [u8; 32],
}

/// `ssid` plus the Reveal-Sig (`c, m1, m2`) and Signature (`c', m1', m2'`)
/// key sets. Everything here is ephemeral AKE-internal material, wiped
/// once the handshake completes.
#[derive(ZeroizeOnDrop)]
pub struct AkeKeys {
    #[zeroize(skip)]
    pub ssid: [u8; 8],
    pub reveal: KeySet,
    pub sig: KeySet,
}

fn hash_tagged(tag: u8, secbytes: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update([tag]);
    hasher.update(secbytes);
    let digest = hasher.finalize();
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Derive `ssid` and both key sets from the raw DH shared secret `s`.
pub fn calculate_ake_keys(s: &BigUint) -> AkeKeys {
    let mut secbytes = Vec::new();
    append_mpi(&mut secbytes, s);

    let ssid_full = hash_tagged(0x00, &secbytes);
    let mut ssid = [0u8; 8];
    ssid.copy_from_slice(&ssid_full[..8]);

    let cc_prime = hash_tagged(0x01, &secbytes);
    let mut c = [0u8; 16];
    let mut c_prime = [0u8; 16];
    c.copy_from_slice(&cc_prime[..16]);
    c_prime.copy_from_slice(&cc_prime[16..]);

    let m1 = hash_tagged(0x02, &secbytes);
    let m2 = hash_tagged(0x03, &secbytes);
    let m1_prime = hash_tagged(0x04, &secbytes);
    let m2_prime = hash_tagged(0x05, &secbytes);

    AkeKeys {
        ssid,
        reveal: KeySet { c, m1, m2 },
        sig: KeySet { c: c_prime, m1: m1_prime, m2: m2_prime },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derivation_is_deterministic() {
        let s = BigUint::from(123456789u64);
        let a = calculate_ake_keys(&s);
        let b = calculate_ake_keys(&s);
        assert_eq!(a.ssid, b.ssid);
        assert_eq!(a.reveal.c, b.reveal.c);
        assert_eq!(a.sig.c, b.sig.c);
    }

    #[test]
    fn reveal_and_signature_keys_are_distinct() {
        let s = BigUint::from(42u64);
        let keys = calculate_ake_keys(&s);
        assert_ne!(keys.reveal.c, keys.sig.c);
        assert_ne!(keys.reveal.m1, keys.sig.m1);
        assert_ne!(keys.reveal.m2, keys.sig.m2);
    }

    #[test]
    fn different_secrets_yield_different_ssid() {
        let a = calculate_ake_keys(&BigUint::from(1u64));
        let b = calculate_ake_keys(&BigUint::from(2u64));
        assert_ne!(a.ssid, b.ssid);
    }
}
