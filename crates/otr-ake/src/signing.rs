//! Generation and verification of the encrypted-signature payload carried
//! by the Reveal-Signature and Signature messages.

use num_bigint::BigUint;
use otr_crypto::dsa::DsaKeyPair;
use otr_crypto::mpi::append_mpi;
use otr_crypto::symmetric::{aes_ctr_zero_iv, hmac_sha256_truncated20, mac_eq};
use otr_proto::ake_messages::EncryptedSignaturePayload;
use rand_core::{CryptoRng, RngCore};

use crate::error::AkeError;
use crate::keys::KeySet;

/// `MPI(gx) ‖ MPI(gy) ‖ pub ‖ WORD(keyID)` when the sender chose `x`,
/// otherwise the first two MPIs swapped.
fn transcript(gx: &BigUint, gy: &BigUint, sender_chose_x: bool, pub_key_serialized: &[u8], key_id: u32) -> Vec<u8> {
    let mut out = Vec::new();
    if sender_chose_x {
        append_mpi(&mut out, gx);
        append_mpi(&mut out, gy);
    } else {
        append_mpi(&mut out, gy);
        append_mpi(&mut out, gx);
    }
    out.extend_from_slice(pub_key_serialized);
    out.extend_from_slice(&key_id.to_be_bytes());
    out
}

/// Produce `(enc, mac20)` for a Reveal-Signature or Signature message
/// body: `xb = pub ‖ WORD(keyID) ‖ DSA-sign(mb)`, `enc = AES128-CTR(c,
/// IV=0, xb)`, `mac20 = HMAC-SHA256(m2, DATA(enc))[..20]`.
pub fn generate_encrypted_signature(
    rng: &mut (impl RngCore + CryptoRng),
    identity: &DsaKeyPair,
    key: &KeySet,
    key_id: u32,
    gx: &BigUint,
    gy: &BigUint,
    sender_chose_x: bool,
) -> Result<(Vec<u8>, [u8; 20]), AkeError> {
    let pub_serialized = identity.public().serialize();
    let m = transcript(gx, gy, sender_chose_x, &pub_serialized, key_id);
    let mb = otr_crypto::symmetric::hmac_sha256(&key.m1, &m);

    let signature = identity.sign_prehashed(rng, &mb)?;
    let payload = EncryptedSignaturePayload {
        public_key: identity.public().clone(),
        key_id,
        signature,
    };
    let mut xb = payload.encode();
    aes_ctr_zero_iv(&key.c, &mut xb)?;

    let mut data_framed = Vec::with_capacity(4 + xb.len());
    otr_crypto::mpi::append_data(&mut data_framed, &xb);
    let mac = hmac_sha256_truncated20(&key.m2, &data_framed);

    Ok((xb, mac))
}

/// Verify and decode an incoming encrypted-signature payload. `gx`/`gy`
/// are passed with roles already swapped relative to the sender (the
/// verifier always recomputes the transcript from its own perspective).
pub fn verify_encrypted_signature(
    key: &KeySet,
    enc: &[u8],
    mac: &[u8; 20],
    gx: &BigUint,
    gy: &BigUint,
    sender_chose_x: bool,
) -> Result<EncryptedSignaturePayload, AkeError> {
    let mut data_framed = Vec::with_capacity(4 + enc.len());
    otr_crypto::mpi::append_data(&mut data_framed, enc);
    let expected_mac = hmac_sha256_truncated20(&key.m2, &data_framed);
    if !mac_eq(&expected_mac, mac) {
        return Err(AkeError::BadSignatureMac);
    }

    let mut plaintext = enc.to_vec();
    aes_ctr_zero_iv(&key.c, &mut plaintext)?;

    let payload = EncryptedSignaturePayload::parse(&plaintext)?;

    let pub_serialized = payload.public_key.serialize();
    let m = transcript(gx, gy, sender_chose_x, &pub_serialized, payload.key_id);
    let mb = otr_crypto::symmetric::hmac_sha256(&key.m1, &m);

    payload
        .public_key
        .verify_prehashed(&mb, &payload.signature)
        .map_err(|_| AkeError::BadSignature)?;

    Ok(payload)
}

#[cfg(test)]
mod tests {
    use super::*;
    use otr_crypto::dh::{generator, modexp_secret};
    use rand::rngs::OsRng;

    #[test]
    fn generate_then_verify_roundtrip() {
        let mut rng = OsRng;
        let identity = DsaKeyPair::generate(&mut rng);
        let key = KeySet { c: [9u8; 16], m1: [3u8; 32], m2: [4u8; 32] };
        let gx = modexp_secret(&generator(), &BigUint::from(12345u64));
        let gy = modexp_secret(&generator(), &BigUint::from(54321u64));

        let (enc, mac) =
            generate_encrypted_signature(&mut rng, &identity, &key, 1, &gx, &gy, true).unwrap();

        let payload = verify_encrypted_signature(&key, &enc, &mac, &gx, &gy, true).unwrap();
        assert_eq!(payload.key_id, 1);
        assert_eq!(&payload.public_key, identity.public());
    }

    #[test]
    fn tampered_mac_is_rejected() {
        let mut rng = OsRng;
        let identity = DsaKeyPair::generate(&mut rng);
        let key = KeySet { c: [9u8; 16], m1: [3u8; 32], m2: [4u8; 32] };
        let gx = modexp_secret(&generator(), &BigUint::from(111u64));
        let gy = modexp_secret(&generator(), &BigUint::from(222u64));

        let (enc, mut mac) =
            generate_encrypted_signature(&mut rng, &identity, &key, 1, &gx, &gy, true).unwrap();
        mac[0] ^= 0xFF;

        assert!(matches!(
            verify_encrypted_signature(&key, &enc, &mac, &gx, &gy, true),
            Err(AkeError::BadSignatureMac)
        ));
    }

    #[test]
    fn signature_from_different_session_is_rejected() {
        let mut rng = OsRng;
        let identity = DsaKeyPair::generate(&mut rng);
        let key = KeySet { c: [9u8; 16], m1: [3u8; 32], m2: [4u8; 32] };
        let gx = modexp_secret(&generator(), &BigUint::from(111u64));
        let gy = modexp_secret(&generator(), &BigUint::from(222u64));
        let other_gy = modexp_secret(&generator(), &BigUint::from(999u64));

        let (enc, mac) =
            generate_encrypted_signature(&mut rng, &identity, &key, 1, &gx, &gy, true).unwrap();

        assert!(matches!(
            verify_encrypted_signature(&key, &enc, &mac, &gx, &other_gy, true),
            Err(AkeError::BadSignature)
        ));
    }
}
