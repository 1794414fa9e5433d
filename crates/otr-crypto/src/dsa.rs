//! The long-term DSA identity key: canonical public-key serialization,
//! fingerprinting, and fixed-width `r‖s` signatures.
//!
//! The serialized form (type tag `0x0000` followed by `MPI(p) ‖ MPI(q) ‖
//! MPI(g) ‖ MPI(y)`) is the byte string every fingerprint and every
//! encrypted-signature payload is computed over, so it lives here rather
//! than in `otr-proto` — `otr-proto` only frames it inside a larger
//! message.
//!
//! Grounded on the teacher's long-term identity key
//! (`dl_crypto::identity::IdentityKeyPair`): a keypair struct holding a
//! public half plus a zeroize-on-drop secret half, with `sign`/`verify`
//! as the only operations exposed on the secret. The teacher signs with
//! Ed25519; here the algorithm is fixed DSA with SHA-1 because that is
//! what OTR's transcript format requires, but the shape — opaque keypair,
//! `fingerprint()` derived from the serialized public key, constant-time
//! fingerprint comparison — carries over directly.

use dsa::{Components, SigningKey, VerifyingKey};
use num_bigint::BigUint;
use num_bigint_dig::BigUint as DigBigUint;
use sha1::{Digest, Sha1};
use signature::hazmat::{PrehashVerifier, RandomizedPrehashSigner};
use subtle::ConstantTimeEq;

use crate::error::CryptoError;
use crate::mpi::{append_mpi, Reader};

const PUBKEY_TYPE_TAG: u16 = 0x0000;
const SIG_PART_LEN: usize = 20;

fn to_dig(n: &BigUint) -> DigBigUint {
    DigBigUint::from_bytes_be(&n.to_bytes_be())
}

fn from_dig(n: &DigBigUint) -> BigUint {
    BigUint::from_bytes_be(&n.to_bytes_be())
}

/// A DSA public key in OTR's canonical `(p, q, g, y)` form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DsaPublicKey {
    pub p: BigUint,
    pub q: BigUint,
    pub g: BigUint,
    pub y: BigUint,
}

impl DsaPublicKey {
    /// `0x0000 ‖ MPI(p) ‖ MPI(q) ‖ MPI(g) ‖ MPI(y)` — the exact bytes a
    /// fingerprint is taken over and that appear inline in an AKE
    /// encrypted-signature payload.
    pub fn serialize(&self) -> Vec<u8> {
        let mut out = Vec::new();
        out.extend_from_slice(&PUBKEY_TYPE_TAG.to_be_bytes());
        append_mpi(&mut out, &self.p);
        append_mpi(&mut out, &self.q);
        append_mpi(&mut out, &self.g);
        append_mpi(&mut out, &self.y);
        out
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, CryptoError> {
        let tag = reader
            .read_short()
            .map_err(|_| CryptoError::InvalidKeyLength { expected: 2, got: 0 })?;
        if tag != PUBKEY_TYPE_TAG {
            return Err(CryptoError::Dsa(format!("unsupported public key type tag {tag:#06x}")));
        }
        let p = reader.read_mpi().map_err(|e| CryptoError::Dsa(e.to_string()))?;
        let q = reader.read_mpi().map_err(|e| CryptoError::Dsa(e.to_string()))?;
        let g = reader.read_mpi().map_err(|e| CryptoError::Dsa(e.to_string()))?;
        let y = reader.read_mpi().map_err(|e| CryptoError::Dsa(e.to_string()))?;
        Ok(Self { p, q, g, y })
    }

    /// 20-byte SHA-1 digest of the serialized public key, the basis for
    /// manual trust comparison between peers.
    pub fn fingerprint(&self) -> [u8; 20] {
        let mut hasher = Sha1::new();
        hasher.update(self.serialize());
        let digest = hasher.finalize();
        let mut out = [0u8; 20];
        out.copy_from_slice(&digest);
        out
    }

    /// Constant-time fingerprint comparison for manual-verification UIs.
    pub fn fingerprint_eq(&self, other: &DsaPublicKey) -> bool {
        self.fingerprint().ct_eq(&other.fingerprint()).into()
    }

    fn verifying_key(&self) -> Result<VerifyingKey, CryptoError> {
        let components = Components::from_components(to_dig(&self.p), to_dig(&self.q), to_dig(&self.g))
            .map_err(|e| CryptoError::Dsa(e.to_string()))?;
        VerifyingKey::from_components(components, to_dig(&self.y))
            .map_err(|e| CryptoError::Dsa(e.to_string()))
    }

    /// Verify a fixed 40-byte `r‖s` signature over a pre-hashed message,
    /// matching `DSA-verify(pub_peer, mb, sig)` in the encrypted-signature
    /// check: `mb` is already an HMAC-SHA256 digest, never re-hashed here.
    pub fn verify_prehashed(&self, digest: &[u8], sig: &[u8; 40]) -> Result<(), CryptoError> {
        let verifying_key = self.verifying_key()?;
        let signature = decode_signature(sig)?;
        verifying_key
            .verify_prehash(digest, &signature)
            .map_err(|_| CryptoError::SignatureVerification)
    }
}

/// A long-term DSA identity keypair. The secret exponent `x` is zeroized
/// on drop; only `sign` and `public()` ever touch it.
pub struct DsaKeyPair {
    public: DsaPublicKey,
    signing_key: SigningKey,
}

impl DsaKeyPair {
    /// Generate a fresh 1024-bit DSA keypair (the conventional OTR
    /// identity-key size; `dsa::Components::generate` picks matching
    /// L/N parameters for it).
    pub fn generate(rng: &mut (impl rand_core::RngCore + rand_core::CryptoRng)) -> Self {
        let components = Components::generate(rng, dsa::KeySize::DSA_1024_160);
        let signing_key = SigningKey::generate(rng, components);
        let verifying_key = signing_key.verifying_key();
        let public = DsaPublicKey {
            p: from_dig(verifying_key.components().p()),
            q: from_dig(verifying_key.components().q()),
            g: from_dig(verifying_key.components().g()),
            y: from_dig(verifying_key.y()),
        };
        Self { public, signing_key }
    }

    pub fn public(&self) -> &DsaPublicKey {
        &self.public
    }

    /// Sign a pre-hashed message, returning the fixed 40-byte `r‖s`
    /// encoding (each zero-padded to 20 bytes) that the encrypted-
    /// signature payload embeds verbatim.
    pub fn sign_prehashed(
        &self,
        rng: &mut (impl rand_core::RngCore + rand_core::CryptoRng),
        digest: &[u8],
    ) -> Result<[u8; 40], CryptoError> {
        let signature: dsa::Signature = self
            .signing_key
            .sign_prehash_with_rng(rng, digest)
            .map_err(|e| CryptoError::Dsa(e.to_string()))?;
        encode_signature(&signature)
    }
}

fn encode_signature(signature: &dsa::Signature) -> Result<[u8; 40], CryptoError> {
    let mut out = [0u8; 40];
    write_part(&mut out[..SIG_PART_LEN], signature.r())?;
    write_part(&mut out[SIG_PART_LEN..], signature.s())?;
    Ok(out)
}

fn write_part(dest: &mut [u8], n: &DigBigUint) -> Result<(), CryptoError> {
    let bytes = n.to_bytes_be();
    if bytes.len() > dest.len() {
        return Err(CryptoError::Dsa("signature component too wide for 20-byte field".into()));
    }
    let offset = dest.len() - bytes.len();
    dest[offset..].copy_from_slice(&bytes);
    Ok(())
}

fn decode_signature(sig: &[u8; 40]) -> Result<dsa::Signature, CryptoError> {
    let r = DigBigUint::from_bytes_be(&sig[..SIG_PART_LEN]);
    let s = DigBigUint::from_bytes_be(&sig[SIG_PART_LEN..]);
    dsa::Signature::from_components(r, s).map_err(|e| CryptoError::Dsa(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    #[test]
    fn sign_then_verify_roundtrip() {
        let mut rng = OsRng;
        let keypair = DsaKeyPair::generate(&mut rng);
        let digest = Sha1::digest(b"handshake transcript");
        let sig = keypair.sign_prehashed(&mut rng, &digest).unwrap();
        keypair.public().verify_prehashed(&digest, &sig).unwrap();
    }

    #[test]
    fn tampered_signature_is_rejected() {
        let mut rng = OsRng;
        let keypair = DsaKeyPair::generate(&mut rng);
        let digest = Sha1::digest(b"handshake transcript");
        let mut sig = keypair.sign_prehashed(&mut rng, &digest).unwrap();
        sig[0] ^= 0xFF;
        assert!(keypair.public().verify_prehashed(&digest, &sig).is_err());
    }

    #[test]
    fn public_key_serialization_roundtrip() {
        let mut rng = OsRng;
        let keypair = DsaKeyPair::generate(&mut rng);
        let bytes = keypair.public().serialize();
        let mut reader = Reader::new(&bytes);
        let parsed = DsaPublicKey::parse(&mut reader).unwrap();
        reader.expect_exhausted().unwrap();
        assert_eq!(&parsed, keypair.public());
    }

    #[test]
    fn fingerprint_is_twenty_bytes_and_stable() {
        let mut rng = OsRng;
        let keypair = DsaKeyPair::generate(&mut rng);
        let a = keypair.public().fingerprint();
        let b = keypair.public().fingerprint();
        assert_eq!(a.len(), 20);
        assert_eq!(a, b);
    }

    #[test]
    fn different_keys_have_different_fingerprints() {
        let mut rng = OsRng;
        let a = DsaKeyPair::generate(&mut rng);
        let b = DsaKeyPair::generate(&mut rng);
        assert!(!a.public().fingerprint_eq(b.public()));
    }
}
