//! The zero-knowledge proof primitives the four SMP messages are built
//! from: a Fiat-Shamir hash over group elements, and the three proof
//! shapes used across SMP1-4 (knowledge of a discrete log, knowledge of
//! the coordinates of a Pedersen-style commitment, and equality of two
//! discrete logs across different bases).
//!
//! All of this runs over the same 1536-bit group as the AKE
//! (`otr_crypto::dh`), reusing its `modexp_secret`/`modexp_public` split:
//! an ephemeral proof exponent (`r2`, `r4`, ...) is secret and uses the
//! constant-time ladder; a value received from the wire (`c`, `d`, a
//! peer's committed group element) is public and uses variable-time
//! exponentiation.

use num_bigint::{BigInt, BigUint, Sign};
use otr_crypto::dh::{modexp_public, modexp_secret, subgroup_order};
use otr_crypto::mpi::append_mpi;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Constant-time comparison of two scalars, padded to the hash's 32-byte
/// output width before comparing.
pub(crate) fn scalars_eq(a: &BigUint, b: &BigUint) -> bool {
    let mut ab = [0u8; 32];
    let mut bb = [0u8; 32];
    let a_bytes = a.to_bytes_be();
    let b_bytes = b.to_bytes_be();
    ab[32 - a_bytes.len()..].copy_from_slice(&a_bytes);
    bb[32 - b_bytes.len()..].copy_from_slice(&b_bytes);
    ab.ct_eq(&bb).into()
}

/// Constant-time comparison of two group elements, padded to the prime's
/// 192-byte width. Used for the final `Rab` check, which compares values
/// up to 1536 bits wide rather than a 256-bit hash output.
pub(crate) fn group_elements_eq(a: &BigUint, b: &BigUint) -> bool {
    let width = otr_crypto::dh::prime().to_bytes_be().len();
    let mut ab = vec![0u8; width];
    let mut bb = vec![0u8; width];
    let a_bytes = a.to_bytes_be();
    let b_bytes = b.to_bytes_be();
    ab[width - a_bytes.len()..].copy_from_slice(&a_bytes);
    bb[width - b_bytes.len()..].copy_from_slice(&b_bytes);
    ab.ct_eq(&bb).into()
}

/// A fresh exponent drawn uniformly from `[0, q)` via rejection-free
/// reduction of 192 random bytes (generous overkill relative to q's
/// ~1533 bits, keeping the bias from the reduction negligible).
pub fn random_exponent(rng: &mut (impl RngCore + CryptoRng)) -> BigUint {
    let mut buf = [0u8; 192];
    rng.fill_bytes(&mut buf);
    BigUint::from_bytes_be(&buf) % subgroup_order()
}

/// `SHA256(version_byte ‖ MPI(e1) ‖ MPI(e2) ‖ ...) mod q`, the Fiat-Shamir
/// challenge used by every SMP proof. `version` disambiguates the eight
/// distinct proofs so a challenge from one can't be replayed as another.
pub fn hash_to_scalar(version: u8, elements: &[&BigUint]) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update([version]);
    for e in elements {
        let mut mpi = Vec::new();
        append_mpi(&mut mpi, e);
        hasher.update(&mpi);
    }
    let digest = hasher.finalize();
    BigUint::from_bytes_be(&digest) % subgroup_order()
}

/// `r - a*c mod q`, computed in signed arithmetic and reduced back into
/// `[0, q)`.
pub fn sub_mod_q(r: &BigUint, a: &BigUint, c: &BigUint) -> BigUint {
    let q = BigInt::from(subgroup_order());
    let r = BigInt::from(r.clone());
    let a = BigInt::from(a.clone());
    let c = BigInt::from(c.clone());
    let mut diff = (r - a * c) % &q;
    if diff.sign() == Sign::Minus {
        diff += &q;
    }
    diff.to_biguint().expect("reduced into [0, q)")
}

/// `base^-1 mod p`, via Fermat's little theorem. `base` is always a
/// public group element here, so the variable-time ladder is fine.
pub fn inverse(base: &BigUint) -> BigUint {
    let p_minus_2 = otr_crypto::dh::prime() - BigUint::from(2u32);
    modexp_public(base, &p_minus_2)
}

/// Proof of knowledge of the discrete log `a` such that `public = g^a`:
/// used for `g2a`/`g3a` (SMP1) and `g2b`/`g3b` (SMP2).
pub struct LogProof {
    pub c: BigUint,
    pub d: BigUint,
}

pub fn prove_log(rng: &mut (impl RngCore + CryptoRng), version: u8, generator: &BigUint, a: &BigUint) -> LogProof {
    let r = random_exponent(rng);
    let commitment = modexp_secret(generator, &r);
    let c = hash_to_scalar(version, &[&commitment]);
    let d = sub_mod_q(&r, a, &c);
    LogProof { c, d }
}

pub fn verify_log(version: u8, generator: &BigUint, public: &BigUint, proof: &LogProof) -> bool {
    let lhs = modexp_public(generator, &proof.d);
    let rhs = modexp_public(public, &proof.c);
    let commitment = (&lhs * &rhs) % otr_crypto::dh::prime();
    scalars_eq(&proof.c, &hash_to_scalar(version, &[&commitment]))
}

/// Proof of knowledge of `(r, secret)` behind `p = g3^r`, `q = g1^r *
/// g2^secret`: used for `(Pb, Qb)` in SMP2 and `(Pa, Qa)` in SMP3.
pub struct CoordProof {
    pub cp: BigUint,
    pub d5: BigUint,
    pub d6: BigUint,
}

pub fn prove_coords(
    rng: &mut (impl RngCore + CryptoRng),
    version: u8,
    g2: &BigUint,
    g3: &BigUint,
    r4: &BigUint,
    secret: &BigUint,
) -> CoordProof {
    let r5 = random_exponent(rng);
    let r6 = random_exponent(rng);

    let commit_p = modexp_secret(g3, &r5);
    let commit_q = {
        let a = modexp_secret(&otr_crypto::dh::generator(), &r5);
        let b = modexp_secret(g2, &r6);
        (&a * &b) % otr_crypto::dh::prime()
    };

    let cp = hash_to_scalar(version, &[&commit_p, &commit_q]);
    let d5 = sub_mod_q(&r5, r4, &cp);
    let d6 = sub_mod_q(&r6, secret, &cp);
    CoordProof { cp, d5, d6 }
}

pub fn verify_coords(version: u8, g2: &BigUint, g3: &BigUint, p: &BigUint, q: &BigUint, proof: &CoordProof) -> bool {
    let p_part = {
        let a = modexp_public(g3, &proof.d5);
        let b = modexp_public(p, &proof.cp);
        (&a * &b) % otr_crypto::dh::prime()
    };
    let q_part = {
        let a = modexp_public(&otr_crypto::dh::generator(), &proof.d5);
        let b = modexp_public(g2, &proof.d6);
        let c = modexp_public(q, &proof.cp);
        let ab = (&a * &b) % otr_crypto::dh::prime();
        (&ab * &c) % otr_crypto::dh::prime()
    };
    scalars_eq(&proof.cp, &hash_to_scalar(version, &[&p_part, &q_part]))
}

/// Proof of knowledge of `a3` such that `g3a = g1^a3` and `big_r =
/// qaqb^a3`: used for `Ra` (SMP3) and `Rb` (SMP4), binding the same
/// exponent across two different bases.
pub struct EqualLogsProof {
    pub cr: BigUint,
    pub d7: BigUint,
}

pub fn prove_equal_logs(
    rng: &mut (impl RngCore + CryptoRng),
    version: u8,
    qaqb: &BigUint,
    a3: &BigUint,
) -> EqualLogsProof {
    let r7 = random_exponent(rng);
    let commit_g = modexp_secret(&otr_crypto::dh::generator(), &r7);
    let commit_qaqb = modexp_secret(qaqb, &r7);
    let cr = hash_to_scalar(version, &[&commit_g, &commit_qaqb]);
    let d7 = sub_mod_q(&r7, a3, &cr);
    EqualLogsProof { cr, d7 }
}

pub fn verify_equal_logs(
    version: u8,
    g3x: &BigUint,
    qaqb: &BigUint,
    big_r: &BigUint,
    proof: &EqualLogsProof,
) -> bool {
    let g_part = {
        let a = modexp_public(&otr_crypto::dh::generator(), &proof.d7);
        let b = modexp_public(g3x, &proof.cr);
        (&a * &b) % otr_crypto::dh::prime()
    };
    let qaqb_part = {
        let a = modexp_public(qaqb, &proof.d7);
        let b = modexp_public(big_r, &proof.cr);
        (&a * &b) % otr_crypto::dh::prime()
    };
    scalars_eq(&proof.cr, &hash_to_scalar(version, &[&g_part, &qaqb_part]))
}

#[cfg(test)]
mod tests {
    use super::*;
    use otr_crypto::dh::generator;
    use rand::rngs::OsRng;

    #[test]
    fn log_proof_roundtrip() {
        let mut rng = OsRng;
        let a = random_exponent(&mut rng);
        let public = modexp_secret(&generator(), &a);
        let proof = prove_log(&mut rng, 1, &generator(), &a);
        assert!(verify_log(1, &generator(), &public, &proof));
    }

    #[test]
    fn log_proof_rejects_wrong_public_value() {
        let mut rng = OsRng;
        let a = random_exponent(&mut rng);
        let other = random_exponent(&mut rng);
        let wrong_public = modexp_secret(&generator(), &other);
        let proof = prove_log(&mut rng, 1, &generator(), &a);
        assert!(!verify_log(1, &generator(), &wrong_public, &proof));
    }

    #[test]
    fn coord_proof_roundtrip() {
        let mut rng = OsRng;
        let g2 = modexp_secret(&generator(), &random_exponent(&mut rng));
        let g3 = modexp_secret(&generator(), &random_exponent(&mut rng));
        let r4 = random_exponent(&mut rng);
        let secret = BigUint::from(42u32);

        let p = modexp_secret(&g3, &r4);
        let q = {
            let a = modexp_secret(&generator(), &r4);
            let b = modexp_secret(&g2, &secret);
            (&a * &b) % otr_crypto::dh::prime()
        };

        let proof = prove_coords(&mut rng, 5, &g2, &g3, &r4, &secret);
        assert!(verify_coords(5, &g2, &g3, &p, &q, &proof));
    }

    #[test]
    fn equal_logs_proof_roundtrip() {
        let mut rng = OsRng;
        let a3 = random_exponent(&mut rng);
        let g3a = modexp_secret(&generator(), &a3);
        let qaqb = modexp_secret(&generator(), &random_exponent(&mut rng));
        let big_r = modexp_secret(&qaqb, &a3);

        let proof = prove_equal_logs(&mut rng, 7, &qaqb, &a3);
        assert!(verify_equal_logs(7, &g3a, &qaqb, &big_r, &proof));
    }

    #[test]
    fn inverse_roundtrips_to_identity() {
        let x = modexp_secret(&generator(), &BigUint::from(999u32));
        let inv = inverse(&x);
        let product = (&x * &inv) % otr_crypto::dh::prime();
        assert_eq!(product, BigUint::from(1u32));
    }
}
