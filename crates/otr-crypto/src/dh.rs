//! The fixed 1536-bit OTR Diffie-Hellman group and its two modular
//! exponentiation primitives.
//!
//! A constant-time ladder is used whenever the exponent is secret (DH
//! keypair generation, shared-secret derivation); `BigUint::modpow`
//! (variable-time) is used only on already-verified public values, never
//! on a secret exponent.

use num_bigint::BigUint;
use num_traits::{One, Zero};
use once_lock_prime::group_prime;
use rand_core::RngCore;

use crate::error::CryptoError;
use crate::secret::SecretExponent;

mod once_lock_prime {
    use num_bigint::BigUint;
    use std::sync::OnceLock;

    // The fixed 1536-bit safe-prime OTR DH group: p = 2q+1 with p and q
    // prime and g=2 generating the order-q subgroup.
    const P_HEX: &str = concat!(
        "F6F6AE1AB438FCF8AE0130F953AE80981544C6D378DB9918FC2F81D7F68F4B7",
        "9BD088EA5B65D3194435572FE7EBF325B3C1835FB3B67A9ED3E6AC1DD4730B2",
        "E5B50914248335F1B4E29800B31C79F997747E030A1B8E695C140DF438CDB6",
        "EA80D13211E2B16CD1A7E7F698AE6F1753C7288E4DF5991C74A1C4291E0742B",
        "AB9BE0908D19B8E7BC56B3FFCB0C19154C66314446A56DE20A8340690983390",
        "F26EA6CB35424A6166639ACDB4ED899E971873560588C7179EA196DEA3CEF31",
        "91FC5A7",
    );

    pub fn group_prime() -> &'static BigUint {
        static P: OnceLock<BigUint> = OnceLock::new();
        P.get_or_init(|| {
            let hex: String = P_HEX.chars().filter(|c| !c.is_whitespace()).collect();
            BigUint::parse_bytes(hex.as_bytes(), 16).expect("static DH prime is valid hex")
        })
    }
}

/// The fixed generator, g = 2.
pub fn generator() -> BigUint {
    BigUint::from(2u32)
}

/// p, the 1536-bit safe prime.
pub fn prime() -> &'static BigUint {
    group_prime()
}

/// q = (p-1)/2, the order of the subgroup.
pub fn subgroup_order() -> BigUint {
    (prime() - BigUint::one()) / BigUint::from(2u32)
}

/// A value `x` is a valid group element iff `2 <= x <= p-2`.
pub fn is_group_element(x: &BigUint) -> bool {
    let p = prime();
    x >= &BigUint::from(2u32) && x <= &(p - BigUint::from(2u32))
}

pub fn check_group_element(x: &BigUint) -> Result<(), CryptoError> {
    if is_group_element(x) {
        Ok(())
    } else {
        Err(CryptoError::InvalidGroupElement)
    }
}

/// Variable-time modular exponentiation, used only on already-validated
/// public values (never on a secret exponent).
pub fn modexp_public(base: &BigUint, exponent: &BigUint) -> BigUint {
    base.modpow(exponent, prime())
}

/// Constant-time(-shaped) modular exponentiation via a Montgomery ladder:
/// the sequence of big-integer multiplications performed is identical
/// regardless of the bits of `exponent`, only which registers they update
/// differs. Used whenever `exponent` is secret.
pub fn modexp_secret(base: &BigUint, exponent: &BigUint) -> BigUint {
    let p = prime();
    if exponent.is_zero() {
        return BigUint::one();
    }

    let bits = exponent.bits();
    let mut r0 = BigUint::one();
    let mut r1 = base % p;

    for i in (0..bits).rev() {
        let bit = exponent.bit(i);
        if bit {
            r0 = (&r0 * &r1) % p;
            r1 = (&r1 * &r1) % p;
        } else {
            r1 = (&r0 * &r1) % p;
            r0 = (&r0 * &r0) % p;
        }
    }

    r0
}

/// A freshly generated DH keypair: a secret exponent of at least 320 bits
/// of entropy and the corresponding public value `g^x mod p`.
pub struct DhKeyPair {
    pub secret: SecretExponent,
    pub public: BigUint,
}

impl DhKeyPair {
    /// Generate a keypair using 40 random bytes (320 bits) reduced into the
    /// exponent, matching the source's `randSecret(make([]byte, 40))`.
    pub fn generate(rng: &mut dyn RngCore) -> Result<Self, CryptoError> {
        let mut buf = [0u8; 40];
        rng.try_fill_bytes(&mut buf)
            .map_err(|_| CryptoError::ShortRandomRead)?;
        let x = BigUint::from_bytes_be(&buf);
        let gx = modexp_secret(&generator(), &x);
        Ok(Self {
            secret: SecretExponent::new(x),
            public: gx,
        })
    }

    /// Derive the raw Diffie-Hellman shared secret `s = their_public^x mod p`.
    /// The caller is responsible for validating `their_public` via
    /// `check_group_element` first.
    pub fn shared_secret(&self, their_public: &BigUint) -> BigUint {
        modexp_secret(their_public, &self.secret.value())
    }
}
