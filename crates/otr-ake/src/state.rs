//! The AKE state machine: a closed sum type whose variants carry exactly
//! the data that state needs for a retransmit, rather than the source's
//! interface-per-state polymorphism.

use num_bigint::BigUint;
use otr_crypto::secret::SecretExponent;

use crate::keys::AkeKeys;

/// Which handshake message is expected next. There is no terminal state:
/// a successful final message returns the machine to `None` while the
/// conversation's message state moves to Encrypted.
pub enum AkeState {
    None,
    AwaitingDhKey {
        x: SecretExponent,
        gx: BigUint,
        r: [u8; 16],
        /// The hash our in-flight DH-Commit carried, needed for the
        /// tie-break comparison against a concurrently received one.
        sent_commit_hashed_gx: [u8; 32],
        /// The exact bytes of our in-flight DH-Commit, resent unchanged
        /// if we win the tie-break.
        sent_commit_body: Vec<u8>,
    },
    AwaitingRevealSig {
        y: SecretExponent,
        gy: BigUint,
        their_encrypted_gx: Vec<u8>,
        their_hashed_gx: [u8; 32],
        /// Stored so a retransmitted DH-Commit gets the same DH-Key back.
        sent_dh_key: Vec<u8>,
    },
    AwaitingSig {
        gx: BigUint,
        their_gy: BigUint,
        /// Stored so a DH-Key carrying the same `gy` gets this retransmit
        /// back, per the "first gy wins" rule.
        sent_reveal_sig: Vec<u8>,
        /// Derived once the shared secret is known; needed to verify the
        /// incoming Signature message's MAC and decrypt its payload.
        keys: AkeKeys,
    },
}

impl AkeState {
    pub fn is_none(&self) -> bool {
        matches!(self, AkeState::None)
    }

    pub fn label(&self) -> &'static str {
        match self {
            AkeState::None => "None",
            AkeState::AwaitingDhKey { .. } => "AwaitingDHKey",
            AkeState::AwaitingRevealSig { .. } => "AwaitingRevealSig",
            AkeState::AwaitingSig { .. } => "AwaitingSig",
        }
    }
}

impl Default for AkeState {
    fn default() -> Self {
        AkeState::None
    }
}
