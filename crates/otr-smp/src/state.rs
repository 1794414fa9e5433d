//! The SMP state machine: a closed sum type whose variants carry
//! exactly the data needed to process the next expected message, rather
//! than the source's `smpState` interface.

use num_bigint::BigUint;
use otr_crypto::secret::SecretExponent;

/// Which SMP message is expected next. `Expect1` is both the initial
/// idle state and the state every path resets to on completion or
/// abort.
pub enum SmpState {
    Expect1,
    /// The initiator, after sending SMP1, waiting for SMP2.
    Expect2 { x: SecretExponent, a2: SecretExponent, a3: SecretExponent },
    /// The responder, after sending SMP2, waiting for SMP3.
    Expect3 {
        b3: SecretExponent,
        g2: BigUint,
        g3: BigUint,
        g3a: BigUint,
        pb: BigUint,
        qb: BigUint,
    },
    /// The initiator, after sending SMP3, waiting for SMP4.
    Expect4 { a3: SecretExponent, pa: BigUint, pb: BigUint, g3b: BigUint, qaqb: BigUint },
}

impl SmpState {
    pub fn label(&self) -> &'static str {
        match self {
            SmpState::Expect1 => "Expect1",
            SmpState::Expect2 { .. } => "Expect2",
            SmpState::Expect3 { .. } => "Expect3",
            SmpState::Expect4 { .. } => "Expect4",
        }
    }

    pub fn is_idle(&self) -> bool {
        matches!(self, SmpState::Expect1)
    }
}

impl Default for SmpState {
    fn default() -> Self {
        SmpState::Expect1
    }
}
