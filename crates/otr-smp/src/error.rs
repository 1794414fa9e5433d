use thiserror::Error;

/// Failures the SMP engine can report. Per the propagation policy, a ZK
/// proof or group-element failure is never returned to the caller as an
/// `Err` — the engine catches it internally, emits an Abort TLV, and
/// resets to `Expect1`. `Err` here is reserved for malformed framing
/// that can't even be interpreted as an SMP message.
#[derive(Debug, Error)]
pub enum SmpError {
    #[error(transparent)]
    Crypto(#[from] otr_crypto::CryptoError),

    #[error(transparent)]
    Proto(#[from] otr_proto::ProtoError),

    #[error("SMP proof rejected: {0}")]
    ProofRejected(&'static str),

    #[error("SMP message received outside the encrypted message state")]
    NotEncrypted,
}
