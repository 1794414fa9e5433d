use thiserror::Error;

/// The umbrella error returned from every fallible `Conversation` method.
/// Per the propagation policy, most protocol-level failures are caught
/// internally by the AKE/SMP engines and turned into a silent state
/// reset or an outgoing Abort TLV; this variant set is what's left over
/// — malformed framing, policy violations, and system-level failures
/// that must reach the caller unchanged.
#[derive(Debug, Error)]
pub enum OtrError {
    #[error(transparent)]
    Ake(#[from] otr_ake::AkeError),

    #[error(transparent)]
    Smp(#[from] otr_smp::SmpError),

    #[error(transparent)]
    Proto(#[from] otr_proto::ProtoError),

    #[error(transparent)]
    Crypto(#[from] otr_crypto::CryptoError),

    #[error("SMP requested outside the Encrypted message state")]
    NotEncrypted,
}
