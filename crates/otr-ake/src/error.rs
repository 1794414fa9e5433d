use thiserror::Error;

/// Failures the AKE engine can report. Per the propagation policy, most
/// of these are caught internally and turned into a silent state reset;
/// only genuinely malformed framing or a policy violation is expected to
/// reach a caller as an `Err`.
#[derive(Debug, Error)]
pub enum AkeError {
    #[error(transparent)]
    Crypto(#[from] otr_crypto::CryptoError),

    #[error(transparent)]
    Proto(#[from] otr_proto::ProtoError),

    #[error("DH value is outside the required subgroup range")]
    DhValueOutOfRange,

    #[error("SHA256(decrypted gx) does not match the committed hash")]
    BadCommitment,

    #[error("HMAC over the encrypted signature does not verify")]
    BadSignatureMac,

    #[error("DSA signature verification failed")]
    BadSignature,

    #[error("message version or type not permitted by policy")]
    ProtocolPolicyViolation,
}
