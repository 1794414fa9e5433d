use thiserror::Error;

/// Failures that can occur inside the field-arithmetic, serialization and
/// identity-key primitives. Higher layers (`otr-ake`, `otr-smp`) wrap this
/// in their own error enums via `#[from]`.
#[derive(Debug, Error)]
pub enum CryptoError {
    #[error("random source returned fewer bytes than requested")]
    ShortRandomRead,

    #[error("DH value is not in the required subgroup range [2, p-2]")]
    InvalidGroupElement,

    #[error("key material has the wrong length: expected {expected}, got {got}")]
    InvalidKeyLength { expected: usize, got: usize },

    #[error("signature verification failed")]
    SignatureVerification,

    #[error("DSA operation failed: {0}")]
    Dsa(String),
}

impl From<signature::Error> for CryptoError {
    fn from(_: signature::Error) -> Self {
        CryptoError::SignatureVerification
    }
}
