use thiserror::Error;

/// Failures parsing or framing an OTR wire message. Higher layers
/// (`otr-ake`, `otr-smp`) wrap this in their own error enums via `#[from]`.
#[derive(Debug, Error)]
pub enum ProtoError {
    #[error("malformed message: {0}")]
    MalformedMessage(&'static str),

    #[error("residual bytes after parsing an encrypted signature payload")]
    CorruptEncryptedSignature,

    #[error("unknown message type byte {0:#04x}")]
    UnknownMessageType(u8),

    #[error("unsupported protocol version {0:#06x}")]
    UnsupportedVersion(u16),
}

impl From<&'static str> for ProtoError {
    fn from(reason: &'static str) -> Self {
        ProtoError::MalformedMessage(reason)
    }
}
