//! The binary frame header shared by every AKE and data message:
//! `SHORT version ‖ BYTE messageType ‖ [WORD senderTag ‖ WORD receiverTag]`.
//! The instance-tag pair is present only for v3; v2 header parsing is
//! therefore driven by the version field read first, per the Design
//! Note on keeping the version a field of the parser state.

use otr_crypto::mpi::Reader;

use crate::error::ProtoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolVersion {
    V2,
    V3,
}

impl ProtocolVersion {
    pub fn as_short(self) -> u16 {
        match self {
            ProtocolVersion::V2 => 0x0002,
            ProtocolVersion::V3 => 0x0003,
        }
    }

    pub fn from_short(v: u16) -> Result<Self, ProtoError> {
        match v {
            0x0002 => Ok(ProtocolVersion::V2),
            0x0003 => Ok(ProtocolVersion::V3),
            other => Err(ProtoError::UnsupportedVersion(other)),
        }
    }

    pub fn has_instance_tags(self) -> bool {
        matches!(self, ProtocolVersion::V3)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageType {
    DhCommit,
    DhKey,
    RevealSignature,
    Signature,
    Data,
}

impl MessageType {
    pub fn as_byte(self) -> u8 {
        match self {
            MessageType::DhCommit => 0x02,
            MessageType::DhKey => 0x0A,
            MessageType::RevealSignature => 0x11,
            MessageType::Signature => 0x12,
            MessageType::Data => 0x03,
        }
    }

    pub fn from_byte(b: u8) -> Result<Self, ProtoError> {
        match b {
            0x02 => Ok(MessageType::DhCommit),
            0x0A => Ok(MessageType::DhKey),
            0x11 => Ok(MessageType::RevealSignature),
            0x12 => Ok(MessageType::Signature),
            0x03 => Ok(MessageType::Data),
            other => Err(ProtoError::UnknownMessageType(other)),
        }
    }
}

/// A fully-parsed binary header plus the remaining body bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub version: ProtocolVersion,
    pub message_type: MessageType,
    pub sender_instance_tag: u32,
    pub receiver_instance_tag: u32,
}

impl Header {
    pub fn encode(&self, out: &mut Vec<u8>) {
        out.extend_from_slice(&self.version.as_short().to_be_bytes());
        out.push(self.message_type.as_byte());
        if self.version.has_instance_tags() {
            out.extend_from_slice(&self.sender_instance_tag.to_be_bytes());
            out.extend_from_slice(&self.receiver_instance_tag.to_be_bytes());
        }
    }

    /// Parse a header from the front of `reader`, leaving the cursor
    /// positioned at the start of the message-type-specific body.
    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let version = ProtocolVersion::from_short(
            reader.read_short().map_err(ProtoError::from)?,
        )?;
        let message_type = MessageType::from_byte(reader.read_byte().map_err(ProtoError::from)?)?;
        let (sender_instance_tag, receiver_instance_tag) = if version.has_instance_tags() {
            (
                reader.read_word().map_err(ProtoError::from)?,
                reader.read_word().map_err(ProtoError::from)?,
            )
        } else {
            (0, 0)
        };
        Ok(Header {
            version,
            message_type,
            sender_instance_tag,
            receiver_instance_tag,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn v3_header_roundtrip() {
        let header = Header {
            version: ProtocolVersion::V3,
            message_type: MessageType::DhKey,
            sender_instance_tag: 0x1234_5678,
            receiver_instance_tag: 0x0000_0101,
        };
        let mut out = Vec::new();
        header.encode(&mut out);
        assert_eq!(out.len(), 2 + 1 + 4 + 4);
        let mut reader = Reader::new(&out);
        let parsed = Header::parse(&mut reader).unwrap();
        assert_eq!(parsed, header);
    }

    #[test]
    fn v2_header_has_no_instance_tags() {
        let header = Header {
            version: ProtocolVersion::V2,
            message_type: MessageType::Signature,
            sender_instance_tag: 0,
            receiver_instance_tag: 0,
        };
        let mut out = Vec::new();
        header.encode(&mut out);
        assert_eq!(out.len(), 2 + 1);
    }

    #[test]
    fn unknown_message_type_rejected() {
        assert!(MessageType::from_byte(0xFF).is_err());
    }
}
