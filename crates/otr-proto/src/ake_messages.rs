//! The four AKE message bodies (everything after the shared header) and
//! the encrypted-signature payload format they carry.
//!
//! This module only frames bytes; it never touches key material. The
//! caller (`otr-ake`) is responsible for producing `enc`/`mac20` via
//! encryption and HMAC, and for decrypting `enc` before handing the
//! plaintext back here to parse as an `EncryptedSignaturePayload`.

use num_bigint::BigUint;
use otr_crypto::dsa::DsaPublicKey;
use otr_crypto::mpi::{append_data, append_mpi, append_word, Reader};

use crate::error::ProtoError;

/// `DATA(encryptedGx) ‖ DATA(hashedGx)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhCommitMessage {
    pub encrypted_gx: Vec<u8>,
    pub hashed_gx: [u8; 32],
}

impl DhCommitMessage {
    pub fn encode(&self, out: &mut Vec<u8>) {
        append_data(out, &self.encrypted_gx);
        append_data(out, &self.hashed_gx);
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let encrypted_gx = reader.read_data().map_err(ProtoError::from)?.to_vec();
        let hashed_gx_bytes = reader.read_data().map_err(ProtoError::from)?;
        let hashed_gx: [u8; 32] = hashed_gx_bytes
            .try_into()
            .map_err(|_| ProtoError::MalformedMessage("hashedGx is not 32 bytes"))?;
        Ok(Self { encrypted_gx, hashed_gx })
    }
}

/// `MPI(gy)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DhKeyMessage {
    pub gy: BigUint,
}

impl DhKeyMessage {
    pub fn encode(&self, out: &mut Vec<u8>) {
        append_mpi(out, &self.gy);
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let gy = reader.read_mpi().map_err(ProtoError::from)?;
        Ok(Self { gy })
    }
}

/// `DATA(r) ‖ DATA(enc) ‖ MAC20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevealSignatureMessage {
    pub revealed_key: [u8; 16],
    pub encrypted_signature: Vec<u8>,
    pub mac: [u8; 20],
}

impl RevealSignatureMessage {
    pub fn encode(&self, out: &mut Vec<u8>) {
        append_data(out, &self.revealed_key);
        append_data(out, &self.encrypted_signature);
        out.extend_from_slice(&self.mac);
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let revealed_key_bytes = reader.read_data().map_err(ProtoError::from)?;
        let revealed_key: [u8; 16] = revealed_key_bytes
            .try_into()
            .map_err(|_| ProtoError::MalformedMessage("revealed key is not 16 bytes"))?;
        let encrypted_signature = reader.read_data().map_err(ProtoError::from)?.to_vec();
        let mac = read_mac20(reader)?;
        Ok(Self { revealed_key, encrypted_signature, mac })
    }
}

/// `DATA(enc) ‖ MAC20`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureMessage {
    pub encrypted_signature: Vec<u8>,
    pub mac: [u8; 20],
}

impl SignatureMessage {
    pub fn encode(&self, out: &mut Vec<u8>) {
        append_data(out, &self.encrypted_signature);
        out.extend_from_slice(&self.mac);
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let encrypted_signature = reader.read_data().map_err(ProtoError::from)?.to_vec();
        let mac = read_mac20(reader)?;
        Ok(Self { encrypted_signature, mac })
    }
}

fn read_mac20(reader: &mut Reader<'_>) -> Result<[u8; 20], ProtoError> {
    let mut mac = [0u8; 20];
    for byte in mac.iter_mut() {
        *byte = reader.read_byte().map_err(ProtoError::from)?;
    }
    Ok(mac)
}

/// The plaintext `xb = pub ‖ WORD(keyID) ‖ DSA-sign(mb)` payload, decrypted
/// out of a Reveal-Signature or Signature message body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedSignaturePayload {
    pub public_key: DsaPublicKey,
    pub key_id: u32,
    pub signature: [u8; 40],
}

impl EncryptedSignaturePayload {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = self.public_key.serialize();
        append_word(&mut out, self.key_id);
        out.extend_from_slice(&self.signature);
        out
    }

    /// Parses the decrypted `xb` bytes, rejecting any residual bytes per
    /// the `CorruptEncryptedSignature` check.
    pub fn parse(plaintext: &[u8]) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(plaintext);
        let public_key = DsaPublicKey::parse(&mut reader).map_err(|_| ProtoError::CorruptEncryptedSignature)?;
        let key_id = reader.read_word().map_err(|_| ProtoError::CorruptEncryptedSignature)?;
        let mut signature = [0u8; 40];
        for byte in signature.iter_mut() {
            *byte = reader.read_byte().map_err(|_| ProtoError::CorruptEncryptedSignature)?;
        }
        reader
            .expect_exhausted()
            .map_err(|_| ProtoError::CorruptEncryptedSignature)?;
        Ok(Self { public_key, key_id, signature })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigUint;

    fn sample_public_key() -> DsaPublicKey {
        DsaPublicKey {
            p: BigUint::from(23u32),
            q: BigUint::from(11u32),
            g: BigUint::from(2u32),
            y: BigUint::from(4u32),
        }
    }

    #[test]
    fn dh_commit_roundtrip() {
        let msg = DhCommitMessage {
            encrypted_gx: vec![1, 2, 3, 4],
            hashed_gx: [9u8; 32],
        };
        let mut out = Vec::new();
        msg.encode(&mut out);
        let mut reader = Reader::new(&out);
        assert_eq!(DhCommitMessage::parse(&mut reader).unwrap(), msg);
    }

    #[test]
    fn dh_key_roundtrip() {
        let msg = DhKeyMessage { gy: BigUint::from(123456789u64) };
        let mut out = Vec::new();
        msg.encode(&mut out);
        let mut reader = Reader::new(&out);
        assert_eq!(DhKeyMessage::parse(&mut reader).unwrap(), msg);
    }

    #[test]
    fn reveal_signature_roundtrip() {
        let msg = RevealSignatureMessage {
            revealed_key: [7u8; 16],
            encrypted_signature: vec![1, 2, 3],
            mac: [8u8; 20],
        };
        let mut out = Vec::new();
        msg.encode(&mut out);
        let mut reader = Reader::new(&out);
        assert_eq!(RevealSignatureMessage::parse(&mut reader).unwrap(), msg);
    }

    #[test]
    fn encrypted_signature_payload_roundtrip() {
        let payload = EncryptedSignaturePayload {
            public_key: sample_public_key(),
            key_id: 1,
            signature: [5u8; 40],
        };
        let bytes = payload.encode();
        assert_eq!(EncryptedSignaturePayload::parse(&bytes).unwrap(), payload);
    }

    #[test]
    fn encrypted_signature_payload_rejects_residual_bytes() {
        let payload = EncryptedSignaturePayload {
            public_key: sample_public_key(),
            key_id: 1,
            signature: [5u8; 40],
        };
        let mut bytes = payload.encode();
        bytes.push(0xAA);
        assert!(matches!(
            EncryptedSignaturePayload::parse(&bytes),
            Err(ProtoError::CorruptEncryptedSignature)
        ));
    }
}
