//! A placeholder for the OTR Data Message body.
//!
//! The real Data Message ratchets a per-direction AES-CTR counter and a
//! rotating MAC key derived from successive DH key exchanges — that
//! symmetric layer is the one piece spec.md explicitly places out of
//! scope ("the symmetric data-message layer that runs after AKE
//! completes... is not specified here"). What `Conversation` needs
//! locally is just a carrier for the two things that flow over the
//! Encrypted message state in this crate's scope: opaque plaintext and
//! the TLV chain SMP rides on. `DataFrame` is that carrier. It is not
//! wire-compatible with a real OTR client's Data Message.

use otr_crypto::mpi::{append_data, Reader};
use otr_proto::smp_messages::Tlv;
use otr_proto::ProtoError;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataFrame {
    pub plaintext: Vec<u8>,
    pub tlvs: Vec<Tlv>,
}

impl DataFrame {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        append_data(&mut out, &self.plaintext);
        for tlv in &self.tlvs {
            tlv.encode(&mut out);
        }
        out
    }

    pub fn parse(body: &[u8]) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(body);
        let plaintext = reader.read_data().map_err(ProtoError::from)?.to_vec();
        let mut tlvs = Vec::new();
        while !reader.is_empty() {
            tlvs.push(Tlv::parse(&mut reader)?);
        }
        Ok(Self { plaintext, tlvs })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use otr_proto::smp_messages::smp_abort_tlv;

    #[test]
    fn roundtrips_plaintext_with_no_tlvs() {
        let frame = DataFrame { plaintext: b"hello".to_vec(), tlvs: Vec::new() };
        let encoded = frame.encode();
        assert_eq!(DataFrame::parse(&encoded).unwrap(), frame);
    }

    #[test]
    fn roundtrips_plaintext_with_a_tlv_chain() {
        let frame = DataFrame { plaintext: Vec::new(), tlvs: vec![smp_abort_tlv(), smp_abort_tlv()] };
        let encoded = frame.encode();
        assert_eq!(DataFrame::parse(&encoded).unwrap(), frame);
    }
}
