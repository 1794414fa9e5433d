//! SMP TLV framing. SMP runs as type-length-value records carried inside
//! the encrypted data-message channel (the data-message layer itself is
//! out of scope — `otr-core` hands this module raw TLV bytes already
//! extracted from that layer).
//!
//! Field counts for each message body follow the published OTR SMP
//! layout: SMP1 carries six group elements/proof scalars (seven when a
//! question string is attached), SMP2 eleven, SMP3 eight, SMP4 three.

use num_bigint::BigUint;
use otr_crypto::mpi::{append_data, append_mpi, append_short, Reader};

use crate::error::ProtoError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TlvType {
    Padding,
    Disconnected,
    Smp1,
    Smp2,
    Smp3,
    Smp4,
    SmpAbort,
    Smp1Question,
}

impl TlvType {
    pub fn as_short(self) -> u16 {
        match self {
            TlvType::Padding => 0,
            TlvType::Disconnected => 1,
            TlvType::Smp1 => 2,
            TlvType::Smp2 => 3,
            TlvType::Smp3 => 4,
            TlvType::Smp4 => 5,
            TlvType::SmpAbort => 6,
            TlvType::Smp1Question => 7,
        }
    }

    pub fn from_short(v: u16) -> Result<Self, ProtoError> {
        match v {
            0 => Ok(TlvType::Padding),
            1 => Ok(TlvType::Disconnected),
            2 => Ok(TlvType::Smp1),
            3 => Ok(TlvType::Smp2),
            4 => Ok(TlvType::Smp3),
            5 => Ok(TlvType::Smp4),
            6 => Ok(TlvType::SmpAbort),
            7 => Ok(TlvType::Smp1Question),
            _ => Err(ProtoError::MalformedMessage("unknown TLV type")),
        }
    }
}

/// `SHORT type ‖ SHORT length ‖ value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tlv {
    pub tlv_type: TlvType,
    pub value: Vec<u8>,
}

impl Tlv {
    pub fn encode(&self, out: &mut Vec<u8>) {
        append_short(out, self.tlv_type.as_short());
        append_short(out, self.value.len() as u16);
        out.extend_from_slice(&self.value);
    }

    pub fn parse(reader: &mut Reader<'_>) -> Result<Self, ProtoError> {
        let tlv_type = TlvType::from_short(reader.read_short().map_err(ProtoError::from)?)?;
        let len = reader.read_short().map_err(ProtoError::from)? as usize;
        let mut value = Vec::with_capacity(len);
        for _ in 0..len {
            value.push(reader.read_byte().map_err(ProtoError::from)?);
        }
        Ok(Self { tlv_type, value })
    }
}

fn append_mpis(out: &mut Vec<u8>, values: &[&BigUint]) {
    for v in values {
        append_mpi(out, v);
    }
}

fn read_mpis(reader: &mut Reader<'_>, n: usize) -> Result<Vec<BigUint>, ProtoError> {
    (0..n)
        .map(|_| reader.read_mpi().map_err(ProtoError::from))
        .collect()
}

/// SMP1: `g2a, c2, d2, g3a, c3, d3`; optionally preceded by a `DATA`
/// question string (the `Smp1Question` TLV variant).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smp1 {
    pub question: Option<String>,
    pub g2a: BigUint,
    pub c2: BigUint,
    pub d2: BigUint,
    pub g3a: BigUint,
    pub c3: BigUint,
    pub d3: BigUint,
}

impl Smp1 {
    pub fn encode(&self) -> Tlv {
        let mut value = Vec::new();
        if let Some(question) = &self.question {
            append_data(&mut value, question.as_bytes());
        }
        append_mpis(
            &mut value,
            &[&self.g2a, &self.c2, &self.d2, &self.g3a, &self.c3, &self.d3],
        );
        let tlv_type = if self.question.is_some() {
            TlvType::Smp1Question
        } else {
            TlvType::Smp1
        };
        Tlv { tlv_type, value }
    }

    pub fn parse(tlv: &Tlv) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(&tlv.value);
        let question = if tlv.tlv_type == TlvType::Smp1Question {
            let bytes = reader.read_data().map_err(ProtoError::from)?;
            Some(
                String::from_utf8(bytes.to_vec())
                    .map_err(|_| ProtoError::MalformedMessage("SMP1 question is not valid UTF-8"))?,
            )
        } else {
            None
        };
        let mpis = read_mpis(&mut reader, 6)?;
        reader.expect_exhausted().map_err(ProtoError::from)?;
        Ok(Self {
            question,
            g2a: mpis[0].clone(),
            c2: mpis[1].clone(),
            d2: mpis[2].clone(),
            g3a: mpis[3].clone(),
            c3: mpis[4].clone(),
            d3: mpis[5].clone(),
        })
    }
}

/// SMP2: `g2b, c2, d2, g3b, c3, d3, pb, qb, cp, d5, d6`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smp2 {
    pub g2b: BigUint,
    pub c2: BigUint,
    pub d2: BigUint,
    pub g3b: BigUint,
    pub c3: BigUint,
    pub d3: BigUint,
    pub pb: BigUint,
    pub qb: BigUint,
    pub cp: BigUint,
    pub d5: BigUint,
    pub d6: BigUint,
}

impl Smp2 {
    pub fn encode(&self) -> Tlv {
        let mut value = Vec::new();
        append_mpis(
            &mut value,
            &[
                &self.g2b, &self.c2, &self.d2, &self.g3b, &self.c3, &self.d3, &self.pb, &self.qb,
                &self.cp, &self.d5, &self.d6,
            ],
        );
        Tlv { tlv_type: TlvType::Smp2, value }
    }

    pub fn parse(tlv: &Tlv) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(&tlv.value);
        let mpis = read_mpis(&mut reader, 11)?;
        reader.expect_exhausted().map_err(ProtoError::from)?;
        Ok(Self {
            g2b: mpis[0].clone(),
            c2: mpis[1].clone(),
            d2: mpis[2].clone(),
            g3b: mpis[3].clone(),
            c3: mpis[4].clone(),
            d3: mpis[5].clone(),
            pb: mpis[6].clone(),
            qb: mpis[7].clone(),
            cp: mpis[8].clone(),
            d5: mpis[9].clone(),
            d6: mpis[10].clone(),
        })
    }
}

/// SMP3: `pa, qa, cp, d5, d6, ra, cr, d7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smp3 {
    pub pa: BigUint,
    pub qa: BigUint,
    pub cp: BigUint,
    pub d5: BigUint,
    pub d6: BigUint,
    pub ra: BigUint,
    pub cr: BigUint,
    pub d7: BigUint,
}

impl Smp3 {
    pub fn encode(&self) -> Tlv {
        let mut value = Vec::new();
        append_mpis(
            &mut value,
            &[
                &self.pa, &self.qa, &self.cp, &self.d5, &self.d6, &self.ra, &self.cr, &self.d7,
            ],
        );
        Tlv { tlv_type: TlvType::Smp3, value }
    }

    pub fn parse(tlv: &Tlv) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(&tlv.value);
        let mpis = read_mpis(&mut reader, 8)?;
        reader.expect_exhausted().map_err(ProtoError::from)?;
        Ok(Self {
            pa: mpis[0].clone(),
            qa: mpis[1].clone(),
            cp: mpis[2].clone(),
            d5: mpis[3].clone(),
            d6: mpis[4].clone(),
            ra: mpis[5].clone(),
            cr: mpis[6].clone(),
            d7: mpis[7].clone(),
        })
    }
}

/// SMP4: `rb, cr, d7`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Smp4 {
    pub rb: BigUint,
    pub cr: BigUint,
    pub d7: BigUint,
}

impl Smp4 {
    pub fn encode(&self) -> Tlv {
        let mut value = Vec::new();
        append_mpis(&mut value, &[&self.rb, &self.cr, &self.d7]);
        Tlv { tlv_type: TlvType::Smp4, value }
    }

    pub fn parse(tlv: &Tlv) -> Result<Self, ProtoError> {
        let mut reader = Reader::new(&tlv.value);
        let mpis = read_mpis(&mut reader, 3)?;
        reader.expect_exhausted().map_err(ProtoError::from)?;
        Ok(Self { rb: mpis[0].clone(), cr: mpis[1].clone(), d7: mpis[2].clone() })
    }
}

/// SMP-Abort carries an empty body.
pub fn smp_abort_tlv() -> Tlv {
    Tlv { tlv_type: TlvType::SmpAbort, value: Vec::new() }
}
