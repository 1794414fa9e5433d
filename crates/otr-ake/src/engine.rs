//! The AKE engine: produces and consumes the four handshake messages,
//! driving the `AkeState` transitions from §4.3's table.

use otr_crypto::dh::{check_group_element, modexp_secret, DhKeyPair};
use otr_crypto::dsa::{DsaKeyPair, DsaPublicKey};
use otr_crypto::mpi::{append_mpi, Reader};
use otr_crypto::random::random_fill;
use otr_crypto::symmetric::aes_ctr_zero_iv;
use otr_proto::ake_messages::{DhCommitMessage, DhKeyMessage, RevealSignatureMessage, SignatureMessage};
use otr_proto::header::MessageType;
use otr_proto::ProtoError;
use rand_core::{CryptoRng, RngCore};
use sha2::{Digest, Sha256};

use crate::error::AkeError;
use crate::keys::{calculate_ake_keys, AkeKeys};
use crate::signing::{generate_encrypted_signature, verify_encrypted_signature};
use crate::state::AkeState;

/// What an AKE step produced.
pub enum AkeOutput {
    /// Input was well-formed but not actionable in the current state;
    /// per the transition table, silently ignored.
    Nothing,
    /// A message body to send back to the peer, tagged with the message
    /// type the dispatcher needs to build the wire header — the engine
    /// only ever produces bodies, never headers.
    Send { message_type: MessageType, body: Vec<u8> },
    /// The handshake completed. `reply` carries the final Signature
    /// message body when this side owes one (after a Reveal-Signature),
    /// or `None` when nothing more needs sending (after a Signature).
    Established { reply: Option<Vec<u8>>, session: EstablishedSession },
}

pub struct EstablishedSession {
    pub ssid: [u8; 8],
    pub keys: AkeKeys,
    pub their_public_key: DsaPublicKey,
    pub their_key_id: u32,
}

fn sha256_32(data: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(data);
    let mut out = [0u8; 32];
    out.copy_from_slice(&digest);
    out
}

/// Generate a fresh DH keypair, `r`, and the full DH-Commit body.
fn build_dh_commit(
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<(DhKeyPair, [u8; 16], [u8; 32], Vec<u8>), AkeError> {
    let keypair = DhKeyPair::generate(rng)?;
    let mut r = [0u8; 16];
    random_fill(rng, &mut r)?;

    let mut gx_mpi = Vec::new();
    append_mpi(&mut gx_mpi, &keypair.public);
    let hashed = sha256_32(&gx_mpi);

    let mut encrypted_gx = gx_mpi;
    aes_ctr_zero_iv(&r, &mut encrypted_gx)?;

    let mut body = Vec::new();
    DhCommitMessage { encrypted_gx, hashed_gx: hashed }.encode(&mut body);

    Ok((keypair, r, hashed, body))
}

/// Start (or restart) a handshake: emit a DH-Commit and move to
/// `AwaitingDhKey`.
pub fn start(state: &mut AkeState, rng: &mut (impl RngCore + CryptoRng)) -> Result<Vec<u8>, AkeError> {
    let (keypair, r, hashed, body) = build_dh_commit(rng)?;
    *state = AkeState::AwaitingDhKey {
        x: keypair.secret,
        gx: keypair.public,
        r,
        sent_commit_hashed_gx: hashed,
        sent_commit_body: body.clone(),
    };
    tracing::debug!(target: "otr_ake", event = "ake_transition", to = "AwaitingDhKey");
    Ok(body)
}

pub fn receive_dh_commit(
    state: &mut AkeState,
    body: &[u8],
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<AkeOutput, AkeError> {
    let mut reader = Reader::new(body);
    let msg = DhCommitMessage::parse(&mut reader)?;

    match state {
        AkeState::None => respond_dh_key(state, msg, rng),
        AkeState::AwaitingDhKey { sent_commit_hashed_gx, sent_commit_body, .. } => {
            if sent_commit_hashed_gx.as_slice() > msg.hashed_gx.as_slice() {
                tracing::trace!(target: "otr_ake", event = "commit_tie_break", outcome = "kept_own_commit");
                Ok(AkeOutput::Send { message_type: MessageType::DhCommit, body: sent_commit_body.clone() })
            } else {
                tracing::trace!(target: "otr_ake", event = "commit_tie_break", outcome = "yielded_to_peer");
                respond_dh_key(state, msg, rng)
            }
        }
        AkeState::AwaitingRevealSig { sent_dh_key, .. } => {
            Ok(AkeOutput::Send { message_type: MessageType::DhKey, body: sent_dh_key.clone() })
        }
        // Not one of the rows the transition table lists for DH-Commit;
        // left untouched.
        AkeState::AwaitingSig { .. } => Ok(AkeOutput::Nothing),
    }
}

fn respond_dh_key(
    state: &mut AkeState,
    msg: DhCommitMessage,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<AkeOutput, AkeError> {
    let keypair = DhKeyPair::generate(rng)?;
    let mut body = Vec::new();
    DhKeyMessage { gy: keypair.public.clone() }.encode(&mut body);

    *state = AkeState::AwaitingRevealSig {
        y: keypair.secret,
        gy: keypair.public,
        their_encrypted_gx: msg.encrypted_gx,
        their_hashed_gx: msg.hashed_gx,
        sent_dh_key: body.clone(),
    };
    tracing::debug!(target: "otr_ake", event = "ake_transition", to = "AwaitingRevealSig");
    Ok(AkeOutput::Send { message_type: MessageType::DhKey, body })
}

pub fn receive_dh_key(
    state: &mut AkeState,
    body: &[u8],
    identity: &DsaKeyPair,
    our_key_id: &mut u32,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<AkeOutput, AkeError> {
    let mut reader = Reader::new(body);
    let msg = DhKeyMessage::parse(&mut reader)?;
    check_group_element(&msg.gy).map_err(|_| AkeError::DhValueOutOfRange)?;

    if matches!(state, AkeState::AwaitingDhKey { .. }) {
        let AkeState::AwaitingDhKey { x, gx, r, .. } = std::mem::take(state) else { unreachable!() };

        let s = modexp_secret(&msg.gy, &x.value());
        let keys = calculate_ake_keys(&s);
        *our_key_id += 1;

        let (enc, mac) =
            generate_encrypted_signature(rng, identity, &keys.reveal, *our_key_id, &gx, &msg.gy, true)?;

        let mut body_out = Vec::new();
        RevealSignatureMessage { revealed_key: r, encrypted_signature: enc, mac }.encode(&mut body_out);

        *state = AkeState::AwaitingSig {
            gx,
            their_gy: msg.gy,
            sent_reveal_sig: body_out.clone(),
            keys,
        };
        tracing::debug!(target: "otr_ake", event = "ake_transition", to = "AwaitingSig");
        return Ok(AkeOutput::Send { message_type: MessageType::RevealSignature, body: body_out });
    }

    if matches!(state, AkeState::AwaitingSig { .. }) {
        if let AkeState::AwaitingSig { their_gy, sent_reveal_sig, .. } = state {
            return Ok(if *their_gy == msg.gy {
                AkeOutput::Send { message_type: MessageType::RevealSignature, body: sent_reveal_sig.clone() }
            } else {
                AkeOutput::Nothing
            });
        }
    }

    Ok(AkeOutput::Nothing)
}

pub fn receive_reveal_sig(
    state: &mut AkeState,
    body: &[u8],
    identity: &DsaKeyPair,
    rng: &mut (impl RngCore + CryptoRng),
) -> Result<AkeOutput, AkeError> {
    if !matches!(state, AkeState::AwaitingRevealSig { .. }) {
        return Ok(AkeOutput::Nothing);
    }
    let AkeState::AwaitingRevealSig { y, gy, their_encrypted_gx, their_hashed_gx, .. } =
        std::mem::replace(state, AkeState::None)
    else {
        unreachable!()
    };

    let mut reader = Reader::new(body);
    let msg = RevealSignatureMessage::parse(&mut reader)?;

    let mut decrypted = their_encrypted_gx;
    aes_ctr_zero_iv(&msg.revealed_key, &mut decrypted)?;

    if sha256_32(&decrypted) != their_hashed_gx {
        tracing::debug!(target: "otr_ake", event = "commitment_mismatch");
        return Err(AkeError::BadCommitment);
    }

    let mut gx_reader = Reader::new(&decrypted);
    let gx = gx_reader.read_mpi().map_err(ProtoError::from)?;
    gx_reader.expect_exhausted().map_err(ProtoError::from)?;
    check_group_element(&gx).map_err(|_| AkeError::DhValueOutOfRange)?;

    let s = modexp_secret(&gx, &y.value());
    let keys = calculate_ake_keys(&s);

    let payload = verify_encrypted_signature(&keys.reveal, &msg.encrypted_signature, &msg.mac, &gx, &gy, true)?;

    let (enc, mac) = generate_encrypted_signature(rng, identity, &keys.sig, 1, &gx, &gy, false)?;

    let mut reply = Vec::new();
    SignatureMessage { encrypted_signature: enc, mac }.encode(&mut reply);

    let session = EstablishedSession {
        ssid: keys.ssid,
        their_public_key: payload.public_key,
        their_key_id: payload.key_id,
        keys,
    };

    tracing::debug!(target: "otr_ake", event = "ake_established", role = "responder");
    Ok(AkeOutput::Established { reply: Some(reply), session })
}

pub fn receive_sig(state: &mut AkeState, body: &[u8]) -> Result<AkeOutput, AkeError> {
    if !matches!(state, AkeState::AwaitingSig { .. }) {
        return Ok(AkeOutput::Nothing);
    }
    let AkeState::AwaitingSig { gx, their_gy, keys, .. } = std::mem::replace(state, AkeState::None) else {
        unreachable!()
    };

    let mut reader = Reader::new(body);
    let msg = SignatureMessage::parse(&mut reader)?;

    let payload = verify_encrypted_signature(&keys.sig, &msg.encrypted_signature, &msg.mac, &gx, &their_gy, false)?;

    let session = EstablishedSession {
        ssid: keys.ssid,
        their_public_key: payload.public_key,
        their_key_id: payload.key_id,
        keys,
    };

    tracing::debug!(target: "otr_ake", event = "ake_established", role = "initiator");
    Ok(AkeOutput::Established { reply: None, session })
}
