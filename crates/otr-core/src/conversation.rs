//! The dispatcher: owns both state machines plus the conversation-level
//! message state, classifies incoming text, and routes it to the AKE or
//! SMP engine. Exposes exactly the caller-facing contract named in
//! §6 — `start_conversation`/`receive`/`send`/`start_smp`/
//! `receive_smp_message`/`end_conversation`.

use std::time::Instant;

use otr_ake::{AkeOutput, AkeState};
use otr_crypto::dsa::{DsaKeyPair, DsaPublicKey};
use otr_crypto::mpi::Reader;
use otr_proto::armor::{self, IncomingText};
use otr_proto::header::{Header, MessageType, ProtocolVersion};
use otr_proto::smp_messages::{smp_abort_tlv, Smp1, Tlv, TlvType};
use otr_smp::{derive_smp_secret, SmpOutput, SmpState};
use rand_core::{CryptoRng, RngCore};

use crate::callbacks::Callbacks;
use crate::data_frame::DataFrame;
use crate::error::OtrError;
use crate::policy::Policy;
use crate::state::MessageState;

/// The peer-facing identity and ssid fixed at the end of a successful
/// AKE. `keys` (the AES/HMAC key sets) are deliberately not kept here —
/// they are AKE-internal and zeroize on drop once the handshake
/// finishes, per the context invariant that AKE secrets don't outlive
/// the handshake.
struct Session {
    ssid: [u8; 8],
    their_public_key: DsaPublicKey,
    #[allow(dead_code)]
    their_key_id: u32,
}

/// Owns one conversation with a single peer. `R` is the randomness
/// source threaded through every DH/DSA/SMP operation — generic rather
/// than a boxed trait object, so a deterministic `RngCore + CryptoRng`
/// test double can be substituted with no dynamic dispatch at the call
/// sites `otr-ake`/`otr-smp` already require it at.
pub struct Conversation<R: RngCore + CryptoRng, C: Callbacks> {
    policy: Policy,
    identity: DsaKeyPair,
    rng: R,
    callbacks: C,

    version: ProtocolVersion,
    our_instance_tag: u32,
    their_instance_tag: u32,

    ake_state: AkeState,
    smp_state: SmpState,
    message_state: MessageState,
    our_key_id: u32,
    session: Option<Session>,
    /// An incoming SMP1 the local user hasn't answered yet, stashed
    /// between the `on_smp_question` callback and the matching
    /// `start_smp` call that supplies the secret.
    pending_smp1: Option<Tlv>,

    state_changed_at: Instant,
}

fn generate_instance_tag(rng: &mut impl RngCore) -> u32 {
    loop {
        let candidate = rng.next_u32() & 0x7FFF_FFFF;
        if candidate >= 0x100 {
            return candidate;
        }
    }
}

impl<R: RngCore + CryptoRng, C: Callbacks> Conversation<R, C> {
    pub fn new(identity: DsaKeyPair, mut rng: R, policy: Policy, callbacks: C) -> Self {
        let our_instance_tag = generate_instance_tag(&mut rng);
        let version = if policy.allow_v3 { ProtocolVersion::V3 } else { ProtocolVersion::V2 };
        Self {
            policy,
            identity,
            rng,
            callbacks,
            version,
            our_instance_tag,
            their_instance_tag: 0,
            ake_state: AkeState::default(),
            smp_state: SmpState::default(),
            message_state: MessageState::default(),
            our_key_id: 0,
            session: None,
            pending_smp1: None,
            state_changed_at: Instant::now(),
        }
    }

    pub fn message_state(&self) -> MessageState {
        self.message_state
    }

    pub fn state_changed_at(&self) -> Instant {
        self.state_changed_at
    }

    pub fn callbacks(&self) -> &C {
        &self.callbacks
    }

    pub fn ake_state_label(&self) -> &'static str {
        self.ake_state.label()
    }

    pub fn smp_state_label(&self) -> &'static str {
        self.smp_state.label()
    }

    fn touch(&mut self) {
        self.state_changed_at = Instant::now();
    }

    fn wrap(&self, message_type: MessageType, body: Vec<u8>) -> String {
        let header = Header {
            version: self.version,
            message_type,
            sender_instance_tag: self.our_instance_tag,
            receiver_instance_tag: self.their_instance_tag,
        };
        let mut frame = Vec::new();
        header.encode(&mut frame);
        frame.extend_from_slice(&body);
        armor::encode_frame(&frame)
    }

    /// Emit a query message advertising every version this policy
    /// allows.
    pub fn start_conversation(&mut self) -> String {
        self.touch();
        armor::encode_query(&self.policy.advertised_versions())
    }

    /// Process one line of incoming transport text. Returns
    /// `(plaintext_for_the_ui, bytes_to_send_back)`.
    pub fn receive(&mut self, input: &str) -> Result<(Option<String>, Option<String>), OtrError> {
        match armor::classify(input)? {
            IncomingText::Plaintext { text, advertises_v2, advertises_v3 } => {
                let should_ake = (advertises_v3 && self.policy.allow_v3 && self.policy.whitespace_start_ake)
                    || (advertises_v2 && self.policy.allow_v2 && self.policy.whitespace_start_ake);
                let to_send = if should_ake { Some(self.start_conversation()) } else { None };
                Ok((Some(text.to_string()), to_send))
            }
            IncomingText::Query { versions } => Ok((None, self.handle_query(&versions)?)),
            IncomingText::Encoded(bytes) => self.receive_encoded(&bytes),
        }
    }

    fn handle_query(&mut self, versions: &[u8]) -> Result<Option<String>, OtrError> {
        let negotiated = if versions.contains(&3) && self.policy.allow_v3 {
            Some(ProtocolVersion::V3)
        } else if versions.contains(&2) && self.policy.allow_v2 {
            Some(ProtocolVersion::V2)
        } else {
            None
        };
        let Some(version) = negotiated else {
            tracing::debug!(target: "otr_core", event = "query_rejected_by_policy", versions = ?versions);
            return Ok(None);
        };
        self.version = version;
        let body = otr_ake::engine::start(&mut self.ake_state, &mut self.rng)?;
        self.touch();
        tracing::debug!(target: "otr_core", event = "ake_started", version = ?self.version);
        Ok(Some(self.wrap(MessageType::DhCommit, body)))
    }

    fn receive_encoded(&mut self, bytes: &[u8]) -> Result<(Option<String>, Option<String>), OtrError> {
        let mut reader = Reader::new(bytes);
        let header = Header::parse(&mut reader)?;

        let policy_allows = match header.version {
            ProtocolVersion::V2 => self.policy.allow_v2,
            ProtocolVersion::V3 => self.policy.allow_v3,
        };
        if !policy_allows {
            tracing::debug!(target: "otr_core", event = "message_rejected_by_policy", version = ?header.version);
            return Ok((None, None));
        }
        self.version = header.version;
        if header.version.has_instance_tags() {
            self.their_instance_tag = header.sender_instance_tag;
        }

        let body = reader.remaining();
        self.touch();
        match header.message_type {
            MessageType::DhCommit => {
                let output = otr_ake::engine::receive_dh_commit(&mut self.ake_state, body, &mut self.rng)?;
                Ok((None, self.resolve_ake_output(output)?))
            }
            MessageType::DhKey => {
                let output = otr_ake::engine::receive_dh_key(
                    &mut self.ake_state,
                    body,
                    &self.identity,
                    &mut self.our_key_id,
                    &mut self.rng,
                )?;
                Ok((None, self.resolve_ake_output(output)?))
            }
            MessageType::RevealSignature => {
                let output =
                    otr_ake::engine::receive_reveal_sig(&mut self.ake_state, body, &self.identity, &mut self.rng)?;
                Ok((None, self.resolve_ake_output(output)?))
            }
            MessageType::Signature => {
                let output = otr_ake::engine::receive_sig(&mut self.ake_state, body)?;
                Ok((None, self.resolve_ake_output(output)?))
            }
            MessageType::Data => self.receive_data(body),
        }
    }

    fn resolve_ake_output(&mut self, output: AkeOutput) -> Result<Option<String>, OtrError> {
        match output {
            AkeOutput::Nothing => Ok(None),
            AkeOutput::Send { message_type, body } => Ok(Some(self.wrap(message_type, body))),
            AkeOutput::Established { reply, session } => {
                let our_fingerprint = self.identity.public().fingerprint();
                let their_fingerprint = session.their_public_key.fingerprint();
                let ssid = session.ssid;
                self.message_state = MessageState::Encrypted;
                self.session = Some(Session {
                    ssid,
                    their_public_key: session.their_public_key,
                    their_key_id: session.their_key_id,
                });
                self.callbacks.on_security_established(ssid, our_fingerprint, their_fingerprint);
                tracing::debug!(target: "otr_core", event = "security_established");
                Ok(reply.map(|body| self.wrap(MessageType::Signature, body)))
            }
        }
    }

    fn receive_data(&mut self, body: &[u8]) -> Result<(Option<String>, Option<String>), OtrError> {
        let frame = DataFrame::parse(body)?;

        let mut replies = Vec::new();
        for tlv in frame.tlvs {
            if let Some(reply) = self.handle_smp_tlv(tlv)? {
                replies.push(reply);
            }
        }

        let plaintext = if frame.plaintext.is_empty() {
            None
        } else {
            Some(
                String::from_utf8(frame.plaintext)
                    .map_err(|_| otr_proto::ProtoError::MalformedMessage("data message plaintext is not UTF-8"))?,
            )
        };

        let to_send = if replies.is_empty() {
            None
        } else {
            Some(self.wrap(MessageType::Data, DataFrame { plaintext: Vec::new(), tlvs: replies }.encode()))
        };
        Ok((plaintext, to_send))
    }

    fn handle_smp_tlv(&mut self, tlv: Tlv) -> Result<Option<Tlv>, OtrError> {
        if self.message_state != MessageState::Encrypted {
            self.smp_state = SmpState::Expect1;
            self.pending_smp1 = None;
            return Ok(None);
        }
        match tlv.tlv_type {
            TlvType::Smp1 | TlvType::Smp1Question => {
                if self.smp_state.is_idle() && self.pending_smp1.is_none() {
                    let question = Smp1::parse(&tlv)?.question;
                    self.pending_smp1 = Some(tlv);
                    self.callbacks.on_smp_question(question);
                    Ok(None)
                } else {
                    self.smp_state = SmpState::Expect1;
                    Ok(Some(smp_abort_tlv()))
                }
            }
            TlvType::Smp2 => {
                let output = otr_smp::receive_smp2(&mut self.smp_state, &tlv, &mut self.rng)?;
                self.finish_smp_step(output)
            }
            TlvType::Smp3 => {
                let output = otr_smp::receive_smp3(&mut self.smp_state, &tlv, &mut self.rng)?;
                self.finish_smp_step(output)
            }
            TlvType::Smp4 => {
                let output = otr_smp::receive_smp4(&mut self.smp_state, &tlv)?;
                self.finish_smp_step(output)
            }
            TlvType::SmpAbort => {
                otr_smp::receive_abort(&mut self.smp_state);
                self.pending_smp1 = None;
                Ok(None)
            }
            TlvType::Disconnected => {
                self.message_state = MessageState::Finished;
                self.smp_state = SmpState::Expect1;
                self.pending_smp1 = None;
                self.callbacks.on_session_ended();
                Ok(None)
            }
            TlvType::Padding => Ok(None),
        }
    }

    fn finish_smp_step(&mut self, output: SmpOutput) -> Result<Option<Tlv>, OtrError> {
        match output {
            SmpOutput::Nothing => Ok(None),
            SmpOutput::Send(tlv) => Ok(Some(tlv)),
            SmpOutput::Aborted { reply } => Ok(Some(reply)),
            SmpOutput::Finished { reply, succeeded } => {
                tracing::debug!(target: "otr_core", event = "smp_finished", succeeded);
                if succeeded {
                    self.callbacks.on_smp_succeeded();
                } else {
                    self.callbacks.on_smp_failed();
                }
                Ok(reply)
            }
        }
    }

    /// Send an application message, or start SMP's question/secret
    /// exchange when `pending_smp1` is waiting on an answer.
    pub fn send(&mut self, plaintext: &str) -> Result<String, OtrError> {
        match self.message_state {
            MessageState::Encrypted => {
                let frame = DataFrame { plaintext: plaintext.as_bytes().to_vec(), tlvs: Vec::new() };
                Ok(self.wrap(MessageType::Data, frame.encode()))
            }
            _ if self.policy.require_encryption => Err(OtrError::NotEncrypted),
            _ => Ok(plaintext.to_string()),
        }
    }

    /// Start SMP as the initiator, or — if an incoming SMP1 is pending
    /// an answer — respond to it with the given secret.
    pub fn start_smp(&mut self, secret: &[u8], question: Option<String>) -> Result<String, OtrError> {
        if self.message_state != MessageState::Encrypted {
            return Err(OtrError::NotEncrypted);
        }
        let session = self.session.as_ref().expect("Encrypted implies an established session");
        let our_fingerprint = self.identity.public().fingerprint();
        let their_fingerprint = session.their_public_key.fingerprint();
        let ssid = session.ssid;

        let tlv = if let Some(pending) = self.pending_smp1.take() {
            let x = derive_smp_secret(false, &our_fingerprint, &their_fingerprint, &ssid, secret);
            match otr_smp::receive_smp1(&mut self.smp_state, &pending, &mut self.rng, x)? {
                SmpOutput::Send(tlv) => tlv,
                SmpOutput::Aborted { reply } => reply,
                _ => unreachable!("SMP1 handling only ever sends a reply or aborts"),
            }
        } else {
            let x = derive_smp_secret(true, &our_fingerprint, &their_fingerprint, &ssid, secret);
            otr_smp::start(&mut self.smp_state, &mut self.rng, x, question)
        };

        self.touch();
        Ok(self.wrap(MessageType::Data, DataFrame { plaintext: Vec::new(), tlvs: vec![tlv] }.encode()))
    }

    /// Process a raw SMP TLV handed directly to the dispatcher (bypassing
    /// the text/data-message layer), per the caller-facing contract's
    /// `receive_smp_message`. Returns the reply TLV's raw bytes, in the
    /// same bypassed form the input arrived in.
    pub fn receive_smp_message(&mut self, tlv_bytes: &[u8]) -> Result<Option<Vec<u8>>, OtrError> {
        let mut reader = Reader::new(tlv_bytes);
        let tlv = Tlv::parse(&mut reader)?;
        let reply = self.handle_smp_tlv(tlv)?;
        self.touch();
        Ok(reply.map(|tlv| {
            let mut out = Vec::new();
            tlv.encode(&mut out);
            out
        }))
    }

    pub fn end_conversation(&mut self) -> String {
        let was_encrypted = self.message_state == MessageState::Encrypted;
        self.ake_state = AkeState::default();
        self.smp_state = SmpState::default();
        self.pending_smp1 = None;
        self.session = None;
        self.message_state = MessageState::Finished;
        self.touch();
        self.callbacks.on_session_ended();

        if was_encrypted {
            let tlv = Tlv { tlv_type: TlvType::Disconnected, value: Vec::new() };
            self.wrap(MessageType::Data, DataFrame { plaintext: Vec::new(), tlvs: vec![tlv] }.encode())
        } else {
            String::new()
        }
    }
}
