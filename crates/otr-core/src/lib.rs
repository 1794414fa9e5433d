//! otr-core — the dispatcher tying the AKE and SMP state machines to a
//! text transport: classifies incoming lines, routes framed messages to
//! the right engine, and exposes the small caller-facing contract a
//! host needs (`start_conversation`/`receive`/`send`/`start_smp`/
//! `receive_smp_message`/`end_conversation`).
//!
//! # Module layout
//! - `policy`       — client-configurable behavior flags
//! - `state`        — `MessageState`, tracked alongside the AKE/SMP state machines
//! - `callbacks`    — security-event notifications the host observes
//! - `data_frame`   — the TLV/plaintext carrier standing in for the out-of-scope Data Message symmetric layer
//! - `conversation` — `Conversation`, the dispatcher itself
//! - `error`        — unified error type

pub mod callbacks;
pub mod conversation;
pub mod data_frame;
pub mod error;
pub mod policy;
pub mod state;

pub use callbacks::{Callbacks, NullCallbacks};
pub use conversation::Conversation;
pub use data_frame::DataFrame;
pub use error::OtrError;
pub use policy::Policy;
pub use state::MessageState;

#[cfg(test)]
mod tests {
    use super::*;
    use otr_crypto::dsa::DsaKeyPair;
    use otr_proto::ake_messages::SignatureMessage;
    use otr_proto::armor::{self, IncomingText};
    use otr_proto::header::{Header, MessageType, ProtocolVersion};
    use rand::rngs::OsRng;

    #[derive(Default)]
    struct Recorder {
        ssid: Option<[u8; 8]>,
        our_fingerprint: Option<[u8; 20]>,
        their_fingerprint: Option<[u8; 20]>,
        smp_question: Option<Option<String>>,
        smp_succeeded: bool,
        smp_failed: bool,
        session_ended: bool,
    }

    impl Callbacks for Recorder {
        fn on_security_established(&mut self, ssid: [u8; 8], our_fp: [u8; 20], their_fp: [u8; 20]) {
            self.ssid = Some(ssid);
            self.our_fingerprint = Some(our_fp);
            self.their_fingerprint = Some(their_fp);
        }
        fn on_smp_question(&mut self, question: Option<String>) {
            self.smp_question = Some(question);
        }
        fn on_smp_succeeded(&mut self) {
            self.smp_succeeded = true;
        }
        fn on_smp_failed(&mut self) {
            self.smp_failed = true;
        }
        fn on_session_ended(&mut self) {
            self.session_ended = true;
        }
    }

    fn fresh_conversation() -> Conversation<OsRng, Recorder> {
        let identity = DsaKeyPair::generate(&mut OsRng);
        Conversation::new(identity, OsRng, Policy::default(), Recorder::default())
    }

    /// Drives a full handshake: whoever receives the query emits the
    /// DH-Commit and plays the AKE initiator role (`I` in spec terms),
    /// the other plays the responder (`R`). Returns both ends Encrypted.
    fn run_handshake() -> (Conversation<OsRng, Recorder>, Conversation<OsRng, Recorder>) {
        let mut alice = fresh_conversation();
        let mut bob = fresh_conversation();

        let query = alice.start_conversation();
        let (_, dh_commit) = bob.receive(&query).unwrap();
        let dh_commit = dh_commit.expect("receiving a query starts bob's own DH-Commit");

        let (_, dh_key) = alice.receive(&dh_commit).unwrap();
        let dh_key = dh_key.expect("None + DH-Commit replies with DH-Key");

        let (_, reveal_sig) = bob.receive(&dh_key).unwrap();
        let reveal_sig = reveal_sig.expect("AwaitingDHKey + DH-Key replies with Reveal-Signature");

        let (_, signature) = alice.receive(&reveal_sig).unwrap();
        let signature = signature.expect("AwaitingRevealSig + Reveal-Sig replies with Signature and establishes");

        let (_, nothing) = bob.receive(&signature).unwrap();
        assert!(nothing.is_none());

        (alice, bob)
    }

    /// S1 — vanilla handshake: both sides end Encrypted with identical
    /// `ssid` and each side's recorded fingerprint of the other matches
    /// what the other side actually holds.
    #[test]
    fn s1_handshake_agrees_on_ssid_and_fingerprints() {
        let (alice, bob) = run_handshake();

        assert_eq!(alice.message_state(), MessageState::Encrypted);
        assert_eq!(bob.message_state(), MessageState::Encrypted);

        let alice_ssid = alice.callbacks().ssid.expect("alice observed security-established");
        let bob_ssid = bob.callbacks().ssid.expect("bob observed security-established");
        assert_eq!(alice_ssid, bob_ssid);

        assert_eq!(alice.callbacks().their_fingerprint, bob.callbacks().our_fingerprint);
        assert_eq!(bob.callbacks().their_fingerprint, alice.callbacks().our_fingerprint);
    }

    /// S2 — concurrent commit tie-break: if both sides independently
    /// start an AKE before seeing each other's DH-Commit, exactly one
    /// side yields and emits a DH-Key; the other resends its own commit.
    #[test]
    fn s2_concurrent_commits_tie_break_on_one_side() {
        let mut alice = fresh_conversation();
        let mut bob = fresh_conversation();

        let query = armor::encode_query(&[3]);
        let (_, alice_commit) = alice.receive(&query).unwrap();
        let (_, bob_commit) = bob.receive(&query).unwrap();
        let alice_commit = alice_commit.unwrap();
        let bob_commit = bob_commit.unwrap();

        assert_eq!(alice.ake_state_label(), "AwaitingDHKey");
        assert_eq!(bob.ake_state_label(), "AwaitingDHKey");

        alice.receive(&bob_commit).unwrap();
        bob.receive(&alice_commit).unwrap();

        let alice_yielded = alice.ake_state_label() == "AwaitingRevealSig";
        let bob_yielded = bob.ake_state_label() == "AwaitingRevealSig";
        assert!(alice_yielded ^ bob_yielded, "exactly one side should yield and move on");
    }

    /// S3 — a Reveal-Signature with one flipped MAC byte is rejected
    /// without changing the responder's state or producing a reply; a
    /// subsequent valid message still proceeds normally.
    #[test]
    fn s3_tampered_reveal_sig_mac_is_rejected_without_state_change() {
        let mut alice = fresh_conversation();
        let mut bob = fresh_conversation();

        let query = alice.start_conversation();
        let (_, dh_commit) = bob.receive(&query).unwrap();
        let (_, dh_key) = alice.receive(&dh_commit.unwrap()).unwrap();
        let (_, reveal_sig) = bob.receive(&dh_key.unwrap()).unwrap();
        let reveal_sig = reveal_sig.unwrap();

        let IncomingText::Encoded(mut bytes) = armor::classify(&reveal_sig).unwrap() else {
            panic!("expected an encoded frame")
        };
        let last = bytes.len() - 1;
        bytes[last] ^= 0xFF;
        let tampered = armor::encode_frame(&bytes);

        assert_eq!(alice.ake_state_label(), "AwaitingRevealSig");
        let (plaintext, reply) = alice.receive(&tampered).unwrap();
        assert!(plaintext.is_none());
        assert!(reply.is_none());
        assert_eq!(alice.ake_state_label(), "AwaitingRevealSig");

        let (_, signature) = alice.receive(&reveal_sig).unwrap();
        assert!(signature.is_some());
        assert_eq!(alice.message_state(), MessageState::Encrypted);
    }

    /// S4 — a Signature message delivered while awaiting a DH-Key is
    /// ignored: the receiver's state and output are both unchanged.
    #[test]
    fn s4_wrong_state_message_is_ignored() {
        let mut bob = fresh_conversation();
        let query = armor::encode_query(&[3]);
        bob.receive(&query).unwrap();
        assert_eq!(bob.ake_state_label(), "AwaitingDHKey");

        let mut body = Vec::new();
        SignatureMessage { encrypted_signature: Vec::new(), mac: [0u8; 20] }.encode(&mut body);
        let mut frame = Vec::new();
        Header {
            version: ProtocolVersion::V3,
            message_type: MessageType::Signature,
            sender_instance_tag: 0x200,
            receiver_instance_tag: 0x200,
        }
        .encode(&mut frame);
        frame.extend_from_slice(&body);
        let text = armor::encode_frame(&frame);

        let (plaintext, reply) = bob.receive(&text).unwrap();
        assert!(plaintext.is_none());
        assert!(reply.is_none());
        assert_eq!(bob.ake_state_label(), "AwaitingDHKey");
    }

    /// S5/S9 — matching secrets: SMP runs to completion after exactly
    /// four TLVs and both sides observe success.
    #[test]
    fn s5_smp_with_matching_secrets_succeeds_on_both_sides() {
        let (mut alice, mut bob) = run_handshake();

        let smp1 = bob.start_smp(b"hunter2", None).unwrap();
        let (plaintext, reply) = alice.receive(&smp1).unwrap();
        assert!(plaintext.is_none());
        assert!(reply.is_none(), "the responder waits for the question to be answered");
        assert_eq!(alice.callbacks().smp_question, Some(None));

        let smp2 = alice.start_smp(b"hunter2", None).unwrap();
        let (_, smp3) = bob.receive(&smp2).unwrap();
        let (_, smp4) = alice.receive(&smp3.unwrap()).unwrap();
        let (_, nothing) = bob.receive(&smp4.unwrap()).unwrap();
        assert!(nothing.is_none());

        assert!(alice.callbacks().smp_succeeded);
        assert!(bob.callbacks().smp_succeeded);
        assert_eq!(alice.smp_state_label(), "Expect1");
        assert_eq!(bob.smp_state_label(), "Expect1");
        assert_eq!(alice.message_state(), MessageState::Encrypted);
    }

    /// S6 — mismatched secrets: the same four-TLV exchange completes,
    /// but both sides observe failure, and the AKE session survives.
    #[test]
    fn s6_smp_with_mismatched_secrets_fails_on_both_sides() {
        let (mut alice, mut bob) = run_handshake();

        let smp1 = bob.start_smp(b"hunter2", Some("pet's name?".to_string())).unwrap();
        alice.receive(&smp1).unwrap();
        assert_eq!(alice.callbacks().smp_question, Some(Some("pet's name?".to_string())));

        let smp2 = alice.start_smp(b"the wrong answer", None).unwrap();
        let (_, smp3) = bob.receive(&smp2).unwrap();
        let (_, smp4) = alice.receive(&smp3.unwrap()).unwrap();
        bob.receive(&smp4.unwrap()).unwrap();

        assert!(alice.callbacks().smp_failed);
        assert!(bob.callbacks().smp_failed);
        assert_eq!(alice.message_state(), MessageState::Encrypted);
        assert_eq!(bob.message_state(), MessageState::Encrypted);
    }

    #[test]
    fn plaintext_before_any_handshake_passes_through() {
        let mut bob = fresh_conversation();
        let (plaintext, reply) = bob.receive("hello there").unwrap();
        assert_eq!(plaintext, Some("hello there".to_string()));
        assert!(reply.is_none());
    }

    #[test]
    fn end_conversation_emits_a_disconnect_tlv_and_wipes_state() {
        let (mut alice, _bob) = run_handshake();
        let disconnect = alice.end_conversation();
        assert!(!disconnect.is_empty());
        assert_eq!(alice.message_state(), MessageState::Finished);
        assert!(alice.callbacks().session_ended);
    }
}
