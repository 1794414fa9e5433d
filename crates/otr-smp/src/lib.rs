//! otr-smp — the Socialist Millionaires' Protocol: a zero-knowledge
//! proof that both ends of a conversation share the same secret,
//! without revealing it to an eavesdropper or to each other on mismatch.
//!
//! # Module layout
//! - `state`  — the closed `SmpState` enum, one variant per awaited message
//! - `engine` — message production/consumption, implementing the transition table
//! - `math`   — the Fiat-Shamir proof primitives the four messages are built from
//! - `secret` — derivation of the SMP input from fingerprints, `ssid`, and the user secret
//! - `error`  — unified error type

pub mod engine;
pub mod error;
pub mod math;
pub mod secret;
pub mod state;

pub use engine::{abort, receive_abort, receive_smp1, receive_smp2, receive_smp3, receive_smp4, start, SmpOutput};
pub use error::SmpError;
pub use secret::derive_smp_secret;
pub use state::SmpState;

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::OsRng;

    fn run_to_completion(user_secret_a: &[u8], user_secret_b: &[u8]) -> (bool, bool) {
        let mut rng = OsRng;
        let alice_fp = [1u8; 20];
        let bob_fp = [2u8; 20];
        let ssid = [3u8; 8];

        let xa = derive_smp_secret(true, &alice_fp, &bob_fp, &ssid, user_secret_a);
        let xb = derive_smp_secret(false, &bob_fp, &alice_fp, &ssid, user_secret_b);

        let mut alice_state = SmpState::default();
        let mut bob_state = SmpState::default();

        let smp1 = start(&mut alice_state, &mut rng, xa, None);

        let smp2 = match receive_smp1(&mut bob_state, &smp1, &mut rng, xb).unwrap() {
            SmpOutput::Send(tlv) => tlv,
            _ => panic!("expected SMP2"),
        };

        let smp3 = match receive_smp2(&mut alice_state, &smp2, &mut rng).unwrap() {
            SmpOutput::Send(tlv) => tlv,
            _ => panic!("expected SMP3"),
        };

        let (smp4, bob_succeeded) = match receive_smp3(&mut bob_state, &smp3, &mut rng).unwrap() {
            SmpOutput::Finished { reply: Some(tlv), succeeded } => (tlv, succeeded),
            _ => panic!("expected Finished with an SMP4 reply"),
        };

        let alice_succeeded = match receive_smp4(&mut alice_state, &smp4).unwrap() {
            SmpOutput::Finished { reply: None, succeeded } => succeeded,
            _ => panic!("expected Finished with no further reply"),
        };

        assert!(alice_state.is_idle());
        assert!(bob_state.is_idle());
        (alice_succeeded, bob_succeeded)
    }

    #[test]
    fn matching_secrets_succeed_on_both_sides() {
        let (alice_ok, bob_ok) = run_to_completion(b"the same secret", b"the same secret");
        assert!(alice_ok);
        assert!(bob_ok);
    }

    #[test]
    fn mismatched_secrets_fail_cleanly_without_aborting() {
        let (alice_ok, bob_ok) = run_to_completion(b"hunter2", b"password123");
        assert!(!alice_ok);
        assert!(!bob_ok);
    }

    #[test]
    fn garbled_smp1_aborts_the_responder() {
        let mut rng = OsRng;
        let bob_fp = [2u8; 20];
        let alice_fp = [1u8; 20];
        let ssid = [3u8; 8];
        let xb = derive_smp_secret(false, &bob_fp, &alice_fp, &ssid, b"whatever");

        let mut bob_state = SmpState::default();
        let garbage = otr_proto::smp_messages::Tlv { tlv_type: otr_proto::smp_messages::TlvType::Smp1, value: vec![1, 2, 3] };
        match receive_smp1(&mut bob_state, &garbage, &mut rng, xb) {
            Err(_) => {}
            Ok(_) => panic!("malformed SMP1 body should fail to parse"),
        }
    }

    #[test]
    fn received_abort_resets_any_state() {
        let mut rng = OsRng;
        let mut alice_state = SmpState::default();
        let xa = derive_smp_secret(true, &[1u8; 20], &[2u8; 20], &[3u8; 8], b"secret");
        let _ = start(&mut alice_state, &mut rng, xa, None);
        assert!(!alice_state.is_idle());

        assert!(matches!(receive_abort(&mut alice_state), SmpOutput::Nothing));
        assert!(alice_state.is_idle());
    }
}
