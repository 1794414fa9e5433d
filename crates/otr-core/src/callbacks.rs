//! Security-event notifications the host observes, rather than polls
//! for. Grounded on `guard-core::ipc::IpcHandler`'s shape — a small
//! trait of named events a caller implements and hands to the engine by
//! reference — reworked synchronous since nothing here performs I/O.

/// Implemented by the host application; `Conversation` calls these at
/// the moments named in each method, never with secret material beyond
/// what the caller-facing contract already exposes (`ssid`,
/// fingerprints).
pub trait Callbacks {
    /// The AKE completed. `ssid` identifies the session for manual
    /// verification UIs; `our_fingerprint`/`their_fingerprint` are the
    /// 20-byte SHA-1 fingerprints of each side's long-term public key.
    fn on_security_established(&mut self, ssid: [u8; 8], our_fingerprint: [u8; 20], their_fingerprint: [u8; 20]) {
        let _ = (ssid, our_fingerprint, their_fingerprint);
    }

    /// The peer started SMP, optionally asking a question the local
    /// user should answer with the shared secret.
    fn on_smp_question(&mut self, question: Option<String>) {
        let _ = question;
    }

    fn on_smp_succeeded(&mut self) {}

    fn on_smp_failed(&mut self) {}

    fn on_session_ended(&mut self) {}
}

/// A no-op implementor for callers that poll `Conversation`'s state
/// directly instead of reacting to events, and for tests.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullCallbacks;

impl Callbacks for NullCallbacks {}
