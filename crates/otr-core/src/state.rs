/// The conversation-level message state, tracked alongside the AKE and
/// SMP state machines. `AkeState`/`SmpState` describe in-progress
/// handshakes; this describes what can currently be sent as an
/// application message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageState {
    Plaintext,
    Encrypted,
    Finished,
}

impl Default for MessageState {
    fn default() -> Self {
        MessageState::Plaintext
    }
}
