//! otr-ake — the Authenticated Key Exchange: DH-Commit / DH-Key /
//! Reveal-Signature / Signature, and the state machine that drives them.
//!
//! # Module layout
//! - `state`   — the closed `AkeState` enum, one variant per awaited message
//! - `engine`  — message production/consumption, implementing the transition table
//! - `keys`    — `ssid` and key-set derivation from the DH shared secret
//! - `signing` — the encrypted-signature payload: transcript, sign, MAC, verify
//! - `error`   — unified error type

pub mod engine;
pub mod error;
pub mod keys;
pub mod signing;
pub mod state;

pub use engine::{start, AkeOutput, EstablishedSession};
pub use error::AkeError;
pub use state::AkeState;
