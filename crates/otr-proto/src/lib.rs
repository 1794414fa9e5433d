//! otr-proto — wire framing for the OTR handshake and SMP.
//!
//! # Module layout
//! - `header`       — the shared binary frame header (version, message type, instance tags)
//! - `ake_messages` — DH-Commit / DH-Key / Reveal-Signature / Signature bodies
//! - `smp_messages` — SMP1-4 / Abort TLV framing
//! - `armor`        — the OTR text layer: plaintext / query / `?OTR:`-encoded classification
//! - `error`        — unified error type

pub mod ake_messages;
pub mod armor;
pub mod error;
pub mod header;
pub mod smp_messages;

pub use error::ProtoError;
