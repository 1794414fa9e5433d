//! otr-crypto — field arithmetic, wire primitives and the long-term
//! identity key underlying the OTR handshake and SMP.
//!
//! # Design principles
//! - No custom crypto: DH group arithmetic rides on `num-bigint`, DSA on
//!   the `dsa` crate, everything else on RustCrypto building blocks.
//! - Every secret (DH exponents, signature keys, MAC/encryption keys) is
//!   zeroized on drop.
//! - A single injectable randomness seam (`random::random_fill`) so
//!   higher layers can run deterministic handshakes in tests.
//!
//! # Module layout
//! - `dh`        — the fixed 1536-bit DH group, keypair generation, shared secret
//! - `dsa`       — long-term identity keypair, canonical public-key serialization, fingerprinting
//! - `mpi`       — `SHORT`/`WORD`/`DATA`/`MPI` wire encoding and a buffer cursor reader
//! - `secret`    — zeroize-on-drop wrappers for byte buffers and DH exponents
//! - `symmetric` — AES-128-CTR and HMAC-SHA256 helpers
//! - `random`    — the injectable randomness seam
//! - `error`     — unified error type

pub mod dh;
pub mod dsa;
pub mod error;
pub mod mpi;
pub mod random;
pub mod secret;
pub mod symmetric;

pub use error::CryptoError;
