//! Cryptographic primitives for Ballast.
//!
//! Provides Ed25519 signing/verification and the signed envelope format used
//! for pointer CAS payloads and space requests. Key identifiers are derived
//! in `ballast-types`; this crate owns everything touching key material.
//!
//! All crypto operations wrap established libraries — no custom cryptography.

pub mod envelope;
pub mod signer;

pub use signer::{Signature, SignatureError, SigningKey, VerifyingKey};
