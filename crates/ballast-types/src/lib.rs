//! Foundation types for Ballast.
//!
//! This crate provides the identifiers, event records, and signed-payload
//! shapes used throughout the Ballast usage-accounting engine. Every other
//! Ballast crate depends on `ballast-types`.
//!
//! # Key Types
//!
//! - [`KeyId`] — Hash of an ed25519 public key; identifies a writer
//! - [`BlockId`] — Content-addressed block identifier (BLAKE3 hash)
//! - [`CasPair`] — The `(original, updated)` payload a writer signs to move
//!   its pointer
//! - [`PointerEvent`] / [`IdentityEvent`] — Notifications consumed by the
//!   accounting engine
//! - [`SpaceRequest`] / [`TimeProof`] — Signed records for the quota
//!   request/inspection protocol

pub mod cas;
pub mod error;
pub mod event;
pub mod ids;
pub mod request;

pub use cas::CasPair;
pub use error::TypeError;
pub use event::{IdentityEvent, PointerEvent};
pub use ids::{BlockId, KeyId};
pub use request::{SpaceRequest, TimeProof};
