//! Signed payload envelopes.
//!
//! A sealed envelope is the 64-byte Ed25519 signature followed by the raw
//! payload bytes. Opening an envelope verifies the signature before handing
//! the payload back, so callers can never observe unauthenticated content.
//! This is the sole trust boundary between externally supplied events and the
//! accounting state.

use crate::signer::{Signature, SignatureError, SigningKey, VerifyingKey};

const SIGNATURE_LEN: usize = 64;

/// Sign `payload` with `key`, producing `signature ‖ payload`.
pub fn seal(key: &SigningKey, payload: &[u8]) -> Vec<u8> {
    let signature = key.sign(payload);
    let mut sealed = Vec::with_capacity(SIGNATURE_LEN + payload.len());
    sealed.extend_from_slice(&signature.to_bytes());
    sealed.extend_from_slice(payload);
    sealed
}

/// Verify a sealed envelope against `key` and return the payload bytes.
///
/// Fails with [`SignatureError::MalformedPayload`] if the blob is too short
/// to contain a signature, or [`SignatureError::InvalidSignature`] if the
/// signature does not verify.
pub fn open(key: &VerifyingKey, sealed: &[u8]) -> Result<Vec<u8>, SignatureError> {
    if sealed.len() < SIGNATURE_LEN {
        return Err(SignatureError::MalformedPayload);
    }
    let (sig_bytes, payload) = sealed.split_at(SIGNATURE_LEN);
    let sig_arr: [u8; 64] = sig_bytes
        .try_into()
        .map_err(|_| SignatureError::MalformedPayload)?;
    let signature = Signature::from_bytes(&sig_arr);
    key.verify(payload, &signature)?;
    Ok(payload.to_vec())
}
