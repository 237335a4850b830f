use serde::{Deserialize, Serialize};

use crate::ids::KeyId;

/// Notification that a writer's mutable pointer may have changed.
///
/// The `signed_cas` blob is the writer-signed [`CasPair`](crate::CasPair)
/// encoding. It is opaque until verified against the writer's public key —
/// the accounting engine never acts on an unverified pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PointerEvent {
    /// The owner the pointer is namespaced under.
    pub owner: KeyId,
    /// The writer whose pointer changed.
    pub writer: KeyId,
    /// Signed CAS payload (signature-prefixed bincode `CasPair`).
    pub signed_cas: Vec<u8>,
}

impl PointerEvent {
    pub fn new(owner: KeyId, writer: KeyId, signed_cas: Vec<u8>) -> Self {
        Self {
            owner,
            writer,
            signed_cas,
        }
    }
}

/// Notification that a username now maps to a given root identity key.
///
/// Emitted on sign-up and on key rotation. The named key becomes the billing
/// owner for every writer reachable through its ownership tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityEvent {
    /// The registered username.
    pub username: String,
    /// The root identity key for this username.
    pub key: KeyId,
}

impl IdentityEvent {
    pub fn new(username: impl Into<String>, key: KeyId) -> Self {
        Self {
            username: username.into(),
            key,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_event_serde_roundtrip() {
        let event = PointerEvent::new(
            KeyId::from_raw([1u8; 32]),
            KeyId::from_raw([2u8; 32]),
            vec![1, 2, 3],
        );
        let bytes = bincode::serialize(&event).unwrap();
        let decoded: PointerEvent = bincode::deserialize(&bytes).unwrap();
        assert_eq!(event, decoded);
    }

    #[test]
    fn identity_event_carries_username() {
        let event = IdentityEvent::new("alice", KeyId::from_raw([3u8; 32]));
        assert_eq!(event.username, "alice");
    }
}
