//! Pending space-request storage.
//!
//! Verified quota-increase requests are parked here, still signed, until an
//! administrator reviews them out of band. The engine only ever appends;
//! approval updates the quota source through channels outside this crate.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::{Result, SpaceError};

/// Milliseconds since the UNIX epoch.
pub(crate) fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Storage for verified, not-yet-approved space requests.
pub trait RequestStore: Send + Sync {
    /// Append a verified, still-signed request blob for `username`.
    fn append(&self, username: &str, signed_request: &[u8]) -> Result<()>;

    /// All pending request blobs for `username`, oldest first.
    fn pending(&self, username: &str) -> Result<Vec<Vec<u8>>>;
}

/// An in-memory implementation of [`RequestStore`].
#[derive(Default)]
pub struct InMemoryRequestStore {
    requests: RwLock<HashMap<String, Vec<Vec<u8>>>>,
}

impl InMemoryRequestStore {
    /// Create a new empty request store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl RequestStore for InMemoryRequestStore {
    fn append(&self, username: &str, signed_request: &[u8]) -> Result<()> {
        let mut requests = self
            .requests
            .write()
            .map_err(|e| SpaceError::Directory(format!("lock poisoned: {e}")))?;
        requests
            .entry(username.to_string())
            .or_default()
            .push(signed_request.to_vec());
        Ok(())
    }

    fn pending(&self, username: &str) -> Result<Vec<Vec<u8>>> {
        let requests = self
            .requests
            .read()
            .map_err(|e| SpaceError::Directory(format!("lock poisoned: {e}")))?;
        Ok(requests.get(username).cloned().unwrap_or_default())
    }
}

impl crate::processor::EngineState {
    /// Verify a signed quota-increase request and park it for review.
    ///
    /// The request must be signed by the owner's registered key and carry a
    /// signing time inside the replay window. The blob is stored still
    /// signed, so the reviewing administrator can re-verify it.
    pub(crate) fn request_space(
        &self,
        owner: &ballast_types::KeyId,
        signed_request: &[u8],
    ) -> Result<()> {
        let key = self
            .blocks
            .resolve_signing_key(owner)?
            .ok_or(SpaceError::Auth(*owner))?;
        let payload = ballast_crypto::envelope::open(&key, signed_request)
            .map_err(|_| SpaceError::Auth(*owner))?;
        let request: ballast_types::SpaceRequest =
            bincode::deserialize(&payload).map_err(|_| SpaceError::Auth(*owner))?;

        let now = now_millis();
        let age = now.saturating_sub(request.utc_millis);
        if age > self.config.request_window_millis {
            return Err(SpaceError::StaleRequest { age_millis: age });
        }

        tracing::info!(
            user = %request.username,
            bytes = request.bytes,
            "space request queued for approval"
        );
        self.requests.append(&request.username, signed_request)
    }

    /// Reveal the quota for the owner of `key`, gated on a fresh signed
    /// time proof.
    pub(crate) fn quota_of(
        &self,
        key: &ballast_types::KeyId,
        signed_proof: &[u8],
    ) -> Result<u64> {
        let signing_key = self
            .blocks
            .resolve_signing_key(key)?
            .ok_or(SpaceError::Auth(*key))?;
        let payload = ballast_crypto::envelope::open(&signing_key, signed_proof)
            .map_err(|_| SpaceError::Auth(*key))?;
        let proof: ballast_types::TimeProof =
            bincode::deserialize(&payload).map_err(|_| SpaceError::Auth(*key))?;

        let age = now_millis().saturating_sub(proof.utc_millis);
        if age > self.config.proof_window_millis {
            return Err(SpaceError::StaleRequest { age_millis: age });
        }

        let record = self
            .usage
            .writer_usage(key)?
            .ok_or(SpaceError::UnknownWriter(*key))?;
        self.quotas.quota(&record.owner)
    }
}

#[cfg(test)]
mod tests {
    use ballast_crypto::{envelope, SigningKey};
    use ballast_types::{SpaceRequest, TimeProof};

    use crate::processor::tests::rig;

    use super::*;

    fn sealed_request(sk: &SigningKey, request: &SpaceRequest) -> Vec<u8> {
        envelope::seal(sk, &bincode::serialize(request).unwrap())
    }

    #[test]
    fn fresh_request_is_queued() {
        let rig = rig();
        let (sk, owner) = rig.writer(None);
        let request = SpaceRequest::new("alice", 10_000_000, now_millis());
        rig.state
            .request_space(&owner, &sealed_request(&sk, &request))
            .unwrap();
        assert_eq!(rig.state.requests.pending("alice").unwrap().len(), 1);
    }

    #[test]
    fn request_just_inside_the_window_is_accepted() {
        let rig = rig();
        let (sk, owner) = rig.writer(None);
        let request = SpaceRequest::new("alice", 1, now_millis() - 29_000);
        rig.state
            .request_space(&owner, &sealed_request(&sk, &request))
            .unwrap();
    }

    #[test]
    fn request_past_the_window_is_stale() {
        let rig = rig();
        let (sk, owner) = rig.writer(None);
        let request = SpaceRequest::new("alice", 1, now_millis() - 31_000);
        let err = rig
            .state
            .request_space(&owner, &sealed_request(&sk, &request))
            .unwrap_err();
        assert!(matches!(err, SpaceError::StaleRequest { .. }));
        assert!(rig.state.requests.pending("alice").unwrap().is_empty());
    }

    #[test]
    fn request_signed_by_the_wrong_key_is_rejected() {
        let rig = rig();
        let (_, owner) = rig.writer(None);
        let intruder = SigningKey::generate();
        let request = SpaceRequest::new("alice", 1, now_millis());
        let err = rig
            .state
            .request_space(&owner, &sealed_request(&intruder, &request))
            .unwrap_err();
        assert!(matches!(err, SpaceError::Auth(_)));
    }

    #[test]
    fn request_for_unregistered_owner_is_rejected() {
        let rig = rig();
        let sk = SigningKey::generate();
        let owner = sk.key_id();
        let request = SpaceRequest::new("alice", 1, now_millis());
        let err = rig
            .state
            .request_space(&owner, &sealed_request(&sk, &request))
            .unwrap_err();
        assert!(matches!(err, SpaceError::Auth(_)));
    }

    #[test]
    fn quota_read_requires_a_fresh_proof() {
        let rig = rig();
        let (sk, owner) = rig.writer(None);
        let fresh = envelope::seal(
            &sk,
            &bincode::serialize(&TimeProof::new(now_millis())).unwrap(),
        );
        assert_eq!(
            rig.state.quota_of(&owner, &fresh).unwrap(),
            1_000_000_000
        );

        let stale = envelope::seal(
            &sk,
            &bincode::serialize(&TimeProof::new(now_millis() - 200_000)).unwrap(),
        );
        let err = rig.state.quota_of(&owner, &stale).unwrap_err();
        assert!(matches!(err, SpaceError::StaleRequest { .. }));
    }

    #[test]
    fn append_then_list() {
        let store = InMemoryRequestStore::new();
        store.append("alice", b"first").unwrap();
        store.append("alice", b"second").unwrap();
        let pending = store.pending("alice").unwrap();
        assert_eq!(pending, vec![b"first".to_vec(), b"second".to_vec()]);
    }

    #[test]
    fn unknown_user_has_no_pending_requests() {
        let store = InMemoryRequestStore::new();
        assert!(store.pending("ghost").unwrap().is_empty());
    }

    #[test]
    fn now_millis_is_monotonic_enough() {
        let a = now_millis();
        let b = now_millis();
        assert!(b >= a);
    }
}
