use serde::{Deserialize, Serialize};

/// A quota-increase request, bincode-encoded and signed by the owner's
/// identity key before submission.
///
/// `utc_millis` is the signing time; the engine rejects requests older than
/// its replay window, so a captured blob cannot be resubmitted later.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpaceRequest {
    /// The requesting username.
    pub username: String,
    /// The total number of bytes requested.
    pub bytes: u64,
    /// Milliseconds since the UNIX epoch at signing time.
    pub utc_millis: u64,
}

impl SpaceRequest {
    pub fn new(username: impl Into<String>, bytes: u64, utc_millis: u64) -> Self {
        Self {
            username: username.into(),
            bytes,
            utc_millis,
        }
    }
}

/// A signed freshness proof: just a timestamp, signed by an identity key.
///
/// Used to gate quota reads — the caller proves it holds the key and that the
/// request is recent, without any further payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeProof {
    /// Milliseconds since the UNIX epoch at signing time.
    pub utc_millis: u64,
}

impl TimeProof {
    pub fn new(utc_millis: u64) -> Self {
        Self { utc_millis }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn space_request_serde_roundtrip() {
        let req = SpaceRequest::new("bob", 5_000_000_000, 1_700_000_000_000);
        let bytes = bincode::serialize(&req).unwrap();
        let decoded: SpaceRequest = bincode::deserialize(&bytes).unwrap();
        assert_eq!(req, decoded);
    }

    #[test]
    fn time_proof_serde_roundtrip() {
        let proof = TimeProof::new(1_700_000_000_000);
        let bytes = bincode::serialize(&proof).unwrap();
        let decoded: TimeProof = bincode::deserialize(&bytes).unwrap();
        assert_eq!(proof, decoded);
    }
}
