//! Admission control: the synchronous quota gate in front of every write.

use tracing::warn;

use ballast_types::KeyId;

use crate::error::{Result, SpaceError};
use crate::processor::EngineState;

impl EngineState {
    /// Decide whether `writer` may store another `bytes` bytes, reserving
    /// them on success.
    ///
    /// The check is against expected usage (confirmed total plus all
    /// outstanding reservations). An owner already in the errored state is
    /// granted the configured tolerance above its quota, so a marginally
    /// over-quota user can still delete files or request more space. On
    /// rejection the writer's reservation is cleared and the owner's errored
    /// flag set; the caller owns the retry decision.
    ///
    /// The reservation made here is released by the caller through the
    /// usage store (`confirm` on success, `clear` on failure) — admission
    /// does not track write completion.
    pub(crate) fn allow_write(&self, writer: &KeyId, bytes: u64) -> Result<()> {
        let record = self
            .usage
            .writer_usage(writer)?
            .ok_or(SpaceError::UnknownWriter(*writer))?;
        let user = self
            .usage
            .user_usage(&record.owner)?
            .ok_or(SpaceError::UnknownWriter(record.owner))?;
        let quota = self.quotas.quota(&record.owner)?;

        let expected = user.expected_usage();
        let limit = if user.errored {
            quota + self.config.usage_tolerance
        } else {
            quota
        };
        if expected + bytes > limit {
            let pending = user.pending_of(writer);
            self.usage.clear_pending_usage(&record.owner, writer)?;
            self.usage.set_errored(&record.owner, true)?;
            warn!(
                owner = %record.owner,
                usage = user.total_usage,
                quota,
                attempted = bytes + pending,
                "write rejected: quota reached"
            );
            return Err(SpaceError::QuotaExceeded {
                usage: user.total_usage,
                quota,
                attempted: bytes + pending,
            });
        }

        self.usage.add_pending_usage(&record.owner, writer, bytes)?;
        Ok(())
    }

    /// The confirmed usage total billed to the owner of `key`.
    pub(crate) fn usage_of(&self, key: &KeyId) -> Result<u64> {
        let record = self
            .usage
            .writer_usage(key)?
            .ok_or(SpaceError::UnknownWriter(*key))?;
        let user = self
            .usage
            .user_usage(&record.owner)?
            .ok_or(SpaceError::UnknownWriter(record.owner))?;
        Ok(user.total_usage)
    }
}

#[cfg(test)]
mod tests {
    use ballast_ledger::UsageStore;
    use ballast_store::{Block, BlockStore};
    use ballast_types::KeyId;

    use crate::config::SpaceConfig;
    use crate::processor::tests::{rig_with, Rig};

    use super::*;

    const QUOTA: u64 = 1000;
    const TOLERANCE: u64 = 100;

    fn quota_rig() -> Rig {
        let config = SpaceConfig {
            usage_tolerance: TOLERANCE,
            ..Default::default()
        };
        rig_with(config, QUOTA)
    }

    /// Fill the writer's confirmed usage to exactly `bytes`.
    fn fill(rig: &Rig, writer: &KeyId, bytes: u64) {
        let root = rig.blocks.write(&Block::leaf(bytes)).unwrap();
        rig.state.process_change(writer, Some(root)).unwrap();
    }

    #[test]
    fn write_within_quota_reserves_pending() {
        let rig = quota_rig();
        let (_, writer) = rig.writer(None);
        rig.state.allow_write(&writer, 400).unwrap();
        let user = rig.usage.user_usage(&writer).unwrap().unwrap();
        assert_eq!(user.pending_of(&writer), 400);
        assert_eq!(user.expected_usage(), 400);
    }

    #[test]
    fn reservations_count_against_the_quota() {
        let rig = quota_rig();
        let (_, writer) = rig.writer(None);
        rig.state.allow_write(&writer, 600).unwrap();
        let err = rig.state.allow_write(&writer, 500).unwrap_err();
        assert!(matches!(err, SpaceError::QuotaExceeded { .. }));
    }

    #[test]
    fn at_quota_any_write_is_rejected() {
        let rig = quota_rig();
        let (_, writer) = rig.writer(None);
        fill(&rig, &writer, QUOTA);
        let err = rig.state.allow_write(&writer, 1).unwrap_err();
        match err {
            SpaceError::QuotaExceeded {
                usage,
                quota,
                attempted,
            } => {
                assert_eq!(usage, QUOTA);
                assert_eq!(quota, QUOTA);
                assert_eq!(attempted, 1);
            }
            other => panic!("expected QuotaExceeded, got {other}"),
        }
        // Rejection is sticky.
        assert!(rig.usage.user_usage(&writer).unwrap().unwrap().errored);
    }

    #[test]
    fn errored_owner_gets_the_tolerance_band() {
        let rig = quota_rig();
        let (_, writer) = rig.writer(None);
        fill(&rig, &writer, QUOTA);
        assert!(rig.state.allow_write(&writer, 1).is_err());

        // Within quota + tolerance now succeeds...
        rig.state.allow_write(&writer, TOLERANCE).unwrap();
        // ...but not beyond it.
        let err = rig.state.allow_write(&writer, 1).unwrap_err();
        assert!(matches!(err, SpaceError::QuotaExceeded { .. }));
    }

    #[test]
    fn rejection_clears_the_writers_reservation() {
        let rig = quota_rig();
        let (_, writer) = rig.writer(None);
        rig.state.allow_write(&writer, 900).unwrap();
        let err = rig.state.allow_write(&writer, 900).unwrap_err();
        match err {
            // The dropped reservation is reported as part of the attempt.
            SpaceError::QuotaExceeded { attempted, .. } => assert_eq!(attempted, 1800),
            other => panic!("expected QuotaExceeded, got {other}"),
        }
        let user = rig.usage.user_usage(&writer).unwrap().unwrap();
        assert_eq!(user.pending_of(&writer), 0);
    }

    #[test]
    fn unknown_writer_is_an_error() {
        let rig = quota_rig();
        let ghost = KeyId::from_raw([7u8; 32]);
        let err = rig.state.allow_write(&ghost, 10).unwrap_err();
        assert!(matches!(err, SpaceError::UnknownWriter(_)));
    }

    #[test]
    fn delegated_writers_share_the_owners_quota() {
        let rig = quota_rig();
        let (_, alice) = rig.writer(None);
        let (_, bob) = rig.writer(Some(&alice));
        fill(&rig, &alice, 700);
        fill(&rig, &bob, 300);
        let err = rig.state.allow_write(&bob, 1).unwrap_err();
        assert!(matches!(err, SpaceError::QuotaExceeded { .. }));
    }

    #[test]
    fn usage_of_resolves_through_the_owner() {
        let rig = quota_rig();
        let (_, alice) = rig.writer(None);
        let (_, bob) = rig.writer(Some(&alice));
        fill(&rig, &alice, 600);
        fill(&rig, &bob, 150);
        assert_eq!(rig.state.usage_of(&alice).unwrap(), 750);
        assert_eq!(rig.state.usage_of(&bob).unwrap(), 750);
    }
}
