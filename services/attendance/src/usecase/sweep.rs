use serde::Serialize;

use rollcall_core::clock::SharedClock;

use crate::domain::repository::{ChallengeRepository, SessionCodeRepository};
use crate::error::AttendanceServiceError;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    pub challenges_purged: u64,
    pub codes_deactivated: u64,
}

/// Purge expired challenges and deactivate expired session codes as of one instant.
pub struct SweepUseCase<C, S>
where
    C: ChallengeRepository,
    S: SessionCodeRepository,
{
    pub challenges: C,
    pub codes: S,
    pub clock: SharedClock,
}

impl<C, S> SweepUseCase<C, S>
where
    C: ChallengeRepository,
    S: SessionCodeRepository,
{
    pub async fn execute(&self) -> Result<SweepReport, AttendanceServiceError> {
        let now = self.clock.now();
        let challenges_purged = self.challenges.purge_expired(now).await?;
        let codes_deactivated = self.codes.deactivate_expired(now).await?;
        Ok(SweepReport {
            challenges_purged,
            codes_deactivated,
        })
    }
}
