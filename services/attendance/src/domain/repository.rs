#![allow(async_fn_in_trait)]

use std::future::Future;

use chrono::{DateTime, NaiveDate, Utc};

use rollcall_domain::attendance::DateRange;
use rollcall_domain::id::{ParticipantId, SessionId};

use crate::domain::types::{
    AttendanceKey, AttendanceRecord, OtpDelivery, SessionCode, UpsertOutcome,
    VerificationChallenge,
};
use crate::error::AttendanceServiceError;

/// Store of outstanding login challenges, one per address.
pub trait ChallengeRepository: Send + Sync {
    /// Store `challenge`, replacing any prior challenge for the same address.
    async fn put(&self, challenge: VerificationChallenge) -> Result<(), AttendanceServiceError>;

    async fn find(&self, address: &str)
    -> Result<Option<VerificationChallenge>, AttendanceServiceError>;

    /// Run `f` against the slot for `address` with exclusive access to that key.
    /// Leaving `None` in the slot deletes the challenge.
    async fn update<F, T>(&self, address: &str, f: F) -> Result<T, AttendanceServiceError>
    where
        F: FnOnce(&mut Option<VerificationChallenge>) -> T + Send,
        T: Send;

    /// Delete every challenge with `now >= expires_at`. Returns the number removed.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError>;

    async fn count(&self) -> Result<u64, AttendanceServiceError>;
}

/// Store of session codes. Codes are never deleted, only deactivated.
pub trait SessionCodeRepository: Send + Sync {
    /// Insert `code` unless a code with the same value already exists.
    /// Returns `false` on collision.
    async fn insert_if_absent(&self, code: &SessionCode) -> Result<bool, AttendanceServiceError>;

    /// Look up a code by its normalized (lowercase) value.
    async fn find(&self, code: &str) -> Result<Option<SessionCode>, AttendanceServiceError>;

    /// Flip `active` to false. Returns `true` if the code was active.
    async fn deactivate(&self, code: &str) -> Result<bool, AttendanceServiceError>;

    /// Flip every active code with `now >= expires_at` to inactive. Returns the count.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> Result<u64, AttendanceServiceError>;

    /// Whether `session` has at least one active, unexpired code.
    async fn has_presentable(
        &self,
        session: &SessionId,
        now: DateTime<Utc>,
    ) -> Result<bool, AttendanceServiceError>;

    async fn count_active(&self) -> Result<u64, AttendanceServiceError>;
}

/// Keyed attendance ledger: one record per (participant, session, date).
pub trait AttendanceRepository: Send + Sync {
    /// Insert or overwrite the record at `record.key()`.
    async fn upsert(
        &self,
        record: &AttendanceRecord,
    ) -> Result<UpsertOutcome, AttendanceServiceError>;

    async fn find(
        &self,
        key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceServiceError>;

    /// Records for `participant`, most recent date first, ties by session id.
    async fn list_for_participant(
        &self,
        participant: &ParticipantId,
        session: Option<&SessionId>,
        range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError>;

    /// Every record for `session` on `date`, ordered by participant id.
    async fn list_for_session(
        &self,
        session: &SessionId,
        date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError>;

    async fn count(&self) -> Result<u64, AttendanceServiceError>;
}

/// Hands OTP deliveries to the email collaborator without waiting on it.
pub trait OtpNotifier: Send + Sync {
    fn enqueue(&self, delivery: OtpDelivery);
}

/// Outbound email transport used by the outbox worker.
pub trait Mailer: Send + Sync + 'static {
    fn send(&self, delivery: &OtpDelivery) -> impl Future<Output = anyhow::Result<()>> + Send;
}
