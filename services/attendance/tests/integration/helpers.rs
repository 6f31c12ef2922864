use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use chrono::{Duration, NaiveDate};
use tokio::sync::mpsc;

use rollcall_attendance::config::Tunables;
use rollcall_attendance::domain::repository::{AttendanceRepository, OtpNotifier};
use rollcall_attendance::domain::types::{
    AttendanceKey, AttendanceRecord, OtpDelivery, UpsertOutcome,
};
use rollcall_attendance::error::AttendanceServiceError;
use rollcall_attendance::infra::memory::{
    MemoryChallengeStore, MemoryLedger, MemorySessionCodeStore,
};
use rollcall_attendance::infra::outbox::OutboxNotifier;
use rollcall_attendance::state::AppState;
use rollcall_attendance::usecase::otp::{
    IssueChallengeInput, IssueChallengeUseCase, VerifyChallengeUseCase,
};
use rollcall_attendance::usecase::scan::PresentInputUseCase;
use rollcall_attendance::usecase::session_code::{
    IssueSessionCodeInput, IssueSessionCodeUseCase,
};
use rollcall_auth_types::identity::TokenSecret;
use rollcall_domain::attendance::DateRange;
use rollcall_domain::id::{IssuerId, ParticipantId, SessionId};
use rollcall_domain::role::Role;
use rollcall_testing::auth::TEST_JWT_SECRET;
use rollcall_testing::clock::ManualClock;

// ── Fixtures ─────────────────────────────────────────────────────────────────

pub fn session(id: &str) -> SessionId {
    SessionId::new(id).unwrap()
}

pub fn participant(id: &str) -> ParticipantId {
    ParticipantId::new(id).unwrap()
}

pub fn issuer(id: &str) -> IssuerId {
    IssuerId::new(id).unwrap()
}

pub fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, d).unwrap()
}

// ── RecordingNotifier ────────────────────────────────────────────────────────

/// Captures every delivery instead of sending it.
#[derive(Clone, Default)]
pub struct RecordingNotifier {
    pub deliveries: Arc<Mutex<Vec<OtpDelivery>>>,
}

impl RecordingNotifier {
    pub fn last_code(&self) -> String {
        self.deliveries
            .lock()
            .unwrap()
            .last()
            .expect("no OTP delivery recorded")
            .code
            .clone()
    }

    pub fn len(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

impl OtpNotifier for RecordingNotifier {
    fn enqueue(&self, delivery: OtpDelivery) {
        self.deliveries.lock().unwrap().push(delivery);
    }
}

// ── FailingLedger ────────────────────────────────────────────────────────────

/// Ledger whose every call fails with a storage error.
pub struct FailingLedger;

impl AttendanceRepository for FailingLedger {
    async fn upsert(
        &self,
        _record: &AttendanceRecord,
    ) -> Result<UpsertOutcome, AttendanceServiceError> {
        Err(anyhow!("ledger unavailable").into())
    }

    async fn find(
        &self,
        _key: &AttendanceKey,
    ) -> Result<Option<AttendanceRecord>, AttendanceServiceError> {
        Err(anyhow!("ledger unavailable").into())
    }

    async fn list_for_participant(
        &self,
        _participant: &ParticipantId,
        _session: Option<&SessionId>,
        _range: DateRange,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Err(anyhow!("ledger unavailable").into())
    }

    async fn list_for_session(
        &self,
        _session: &SessionId,
        _date: NaiveDate,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        Err(anyhow!("ledger unavailable").into())
    }

    async fn count(&self) -> Result<u64, AttendanceServiceError> {
        Err(anyhow!("ledger unavailable").into())
    }
}

// ── Use case builders ────────────────────────────────────────────────────────

pub fn issue_challenge(
    challenges: &MemoryChallengeStore,
    notifier: &RecordingNotifier,
    clock: &ManualClock,
) -> IssueChallengeUseCase<MemoryChallengeStore, RecordingNotifier> {
    IssueChallengeUseCase {
        challenges: challenges.clone(),
        notifier: notifier.clone(),
        clock: clock.shared(),
        tunables: Tunables::default(),
    }
}

pub fn verify_challenge(
    challenges: &MemoryChallengeStore,
    clock: &ManualClock,
) -> VerifyChallengeUseCase<MemoryChallengeStore> {
    VerifyChallengeUseCase {
        challenges: challenges.clone(),
        clock: clock.shared(),
        tunables: Tunables::default(),
    }
}

pub fn issue_session_code(
    codes: &MemorySessionCodeStore,
    clock: &ManualClock,
) -> IssueSessionCodeUseCase<MemorySessionCodeStore> {
    IssueSessionCodeUseCase {
        codes: codes.clone(),
        clock: clock.shared(),
        tunables: Tunables::default(),
    }
}

pub fn present_input<L: AttendanceRepository>(
    codes: &MemorySessionCodeStore,
    ledger: L,
    clock: &ManualClock,
) -> PresentInputUseCase<MemorySessionCodeStore, L> {
    PresentInputUseCase {
        codes: codes.clone(),
        ledger,
        clock: clock.shared(),
        tunables: Tunables::default(),
    }
}

/// Request a challenge for `address` and return the delivered code.
pub async fn request_code(
    challenges: &MemoryChallengeStore,
    notifier: &RecordingNotifier,
    clock: &ManualClock,
    address: &str,
    role: Role,
) -> String {
    issue_challenge(challenges, notifier, clock)
        .execute(IssueChallengeInput {
            address: address.to_owned(),
            role,
        })
        .await
        .unwrap();
    notifier.last_code()
}

/// Issue a one-minute code for `session_id` by `TCH001`.
pub async fn open_session(
    codes: &MemorySessionCodeStore,
    clock: &ManualClock,
    session_id: &str,
) -> String {
    issue_session_code(codes, clock)
        .execute(IssueSessionCodeInput {
            session_id: session(session_id),
            issuer_id: issuer("TCH001"),
            ttl: Duration::seconds(60),
        })
        .await
        .unwrap()
        .code
}

pub fn new_ledger() -> MemoryLedger {
    MemoryLedger::new()
}

// ── Router state ─────────────────────────────────────────────────────────────

/// In-memory state on a manual clock, plus the receiver behind its OTP outbox.
pub fn test_state(clock: &ManualClock) -> (AppState, mpsc::Receiver<OtpDelivery>) {
    let (notifier, rx) = OutboxNotifier::channel(16);
    let state = AppState::in_memory(
        notifier,
        clock.shared(),
        Tunables::default(),
        TokenSecret::new(TEST_JWT_SECRET),
        "campus.test".to_owned(),
    );
    (state, rx)
}
