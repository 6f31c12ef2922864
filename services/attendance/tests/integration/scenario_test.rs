use chrono::Duration;

use rollcall_attendance::domain::repository::{AttendanceRepository, SessionCodeRepository};
use rollcall_attendance::error::AttendanceServiceError;
use rollcall_attendance::infra::memory::{MemoryChallengeStore, MemorySessionCodeStore};
use rollcall_attendance::usecase::ledger::{
    AggregateAttendanceUseCase, QueryAttendanceInput, QueryAttendanceUseCase,
};
use rollcall_attendance::usecase::scan::PresentInput;
use rollcall_attendance::usecase::session_code::IssueSessionCodeInput;
use rollcall_attendance::usecase::sweep::SweepUseCase;
use rollcall_attendance::usecase::token::{LoginInput, LoginUseCase};
use rollcall_auth_types::identity::TokenSecret;
use rollcall_domain::attendance::{AttendanceStatus, DateRange, RecordedBy};
use rollcall_domain::id::ParticipantId;
use rollcall_domain::role::Role;
use rollcall_testing::auth::TEST_JWT_SECRET;
use rollcall_testing::clock::ManualClock;

use crate::helpers::{
    RecordingNotifier, issue_session_code, issuer, new_ledger, present_input, request_code,
    session, verify_challenge,
};

#[tokio::test]
async fn should_run_login_to_presence_to_expiry() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let codes = MemorySessionCodeStore::new();
    let ledger = new_ledger();
    let notifier = RecordingNotifier::default();

    // Student logs in with a mailed OTP.
    let otp = request_code(
        &challenges,
        &notifier,
        &clock,
        "stu001@campus.edu",
        Role::Student,
    )
    .await;
    let login = LoginUseCase {
        verify: verify_challenge(&challenges, &clock),
        jwt_secret: TokenSecret::new(TEST_JWT_SECRET),
    }
    .execute(LoginInput {
        address: "stu001@campus.edu".to_owned(),
        code: otp,
    })
    .await
    .unwrap();
    assert_eq!(login.role, Role::Student);
    let student = ParticipantId::new(login.subject).unwrap();

    // Teacher opens CS101-A for one minute.
    let issued = issue_session_code(&codes, &clock)
        .execute(IssueSessionCodeInput {
            session_id: session("CS101-A"),
            issuer_id: issuer("TCH001"),
            ttl: Duration::seconds(60),
        })
        .await
        .unwrap();

    // Student types the code.
    clock.advance_secs(20);
    let present = present_input(&codes, ledger.clone(), &clock);
    let presence = present
        .execute(PresentInput {
            participant_id: student.clone(),
            raw: issued.code.clone(),
            location: None,
        })
        .await
        .unwrap();
    assert_eq!(presence.session_id, session("CS101-A"));

    let rows = QueryAttendanceUseCase {
        ledger: ledger.clone(),
    }
    .execute(QueryAttendanceInput {
        participant_id: student.clone(),
        session_id: Some(session("CS101-A")),
        range: DateRange::unbounded(),
    })
    .await
    .unwrap();
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].status, AttendanceStatus::Present);
    assert_eq!(rows[0].recorded_by, RecordedBy::ShortCode);

    // The sweep retires the code once it expires.
    clock.advance_secs(60);
    let report = SweepUseCase {
        challenges: challenges.clone(),
        codes: codes.clone(),
        clock: clock.shared(),
    }
    .execute()
    .await
    .unwrap();
    assert_eq!(report.codes_deactivated, 1);
    assert!(!codes.find(&issued.code).await.unwrap().unwrap().active);

    let late = present
        .execute(PresentInput {
            participant_id: student.clone(),
            raw: issued.code,
            location: None,
        })
        .await;
    assert!(
        matches!(late, Err(AttendanceServiceError::InvalidOrExpiredCode)),
        "expected InvalidOrExpiredCode, got {late:?}"
    );

    let agg = AggregateAttendanceUseCase {
        ledger: ledger.clone(),
    }
    .execute(&student, &session("CS101-A"))
    .await
    .unwrap();
    assert_eq!(agg.total, 1);
    assert_eq!(agg.percentage(), 100.0);
    assert_eq!(ledger.count().await.unwrap(), 1);
}
