use std::sync::Arc;

use chrono::Duration;
use tokio::task::JoinSet;

use rollcall_attendance::domain::repository::ChallengeRepository;
use rollcall_attendance::error::AttendanceServiceError;
use rollcall_attendance::infra::memory::MemoryChallengeStore;
use rollcall_attendance::usecase::otp::{
    ChallengeStatusUseCase, IssueChallengeInput, VerifyChallengeInput,
};
use rollcall_attendance::usecase::token::{LoginInput, LoginUseCase};
use rollcall_auth_types::identity::TokenSecret;
use rollcall_auth_types::token::validate_access_token;
use rollcall_domain::role::Role;
use rollcall_testing::auth::TEST_JWT_SECRET;
use rollcall_testing::clock::ManualClock;

use crate::helpers::{RecordingNotifier, issue_challenge, request_code, verify_challenge};

const ADDRESS: &str = "stu001@campus.edu";

fn wrong_code(code: &str) -> String {
    if code == "000000" { "111111" } else { "000000" }.to_owned()
}

#[tokio::test]
async fn should_store_challenge_and_enqueue_delivery() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();

    let issued = issue_challenge(&challenges, &notifier, &clock)
        .execute(IssueChallengeInput {
            address: "  STU001@Campus.edu ".to_owned(),
            role: Role::Student,
        })
        .await
        .unwrap();

    assert_eq!(issued.address, ADDRESS, "address should be normalized");

    let stored = challenges.find(ADDRESS).await.unwrap().unwrap();
    assert_eq!(stored.attempts_used, 0);
    assert_eq!(stored.role, Role::Student);
    assert_eq!(stored.expires_at, issued.expires_at);

    let deliveries = notifier.deliveries.lock().unwrap();
    assert_eq!(deliveries.len(), 1);
    assert_eq!(deliveries[0].recipient, ADDRESS);
    assert_eq!(deliveries[0].code, stored.code);
    assert_eq!(deliveries[0].code.len(), 6);
    assert!(deliveries[0].code.chars().all(|c| c.is_ascii_digit()));
    assert_eq!(deliveries[0].validity_window_label, "5 minutes");
}

#[tokio::test]
async fn should_reject_blank_address() {
    let clock = ManualClock::at_default_start();
    let notifier = RecordingNotifier::default();

    let result = issue_challenge(&MemoryChallengeStore::new(), &notifier, &clock)
        .execute(IssueChallengeInput {
            address: "   ".to_owned(),
            role: Role::Parent,
        })
        .await;

    assert!(
        matches!(result, Err(AttendanceServiceError::InvalidRequest(_))),
        "expected InvalidRequest, got {result:?}"
    );
    assert_eq!(notifier.len(), 0, "nothing should be delivered");
}

#[tokio::test]
async fn should_verify_once_then_report_not_found() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Teacher).await;

    let verify = verify_challenge(&challenges, &clock);
    let role = verify
        .execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code: code.clone(),
        })
        .await
        .unwrap();
    assert_eq!(role, Role::Teacher);

    let result = verify
        .execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code,
        })
        .await;
    assert!(
        matches!(result, Err(AttendanceServiceError::ChallengeNotFound)),
        "expected ChallengeNotFound, got {result:?}"
    );
}

#[tokio::test]
async fn should_lock_out_after_three_wrong_codes() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;
    let verify = verify_challenge(&challenges, &clock);
    let attempt = |candidate: String| {
        verify.execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code: candidate,
        })
    };

    let first = attempt(wrong_code(&code)).await;
    assert!(
        matches!(first, Err(AttendanceServiceError::CodeMismatch { remaining: 2 })),
        "expected CodeMismatch with 2 remaining, got {first:?}"
    );
    let second = attempt(wrong_code(&code)).await;
    assert!(
        matches!(second, Err(AttendanceServiceError::CodeMismatch { remaining: 1 })),
        "expected CodeMismatch with 1 remaining, got {second:?}"
    );
    let third = attempt(wrong_code(&code)).await;
    assert!(
        matches!(third, Err(AttendanceServiceError::AttemptsExhausted)),
        "expected AttemptsExhausted, got {third:?}"
    );

    let correct = attempt(code).await;
    assert!(
        matches!(correct, Err(AttendanceServiceError::ChallengeNotFound)),
        "expected ChallengeNotFound after lockout, got {correct:?}"
    );
}

#[tokio::test]
async fn should_report_expired_regardless_of_attempts() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;

    clock.advance(Duration::minutes(5));

    let result = verify_challenge(&challenges, &clock)
        .execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code,
        })
        .await;
    assert!(
        matches!(result, Err(AttendanceServiceError::ChallengeExpired)),
        "expected ChallengeExpired, got {result:?}"
    );
    assert_eq!(challenges.count().await.unwrap(), 0, "expired challenge is removed");
}

#[tokio::test]
async fn should_invalidate_previous_code_on_reissue() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let verify = verify_challenge(&challenges, &clock);

    let first = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;
    let mut second = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;
    // Two draws can coincide.
    while first == second {
        second = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;
    }

    let stale = verify
        .execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code: first,
        })
        .await;
    assert!(
        matches!(stale, Err(AttendanceServiceError::CodeMismatch { .. })),
        "expected CodeMismatch for replaced code, got {stale:?}"
    );

    let role = verify
        .execute(VerifyChallengeInput {
            address: ADDRESS.to_owned(),
            code: second,
        })
        .await
        .unwrap();
    assert_eq!(role, Role::Student);
}

#[tokio::test]
async fn should_report_pending_until_expiry() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let status = ChallengeStatusUseCase {
        challenges: challenges.clone(),
        clock: clock.shared(),
    };

    assert!(!status.execute(ADDRESS).await.unwrap());

    request_code(&challenges, &notifier, &clock, ADDRESS, Role::Parent).await;
    assert!(status.execute(ADDRESS).await.unwrap());

    clock.advance(Duration::minutes(5));
    assert!(!status.execute(ADDRESS).await.unwrap());
}

#[tokio::test]
async fn should_mint_token_for_verified_address() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Parent).await;

    let login = LoginUseCase {
        verify: verify_challenge(&challenges, &clock),
        jwt_secret: TokenSecret::new(TEST_JWT_SECRET),
    };
    let out = login
        .execute(LoginInput {
            address: "STU001@campus.edu".to_owned(),
            code,
        })
        .await
        .unwrap();

    assert_eq!(out.subject, ADDRESS);
    assert_eq!(out.role, Role::Parent);

    let info = validate_access_token(&out.access_token, TEST_JWT_SECRET).unwrap();
    assert_eq!(info.subject, ADDRESS);
    assert_eq!(info.role, Role::Parent);
    assert_eq!(info.access_token_exp, out.access_token_exp);
}

#[tokio::test]
async fn should_not_mint_token_on_mismatch() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;

    let login = LoginUseCase {
        verify: verify_challenge(&challenges, &clock),
        jwt_secret: TokenSecret::new(TEST_JWT_SECRET),
    };
    let result = login
        .execute(LoginInput {
            address: ADDRESS.to_owned(),
            code: wrong_code(&code),
        })
        .await;

    assert!(
        matches!(result, Err(AttendanceServiceError::CodeMismatch { remaining: 2 })),
        "expected CodeMismatch, got {result:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_count_parallel_wrong_codes_against_one_budget() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Student).await;
    let verify = Arc::new(verify_challenge(&challenges, &clock));

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let verify = Arc::clone(&verify);
        let candidate = wrong_code(&code);
        tasks.spawn(async move {
            verify
                .execute(VerifyChallengeInput {
                    address: ADDRESS.to_owned(),
                    code: candidate,
                })
                .await
        });
    }

    let mut mismatches = 0;
    let mut exhausted = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Err(AttendanceServiceError::CodeMismatch { .. }) => mismatches += 1,
            Err(AttendanceServiceError::AttemptsExhausted) => exhausted += 1,
            Err(AttendanceServiceError::ChallengeNotFound) => {}
            other => panic!("unexpected verify outcome {other:?}"),
        }
    }

    assert_eq!(mismatches, 2, "only the first two wrong codes may report a mismatch");
    assert_eq!(exhausted, 1, "exactly one caller should exhaust the challenge");
    assert!(challenges.find(ADDRESS).await.unwrap().is_none());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_accept_a_code_once_under_parallel_verifies() {
    let clock = ManualClock::at_default_start();
    let challenges = MemoryChallengeStore::new();
    let notifier = RecordingNotifier::default();
    let code = request_code(&challenges, &notifier, &clock, ADDRESS, Role::Teacher).await;
    let verify = Arc::new(verify_challenge(&challenges, &clock));

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let verify = Arc::clone(&verify);
        let candidate = code.clone();
        tasks.spawn(async move {
            verify
                .execute(VerifyChallengeInput {
                    address: ADDRESS.to_owned(),
                    code: candidate,
                })
                .await
        });
    }

    let mut accepted = 0;
    while let Some(joined) = tasks.join_next().await {
        match joined.unwrap() {
            Ok(role) => {
                assert_eq!(role, Role::Teacher);
                accepted += 1;
            }
            Err(AttendanceServiceError::ChallengeNotFound) => {}
            other => panic!("unexpected verify outcome {other:?}"),
        }
    }

    assert_eq!(accepted, 1, "a code must be consumed exactly once");
    assert!(challenges.find(ADDRESS).await.unwrap().is_none());
}
