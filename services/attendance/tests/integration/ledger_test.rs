use std::sync::Arc;

use tokio::task::JoinSet;

use rollcall_attendance::domain::repository::AttendanceRepository;
use rollcall_attendance::domain::types::{
    AttendanceKey, RosterEntry, Standing, UpsertOutcome,
};
use rollcall_attendance::error::AttendanceServiceError;
use rollcall_attendance::infra::memory::MemoryLedger;
use rollcall_attendance::usecase::ledger::{
    AggregateAttendanceUseCase, BatchMarkInput, BatchMarkReport, BatchMarkUseCase,
    QueryAttendanceInput, QueryAttendanceUseCase, RecordAttendanceInput,
    RecordAttendanceUseCase, RosterUseCase,
};
use rollcall_core::clock::Clock;
use rollcall_domain::attendance::{AttendanceStatus, DateRange, GeoPoint, RecordedBy};
use rollcall_testing::clock::ManualClock;

use crate::helpers::{FailingLedger, day, new_ledger, participant, session};

fn recorder(ledger: &MemoryLedger, clock: &ManualClock) -> RecordAttendanceUseCase<MemoryLedger> {
    RecordAttendanceUseCase {
        ledger: ledger.clone(),
        clock: clock.shared(),
    }
}

fn entry(
    participant_id: &str,
    session_id: &str,
    date: u32,
    status: AttendanceStatus,
) -> RecordAttendanceInput {
    RecordAttendanceInput {
        participant_id: participant(participant_id),
        session_id: session(session_id),
        date: day(date),
        status,
        recorded_by: RecordedBy::Marker("TCH001".to_owned()),
        location: None,
    }
}

#[tokio::test]
async fn should_keep_one_row_per_key_and_let_last_write_win() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    let record = recorder(&ledger, &clock);

    let first = record
        .execute(entry("STU001", "CS101-A", 19, AttendanceStatus::Absent))
        .await
        .unwrap();
    assert_eq!(first, UpsertOutcome::Created);

    clock.advance_secs(120);
    let mut correction = entry("STU001", "CS101-A", 19, AttendanceStatus::Late);
    correction.location = Some(GeoPoint::new(12.97, 77.59).unwrap());
    let second = record.execute(correction).await.unwrap();
    assert_eq!(second, UpsertOutcome::Updated);

    assert_eq!(ledger.count().await.unwrap(), 1);
    let stored = ledger
        .find(&AttendanceKey {
            participant_id: participant("STU001"),
            session_id: session("CS101-A"),
            date: day(19),
        })
        .await
        .unwrap()
        .unwrap();
    assert_eq!(stored.status, AttendanceStatus::Late);
    assert_eq!(stored.recorded_at, clock.now());
    assert_eq!(stored.location, Some(GeoPoint::new(12.97, 77.59).unwrap()));
}

#[tokio::test]
async fn should_filter_by_session_and_inclusive_range() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    let record = recorder(&ledger, &clock);
    for (session_id, d) in [("CS101-A", 16), ("CS101-A", 17), ("MA201", 17), ("CS101-A", 19)] {
        record
            .execute(entry("STU001", session_id, d, AttendanceStatus::Present))
            .await
            .unwrap();
    }
    record
        .execute(entry("STU002", "CS101-A", 17, AttendanceStatus::Present))
        .await
        .unwrap();

    let query = QueryAttendanceUseCase {
        ledger: ledger.clone(),
    };
    let rows = query
        .execute(QueryAttendanceInput {
            participant_id: participant("STU001"),
            session_id: Some(session("CS101-A")),
            range: DateRange::new(Some(day(17)), Some(day(19))).unwrap(),
        })
        .await
        .unwrap();

    let dates: Vec<_> = rows.iter().map(|r| r.date).collect();
    assert_eq!(dates, vec![day(19), day(17)]);
    assert!(rows.iter().all(|r| r.participant_id == participant("STU001")));

    let all = query
        .execute(QueryAttendanceInput {
            participant_id: participant("STU001"),
            session_id: None,
            range: DateRange::unbounded(),
        })
        .await
        .unwrap();
    assert_eq!(all.len(), 4);
}

#[tokio::test]
async fn should_aggregate_only_materialized_rows() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    let record = recorder(&ledger, &clock);
    for (d, status) in [
        (16, AttendanceStatus::Present),
        (17, AttendanceStatus::Absent),
        (18, AttendanceStatus::Late),
        (19, AttendanceStatus::Medical),
    ] {
        record.execute(entry("STU001", "CS101-A", d, status)).await.unwrap();
    }
    record
        .execute(entry("STU001", "MA201", 19, AttendanceStatus::Absent))
        .await
        .unwrap();

    let agg = AggregateAttendanceUseCase {
        ledger: ledger.clone(),
    }
    .execute(&participant("STU001"), &session("CS101-A"))
    .await
    .unwrap();

    assert_eq!(agg.total, 4);
    assert_eq!(agg.present_like, 2);
    assert_eq!(agg.excused, 1);
    assert_eq!(agg.counted(), 3);
    assert!((agg.percentage() - 200.0 / 3.0).abs() < 1e-9);
    assert_eq!(agg.standing(), Standing::Warning);
    assert_eq!(agg.classes_needed(75.0), Some(1));
    assert_eq!(agg.classes_missable(60.0), Some(0));
}

#[tokio::test]
async fn should_report_zero_for_participant_without_rows() {
    let agg = AggregateAttendanceUseCase {
        ledger: new_ledger(),
    }
    .execute(&participant("STU404"), &session("CS101-A"))
    .await
    .unwrap();

    assert_eq!(agg.total, 0);
    assert_eq!(agg.percentage(), 0.0);
}

#[tokio::test]
async fn should_batch_mark_and_count_created_and_updated() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    recorder(&ledger, &clock)
        .execute(entry("STU002", "CS101-A", 19, AttendanceStatus::Present))
        .await
        .unwrap();

    let report = BatchMarkUseCase {
        ledger: ledger.clone(),
        clock: clock.shared(),
    }
    .execute(BatchMarkInput {
        session_id: session("CS101-A"),
        date: day(19),
        entries: vec![
            (participant("STU001"), AttendanceStatus::Present),
            (participant("STU002"), AttendanceStatus::OfficialDuty),
            (participant("STU003"), AttendanceStatus::Absent),
        ],
        marker: "TCH001".to_owned(),
    })
    .await
    .unwrap();

    assert_eq!(report, BatchMarkReport { created: 2, updated: 1 });
    let rows = ledger
        .list_for_session(&session("CS101-A"), day(19))
        .await
        .unwrap();
    assert_eq!(rows.len(), 3);
    assert!(
        rows.iter()
            .all(|r| r.recorded_by == RecordedBy::Marker("TCH001".to_owned()))
    );
    assert_eq!(rows[1].status, AttendanceStatus::OfficialDuty);
}

#[tokio::test]
async fn should_fill_roster_gaps_with_unrecorded_absence() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    let record = recorder(&ledger, &clock);
    record
        .execute(entry("STU001", "CS101-A", 19, AttendanceStatus::Present))
        .await
        .unwrap();
    record
        .execute(entry("STU003", "CS101-A", 19, AttendanceStatus::Absent))
        .await
        .unwrap();

    let roster = RosterUseCase {
        ledger: ledger.clone(),
    };

    let expected = roster
        .execute(
            &session("CS101-A"),
            day(19),
            vec![participant("STU001"), participant("STU002"), participant("STU003")],
        )
        .await
        .unwrap();
    assert_eq!(
        expected,
        vec![
            RosterEntry {
                participant_id: participant("STU001"),
                status: AttendanceStatus::Present,
                recorded: true,
            },
            RosterEntry {
                participant_id: participant("STU002"),
                status: AttendanceStatus::Absent,
                recorded: false,
            },
            RosterEntry {
                participant_id: participant("STU003"),
                status: AttendanceStatus::Absent,
                recorded: true,
            },
        ]
    );

    let recorded_only = roster
        .execute(&session("CS101-A"), day(19), vec![])
        .await
        .unwrap();
    assert_eq!(recorded_only.len(), 2);
    assert!(recorded_only.iter().all(|e| e.recorded));
}

#[tokio::test]
async fn should_surface_storage_error_unchanged() {
    let clock = ManualClock::at_default_start();
    let record = RecordAttendanceUseCase {
        ledger: FailingLedger,
        clock: clock.shared(),
    };

    let result = record
        .execute(entry("STU001", "CS101-A", 19, AttendanceStatus::Present))
        .await;
    assert!(
        matches!(result, Err(AttendanceServiceError::Storage(_))),
        "expected Storage, got {result:?}"
    );
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn should_create_one_row_under_parallel_writes_to_one_key() {
    let clock = ManualClock::at_default_start();
    let ledger = new_ledger();
    let record = Arc::new(recorder(&ledger, &clock));

    let mut tasks = JoinSet::new();
    for i in 0..16 {
        let record = Arc::clone(&record);
        let status = if i % 2 == 0 {
            AttendanceStatus::Present
        } else {
            AttendanceStatus::Late
        };
        tasks.spawn(async move { record.execute(entry("STU001", "CS101-A", 19, status)).await });
    }

    let mut created = 0;
    while let Some(joined) = tasks.join_next().await {
        if joined.unwrap().unwrap() == UpsertOutcome::Created {
            created += 1;
        }
    }

    assert_eq!(created, 1, "only the first write to a key creates it");
    assert_eq!(ledger.count().await.unwrap(), 1);
}
