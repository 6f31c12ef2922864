use std::collections::HashMap;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::info;

use rollcall_core::clock::SharedClock;
use rollcall_domain::attendance::{AttendanceStatus, DateRange, GeoPoint, RecordedBy};
use rollcall_domain::id::{ParticipantId, SessionId};

use crate::domain::repository::AttendanceRepository;
use crate::domain::types::{AttendanceAggregate, AttendanceRecord, RosterEntry, UpsertOutcome};
use crate::error::AttendanceServiceError;

// ── RecordAttendance ─────────────────────────────────────────────────────────

pub struct RecordAttendanceInput {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub recorded_by: RecordedBy,
    pub location: Option<GeoPoint>,
}

pub struct RecordAttendanceUseCase<L: AttendanceRepository> {
    pub ledger: L,
    pub clock: SharedClock,
}

impl<L: AttendanceRepository> RecordAttendanceUseCase<L> {
    /// Idempotent keyed write. A second write to the same key overwrites it.
    pub async fn execute(
        &self,
        input: RecordAttendanceInput,
    ) -> Result<UpsertOutcome, AttendanceServiceError> {
        let record = AttendanceRecord {
            participant_id: input.participant_id,
            session_id: input.session_id,
            date: input.date,
            status: input.status,
            recorded_at: self.clock.now(),
            recorded_by: input.recorded_by,
            location: input.location,
        };
        self.ledger.upsert(&record).await
    }
}

// ── QueryAttendance ──────────────────────────────────────────────────────────

pub struct QueryAttendanceInput {
    pub participant_id: ParticipantId,
    pub session_id: Option<SessionId>,
    pub range: DateRange,
}

pub struct QueryAttendanceUseCase<L: AttendanceRepository> {
    pub ledger: L,
}

impl<L: AttendanceRepository> QueryAttendanceUseCase<L> {
    pub async fn execute(
        &self,
        input: QueryAttendanceInput,
    ) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
        self.ledger
            .list_for_participant(
                &input.participant_id,
                input.session_id.as_ref(),
                input.range,
            )
            .await
    }
}

// ── AggregateAttendance ──────────────────────────────────────────────────────

pub struct AggregateAttendanceUseCase<L: AttendanceRepository> {
    pub ledger: L,
}

impl<L: AttendanceRepository> AggregateAttendanceUseCase<L> {
    /// Counts over materialized records only; missing days are not absences here.
    pub async fn execute(
        &self,
        participant: &ParticipantId,
        session: &SessionId,
    ) -> Result<AttendanceAggregate, AttendanceServiceError> {
        let records = self
            .ledger
            .list_for_participant(participant, Some(session), DateRange::unbounded())
            .await?;
        Ok(AttendanceAggregate::from_statuses(
            records.into_iter().map(|r| r.status),
        ))
    }
}

// ── BatchMark ────────────────────────────────────────────────────────────────

pub struct BatchMarkInput {
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub entries: Vec<(ParticipantId, AttendanceStatus)>,
    pub marker: String,
}

#[derive(Debug, Default, PartialEq, Eq, Serialize)]
pub struct BatchMarkReport {
    pub created: u32,
    pub updated: u32,
}

pub struct BatchMarkUseCase<L: AttendanceRepository> {
    pub ledger: L,
    pub clock: SharedClock,
}

impl<L: AttendanceRepository> BatchMarkUseCase<L> {
    /// Each entry is an independent upsert. A storage failure stops the batch;
    /// entries already written stay written.
    pub async fn execute(
        &self,
        input: BatchMarkInput,
    ) -> Result<BatchMarkReport, AttendanceServiceError> {
        let recorded_at = self.clock.now();
        let mut report = BatchMarkReport::default();

        for (participant_id, status) in input.entries {
            let record = AttendanceRecord {
                participant_id,
                session_id: input.session_id.clone(),
                date: input.date,
                status,
                recorded_at,
                recorded_by: RecordedBy::Marker(input.marker.clone()),
                location: None,
            };
            match self.ledger.upsert(&record).await? {
                UpsertOutcome::Created => report.created += 1,
                UpsertOutcome::Updated => report.updated += 1,
            }
        }

        info!(
            session_id = %input.session_id,
            date = %input.date,
            created = report.created,
            updated = report.updated,
            "attendance batch marked"
        );
        Ok(report)
    }
}

// ── Roster ───────────────────────────────────────────────────────────────────

pub struct RosterUseCase<L: AttendanceRepository> {
    pub ledger: L,
}

impl<L: AttendanceRepository> RosterUseCase<L> {
    /// Status of every listed participant for `session` on `date`.
    ///
    /// Participants without a record come back as `absent` with `recorded: false`.
    /// With no participants listed, only recorded rows are returned.
    pub async fn execute(
        &self,
        session: &SessionId,
        date: NaiveDate,
        participants: Vec<ParticipantId>,
    ) -> Result<Vec<RosterEntry>, AttendanceServiceError> {
        let records = self.ledger.list_for_session(session, date).await?;

        if participants.is_empty() {
            return Ok(records
                .into_iter()
                .map(|r| RosterEntry {
                    participant_id: r.participant_id,
                    status: r.status,
                    recorded: true,
                })
                .collect());
        }

        let by_participant: HashMap<ParticipantId, AttendanceStatus> = records
            .into_iter()
            .map(|r| (r.participant_id, r.status))
            .collect();

        Ok(participants
            .into_iter()
            .map(|participant_id| match by_participant.get(&participant_id).copied() {
                Some(status) => RosterEntry {
                    participant_id,
                    status,
                    recorded: true,
                },
                None => RosterEntry {
                    participant_id,
                    status: AttendanceStatus::Absent,
                    recorded: false,
                },
            })
            .collect())
    }
}
