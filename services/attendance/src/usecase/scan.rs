use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::Serialize;
use tracing::{error, info};

use rollcall_core::clock::SharedClock;
use rollcall_domain::attendance::{AttendanceStatus, GeoPoint, RecordedBy};
use rollcall_domain::id::{ParticipantId, SessionId};

use crate::config::Tunables;
use crate::domain::repository::{AttendanceRepository, SessionCodeRepository};
use crate::domain::types::{
    AttendanceRecord, DecodedInput, ScanPayload, UpsertOutcome, is_session_code_shape,
    normalize_session_code,
};
use crate::error::AttendanceServiceError;
use crate::usecase::session_code::resolve_code;

/// Interpret a raw scanned or typed string.
///
/// Text starting with `{` must be a complete JSON payload; anything else must be
/// a bare 8-character session code once trimmed.
pub fn classify(raw: &str) -> Result<DecodedInput, AttendanceServiceError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(AttendanceServiceError::MalformedInput(
            "input is empty".to_owned(),
        ));
    }

    if trimmed.starts_with('{') {
        let payload: ScanPayload = serde_json::from_str(trimmed).map_err(|e| {
            AttendanceServiceError::MalformedInput(format!("unreadable payload: {e}"))
        })?;
        if payload.class_id.trim().is_empty() {
            return Err(AttendanceServiceError::MalformedInput(
                "payload has an empty classId".to_owned(),
            ));
        }
        return Ok(DecodedInput::Payload(payload));
    }

    let code = normalize_session_code(trimmed);
    if is_session_code_shape(&code) {
        Ok(DecodedInput::BareCode(code))
    } else {
        Err(AttendanceServiceError::MalformedInput(
            "expected a session payload or an 8-character code".to_owned(),
        ))
    }
}

/// Reject payloads generated more than `window_ms` before `now_ms`, or claiming
/// to come from more than `window_ms` in the future.
pub fn check_freshness(
    payload: &ScanPayload,
    now_ms: i64,
    window_ms: i64,
) -> Result<(), AttendanceServiceError> {
    let age = now_ms.saturating_sub(payload.timestamp);
    if age > window_ms || age < -window_ms {
        return Err(AttendanceServiceError::InvalidOrExpiredCode);
    }
    Ok(())
}

/// Calendar date of `now` on the campus clock.
pub fn attendance_date(now: DateTime<Utc>, offset: FixedOffset) -> NaiveDate {
    now.with_timezone(&offset).date_naive()
}

// ── PresentInput ─────────────────────────────────────────────────────────────

pub struct PresentInput {
    pub participant_id: ParticipantId,
    pub raw: String,
    pub location: Option<GeoPoint>,
}

#[derive(Debug, Serialize)]
pub struct Presence {
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub recorded_by: RecordedBy,
    pub outcome: UpsertOutcome,
}

pub struct PresentInputUseCase<S, L>
where
    S: SessionCodeRepository,
    L: AttendanceRepository,
{
    pub codes: S,
    pub ledger: L,
    pub clock: SharedClock,
    pub tunables: Tunables,
}

impl<S, L> PresentInputUseCase<S, L>
where
    S: SessionCodeRepository,
    L: AttendanceRepository,
{
    /// Classify `raw`, resolve it to a session and record the participant present.
    pub async fn execute(&self, input: PresentInput) -> Result<Presence, AttendanceServiceError> {
        let now = self.clock.now();

        let (session_id, recorded_by, code) = match classify(&input.raw)? {
            DecodedInput::Payload(payload) => {
                check_freshness(
                    &payload,
                    now.timestamp_millis(),
                    self.tunables.payload_freshness.num_milliseconds(),
                )?;
                let session_id = SessionId::new(payload.class_id)?;
                // A payload names its session directly; it is only honoured while
                // that session has a live code.
                if !self.codes.has_presentable(&session_id, now).await? {
                    return Err(AttendanceServiceError::InvalidOrExpiredCode);
                }
                (session_id, RecordedBy::Scan, None)
            }
            DecodedInput::BareCode(raw_code) => {
                let validated = resolve_code(&self.codes, &raw_code, now).await?;
                (validated.session_id, RecordedBy::ShortCode, Some(validated.code))
            }
        };

        let record = AttendanceRecord {
            participant_id: input.participant_id,
            session_id,
            date: attendance_date(now, self.tunables.campus_offset),
            status: AttendanceStatus::Present,
            recorded_at: now,
            recorded_by,
            location: input.location,
        };

        let outcome = match self.ledger.upsert(&record).await {
            Ok(outcome) => outcome,
            Err(e) => {
                // The code was accepted but nothing was recorded. Not retried.
                error!(
                    code = code.as_deref().unwrap_or("-"),
                    session_id = %record.session_id,
                    participant_id = %record.participant_id,
                    error = ?e,
                    "presence accepted but attendance write failed"
                );
                return Err(e);
            }
        };

        info!(
            session_id = %record.session_id,
            participant_id = %record.participant_id,
            recorded_by = %record.recorded_by,
            ?outcome,
            "presence recorded"
        );
        Ok(Presence {
            session_id: record.session_id,
            date: record.date,
            status: record.status,
            recorded_by: record.recorded_by,
            outcome,
        })
    }
}
