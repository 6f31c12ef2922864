use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use rollcall_auth_types::identity::Identity;
use rollcall_domain::attendance::{AttendanceStatus, DateRange, GeoPoint, RecordedBy};
use rollcall_domain::id::{ParticipantId, SessionId};
use rollcall_domain::role::Role;

use crate::domain::types::{
    AttendanceRecord, GOOD_STANDING_PERCENT, RosterEntry, Standing, UpsertOutcome,
};
use crate::error::AttendanceServiceError;
use crate::handlers::{require_teacher, require_viewer};
use crate::state::AppState;
use crate::usecase::ledger::{
    AggregateAttendanceUseCase, BatchMarkInput, BatchMarkReport, BatchMarkUseCase,
    QueryAttendanceInput, QueryAttendanceUseCase, RecordAttendanceInput,
    RecordAttendanceUseCase, RosterUseCase,
};
use crate::usecase::scan::{Presence, PresentInput, PresentInputUseCase};

fn location(
    latitude: Option<f64>,
    longitude: Option<f64>,
) -> Result<Option<GeoPoint>, AttendanceServiceError> {
    match (latitude, longitude) {
        (Some(lat), Some(lon)) => Ok(Some(GeoPoint::new(lat, lon)?)),
        (None, None) => Ok(None),
        _ => Err(AttendanceServiceError::InvalidGeolocation),
    }
}

fn outcome_status(outcome: UpsertOutcome) -> StatusCode {
    match outcome {
        UpsertOutcome::Created => StatusCode::CREATED,
        UpsertOutcome::Updated => StatusCode::OK,
    }
}

// ── POST /attendance/scan ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct ScanRequest {
    /// Raw decoded QR text or a typed session code.
    pub input: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

pub async fn present(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<ScanRequest>,
) -> Result<(StatusCode, Json<Presence>), AttendanceServiceError> {
    if identity.role != Role::Student {
        return Err(AttendanceServiceError::Forbidden);
    }

    let usecase = PresentInputUseCase {
        codes: state.session_code_repo(),
        ledger: state.ledger_repo(),
        clock: state.clock.clone(),
        tunables: state.tunables,
    };

    let presence = usecase
        .execute(PresentInput {
            participant_id: ParticipantId::new(identity.subject)?,
            raw: body.input,
            location: location(body.latitude, body.longitude)?,
        })
        .await?;

    Ok((outcome_status(presence.outcome), Json(presence)))
}

// ── PUT /attendance ───────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct UpsertAttendanceRequest {
    pub participant_id: String,
    pub session_id: String,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Serialize)]
pub struct UpsertAttendanceResponse {
    pub outcome: UpsertOutcome,
}

pub async fn upsert_attendance(
    State(state): State<AppState>,
    identity: Identity,
    Json(body): Json<UpsertAttendanceRequest>,
) -> Result<impl IntoResponse, AttendanceServiceError> {
    let marker = require_teacher(&identity)?;

    let usecase = RecordAttendanceUseCase {
        ledger: state.ledger_repo(),
        clock: state.clock.clone(),
    };

    let outcome = usecase
        .execute(RecordAttendanceInput {
            participant_id: ParticipantId::new(body.participant_id)?,
            session_id: SessionId::new(body.session_id)?,
            date: body.date,
            status: body.status,
            recorded_by: RecordedBy::Marker(marker.into_inner()),
            location: location(body.latitude, body.longitude)?,
        })
        .await?;

    Ok((
        outcome_status(outcome),
        Json(UpsertAttendanceResponse { outcome }),
    ))
}

// ── POST /sessions/{session_id}/attendance/batch ──────────────────────────────

#[derive(Deserialize)]
pub struct BatchEntry {
    pub participant_id: String,
    pub status: AttendanceStatus,
}

#[derive(Deserialize)]
pub struct BatchMarkRequest {
    pub date: NaiveDate,
    pub entries: Vec<BatchEntry>,
}

pub async fn batch_mark(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Json(body): Json<BatchMarkRequest>,
) -> Result<Json<BatchMarkReport>, AttendanceServiceError> {
    let marker = require_teacher(&identity)?;

    let entries = body
        .entries
        .into_iter()
        .map(|e| Ok((ParticipantId::new(e.participant_id)?, e.status)))
        .collect::<Result<Vec<_>, AttendanceServiceError>>()?;

    let usecase = BatchMarkUseCase {
        ledger: state.ledger_repo(),
        clock: state.clock.clone(),
    };

    let report = usecase
        .execute(BatchMarkInput {
            session_id: SessionId::new(session_id)?,
            date: body.date,
            entries,
            marker: marker.into_inner(),
        })
        .await?;

    Ok(Json(report))
}

// ── GET /attendance/@me, GET /participants/{participant_id}/attendance ────────

#[derive(Deserialize)]
pub struct AttendanceQuery {
    pub session: Option<String>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

async fn list_attendance(
    state: &AppState,
    participant_id: ParticipantId,
    query: AttendanceQuery,
) -> Result<Vec<AttendanceRecord>, AttendanceServiceError> {
    let usecase = QueryAttendanceUseCase {
        ledger: state.ledger_repo(),
    };
    usecase
        .execute(QueryAttendanceInput {
            participant_id,
            session_id: query.session.map(SessionId::new).transpose()?,
            range: DateRange::new(query.from, query.to)?,
        })
        .await
}

pub async fn my_attendance(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AttendanceServiceError> {
    let participant_id = ParticipantId::new(identity.subject)?;
    Ok(Json(list_attendance(&state, participant_id, query).await?))
}

pub async fn participant_attendance(
    State(state): State<AppState>,
    identity: Identity,
    Path(participant_id): Path<String>,
    Query(query): Query<AttendanceQuery>,
) -> Result<Json<Vec<AttendanceRecord>>, AttendanceServiceError> {
    let participant_id = ParticipantId::new(participant_id)?;
    require_viewer(&identity, &participant_id)?;
    Ok(Json(list_attendance(&state, participant_id, query).await?))
}

// ── GET /participants/{participant_id}/sessions/{session_id}/aggregate ────────

#[derive(Deserialize)]
pub struct AggregateQuery {
    /// Target percentage for the needed/missable projections.
    pub target: Option<f64>,
}

#[derive(Serialize)]
pub struct AggregateResponse {
    pub total: u32,
    pub present_like: u32,
    pub excused: u32,
    pub percentage: f64,
    pub standing: Standing,
    pub target: f64,
    pub classes_needed: Option<u32>,
    pub classes_missable: Option<u32>,
}

pub async fn aggregate(
    State(state): State<AppState>,
    identity: Identity,
    Path((participant_id, session_id)): Path<(String, String)>,
    Query(query): Query<AggregateQuery>,
) -> Result<Json<AggregateResponse>, AttendanceServiceError> {
    let participant_id = ParticipantId::new(participant_id)?;
    require_viewer(&identity, &participant_id)?;

    let target = query.target.unwrap_or(GOOD_STANDING_PERCENT);
    if !(0.0..=100.0).contains(&target) {
        return Err(AttendanceServiceError::InvalidRequest(
            "target must be between 0 and 100".to_owned(),
        ));
    }

    let usecase = AggregateAttendanceUseCase {
        ledger: state.ledger_repo(),
    };
    let agg = usecase
        .execute(&participant_id, &SessionId::new(session_id)?)
        .await?;

    Ok(Json(AggregateResponse {
        total: agg.total,
        present_like: agg.present_like,
        excused: agg.excused,
        percentage: agg.percentage(),
        standing: agg.standing(),
        target,
        classes_needed: agg.classes_needed(target),
        classes_missable: agg.classes_missable(target),
    }))
}

// ── GET /sessions/{session_id}/roster ─────────────────────────────────────────

#[derive(Deserialize)]
pub struct RosterQuery {
    pub date: NaiveDate,
    /// Comma-separated participant ids expected in the session.
    pub participants: Option<String>,
}

pub async fn roster(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    Query(query): Query<RosterQuery>,
) -> Result<Json<Vec<RosterEntry>>, AttendanceServiceError> {
    require_teacher(&identity)?;

    let participants = query
        .participants
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .filter(|p| !p.trim().is_empty())
        .map(ParticipantId::new)
        .collect::<Result<Vec<_>, _>>()?;

    let usecase = RosterUseCase {
        ledger: state.ledger_repo(),
    };
    let entries = usecase
        .execute(&SessionId::new(session_id)?, query.date, participants)
        .await?;

    Ok(Json(entries))
}
