use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
};
use chrono::Duration;
use serde::{Deserialize, Serialize};

use rollcall_auth_types::identity::Identity;
use rollcall_domain::id::SessionId;

use crate::error::AttendanceServiceError;
use crate::handlers::require_teacher;
use crate::state::AppState;
use crate::usecase::session_code::{
    DeactivateSessionCodeUseCase, IssueSessionCodeInput, IssueSessionCodeUseCase,
    SessionOpenUseCase,
};

// ── POST /sessions/{session_id}/codes ─────────────────────────────────────────

#[derive(Deserialize, Default)]
pub struct IssueSessionCodeRequest {
    /// Code lifetime in seconds; the configured default when omitted.
    pub ttl_secs: Option<i64>,
}

pub async fn issue_session_code(
    State(state): State<AppState>,
    identity: Identity,
    Path(session_id): Path<String>,
    body: Option<Json<IssueSessionCodeRequest>>,
) -> Result<impl IntoResponse, AttendanceServiceError> {
    let issuer_id = require_teacher(&identity)?;
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let usecase = IssueSessionCodeUseCase {
        codes: state.session_code_repo(),
        clock: state.clock.clone(),
        tunables: state.tunables,
    };

    let ttl = match body.ttl_secs {
        Some(secs) => Duration::try_seconds(secs).ok_or(AttendanceServiceError::InvalidTtl {
            min_secs: state.tunables.session_code_min_ttl.num_seconds(),
            max_secs: state.tunables.session_code_max_ttl.num_seconds(),
        })?,
        None => state.tunables.session_code_default_ttl,
    };

    let code = usecase
        .execute(IssueSessionCodeInput {
            session_id: SessionId::new(session_id)?,
            issuer_id,
            ttl,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(code)))
}

// ── DELETE /session-codes/{code} ──────────────────────────────────────────────

pub async fn deactivate_session_code(
    State(state): State<AppState>,
    identity: Identity,
    Path(code): Path<String>,
) -> Result<impl IntoResponse, AttendanceServiceError> {
    let issuer_id = require_teacher(&identity)?;

    let usecase = DeactivateSessionCodeUseCase {
        codes: state.session_code_repo(),
    };
    usecase.execute(&code, &issuer_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ── GET /sessions/{session_id}/status ─────────────────────────────────────────

#[derive(Serialize)]
pub struct SessionStatusResponse {
    pub open: bool,
}

pub async fn session_status(
    State(state): State<AppState>,
    _identity: Identity,
    Path(session_id): Path<String>,
) -> Result<Json<SessionStatusResponse>, AttendanceServiceError> {
    let usecase = SessionOpenUseCase {
        codes: state.session_code_repo(),
        clock: state.clock.clone(),
    };
    let open = usecase.execute(&SessionId::new(session_id)?).await?;
    Ok(Json(SessionStatusResponse { open }))
}
