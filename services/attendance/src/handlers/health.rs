use axum::{Json, extract::State};
use serde::Serialize;

use crate::domain::repository::{
    AttendanceRepository, ChallengeRepository, SessionCodeRepository,
};
use crate::error::AttendanceServiceError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ReadyResponse {
    pub pending_challenges: u64,
    pub active_session_codes: u64,
    pub attendance_records: u64,
}

/// `GET /readyz`. Fails with `STORAGE_ERROR` when any store is unreachable.
pub async fn readyz(
    State(state): State<AppState>,
) -> Result<Json<ReadyResponse>, AttendanceServiceError> {
    Ok(Json(ReadyResponse {
        pending_challenges: state.challenge_repo().count().await?,
        active_session_codes: state.session_code_repo().count_active().await?,
        attendance_records: state.ledger_repo().count().await?,
    }))
}
