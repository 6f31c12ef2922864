use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use axum_extra::extract::CookieJar;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use rollcall_auth_types::cookie::{clear_access_token_cookie, set_access_token_cookie};
use rollcall_domain::role::Role;

use crate::error::AttendanceServiceError;
use crate::state::AppState;
use crate::usecase::otp::{
    ChallengeStatusUseCase, IssueChallengeInput, IssueChallengeUseCase, VerifyChallengeUseCase,
};
use crate::usecase::token::{LoginInput, LoginUseCase};

// ── POST /auth/otp ────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct IssueOtpRequest {
    pub address: String,
    pub role: Role,
}

#[derive(Serialize)]
pub struct IssueOtpResponse {
    pub address: String,
    #[serde(serialize_with = "rollcall_core::serde::to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
}

pub async fn issue_otp(
    State(state): State<AppState>,
    Json(body): Json<IssueOtpRequest>,
) -> Result<impl IntoResponse, AttendanceServiceError> {
    let usecase = IssueChallengeUseCase {
        challenges: state.challenge_repo(),
        notifier: state.notifier.clone(),
        clock: state.clock.clone(),
        tunables: state.tunables,
    };

    let issued = usecase
        .execute(IssueChallengeInput {
            address: body.address,
            role: body.role,
        })
        .await?;

    Ok((
        StatusCode::ACCEPTED,
        Json(IssueOtpResponse {
            address: issued.address,
            expires_at: issued.expires_at,
        }),
    ))
}

// ── GET /auth/otp ─────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct OtpStatusQuery {
    pub address: String,
}

#[derive(Serialize)]
pub struct OtpStatusResponse {
    pub pending: bool,
}

pub async fn otp_status(
    State(state): State<AppState>,
    Query(query): Query<OtpStatusQuery>,
) -> Result<Json<OtpStatusResponse>, AttendanceServiceError> {
    let usecase = ChallengeStatusUseCase {
        challenges: state.challenge_repo(),
        clock: state.clock.clone(),
    };
    let pending = usecase.execute(&query.address).await?;
    Ok(Json(OtpStatusResponse { pending }))
}

// ── POST /auth/otp/verify ─────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct VerifyOtpRequest {
    pub address: String,
    pub code: String,
}

#[derive(Serialize)]
pub struct VerifyOtpResponse {
    pub subject: String,
    pub role: Role,
    pub access_token: String,
    pub access_token_exp: u64,
}

pub async fn verify_otp(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(body): Json<VerifyOtpRequest>,
) -> Result<impl IntoResponse, AttendanceServiceError> {
    let usecase = LoginUseCase {
        verify: VerifyChallengeUseCase {
            challenges: state.challenge_repo(),
            clock: state.clock.clone(),
            tunables: state.tunables,
        },
        jwt_secret: state.jwt_secret.clone(),
    };

    let out = usecase
        .execute(LoginInput {
            address: body.address,
            code: body.code,
        })
        .await?;

    let jar = set_access_token_cookie(
        jar,
        out.access_token.clone(),
        state.cookie_domain.clone(),
    );

    Ok((
        StatusCode::OK,
        jar,
        Json(VerifyOtpResponse {
            subject: out.subject,
            role: out.role,
            access_token: out.access_token,
            access_token_exp: out.access_token_exp,
        }),
    ))
}

// ── DELETE /auth/token ────────────────────────────────────────────────────────

pub async fn logout(State(state): State<AppState>, jar: CookieJar) -> impl IntoResponse {
    (
        StatusCode::NO_CONTENT,
        clear_access_token_cookie(jar, state.cookie_domain.clone()),
    )
}
