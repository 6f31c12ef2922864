use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use rollcall_domain::attendance::{InvalidGeoPointError, InvertedDateRangeError};
use rollcall_domain::id::EmptyIdError;

/// Attendance service error variants.
#[derive(Debug, thiserror::Error)]
pub enum AttendanceServiceError {
    // OTP path
    #[error("no verification code is pending for this address")]
    ChallengeNotFound,
    #[error("verification code expired")]
    ChallengeExpired,
    #[error("too many incorrect attempts, request a new code")]
    AttemptsExhausted,
    #[error("incorrect code, {remaining} attempt(s) remaining")]
    CodeMismatch { remaining: u32 },

    // Session-code path
    #[error("invalid or expired code")]
    InvalidOrExpiredCode,
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("code lifetime must be between {min_secs} and {max_secs} seconds")]
    InvalidTtl { min_secs: i64, max_secs: i64 },
    #[error("session code not found")]
    SessionCodeNotFound,

    // Request validation
    #[error("invalid geolocation")]
    InvalidGeolocation,
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    // Access
    #[error("invalid token")]
    InvalidToken,
    #[error("forbidden")]
    Forbidden,

    #[error("storage error")]
    Storage(#[from] anyhow::Error),
}

impl AttendanceServiceError {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ChallengeNotFound => "CHALLENGE_NOT_FOUND",
            Self::ChallengeExpired => "CHALLENGE_EXPIRED",
            Self::AttemptsExhausted => "ATTEMPTS_EXHAUSTED",
            Self::CodeMismatch { .. } => "CODE_MISMATCH",
            Self::InvalidOrExpiredCode => "INVALID_OR_EXPIRED_CODE",
            Self::MalformedInput(_) => "MALFORMED_INPUT",
            Self::InvalidTtl { .. } => "INVALID_TTL",
            Self::SessionCodeNotFound => "SESSION_CODE_NOT_FOUND",
            Self::InvalidGeolocation => "INVALID_GEOLOCATION",
            Self::InvalidRequest(_) => "INVALID_REQUEST",
            Self::InvalidToken => "INVALID_TOKEN",
            Self::Forbidden => "FORBIDDEN",
            Self::Storage(_) => "STORAGE_ERROR",
        }
    }
}

impl From<EmptyIdError> for AttendanceServiceError {
    fn from(e: EmptyIdError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

impl From<InvalidGeoPointError> for AttendanceServiceError {
    fn from(_: InvalidGeoPointError) -> Self {
        Self::InvalidGeolocation
    }
}

impl From<InvertedDateRangeError> for AttendanceServiceError {
    fn from(e: InvertedDateRangeError) -> Self {
        Self::InvalidRequest(e.to_string())
    }
}

impl IntoResponse for AttendanceServiceError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::ChallengeNotFound | Self::SessionCodeNotFound => StatusCode::NOT_FOUND,
            Self::ChallengeExpired => StatusCode::GONE,
            Self::AttemptsExhausted => StatusCode::TOO_MANY_REQUESTS,
            Self::CodeMismatch { .. } | Self::InvalidToken => StatusCode::UNAUTHORIZED,
            Self::InvalidOrExpiredCode
            | Self::MalformedInput(_)
            | Self::InvalidTtl { .. }
            | Self::InvalidGeolocation
            | Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        // TraceLayer already records every status; only storage failures carry a
        // cause worth logging here.
        if let Self::Storage(ref e) = self {
            tracing::error!(error = format!("{e:#}"), kind = "STORAGE_ERROR", "storage error");
        }
        let mut body = serde_json::json!({
            "kind": self.kind(),
            "message": self.to_string(),
        });
        if let Self::CodeMismatch { remaining } = &self {
            body["remaining_attempts"] = (*remaining).into();
        }
        (status, axum::Json(body)).into_response()
    }
}
