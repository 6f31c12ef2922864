use axum::http::StatusCode;

/// Handler for `GET /healthz`. Liveness only; services expose their own `/readyz`.
pub async fn healthz() -> StatusCode {
    StatusCode::OK
}
