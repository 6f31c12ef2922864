use axum::{
    Router,
    routing::{delete, get, post, put},
};

use rollcall_core::health::healthz;
use rollcall_core::middleware::{propagate_request_id_layer, request_id_layer, trace_layer};

use crate::handlers::{
    attendance::{
        aggregate, batch_mark, my_attendance, participant_attendance, present, roster,
        upsert_attendance,
    },
    health::readyz,
    otp::{issue_otp, logout, otp_status, verify_otp},
    session_code::{deactivate_session_code, issue_session_code, session_status},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // OTP login
        .route("/auth/otp", post(issue_otp))
        .route("/auth/otp", get(otp_status))
        .route("/auth/otp/verify", post(verify_otp))
        .route("/auth/token", delete(logout))
        // Session codes
        .route("/sessions/{session_id}/codes", post(issue_session_code))
        .route("/sessions/{session_id}/status", get(session_status))
        .route("/session-codes/{code}", delete(deactivate_session_code))
        // Attendance
        .route("/attendance/scan", post(present))
        .route("/attendance", put(upsert_attendance))
        .route("/attendance/@me", get(my_attendance))
        .route(
            "/sessions/{session_id}/attendance/batch",
            post(batch_mark),
        )
        .route("/sessions/{session_id}/roster", get(roster))
        .route(
            "/participants/{participant_id}/attendance",
            get(participant_attendance),
        )
        .route(
            "/participants/{participant_id}/sessions/{session_id}/aggregate",
            get(aggregate),
        )
        .layer(trace_layer())
        .layer(propagate_request_id_layer())
        .layer(request_id_layer())
        .with_state(state)
}
