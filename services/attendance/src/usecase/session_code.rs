use anyhow::anyhow;
use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info, warn};

use rollcall_core::clock::SharedClock;
use rollcall_domain::id::{IssuerId, SessionId};

use crate::config::Tunables;
use crate::domain::repository::SessionCodeRepository;
use crate::domain::types::{
    SessionCode, ValidatedCode, is_session_code_shape, normalize_session_code,
};
use crate::error::AttendanceServiceError;
use crate::usecase::codegen::generate_session_code;

/// Fresh codes drawn before giving up on finding an unused one.
const MAX_GENERATION_ATTEMPTS: usize = 8;

// ── IssueSessionCode ─────────────────────────────────────────────────────────

pub struct IssueSessionCodeInput {
    pub session_id: SessionId,
    pub issuer_id: IssuerId,
    pub ttl: Duration,
}

pub struct IssueSessionCodeUseCase<S: SessionCodeRepository> {
    pub codes: S,
    pub clock: SharedClock,
    pub tunables: Tunables,
}

impl<S: SessionCodeRepository> IssueSessionCodeUseCase<S> {
    pub async fn execute(
        &self,
        input: IssueSessionCodeInput,
    ) -> Result<SessionCode, AttendanceServiceError> {
        let (min, max) = (
            self.tunables.session_code_min_ttl,
            self.tunables.session_code_max_ttl,
        );
        if input.ttl < min || input.ttl > max {
            return Err(AttendanceServiceError::InvalidTtl {
                min_secs: min.num_seconds(),
                max_secs: max.num_seconds(),
            });
        }

        let issued_at = self.clock.now();
        for _ in 0..MAX_GENERATION_ATTEMPTS {
            let code = SessionCode {
                code: generate_session_code(),
                session_id: input.session_id.clone(),
                issuer_id: input.issuer_id.clone(),
                issued_at,
                expires_at: issued_at + input.ttl,
                active: true,
            };
            if self.codes.insert_if_absent(&code).await? {
                info!(
                    session_id = %code.session_id,
                    issuer_id = %code.issuer_id,
                    expires_at = %code.expires_at,
                    "session code issued"
                );
                return Ok(code);
            }
            debug!("session code collision, regenerating");
        }

        Err(anyhow!("no unused session code after {MAX_GENERATION_ATTEMPTS} attempts").into())
    }
}

// ── ValidateSessionCode ──────────────────────────────────────────────────────

pub struct ValidateSessionCodeUseCase<S: SessionCodeRepository> {
    pub codes: S,
    pub clock: SharedClock,
}

impl<S: SessionCodeRepository> ValidateSessionCodeUseCase<S> {
    pub async fn execute(&self, raw: &str) -> Result<ValidatedCode, AttendanceServiceError> {
        resolve_code(&self.codes, raw, self.clock.now()).await
    }
}

/// Resolve a presented code to its session.
///
/// Unknown, inactive and expired codes are indistinguishable to the caller. An
/// expired code still marked active is deactivated on the spot.
pub async fn resolve_code<S: SessionCodeRepository>(
    codes: &S,
    raw: &str,
    now: DateTime<Utc>,
) -> Result<ValidatedCode, AttendanceServiceError> {
    let code = normalize_session_code(raw);
    if !is_session_code_shape(&code) {
        return Err(AttendanceServiceError::InvalidOrExpiredCode);
    }

    let stored = codes
        .find(&code)
        .await?
        .ok_or(AttendanceServiceError::InvalidOrExpiredCode)?;

    if !stored.active {
        return Err(AttendanceServiceError::InvalidOrExpiredCode);
    }

    if stored.is_expired(now) {
        codes.deactivate(&code).await?;
        debug!(session_id = %stored.session_id, "expired session code deactivated on use");
        return Err(AttendanceServiceError::InvalidOrExpiredCode);
    }

    Ok(ValidatedCode {
        code,
        session_id: stored.session_id,
        issuer_id: stored.issuer_id,
    })
}

// ── DeactivateSessionCode ────────────────────────────────────────────────────

pub struct DeactivateSessionCodeUseCase<S: SessionCodeRepository> {
    pub codes: S,
}

impl<S: SessionCodeRepository> DeactivateSessionCodeUseCase<S> {
    /// Revoke `code`. Only the issuer may revoke; revoking twice is a no-op.
    pub async fn execute(
        &self,
        raw: &str,
        issuer: &IssuerId,
    ) -> Result<(), AttendanceServiceError> {
        let code = normalize_session_code(raw);
        let stored = self
            .codes
            .find(&code)
            .await?
            .ok_or(AttendanceServiceError::SessionCodeNotFound)?;

        if &stored.issuer_id != issuer {
            warn!(
                session_id = %stored.session_id,
                requested_by = %issuer,
                "session code revocation refused for non-issuer"
            );
            return Err(AttendanceServiceError::Forbidden);
        }

        if self.codes.deactivate(&code).await? {
            info!(session_id = %stored.session_id, "session code revoked");
        }
        Ok(())
    }
}

// ── SessionOpen ──────────────────────────────────────────────────────────────

pub struct SessionOpenUseCase<S: SessionCodeRepository> {
    pub codes: S,
    pub clock: SharedClock,
}

impl<S: SessionCodeRepository> SessionOpenUseCase<S> {
    /// Whether `session` currently has a presentable code.
    pub async fn execute(&self, session: &SessionId) -> Result<bool, AttendanceServiceError> {
        self.codes.has_presentable(session, self.clock.now()).await
    }
}
