use chrono::{DateTime, Duration, Utc};
use tracing::{info, warn};

use rollcall_core::clock::SharedClock;
use rollcall_domain::role::Role;

use crate::config::Tunables;
use crate::domain::repository::{ChallengeRepository, OtpNotifier};
use crate::domain::types::{OtpDelivery, VerificationChallenge, normalize_address};
use crate::error::AttendanceServiceError;
use crate::usecase::codegen::generate_otp;

/// Render a TTL the way it appears in the login email, e.g. `"5 minutes"`.
pub fn validity_window_label(ttl: Duration) -> String {
    let secs = ttl.num_seconds();
    match (secs % 60, secs / 60) {
        (0, 1) => "1 minute".to_owned(),
        (0, mins) => format!("{mins} minutes"),
        _ if secs == 1 => "1 second".to_owned(),
        _ => format!("{secs} seconds"),
    }
}

fn normalized(raw: &str) -> Result<String, AttendanceServiceError> {
    let address = normalize_address(raw);
    if address.is_empty() {
        return Err(AttendanceServiceError::InvalidRequest(
            "address must not be empty".to_owned(),
        ));
    }
    Ok(address)
}

// ── IssueChallenge ───────────────────────────────────────────────────────────

pub struct IssueChallengeInput {
    pub address: String,
    pub role: Role,
}

#[derive(Debug)]
pub struct IssuedChallenge {
    pub address: String,
    pub expires_at: DateTime<Utc>,
}

pub struct IssueChallengeUseCase<C, N>
where
    C: ChallengeRepository,
    N: OtpNotifier,
{
    pub challenges: C,
    pub notifier: N,
    pub clock: SharedClock,
    pub tunables: Tunables,
}

impl<C, N> IssueChallengeUseCase<C, N>
where
    C: ChallengeRepository,
    N: OtpNotifier,
{
    pub async fn execute(
        &self,
        input: IssueChallengeInput,
    ) -> Result<IssuedChallenge, AttendanceServiceError> {
        let address = normalized(&input.address)?;
        let code = generate_otp();
        let expires_at = self.clock.now() + self.tunables.otp_ttl;

        // Replaces any outstanding challenge for this address.
        self.challenges
            .put(VerificationChallenge {
                address: address.clone(),
                code: code.clone(),
                role: input.role,
                expires_at,
                attempts_used: 0,
            })
            .await?;

        // Enqueued only after the store write; delivery runs on its own.
        self.notifier.enqueue(OtpDelivery {
            recipient: address.clone(),
            code,
            role: input.role,
            validity_window_label: validity_window_label(self.tunables.otp_ttl),
        });

        info!(role = %input.role, %expires_at, "verification challenge issued");
        Ok(IssuedChallenge {
            address,
            expires_at,
        })
    }
}

// ── VerifyChallenge ──────────────────────────────────────────────────────────

/// Apply one verification attempt to the stored challenge slot.
///
/// Clears the slot on success, expiry and exhaustion. A mismatch that uses up the
/// last attempt clears the slot and reports `AttemptsExhausted`.
pub fn evaluate(
    slot: &mut Option<VerificationChallenge>,
    candidate: &str,
    now: DateTime<Utc>,
    max_attempts: u32,
) -> Result<Role, AttendanceServiceError> {
    let Some(challenge) = slot.as_mut() else {
        return Err(AttendanceServiceError::ChallengeNotFound);
    };

    if challenge.is_expired(now) {
        *slot = None;
        return Err(AttendanceServiceError::ChallengeExpired);
    }

    if challenge.attempts_used >= max_attempts {
        *slot = None;
        return Err(AttendanceServiceError::AttemptsExhausted);
    }

    if challenge.code != candidate {
        challenge.attempts_used += 1;
        if challenge.attempts_used >= max_attempts {
            *slot = None;
            return Err(AttendanceServiceError::AttemptsExhausted);
        }
        return Err(AttendanceServiceError::CodeMismatch {
            remaining: max_attempts - challenge.attempts_used,
        });
    }

    let role = challenge.role;
    *slot = None;
    Ok(role)
}

pub struct VerifyChallengeInput {
    pub address: String,
    pub code: String,
}

pub struct VerifyChallengeUseCase<C: ChallengeRepository> {
    pub challenges: C,
    pub clock: SharedClock,
    pub tunables: Tunables,
}

impl<C: ChallengeRepository> VerifyChallengeUseCase<C> {
    /// Returns the role the challenge was issued for.
    pub async fn execute(&self, input: VerifyChallengeInput) -> Result<Role, AttendanceServiceError> {
        let address = normalized(&input.address)?;
        let candidate = input.code.trim().to_owned();
        let now = self.clock.now();
        let max_attempts = self.tunables.otp_max_attempts;

        let result = self
            .challenges
            .update(&address, move |slot| {
                evaluate(slot, &candidate, now, max_attempts)
            })
            .await?;

        if let Err(AttendanceServiceError::AttemptsExhausted) = &result {
            warn!("verification challenge locked out after repeated mismatches");
        }
        result
    }
}

// ── ChallengeStatus ──────────────────────────────────────────────────────────

pub struct ChallengeStatusUseCase<C: ChallengeRepository> {
    pub challenges: C,
    pub clock: SharedClock,
}

impl<C: ChallengeRepository> ChallengeStatusUseCase<C> {
    /// Whether a live, unexpired challenge is waiting for `address`.
    pub async fn execute(&self, address: &str) -> Result<bool, AttendanceServiceError> {
        let address = normalized(address)?;
        let now = self.clock.now();
        let challenge = self.challenges.find(&address).await?;
        Ok(challenge.is_some_and(|c| !c.is_expired(now)))
    }
}
