use std::time::{SystemTime, UNIX_EPOCH};

use rollcall_auth_types::cookie::ACCESS_TOKEN_EXP;
use rollcall_auth_types::identity::TokenSecret;
use rollcall_auth_types::token::issue_access_token;
use rollcall_domain::role::Role;

use crate::domain::repository::ChallengeRepository;
use crate::error::AttendanceServiceError;
use crate::usecase::otp::{VerifyChallengeInput, VerifyChallengeUseCase};

// Token `exp` is checked against the wall clock by the validator, so it is taken
// from the system clock rather than the injected one.
fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or_default()
}

// ── Login ────────────────────────────────────────────────────────────────────

pub struct LoginInput {
    pub address: String,
    pub code: String,
}

#[derive(Debug)]
pub struct LoginOutput {
    /// Normalized address; becomes the token subject.
    pub subject: String,
    pub role: Role,
    pub access_token: String,
    pub access_token_exp: u64,
}

pub struct LoginUseCase<C: ChallengeRepository> {
    pub verify: VerifyChallengeUseCase<C>,
    pub jwt_secret: TokenSecret,
}

impl<C: ChallengeRepository> LoginUseCase<C> {
    pub async fn execute(&self, input: LoginInput) -> Result<LoginOutput, AttendanceServiceError> {
        let subject = crate::domain::types::normalize_address(&input.address);
        let role = self
            .verify
            .execute(VerifyChallengeInput {
                address: input.address,
                code: input.code,
            })
            .await?;

        let access_token_exp = now_secs() + ACCESS_TOKEN_EXP;
        let access_token =
            issue_access_token(&subject, role, access_token_exp, self.jwt_secret.as_str())
                .map_err(|e| anyhow::Error::new(e).context("sign access token"))?;

        Ok(LoginOutput {
            subject,
            role,
            access_token,
            access_token_exp,
        })
    }
}
