//! JWT access tokens carrying the login role.

use jsonwebtoken::{DecodingKey, Validation, decode};
#[cfg(any(feature = "ISSUE_TOKENS", test))]
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Deserialize;
#[cfg(any(feature = "ISSUE_TOKENS", test))]
use serde::Serialize;

use rollcall_domain::role::Role;

/// Identity extracted from a validated access token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenInfo {
    /// Verified address (or participant id) the token was issued to.
    pub subject: String,
    pub role: Role,
    pub access_token_exp: u64,
}

/// Errors returned by token issuing and validation.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid signature")]
    InvalidSignature,
    #[error("token expired")]
    Expired,
    #[error("malformed token")]
    Malformed,
    #[error("unknown role {0}")]
    UnknownRole(u8),
    #[error("failed to sign token")]
    Signing,
}

/// JWT claims payload.
///
/// | Field | JWT claim | Rust type | Meaning |
/// |-------|-----------|-----------|---------|
/// | `sub` | `sub` | string | verified address |
/// | `role` | custom | `u8` wire value | see [`Role`] |
/// | `exp` | `exp` | seconds since epoch | token expiration |
///
/// [`Serialize`] requires the **`ISSUE_TOKENS`** cargo feature; only the service that
/// verifies OTP challenges mints tokens.
#[derive(Debug, Deserialize)]
#[cfg_attr(any(feature = "ISSUE_TOKENS", test), derive(Serialize))]
pub struct JwtClaims {
    pub sub: String,
    pub role: u8,
    pub exp: u64,
}

/// Decode and validate a JWT (HS256, `exp` checked, `exp` + `sub` required).
fn decode_jwt(token: &str, secret: &str) -> Result<JwtClaims, AuthError> {
    let mut validation = Validation::new(jsonwebtoken::Algorithm::HS256);
    validation.validate_exp = true;
    validation.required_spec_claims.clear();
    validation.set_required_spec_claims(&["exp", "sub"]);

    let data = decode::<JwtClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|e| match e.kind() {
        jsonwebtoken::errors::ErrorKind::ExpiredSignature => AuthError::Expired,
        jsonwebtoken::errors::ErrorKind::InvalidSignature => AuthError::InvalidSignature,
        _ => AuthError::Malformed,
    })?;

    Ok(data.claims)
}

/// Validate an access token, returning the identity it carries.
pub fn validate_access_token(token: &str, secret: &str) -> Result<TokenInfo, AuthError> {
    let claims = decode_jwt(token, secret)?;
    let role = Role::from_u8(claims.role).ok_or(AuthError::UnknownRole(claims.role))?;
    Ok(TokenInfo {
        subject: claims.sub,
        role,
        access_token_exp: claims.exp,
    })
}

/// Sign an access token for `subject` expiring at `exp` (seconds since epoch).
#[cfg(any(feature = "ISSUE_TOKENS", test))]
pub fn issue_access_token(
    subject: &str,
    role: Role,
    exp: u64,
    secret: &str,
) -> Result<String, AuthError> {
    let claims = JwtClaims {
        sub: subject.to_owned(),
        role: role.as_u8(),
        exp,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .map_err(|_| AuthError::Signing)
}
