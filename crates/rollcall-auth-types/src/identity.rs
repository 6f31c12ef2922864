//! Access-token identity extractor.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts};
use axum_extra::extract::cookie::CookieJar;
use http::request::Parts;
use http::{HeaderMap, StatusCode, header::AUTHORIZATION};

use rollcall_domain::role::Role;

use crate::cookie::ROLLCALL_ACCESS_TOKEN;
use crate::token::validate_access_token;

/// HMAC secret used to validate access tokens. Provide it from the router state
/// with a `FromRef` impl.
#[derive(Clone)]
pub struct TokenSecret(Arc<str>);

impl TokenSecret {
    pub fn new(secret: impl Into<String>) -> Self {
        Self(Arc::from(secret.into()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for TokenSecret {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("TokenSecret(..)")
    }
}

/// Caller identity taken from a validated access token.
///
/// The token is read from `Authorization: Bearer …` first, then from the
/// access-token cookie. Returns 401 when neither is present or the token does not
/// validate. Role enforcement (403) is done by handlers after extraction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub subject: String,
    pub role: Role,
}

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.trim().to_owned())
        .filter(|t| !t.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<String> {
    CookieJar::from_headers(headers)
        .get(ROLLCALL_ACCESS_TOKEN)
        .map(|c| c.value().to_owned())
        .filter(|t| !t.is_empty())
}

impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
    TokenSecret: FromRef<S>,
{
    type Rejection = StatusCode;

    // Resolve synchronously and hand back a 'static future so the returned future
    // does not capture `parts`.
    fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        let secret = TokenSecret::from_ref(state);
        let result = bearer_token(&parts.headers)
            .or_else(|| cookie_token(&parts.headers))
            .ok_or(StatusCode::UNAUTHORIZED)
            .and_then(|token| {
                validate_access_token(&token, secret.as_str())
                    .map_err(|_| StatusCode::UNAUTHORIZED)
            })
            .map(|info| Identity {
                subject: info.subject,
                role: info.role,
            });

        async move { result }
    }
}
