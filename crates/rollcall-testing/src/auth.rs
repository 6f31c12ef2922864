//! Mock identities for integration tests.
//!
//! Services validate real access tokens, so `MockIdentity` signs one with the test
//! secret instead of stubbing the extractor.

use axum::http::{HeaderMap, HeaderValue, header::AUTHORIZATION};
use rollcall_auth_types::token::issue_access_token;
use rollcall_domain::role::Role;

/// Secret shared by test routers and the tokens minted here.
pub const TEST_JWT_SECRET: &str = "rollcall-test-secret";

/// Configurable identity injected into test requests.
pub struct MockIdentity {
    pub subject: String,
    pub role: Role,
}

impl MockIdentity {
    pub fn new(subject: impl Into<String>, role: Role) -> Self {
        Self {
            subject: subject.into(),
            role,
        }
    }

    pub fn student(subject: impl Into<String>) -> Self {
        Self::new(subject, Role::Student)
    }

    pub fn teacher(subject: impl Into<String>) -> Self {
        Self::new(subject, Role::Teacher)
    }

    pub fn parent(subject: impl Into<String>) -> Self {
        Self::new(subject, Role::Parent)
    }

    /// Signed access token valid for an hour past the wall clock.
    pub fn token(&self) -> String {
        let exp = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs()
            + 3600;
        issue_access_token(&self.subject, self.role, exp, TEST_JWT_SECRET).unwrap()
    }

    /// Headers carrying the token as a bearer credential.
    pub fn headers(&self) -> HeaderMap {
        let mut map = HeaderMap::new();
        map.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {}", self.token())).unwrap(),
        );
        map
    }
}
