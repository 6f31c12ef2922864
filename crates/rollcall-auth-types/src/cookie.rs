//! Cookie builders for the access token.

use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;

/// Cookie name for the access token.
pub const ROLLCALL_ACCESS_TOKEN: &str = "rollcall_access_token";

/// Access-token JWT lifetime in seconds (4 hours).
pub const ACCESS_TOKEN_EXP: u64 = 14400;

/// Set the access-token cookie on the jar. Max-Age matches the token lifetime.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use rollcall_auth_types::cookie::{set_access_token_cookie, ROLLCALL_ACCESS_TOKEN};
///
/// let jar = set_access_token_cookie(CookieJar::new(), "v".to_string(), "campus.edu".to_string());
/// let cookie = jar.get(ROLLCALL_ACCESS_TOKEN).unwrap();
/// assert_eq!(cookie.path(), Some("/"));
/// assert_eq!(cookie.domain(), Some("campus.edu"));
/// assert_eq!(cookie.max_age(), Some(time::Duration::seconds(14400)));
/// assert!(cookie.http_only().unwrap_or(false));
/// ```
pub fn set_access_token_cookie(jar: CookieJar, value: String, domain: String) -> CookieJar {
    let cookie = Cookie::build((ROLLCALL_ACCESS_TOKEN, value))
        .path("/")
        .domain(domain)
        .max_age(Duration::seconds(ACCESS_TOKEN_EXP as i64))
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}

/// Clear the access-token cookie by setting Max-Age to 0.
///
/// ```
/// use axum_extra::extract::cookie::CookieJar;
/// use rollcall_auth_types::cookie::{clear_access_token_cookie, set_access_token_cookie, ROLLCALL_ACCESS_TOKEN};
///
/// let jar = set_access_token_cookie(CookieJar::new(), "v".to_string(), "campus.edu".to_string());
/// let jar = clear_access_token_cookie(jar, "campus.edu".to_string());
/// assert_eq!(jar.get(ROLLCALL_ACCESS_TOKEN).unwrap().max_age(), Some(time::Duration::ZERO));
/// ```
pub fn clear_access_token_cookie(jar: CookieJar, domain: String) -> CookieJar {
    let cookie = Cookie::build((ROLLCALL_ACCESS_TOKEN, ""))
        .path("/")
        .domain(domain)
        .max_age(Duration::ZERO)
        .http_only(true)
        .secure(true)
        .same_site(SameSite::Lax)
        .build();
    jar.add(cookie)
}
