use chrono::{Duration, FixedOffset, Offset, Utc};

use rollcall_core::config::{ConfigError, optional, parse_or, required};

/// Timing and policy knobs shared by the use cases.
#[derive(Debug, Clone, Copy)]
pub struct Tunables {
    pub otp_ttl: Duration,
    pub otp_max_attempts: u32,
    pub session_code_default_ttl: Duration,
    pub session_code_min_ttl: Duration,
    pub session_code_max_ttl: Duration,
    /// How old (or how far in the future) a scanned payload may be.
    pub payload_freshness: Duration,
    pub sweep_interval: std::time::Duration,
    /// Campus timezone; attendance dates are taken in this offset.
    pub campus_offset: FixedOffset,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            otp_ttl: Duration::minutes(5),
            otp_max_attempts: 3,
            session_code_default_ttl: Duration::minutes(1),
            session_code_min_ttl: Duration::minutes(1),
            session_code_max_ttl: Duration::minutes(15),
            payload_freshness: Duration::seconds(60),
            sweep_interval: std::time::Duration::from_secs(60),
            campus_offset: Utc.fix(),
        }
    }
}

/// Attendance service configuration loaded from environment variables.
#[derive(Debug)]
pub struct AttendanceConfig {
    /// TCP port to listen on (default 3120). Env var: `ATTENDANCE_PORT`.
    pub port: u16,
    /// HMAC secret for signing access tokens.
    pub jwt_secret: String,
    /// Cookie domain attribute (root domain, e.g. "campus.edu").
    pub cookie_domain: String,
    /// PostgreSQL URL. Session codes and the ledger stay in memory when unset.
    pub database_url: Option<String>,
    /// Email API endpoint. OTP deliveries are only logged when unset.
    pub email_api_url: Option<String>,
    pub email_api_key: Option<String>,
    /// Pending OTP deliveries buffered before new ones are dropped (default 256).
    pub outbox_capacity: usize,
    pub tunables: Tunables,
}

fn secs(key: &'static str, default: i64) -> Result<Duration, ConfigError> {
    seconds(key, parse_or(key, default)?)
}

fn seconds(key: &'static str, secs: i64) -> Result<Duration, ConfigError> {
    Duration::try_seconds(secs).ok_or_else(|| ConfigError::Invalid {
        key,
        value: secs.to_string(),
    })
}

fn millis(key: &'static str, ms: i64) -> Result<Duration, ConfigError> {
    Duration::try_milliseconds(ms).ok_or_else(|| ConfigError::Invalid {
        key,
        value: ms.to_string(),
    })
}

impl AttendanceConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Tunables::default();

        let offset_minutes: i32 = parse_or("CAMPUS_UTC_OFFSET_MINUTES", 0)?;
        let campus_offset =
            FixedOffset::east_opt(offset_minutes * 60).ok_or_else(|| ConfigError::Invalid {
                key: "CAMPUS_UTC_OFFSET_MINUTES",
                value: offset_minutes.to_string(),
            })?;

        let tunables = Tunables {
            otp_ttl: secs("OTP_TTL_SECS", defaults.otp_ttl.num_seconds())?,
            otp_max_attempts: parse_or("OTP_MAX_ATTEMPTS", defaults.otp_max_attempts)?,
            session_code_default_ttl: secs(
                "SESSION_CODE_DEFAULT_TTL_SECS",
                defaults.session_code_default_ttl.num_seconds(),
            )?,
            session_code_min_ttl: secs(
                "SESSION_CODE_MIN_TTL_SECS",
                defaults.session_code_min_ttl.num_seconds(),
            )?,
            session_code_max_ttl: secs(
                "SESSION_CODE_MAX_TTL_SECS",
                defaults.session_code_max_ttl.num_seconds(),
            )?,
            payload_freshness: millis(
                "PAYLOAD_FRESHNESS_MS",
                parse_or(
                    "PAYLOAD_FRESHNESS_MS",
                    defaults.payload_freshness.num_milliseconds(),
                )?,
            )?,
            sweep_interval: std::time::Duration::from_secs(parse_or(
                "SWEEP_INTERVAL_SECS",
                defaults.sweep_interval.as_secs(),
            )?),
            campus_offset,
        };
        validate(&tunables)?;

        Ok(Self {
            port: parse_or("ATTENDANCE_PORT", 3120)?,
            jwt_secret: required("JWT_SECRET")?,
            cookie_domain: required("COOKIE_DOMAIN")?,
            database_url: optional("DATABASE_URL"),
            email_api_url: optional("EMAIL_API_URL"),
            email_api_key: optional("EMAIL_API_KEY"),
            outbox_capacity: parse_or("OUTBOX_CAPACITY", 256)?,
            tunables,
        })
    }
}

fn validate(t: &Tunables) -> Result<(), ConfigError> {
    let invalid = |key: &'static str, value: String| Err(ConfigError::Invalid { key, value });

    if t.otp_ttl <= Duration::zero() {
        return invalid("OTP_TTL_SECS", t.otp_ttl.num_seconds().to_string());
    }
    if t.otp_max_attempts == 0 {
        return invalid("OTP_MAX_ATTEMPTS", "0".to_owned());
    }
    if t.session_code_min_ttl <= Duration::zero() || t.session_code_min_ttl > t.session_code_max_ttl
    {
        return invalid(
            "SESSION_CODE_MIN_TTL_SECS",
            t.session_code_min_ttl.num_seconds().to_string(),
        );
    }
    if t.session_code_default_ttl < t.session_code_min_ttl
        || t.session_code_default_ttl > t.session_code_max_ttl
    {
        return invalid(
            "SESSION_CODE_DEFAULT_TTL_SECS",
            t.session_code_default_ttl.num_seconds().to_string(),
        );
    }
    if t.payload_freshness <= Duration::zero() {
        return invalid(
            "PAYLOAD_FRESHNESS_MS",
            t.payload_freshness.num_milliseconds().to_string(),
        );
    }
    if t.sweep_interval.is_zero() {
        return invalid("SWEEP_INTERVAL_SECS", "0".to_owned());
    }
    Ok(())
}
