use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use rollcall_core::serde::to_rfc3339_ms;
use rollcall_domain::attendance::{AttendanceStatus, GeoPoint, RecordedBy};
use rollcall_domain::id::{IssuerId, ParticipantId, SessionId};
use rollcall_domain::role::Role;

/// Login OTP length in digits.
pub const OTP_CODE_LEN: usize = 6;

/// Session code length in characters.
pub const SESSION_CODE_LEN: usize = 8;

/// Attendance percentage at or above which a participant is in good standing.
pub const GOOD_STANDING_PERCENT: f64 = 75.0;

/// Attendance percentage at or above which a participant is only warned.
pub const WARNING_STANDING_PERCENT: f64 = 60.0;

// ── Verification challenge ───────────────────────────────────────────────────

/// Outstanding login OTP for one address.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerificationChallenge {
    /// Normalized (trimmed, lowercase) address. Natural key.
    pub address: String,
    pub code: String,
    pub role: Role,
    pub expires_at: DateTime<Utc>,
    pub attempts_used: u32,
}

impl VerificationChallenge {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }
}

/// Normalize a login address for use as a store key.
pub fn normalize_address(raw: &str) -> String {
    raw.trim().to_lowercase()
}

/// Parameters handed to the email collaborator after a challenge is issued.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OtpDelivery {
    pub recipient: String,
    pub code: String,
    pub role: Role,
    /// Human-readable validity window, e.g. `"5 minutes"`.
    pub validity_window_label: String,
}

// ── Session codes ────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionCode {
    pub code: String,
    pub session_id: SessionId,
    pub issuer_id: IssuerId,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub issued_at: DateTime<Utc>,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub expires_at: DateTime<Utc>,
    pub active: bool,
}

impl SessionCode {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// A code can be presented only while active and before its expiry instant.
    pub fn is_presentable(&self, now: DateTime<Utc>) -> bool {
        self.active && !self.is_expired(now)
    }
}

/// Session codes are stored lowercase and matched case-insensitively.
pub fn normalize_session_code(raw: &str) -> String {
    raw.trim().to_ascii_lowercase()
}

/// Whether `code` has the shape of a session code (8 ASCII alphanumerics).
pub fn is_session_code_shape(code: &str) -> bool {
    code.len() == SESSION_CODE_LEN && code.bytes().all(|b| b.is_ascii_alphanumeric())
}

/// Result of a successful session-code validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedCode {
    pub code: String,
    pub session_id: SessionId,
    pub issuer_id: IssuerId,
}

// ── Decoded input ────────────────────────────────────────────────────────────

/// Structured presence assertion encoded in a QR code.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScanPayload {
    pub subject: String,
    #[serde(rename = "classId")]
    pub class_id: String,
    /// Generation instant, epoch milliseconds.
    pub timestamp: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodedInput {
    Payload(ScanPayload),
    /// Normalized (lowercase) session code.
    BareCode(String),
}

// ── Attendance ledger ────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttendanceKey {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttendanceRecord {
    pub participant_id: ParticipantId,
    pub session_id: SessionId,
    pub date: NaiveDate,
    pub status: AttendanceStatus,
    #[serde(serialize_with = "to_rfc3339_ms")]
    pub recorded_at: DateTime<Utc>,
    pub recorded_by: RecordedBy,
    pub location: Option<GeoPoint>,
}

impl AttendanceRecord {
    pub fn key(&self) -> AttendanceKey {
        AttendanceKey {
            participant_id: self.participant_id.clone(),
            session_id: self.session_id.clone(),
            date: self.date,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UpsertOutcome {
    Created,
    Updated,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Standing {
    Good,
    Warning,
    Danger,
}

/// Counts over the materialized records of one participant in one session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttendanceAggregate {
    pub total: u32,
    /// Present + late.
    pub present_like: u32,
    /// Official duty + medical.
    pub excused: u32,
}

impl AttendanceAggregate {
    pub fn from_statuses(statuses: impl IntoIterator<Item = AttendanceStatus>) -> Self {
        statuses.into_iter().fold(Self::default(), |mut acc, status| {
            acc.total += 1;
            if status.is_present_like() {
                acc.present_like += 1;
            }
            if status.is_excused() {
                acc.excused += 1;
            }
            acc
        })
    }

    /// Records that count toward the percentage (excused rows are left out).
    pub fn counted(&self) -> u32 {
        self.total - self.excused
    }

    /// Attended share of counted records, 0–100. Zero when nothing is counted.
    pub fn percentage(&self) -> f64 {
        match self.counted() {
            0 => 0.0,
            counted => f64::from(self.present_like) * 100.0 / f64::from(counted),
        }
    }

    pub fn standing(&self) -> Standing {
        let pct = self.percentage();
        if pct >= GOOD_STANDING_PERCENT {
            Standing::Good
        } else if pct >= WARNING_STANDING_PERCENT {
            Standing::Warning
        } else {
            Standing::Danger
        }
    }

    /// Consecutive attended classes needed to reach `target` percent.
    ///
    /// `None` when the target is outside 0–100 or cannot be reached (100% after a miss).
    pub fn classes_needed(&self, target: f64) -> Option<u32> {
        if !(0.0..=100.0).contains(&target) {
            return None;
        }
        if self.percentage() >= target {
            return Some(0);
        }
        if target >= 100.0 {
            return None;
        }
        let counted = f64::from(self.counted());
        let present = f64::from(self.present_like);
        let needed = ((target * counted - 100.0 * present) / (100.0 - target)).ceil();
        Some(needed.max(0.0) as u32)
    }

    /// Classes that can be missed while staying at or above `target` percent.
    ///
    /// `None` when the target is outside (0, 100], where the answer is unbounded or
    /// meaningless.
    pub fn classes_missable(&self, target: f64) -> Option<u32> {
        if !(target > 0.0 && target <= 100.0) {
            return None;
        }
        if self.percentage() < target {
            return Some(0);
        }
        let counted = f64::from(self.counted());
        let present = f64::from(self.present_like);
        let missable = (100.0 * present / target - counted).floor();
        Some(missable.max(0.0) as u32)
    }
}

/// One participant's line in a session roster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RosterEntry {
    pub participant_id: ParticipantId,
    pub status: AttendanceStatus,
    /// `false` when no record exists and `status` is the implied absence.
    pub recorded: bool,
}
