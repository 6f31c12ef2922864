//! Attendance outcome types.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Outcome recorded for one participant in one session on one day.
///
/// Wire format: `"present" | "absent" | "late" | "od" | "medical"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Present,
    Absent,
    Late,
    /// Away on official duty (sports, events, college business).
    #[serde(rename = "od", alias = "official_duty")]
    OfficialDuty,
    Medical,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown attendance status: {0}")]
pub struct UnknownStatusError(pub String);

impl AttendanceStatus {
    pub const ALL: [AttendanceStatus; 5] = [
        Self::Present,
        Self::Absent,
        Self::Late,
        Self::OfficialDuty,
        Self::Medical,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Present => "present",
            Self::Absent => "absent",
            Self::Late => "late",
            Self::OfficialDuty => "od",
            Self::Medical => "medical",
        }
    }

    /// Present and late count as attended.
    pub fn is_present_like(self) -> bool {
        matches!(self, Self::Present | Self::Late)
    }

    /// Official duty and medical leave are left out of percentage computations
    /// entirely (neither numerator nor denominator).
    pub fn is_excused(self) -> bool {
        matches!(self, Self::OfficialDuty | Self::Medical)
    }
}

impl fmt::Display for AttendanceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for AttendanceStatus {
    type Err = UnknownStatusError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "present" => Ok(Self::Present),
            "absent" => Ok(Self::Absent),
            "late" => Ok(Self::Late),
            "od" | "official_duty" | "official-duty" => Ok(Self::OfficialDuty),
            "medical" => Ok(Self::Medical),
            other => Err(UnknownStatusError(other.to_owned())),
        }
    }
}

/// Who or what produced an attendance write.
///
/// Serialized as a plain string: `"qr_scan"`, `"short_code"`, or the marker name
/// (typically the teacher who marked the row).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum RecordedBy {
    /// Structured payload decoded from a scanned QR code.
    Scan,
    /// Bare session code typed or scanned by the participant.
    ShortCode,
    /// Named marker, e.g. a teacher correcting a row.
    Marker(String),
}

impl RecordedBy {
    const SCAN: &'static str = "qr_scan";
    const SHORT_CODE: &'static str = "short_code";

    pub fn as_str(&self) -> &str {
        match self {
            Self::Scan => Self::SCAN,
            Self::ShortCode => Self::SHORT_CODE,
            Self::Marker(name) => name,
        }
    }
}

impl fmt::Display for RecordedBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<String> for RecordedBy {
    fn from(s: String) -> Self {
        if s == Self::SCAN {
            Self::Scan
        } else if s == Self::SHORT_CODE {
            Self::ShortCode
        } else {
            Self::Marker(s)
        }
    }
}

impl From<RecordedBy> for String {
    fn from(r: RecordedBy) -> Self {
        match r {
            RecordedBy::Marker(name) => name,
            other => other.as_str().to_owned(),
        }
    }
}

/// Error returned for coordinates outside the WGS84 range.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("invalid coordinates ({latitude}, {longitude})")]
pub struct InvalidGeoPointError {
    pub latitude: f64,
    pub longitude: f64,
}

/// Where a presence assertion was made.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Latitude must lie in [-90, 90] and longitude in [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, InvalidGeoPointError> {
        let valid = latitude.is_finite()
            && longitude.is_finite()
            && (-90.0..=90.0).contains(&latitude)
            && (-180.0..=180.0).contains(&longitude);
        if !valid {
            return Err(InvalidGeoPointError {
                latitude,
                longitude,
            });
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("date range starts ({from}) after it ends ({to})")]
pub struct InvertedDateRangeError {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

/// Inclusive date filter. Either bound may be open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    from: Option<NaiveDate>,
    to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    ) -> Result<Self, InvertedDateRangeError> {
        if let (Some(from), Some(to)) = (from, to) {
            if from > to {
                return Err(InvertedDateRangeError { from, to });
            }
        }
        Ok(Self { from, to })
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn start(&self) -> Option<NaiveDate> {
        self.from
    }

    pub fn end(&self) -> Option<NaiveDate> {
        self.to
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }
}
