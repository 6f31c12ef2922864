//! Login role types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Kind of participant requesting a login.
///
/// Wire format: `u8` in tokens (0 = Student, 1 = Teacher, 2 = Parent), snake_case
/// strings in JSON bodies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student = 0,
    Teacher = 1,
    Parent = 2,
}

/// Error returned when a role string or wire value is not recognized.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown role: {0}")]
pub struct UnknownRoleError(pub String);

impl Role {
    pub const ALL: [Role; 3] = [Role::Student, Role::Teacher, Role::Parent];

    /// Convert from `u8` wire value. Returns `None` for unknown values.
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(Self::Student),
            1 => Some(Self::Teacher),
            2 => Some(Self::Parent),
            _ => None,
        }
    }

    /// Convert to `u8` wire value.
    pub fn as_u8(self) -> u8 {
        self as u8
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Student => "student",
            Self::Teacher => "teacher",
            Self::Parent => "parent",
        }
    }

    /// Whether this role may issue session codes and write attendance for others.
    pub fn can_manage_sessions(self) -> bool {
        match self {
            Self::Teacher => true,
            Self::Student | Self::Parent => false,
        }
    }

    /// Whether this role may read another participant's attendance.
    pub fn can_view_others(self) -> bool {
        match self {
            Self::Teacher | Self::Parent => true,
            Self::Student => false,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = UnknownRoleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "student" => Ok(Self::Student),
            "teacher" => Ok(Self::Teacher),
            "parent" => Ok(Self::Parent),
            other => Err(UnknownRoleError(other.to_owned())),
        }
    }
}
