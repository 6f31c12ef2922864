//! sea-orm entities for the attendance service.

pub mod attendance_records;
pub mod session_codes;
