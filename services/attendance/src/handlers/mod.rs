pub mod attendance;
pub mod health;
pub mod otp;
pub mod session_code;

use rollcall_auth_types::identity::Identity;
use rollcall_domain::id::{IssuerId, ParticipantId};

use crate::error::AttendanceServiceError;

/// Teacher identity as the issuer of codes and the marker of rows.
pub(crate) fn require_teacher(identity: &Identity) -> Result<IssuerId, AttendanceServiceError> {
    if !identity.role.can_manage_sessions() {
        return Err(AttendanceServiceError::Forbidden);
    }
    Ok(IssuerId::new(identity.subject.as_str())?)
}

/// A participant may read their own rows; teachers and parents may read anyone's.
pub(crate) fn require_viewer(
    identity: &Identity,
    participant: &ParticipantId,
) -> Result<(), AttendanceServiceError> {
    if identity.role.can_view_others() || identity.subject == participant.as_str() {
        Ok(())
    } else {
        Err(AttendanceServiceError::Forbidden)
    }
}
