use sea_orm::entity::prelude::*;

/// Short-lived code a teacher hands out so students can assert presence in a session.
/// Rows are deactivated on expiry or revocation but never deleted.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "session_codes")]
pub struct Model {
    /// Lowercase, 8 alphanumeric characters.
    #[sea_orm(primary_key, auto_increment = false)]
    pub code: String,
    pub session_id: String,
    pub issuer_id: String,
    pub issued_at: chrono::DateTime<chrono::Utc>,
    pub expires_at: chrono::DateTime<chrono::Utc>,
    pub active: bool,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
