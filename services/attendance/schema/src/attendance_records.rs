use sea_orm::entity::prelude::*;

/// One attendance outcome per (participant, session, date).
#[derive(Clone, Debug, PartialEq, DeriveEntityModel)]
#[sea_orm(table_name = "attendance_records")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub participant_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub session_id: String,
    #[sea_orm(primary_key, auto_increment = false)]
    pub date: chrono::NaiveDate,
    /// `present | absent | late | od | medical`
    pub status: String,
    pub recorded_at: chrono::DateTime<chrono::Utc>,
    /// `qr_scan`, `short_code`, or the marker's name.
    pub recorded_by: String,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
