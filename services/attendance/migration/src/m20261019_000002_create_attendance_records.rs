use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(AttendanceRecords::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(AttendanceRecords::ParticipantId)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::SessionId)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::Date).date().not_null())
                    .col(
                        ColumnDef::new(AttendanceRecords::Status)
                            .string_len(16)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::RecordedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(AttendanceRecords::RecordedBy)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(AttendanceRecords::Latitude).double())
                    .col(ColumnDef::new(AttendanceRecords::Longitude).double())
                    .primary_key(
                        Index::create()
                            .col(AttendanceRecords::ParticipantId)
                            .col(AttendanceRecords::SessionId)
                            .col(AttendanceRecords::Date),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(AttendanceRecords::Table)
                    .col(AttendanceRecords::SessionId)
                    .col(AttendanceRecords::Date)
                    .name("idx_attendance_records_session_id_date")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(AttendanceRecords::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum AttendanceRecords {
    Table,
    ParticipantId,
    SessionId,
    Date,
    Status,
    RecordedAt,
    RecordedBy,
    Latitude,
    Longitude,
}
