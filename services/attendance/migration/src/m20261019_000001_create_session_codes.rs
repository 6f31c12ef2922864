use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(SessionCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SessionCodes::Code)
                            .string_len(8)
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(SessionCodes::SessionId).string().not_null())
                    .col(ColumnDef::new(SessionCodes::IssuerId).string().not_null())
                    .col(
                        ColumnDef::new(SessionCodes::IssuedAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionCodes::ExpiresAt)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SessionCodes::Active)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .to_owned(),
            )
            .await?;

        // Sweeps and "is the session open" lookups both filter on active + expiry.
        manager
            .create_index(
                Index::create()
                    .table(SessionCodes::Table)
                    .col(SessionCodes::SessionId)
                    .col(SessionCodes::Active)
                    .name("idx_session_codes_session_id_active")
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .table(SessionCodes::Table)
                    .col(SessionCodes::Active)
                    .col(SessionCodes::ExpiresAt)
                    .name("idx_session_codes_active_expires_at")
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SessionCodes::Table).to_owned())
            .await
    }
}

#[derive(Iden)]
enum SessionCodes {
    Table,
    Code,
    SessionId,
    IssuerId,
    IssuedAt,
    ExpiresAt,
    Active,
}
