use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DeeplinkCodes::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DeeplinkCodes::Key)
                            .text()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DeeplinkCodes::Code).text().not_null())
                    .col(
                        ColumnDef::new(DeeplinkCodes::ExpiryDate)
                            .timestamp_with_time_zone()
                            .not_null(),
                    )
                    .to_owned(),
            )
            .await?;

        // Lookups filter on expiry and cleanup deletes by it.
        manager
            .create_index(
                Index::create()
                    .if_not_exists()
                    .name("idx_deeplink_codes_expiry_date")
                    .table(DeeplinkCodes::Table)
                    .col(DeeplinkCodes::ExpiryDate)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DeeplinkCodes::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum DeeplinkCodes {
    Table,
    Key,
    Code,
    ExpiryDate,
}
