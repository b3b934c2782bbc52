// Creates the table of sources under watch
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum MonitoredSources {
    #[sea_orm(iden = "monitoredsources")]
    Table,
    Id,
    Name,
    Url,
    LastCheckedAt,
    LastContentHash,
    LastSummary,
    IsActive,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(MonitoredSources::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(MonitoredSources::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(MonitoredSources::Name)
                            .string_len(255)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(MonitoredSources::Url).text().not_null())
                    .col(ColumnDef::new(MonitoredSources::LastCheckedAt).timestamp_with_time_zone())
                    .col(ColumnDef::new(MonitoredSources::LastContentHash).string_len(64))
                    .col(ColumnDef::new(MonitoredSources::LastSummary).text())
                    .col(
                        ColumnDef::new(MonitoredSources::IsActive)
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    // .index(
                    //     Index::create()
                    //         .name("idx_monitoredsources_is_active")
                    //         .table(MonitoredSources::Table)
                    //         .col(MonitoredSources::IsActive),
                    // )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(MonitoredSources::Table).to_owned())
            .await
    }
}
