// Creates the table of detected changes, owned by a monitored source
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum MonitoredSources {
    #[sea_orm(iden = "monitoredsources")]
    Table,
    Id,
}

#[derive(DeriveIden)]
enum DetectedChanges {
    #[sea_orm(iden = "detectedchanges")]
    Table,
    Id,
    SourceId,
    DetectedAt,
    PreviousContentHash,
    NewContentHash,
    ChangeSummaryFromAgent,
    RawAiAnalysisResult,
    FullTextSnippetFromChange,
    UrlOfChange,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(DetectedChanges::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(DetectedChanges::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(DetectedChanges::SourceId).integer())
                    .col(
                        ColumnDef::new(DetectedChanges::DetectedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(DetectedChanges::PreviousContentHash).string_len(64))
                    .col(
                        ColumnDef::new(DetectedChanges::NewContentHash)
                            .string_len(64)
                            .not_null(),
                    )
                    .col(ColumnDef::new(DetectedChanges::ChangeSummaryFromAgent).text())
                    .col(ColumnDef::new(DetectedChanges::RawAiAnalysisResult).json_binary())
                    .col(ColumnDef::new(DetectedChanges::FullTextSnippetFromChange).text())
                    .col(ColumnDef::new(DetectedChanges::UrlOfChange).text())
                    .foreign_key(
                        ForeignKey::create()
                            .name("detectedchanges_source_id_fkey")
                            .from(DetectedChanges::Table, DetectedChanges::SourceId)
                            .to(MonitoredSources::Table, MonitoredSources::Id)
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    // .index(
                    //     Index::create()
                    //         .name("idx_detectedchanges_source_id_detected_at")
                    //         .table(DetectedChanges::Table)
                    //         .col(DetectedChanges::SourceId)
                    //         .col((DetectedChanges::DetectedAt, IndexOrder::Desc)),
                    // )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(DetectedChanges::Table).to_owned())
            .await
    }
}
