// Creates the first version of the enquiries table: free-text context and
// answer, with a processing status tracked by the answering pipeline
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum UserEnquiries {
    #[sea_orm(iden = "userenquiries")]
    Table,
    Id,
    QuestionText,
    TimestampAsked,
    RetrievedContext,
    GeneratedAnswer,
    ProcessingStatus,
}

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(UserEnquiries::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserEnquiries::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserEnquiries::QuestionText).text().not_null())
                    .col(
                        ColumnDef::new(UserEnquiries::TimestampAsked)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(UserEnquiries::RetrievedContext).text())
                    .col(ColumnDef::new(UserEnquiries::GeneratedAnswer).text())
                    .col(
                        ColumnDef::new(UserEnquiries::ProcessingStatus)
                            .string_len(50)
                            .not_null()
                            .default("pending"),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserEnquiries::Table).to_owned())
            .await
    }
}
