// Moves the enquiries table to its answer-reuse shape: keyword search,
// candidate URLs, verification and a reuse counter. Databases created from
// the later DDL directly already have these columns, so every step checks
// before it acts.
use sea_orm::ConnectionTrait;
use sea_orm_migration::prelude::*;

#[derive(DeriveIden)]
enum UserEnquiries {
    #[sea_orm(iden = "userenquiries")]
    Table,
    RetrievedContext,
    GeneratedAnswer,
    ProcessingStatus,
    Keywords,
    AiGeneratedInformation,
    AiIdentifiedUrls,
    FetchedContentSummary,
    IsVerified,
    UsageCount,
    SourceOfAnswer,
}

const TABLE: &str = "userenquiries";
const KEYWORDS_INDEX: &str = "idx_userenquiries_keywords";

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn rename_if_present(
    manager: &SchemaManager<'_>,
    from: UserEnquiries,
    to: UserEnquiries,
) -> Result<(), DbErr> {
    if !manager.has_column(TABLE, &from.to_string()).await? {
        return Ok(());
    }
    manager
        .alter_table(
            Table::alter()
                .table(UserEnquiries::Table)
                .rename_column(from, to)
                .to_owned(),
        )
        .await
}

async fn add_if_missing(manager: &SchemaManager<'_>, mut column: ColumnDef) -> Result<(), DbErr> {
    let name = column.get_column_name();
    if manager.has_column(TABLE, &name).await? {
        return Ok(());
    }
    manager
        .alter_table(
            Table::alter()
                .table(UserEnquiries::Table)
                .add_column(&mut column)
                .to_owned(),
        )
        .await
}

async fn drop_if_present(manager: &SchemaManager<'_>, column: UserEnquiries) -> Result<(), DbErr> {
    if !manager.has_column(TABLE, &column.to_string()).await? {
        return Ok(());
    }
    manager
        .alter_table(
            Table::alter()
                .table(UserEnquiries::Table)
                .drop_column(column)
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        rename_if_present(
            manager,
            UserEnquiries::GeneratedAnswer,
            UserEnquiries::AiGeneratedInformation,
        )
        .await?;
        rename_if_present(
            manager,
            UserEnquiries::RetrievedContext,
            UserEnquiries::FetchedContentSummary,
        )
        .await?;

        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::Keywords).array(ColumnType::Text).to_owned(),
        )
        .await?;
        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::AiIdentifiedUrls).array(ColumnType::Text).to_owned(),
        )
        .await?;
        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::IsVerified)
                .boolean()
                .not_null()
                .default(false)
                .to_owned(),
        )
        .await?;
        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::UsageCount)
                .integer()
                .not_null()
                .default(0)
                .to_owned(),
        )
        .await?;
        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::SourceOfAnswer).string_len(100).to_owned(),
        )
        .await?;

        // Carry the one status the new columns cannot infer
        if manager.has_column(TABLE, "processing_status").await? {
            manager
                .get_connection()
                .execute_unprepared(
                    "UPDATE userenquiries SET source_of_answer = 'no_information_found' \
                     WHERE processing_status = 'no_information_found' AND source_of_answer IS NULL",
                )
                .await?;
        }
        drop_if_present(manager, UserEnquiries::ProcessingStatus).await?;

        manager
            .get_connection()
            .execute_unprepared(&format!(
                "CREATE INDEX IF NOT EXISTS {} ON {} USING GIN (keywords)",
                KEYWORDS_INDEX, TABLE
            ))
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        add_if_missing(
            manager,
            ColumnDef::new(UserEnquiries::ProcessingStatus)
                .string_len(50)
                .not_null()
                .default("pending")
                .to_owned(),
        )
        .await?;
        manager
            .get_connection()
            .execute_unprepared(
                "UPDATE userenquiries SET processing_status = CASE \
                     WHEN ai_generated_information IS NOT NULL THEN 'answered' \
                     WHEN source_of_answer = 'no_information_found' THEN 'no_information_found' \
                     ELSE 'pending' END",
            )
            .await?;

        manager
            .get_connection()
            .execute_unprepared(&format!("DROP INDEX IF EXISTS {}", KEYWORDS_INDEX))
            .await?;

        drop_if_present(manager, UserEnquiries::SourceOfAnswer).await?;
        drop_if_present(manager, UserEnquiries::UsageCount).await?;
        drop_if_present(manager, UserEnquiries::IsVerified).await?;
        drop_if_present(manager, UserEnquiries::AiIdentifiedUrls).await?;
        drop_if_present(manager, UserEnquiries::Keywords).await?;

        rename_if_present(
            manager,
            UserEnquiries::FetchedContentSummary,
            UserEnquiries::RetrievedContext,
        )
        .await?;
        rename_if_present(
            manager,
            UserEnquiries::AiGeneratedInformation,
            UserEnquiries::GeneratedAnswer,
        )
        .await?;

        Ok(())
    }
}
