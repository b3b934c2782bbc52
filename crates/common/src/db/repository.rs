//! Repository pattern for database operations
//!
//! Provides a clean interface for all data access operations
//! with proper error handling and transaction support.

use crate::analysis::ChangeAnalysis;
use crate::config::SourceSeed;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, ConstraintViolation, Result};
use crate::fingerprint::parse_fingerprint;
use crate::keywords::normalize_keywords;
use crate::metrics;
use crate::DEFAULT_ENQUIRY_SEARCH_LIMIT;
use sea_orm::prelude::DateTimeWithTimeZone;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, Statement, TransactionTrait,
};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, info};

/// What a monitor saw when it polled a source
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Observation {
    /// Fingerprint of the extracted content
    pub content_hash: String,

    /// Extracted summary; the stored summary is kept when absent
    #[serde(default)]
    pub summary: Option<String>,

    /// Raw text of the changed region
    #[serde(default)]
    pub snippet: Option<String>,

    /// Item URL when it differs from the source URL
    #[serde(default)]
    pub url_of_change: Option<String>,

    /// Analyser output for the change
    #[serde(default)]
    pub analysis: Option<ChangeAnalysis>,
}

/// Result of recording a check
#[derive(Debug, Clone, Serialize)]
pub struct CheckOutcome {
    /// The source after its check bookkeeping was updated
    pub source: MonitoredSource,

    /// The change row, present only when the fingerprint moved
    pub change: Option<DetectedChange>,
}

impl CheckOutcome {
    pub fn changed(&self) -> bool {
        self.change.is_some()
    }
}

/// A change row written directly, outside of a check
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewDetectedChange {
    pub source_id: i32,
    #[serde(default)]
    pub previous_content_hash: Option<String>,
    pub new_content_hash: String,
    #[serde(default)]
    pub change_summary: Option<String>,
    #[serde(default)]
    pub analysis: Option<serde_json::Value>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub url_of_change: Option<String>,
}

/// Fields of an enquiry that a caller supplies
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewEnquiry {
    pub question_text: String,
    #[serde(default)]
    pub keywords: Vec<String>,
    #[serde(default)]
    pub ai_generated_information: Option<String>,
    #[serde(default)]
    pub ai_identified_urls: Vec<String>,
    #[serde(default)]
    pub fetched_content_summary: Option<String>,
    #[serde(default)]
    pub source_of_answer: Option<String>,
    #[serde(default)]
    pub is_verified: bool,
}

/// An update replaces every field a create sets. `usage_count` and
/// `timestamp_asked` are never touched.
pub type EnquiryUpdate = NewEnquiry;

/// Keyword search over stored enquiries
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnquirySearch {
    pub keywords: Vec<String>,
    #[serde(default = "default_verified_only")]
    pub verified_only: bool,
    #[serde(default = "default_search_limit")]
    pub limit: u64,
}

/// Largest number of enquiries a single search returns
pub const MAX_SEARCH_LIMIT: u64 = 100;

fn default_verified_only() -> bool { true }
fn default_search_limit() -> u64 { DEFAULT_ENQUIRY_SEARCH_LIMIT }

impl Default for EnquirySearch {
    fn default() -> Self {
        Self {
            keywords: Vec::new(),
            verified_only: default_verified_only(),
            limit: default_search_limit(),
        }
    }
}

/// Aggregate state of the monitoring tables
#[derive(Debug, Clone, Serialize)]
pub struct MonitorStatus {
    pub total_sources: u64,
    pub active_sources: u64,
    pub last_checked_at: Option<DateTimeWithTimeZone>,
    pub total_changes: u64,
}

fn non_empty(values: Vec<String>) -> Option<Vec<String>> {
    if values.is_empty() {
        None
    } else {
        Some(values)
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(AppError::Validation {
            message: format!("{} must not be empty", field),
            field: Some(field.to_string()),
        });
    }
    Ok(())
}

/// Insert a change row. Hashes are taken as given.
async fn insert_change<C: ConnectionTrait>(
    conn: &C,
    change: NewDetectedChange,
) -> Result<DetectedChange> {
    // id and detected_at come from the column defaults
    let model = DetectedChangeActiveModel {
        source_id: Set(Some(change.source_id)),
        previous_content_hash: Set(change.previous_content_hash),
        new_content_hash: Set(change.new_content_hash),
        change_summary_from_agent: Set(change.change_summary),
        raw_ai_analysis_result: Set(change.analysis),
        full_text_snippet_from_change: Set(change.snippet),
        url_of_change: Set(change.url_of_change),
        ..Default::default()
    };

    model.insert(conn).await.map_err(Into::into)
}

async fn find_enquiry_on<C: ConnectionTrait>(conn: &C, id: i32) -> Result<UserEnquiry> {
    UserEnquiryEntity::find_by_id(id)
        .one(conn)
        .await?
        .ok_or(AppError::EnquiryNotFound { id })
}

/// Repository for data access operations
#[derive(Clone)]
pub struct Repository {
    pool: DbPool,
}

impl Repository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }

    // ========================================================================
    // Health Check
    // ========================================================================

    /// Ping the database
    pub async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    /// Counts and freshness of the monitoring tables
    pub async fn monitor_status(&self) -> Result<MonitorStatus> {
        let total_sources = MonitoredSourceEntity::find().count(self.read_conn()).await?;

        let active_sources = MonitoredSourceEntity::find()
            .filter(MonitoredSourceColumn::IsActive.eq(true))
            .count(self.read_conn())
            .await?;

        let last_checked_at = MonitoredSourceEntity::find()
            .filter(MonitoredSourceColumn::LastCheckedAt.is_not_null())
            .order_by_desc(MonitoredSourceColumn::LastCheckedAt)
            .one(self.read_conn())
            .await?
            .and_then(|s| s.last_checked_at);

        let total_changes = DetectedChangeEntity::find().count(self.read_conn()).await?;

        Ok(MonitorStatus {
            total_sources,
            active_sources,
            last_checked_at,
            total_changes,
        })
    }

    // ========================================================================
    // Source Operations
    // ========================================================================

    /// Register a new source. It starts active.
    pub async fn register_source(&self, name: &str, url: &str) -> Result<MonitoredSource> {
        require_text("name", name)?;
        require_text("url", url)?;

        let source = MonitoredSourceActiveModel {
            name: Set(name.to_string()),
            url: Set(url.to_string()),
            ..Default::default()
        };

        source
            .insert(self.write_conn())
            .await
            .map_err(|e| match AppError::from(e) {
                AppError::Constraint(ConstraintViolation::Unique { .. }) => {
                    AppError::DuplicateSource { name: name.to_string() }
                }
                other => other,
            })
    }

    /// Register every seed whose name is not taken yet. Returns how many were added.
    pub async fn ensure_sources(&self, seeds: &[SourceSeed]) -> Result<u64> {
        if seeds.is_empty() {
            return Ok(0);
        }

        let models = seeds.iter().map(|seed| MonitoredSourceActiveModel {
            name: Set(seed.name.clone()),
            url: Set(seed.url.clone()),
            ..Default::default()
        });

        let inserted = MonitoredSourceEntity::insert_many(models)
            .on_conflict(
                OnConflict::column(MonitoredSourceColumn::Name)
                    .do_nothing()
                    .to_owned(),
            )
            .exec_without_returning(self.write_conn())
            .await?;

        Ok(inserted)
    }

    /// Find source by ID
    pub async fn find_source_by_id(&self, id: i32) -> Result<Option<MonitoredSource>> {
        MonitoredSourceEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Find source by its unique name
    pub async fn find_source_by_name(&self, name: &str) -> Result<Option<MonitoredSource>> {
        MonitoredSourceEntity::find()
            .filter(MonitoredSourceColumn::Name.eq(name))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List sources ordered by name
    pub async fn list_sources(&self, active_only: bool) -> Result<Vec<MonitoredSource>> {
        let mut query = MonitoredSourceEntity::find();
        if active_only {
            query = query.filter(MonitoredSourceColumn::IsActive.eq(true));
        }

        query
            .order_by_asc(MonitoredSourceColumn::Name)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Suspend or resume monitoring of a source
    pub async fn set_source_active(&self, id: i32, active: bool) -> Result<MonitoredSource> {
        let mut source: MonitoredSourceActiveModel = MonitoredSourceEntity::find_by_id(id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::SourceNotFound { id: id.to_string() })?
            .into();

        source.is_active = Set(active);

        source.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Delete source by ID. Its detected changes go with it.
    pub async fn delete_source(&self, id: i32) -> Result<bool> {
        let result = MonitoredSourceEntity::delete_by_id(id)
            .exec(self.write_conn())
            .await?;

        Ok(result.rows_affected > 0)
    }

    // ========================================================================
    // Check & Change Operations
    // ========================================================================

    /// Record the outcome of polling a source.
    ///
    /// The source row is locked for the duration, so concurrent checks of the
    /// same source are applied one after the other and each sees the
    /// fingerprint the previous one stored.
    pub async fn record_check(&self, source_id: i32, observation: Observation) -> Result<CheckOutcome> {
        let new_hash = parse_fingerprint("content_hash", &observation.content_hash)?;

        let txn = self.write_conn().begin().await?;

        let source = MonitoredSourceEntity::find_by_id(source_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::SourceNotFound { id: source_id.to_string() })?;

        if !source.is_active {
            return Err(AppError::SourceInactive { id: source_id });
        }

        let change = if source.is_changed_by(&new_hash) {
            let analysis = observation.analysis.as_ref();
            let snippet = observation
                .snippet
                .clone()
                .or_else(|| analysis.and_then(|a| a.full_text_snippet.clone()));

            let change = insert_change(
                &txn,
                NewDetectedChange {
                    source_id,
                    previous_content_hash: source.last_content_hash.clone(),
                    new_content_hash: new_hash.clone(),
                    change_summary: analysis.map(|a| a.summary_of_change.clone()),
                    analysis: analysis.map(ChangeAnalysis::to_json),
                    snippet,
                    url_of_change: observation.url_of_change.clone(),
                },
            )
            .await?;

            Some(change)
        } else {
            None
        };

        let mut active: MonitoredSourceActiveModel = source.into();
        active.last_checked_at = Set(Some(chrono::Utc::now().into()));
        active.last_content_hash = Set(Some(new_hash));
        if let Some(summary) = observation.summary {
            active.last_summary = Set(Some(summary));
        }
        let source = active.update(&txn).await?;

        txn.commit().await?;

        metrics::record_check(change.is_some());

        match &change {
            Some(c) => info!(
                source_id,
                change_id = c.id,
                source = %source.name,
                "Change detected"
            ),
            None => debug!(source_id, source = %source.name, "No change detected"),
        }

        Ok(CheckOutcome { source, change })
    }

    /// Insert a change row directly. Both hashes must be fingerprints.
    pub async fn record_change(&self, change: NewDetectedChange) -> Result<DetectedChange> {
        let new_content_hash = parse_fingerprint("new_content_hash", &change.new_content_hash)?;
        let previous_content_hash = change
            .previous_content_hash
            .as_deref()
            .map(|h| parse_fingerprint("previous_content_hash", h))
            .transpose()?;

        insert_change(
            self.write_conn(),
            NewDetectedChange {
                new_content_hash,
                previous_content_hash,
                ..change
            },
        )
        .await
    }

    /// Find change by ID
    pub async fn find_change_by_id(&self, id: i32) -> Result<Option<DetectedChange>> {
        DetectedChangeEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// List a source's changes, newest first, with the total count
    pub async fn list_changes_for_source(
        &self,
        source_id: i32,
        offset: u64,
        limit: u64,
    ) -> Result<(Vec<DetectedChange>, u64)> {
        if self.find_source_by_id(source_id).await?.is_none() {
            return Err(AppError::SourceNotFound { id: source_id.to_string() });
        }

        let query = DetectedChangeEntity::find()
            .filter(DetectedChangeColumn::SourceId.eq(source_id));

        let total = query.clone().count(self.read_conn()).await?;
        let changes = query
            .order_by_desc(DetectedChangeColumn::DetectedAt)
            .order_by_desc(DetectedChangeColumn::Id)
            .offset(offset)
            .limit(limit.max(1))
            .all(self.read_conn())
            .await?;

        Ok((changes, total))
    }

    /// Latest changes across all sources
    pub async fn recent_changes(&self, limit: u64) -> Result<Vec<DetectedChange>> {
        DetectedChangeEntity::find()
            .order_by_desc(DetectedChangeColumn::DetectedAt)
            .order_by_desc(DetectedChangeColumn::Id)
            .limit(limit)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Enquiry Operations
    // ========================================================================

    /// Store a new enquiry
    pub async fn create_enquiry(&self, enquiry: NewEnquiry) -> Result<UserEnquiry> {
        require_text("question_text", &enquiry.question_text)?;

        // timestamp_asked and usage_count come from the column defaults
        let model = UserEnquiryActiveModel {
            question_text: Set(enquiry.question_text),
            keywords: Set(non_empty(normalize_keywords(&enquiry.keywords))),
            ai_generated_information: Set(enquiry.ai_generated_information),
            ai_identified_urls: Set(non_empty(enquiry.ai_identified_urls)),
            fetched_content_summary: Set(enquiry.fetched_content_summary),
            is_verified: Set(enquiry.is_verified),
            source_of_answer: Set(enquiry.source_of_answer),
            ..Default::default()
        };

        let created = model.insert(self.write_conn()).await?;
        metrics::record_enquiry_created(created.answer_state());

        Ok(created)
    }

    /// Replace the answer fields of an enquiry
    pub async fn update_enquiry(&self, id: i32, update: EnquiryUpdate) -> Result<UserEnquiry> {
        require_text("question_text", &update.question_text)?;

        let mut enquiry: UserEnquiryActiveModel = find_enquiry_on(self.write_conn(), id).await?.into();

        enquiry.question_text = Set(update.question_text);
        enquiry.keywords = Set(non_empty(normalize_keywords(&update.keywords)));
        enquiry.ai_generated_information = Set(update.ai_generated_information);
        enquiry.ai_identified_urls = Set(non_empty(update.ai_identified_urls));
        enquiry.fetched_content_summary = Set(update.fetched_content_summary);
        enquiry.source_of_answer = Set(update.source_of_answer);
        enquiry.is_verified = Set(update.is_verified);

        enquiry.update(self.write_conn()).await.map_err(Into::into)
    }

    /// Find enquiry by ID
    pub async fn find_enquiry_by_id(&self, id: i32) -> Result<Option<UserEnquiry>> {
        UserEnquiryEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    /// Stored enquiries sharing at least one keyword, most reused first
    pub async fn search_enquiries(&self, search: &EnquirySearch) -> Result<Vec<UserEnquiry>> {
        let keywords = normalize_keywords(&search.keywords);
        if keywords.is_empty() {
            return Ok(Vec::new());
        }

        let start = Instant::now();

        let verified_filter = if search.verified_only {
            "AND is_verified = TRUE"
        } else {
            ""
        };

        let sql = format!(
            r#"
            SELECT *
            FROM userenquiries
            WHERE keywords && $1::text[]
            {}
            ORDER BY usage_count DESC, timestamp_asked DESC
            LIMIT $2
            "#,
            verified_filter
        );

        let values: Vec<sea_orm::Value> = vec![
            keywords.into(),
            i64::try_from(search.limit.clamp(1, MAX_SEARCH_LIMIT))
                .unwrap_or(i64::MAX)
                .into(),
        ];

        let stmt = Statement::from_sql_and_values(DbBackend::Postgres, &sql, values);

        let results = UserEnquiryEntity::find()
            .from_raw_sql(stmt)
            .all(self.read_conn())
            .await?;

        metrics::record_enquiry_search(start.elapsed().as_secs_f64(), results.len());

        Ok(results)
    }

    /// Count one more reuse of a stored answer
    pub async fn record_enquiry_reuse(&self, id: i32) -> Result<UserEnquiry> {
        let result = UserEnquiryEntity::update_many()
            .col_expr(
                UserEnquiryColumn::UsageCount,
                Expr::col(UserEnquiryColumn::UsageCount).add(1),
            )
            .filter(UserEnquiryColumn::Id.eq(id))
            .exec(self.write_conn())
            .await?;

        if result.rows_affected == 0 {
            return Err(AppError::EnquiryNotFound { id });
        }

        metrics::record_enquiry_reuse();

        find_enquiry_on(self.write_conn(), id).await
    }

    /// Mark an enquiry's answer as verified or not
    pub async fn set_enquiry_verified(&self, id: i32, verified: bool) -> Result<UserEnquiry> {
        let mut enquiry: UserEnquiryActiveModel = find_enquiry_on(self.write_conn(), id).await?.into();

        enquiry.is_verified = Set(verified);

        enquiry.update(self.write_conn()).await.map_err(Into::into)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fingerprint::content_fingerprint;
    use sea_orm::{DatabaseBackend, MockDatabase, MockExecResult, Transaction, Value};
    use std::collections::BTreeMap;
    use std::sync::Arc;

    fn source(last_hash: Option<&str>, is_active: bool) -> MonitoredSource {
        MonitoredSource {
            id: 1,
            name: "HMRC_Tax_Updates".into(),
            url: "https://www.gov.uk/government/organisations/hm-revenue-customs/announcements".into(),
            last_checked_at: None,
            last_content_hash: last_hash.map(str::to_string),
            last_summary: None,
            is_active,
        }
    }

    fn change(previous: Option<&str>, new: &str) -> DetectedChange {
        DetectedChange {
            id: 10,
            source_id: Some(1),
            detected_at: chrono::Utc::now().into(),
            previous_content_hash: previous.map(str::to_string),
            new_content_hash: new.to_string(),
            change_summary_from_agent: None,
            raw_ai_analysis_result: None,
            full_text_snippet_from_change: None,
            url_of_change: None,
        }
    }

    fn enquiry(usage_count: i32) -> UserEnquiry {
        UserEnquiry {
            id: 3,
            question_text: "What is the VAT threshold?".into(),
            keywords: Some(vec!["vat".into(), "threshold".into()]),
            timestamp_asked: chrono::Utc::now().into(),
            ai_generated_information: Some("The VAT registration threshold is £90,000.".into()),
            ai_identified_urls: None,
            fetched_content_summary: None,
            is_verified: true,
            usage_count,
            source_of_answer: Some("stored".into()),
        }
    }

    fn shared(db: MockDatabase) -> Arc<DatabaseConnection> {
        Arc::new(db.into_connection())
    }

    fn repo(conn: &Arc<DatabaseConnection>) -> Repository {
        Repository::new(DbPool {
            primary: conn.clone(),
            replica: None,
        })
    }

    /// Statements the mock saw. Every repository built on `conn` must be dropped first.
    fn transaction_log(conn: Arc<DatabaseConnection>) -> Vec<Transaction> {
        match Arc::try_unwrap(conn) {
            Ok(conn) => conn.into_transaction_log(),
            Err(_) => panic!("connection is still shared"),
        }
    }

    fn observation(content: &str) -> Observation {
        Observation {
            content_hash: content_fingerprint(content),
            summary: Some(content.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_first_check_records_change() {
        let hash = content_fingerprint("tax bands adjusted");
        let mut checked = source(Some(&hash), true);
        checked.last_checked_at = Some(chrono::Utc::now().into());

        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![source(None, true)]])
                .append_query_results([vec![change(None, &hash)]])
                .append_query_results([vec![checked]])
        );

        let outcome = repo(&conn)
            .record_check(1, observation("tax bands adjusted"))
            .await
            .unwrap();

        assert!(outcome.changed());
        let change = outcome.change.unwrap();
        assert!(change.is_first_observation());
        assert_eq!(outcome.source.last_content_hash.as_deref(), Some(hash.as_str()));
    }

    #[tokio::test]
    async fn test_unchanged_check_only_updates_source() {
        let hash = content_fingerprint("no major changes today");

        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![source(Some(&hash), true)]])
                .append_query_results([vec![source(Some(&hash), true)]])
        );

        let outcome = repo(&conn)
            .record_check(1, observation("no major changes today"))
            .await
            .unwrap();

        assert!(!outcome.changed());
    }

    #[tokio::test]
    async fn test_inactive_source_rejects_check() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![source(None, false)]])
        );

        let err = repo(&conn)
            .record_check(1, observation("anything"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SourceInactive { id: 1 }));
    }

    #[tokio::test]
    async fn test_missing_source_rejects_check() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<MonitoredSource>::new()])
        );

        let err = repo(&conn)
            .record_check(42, observation("anything"))
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::SourceNotFound { .. }));
    }

    #[tokio::test]
    async fn test_malformed_fingerprint_never_reaches_database() {
        let conn = shared(MockDatabase::new(DatabaseBackend::Postgres));

        let err = repo(&conn)
            .record_check(
                1,
                Observation {
                    content_hash: "d41d8cd98f00b204e9800998ecf8427e".into(),
                    ..Default::default()
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::InvalidFormat { .. }));
        assert!(transaction_log(conn).is_empty());
    }

    #[tokio::test]
    async fn test_blank_source_name_is_rejected() {
        let conn = shared(MockDatabase::new(DatabaseBackend::Postgres));

        let err = repo(&conn)
            .register_source("   ", "https://www.fca.org.uk/news")
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[tokio::test]
    async fn test_empty_keyword_search_skips_query() {
        let conn = shared(MockDatabase::new(DatabaseBackend::Postgres));

        let results = repo(&conn)
            .search_enquiries(&EnquirySearch {
                keywords: vec!["  ".into(), String::new()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert!(results.is_empty());
        assert!(transaction_log(conn).is_empty());
    }

    #[tokio::test]
    async fn test_keyword_search_returns_rows() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![enquiry(4), enquiry(1)]])
        );

        let results = repo(&conn)
            .search_enquiries(&EnquirySearch {
                keywords: vec!["VAT".into()],
                ..Default::default()
            })
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(transaction_log(conn).len(), 1);
    }

    #[tokio::test]
    async fn test_reuse_of_missing_enquiry() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 0,
                }])
        );

        let err = repo(&conn).record_enquiry_reuse(99).await.unwrap_err();
        assert!(matches!(err, AppError::EnquiryNotFound { id: 99 }));
    }

    #[tokio::test]
    async fn test_reuse_returns_updated_row() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_exec_results([MockExecResult {
                    last_insert_id: 0,
                    rows_affected: 1,
                }])
                .append_query_results([vec![enquiry(5)]])
        );

        let updated = repo(&conn).record_enquiry_reuse(3).await.unwrap();
        assert_eq!(updated.usage_count, 5);
    }

    #[tokio::test]
    async fn test_seeding_nothing_is_a_no_op() {
        let conn = shared(MockDatabase::new(DatabaseBackend::Postgres));

        let added = repo(&conn).ensure_sources(&[]).await.unwrap();
        assert_eq!(added, 0);
        assert!(transaction_log(conn).is_empty());
    }

    #[tokio::test]
    async fn test_change_page_starts_at_exact_offset() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![source(None, true)]])
                .append_query_results([[BTreeMap::from([(
                    "num_items",
                    Value::BigInt(Some(25)),
                )])]])
                .append_query_results([vec![change(None, &content_fingerprint("v6"))]])
        );

        let (changes, total) = repo(&conn).list_changes_for_source(1, 5, 20).await.unwrap();
        assert_eq!(total, 25);
        assert_eq!(changes.len(), 1);

        let log = transaction_log(conn);
        let page = &log.last().unwrap().statements()[0];
        assert!(page.sql.contains("OFFSET"));
        let values = &page.values.as_ref().unwrap().0;
        assert!(values.contains(&Value::BigUnsigned(Some(5))));
        assert!(values.contains(&Value::BigUnsigned(Some(20))));
    }

    #[tokio::test]
    async fn test_change_page_is_newest_first() {
        let older = content_fingerprint("v1");
        let newer = content_fingerprint("v2");
        let mut first = change(None, &older);
        first.detected_at = (chrono::Utc::now() - chrono::Duration::hours(1)).into();
        let mut second = change(Some(&older), &newer);
        second.id = 11;

        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![source(Some(&newer), true)]])
                .append_query_results([[BTreeMap::from([(
                    "num_items",
                    Value::BigInt(Some(2)),
                )])]])
                .append_query_results([vec![second, first]])
        );

        let (changes, _) = repo(&conn).list_changes_for_source(1, 0, 10).await.unwrap();
        assert_eq!(changes.iter().map(|c| c.id).collect::<Vec<_>>(), vec![11, 10]);

        let log = transaction_log(conn);
        let sql = &log.last().unwrap().statements()[0].sql;
        let by_time = sql.find(r#""detected_at" DESC"#).expect("ordered by detection time");
        let by_id = sql.find(r#""id" DESC"#).expect("ties broken by id");
        assert!(by_time < by_id);
    }

    #[tokio::test]
    async fn test_changes_of_missing_source() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([Vec::<MonitoredSource>::new()])
        );

        let err = repo(&conn).list_changes_for_source(8, 0, 10).await.unwrap_err();
        assert!(matches!(err, AppError::SourceNotFound { .. }));
        assert_eq!(transaction_log(conn).len(), 1);
    }

    #[tokio::test]
    async fn test_oversized_search_limit_is_clamped() {
        let conn = shared(
            MockDatabase::new(DatabaseBackend::Postgres)
                .append_query_results([vec![enquiry(2)]])
        );

        repo(&conn)
            .search_enquiries(&EnquirySearch {
                keywords: vec!["vat".into()],
                limit: u64::MAX,
                ..Default::default()
            })
            .await
            .unwrap();

        let log = transaction_log(conn);
        let values = &log[0].statements()[0].values.as_ref().unwrap().0;
        assert_eq!(values[1], Value::BigInt(Some(MAX_SEARCH_LIMIT as i64)));
    }

    #[test]
    fn test_search_defaults() {
        let search: EnquirySearch = serde_json::from_str(r#"{"keywords": ["vat"]}"#).unwrap();
        assert!(search.verified_only);
        assert_eq!(search.limit, DEFAULT_ENQUIRY_SEARCH_LIMIT);
    }
}
