//! Detected change entity
//!
//! Rows are written once by the monitor and never updated.

use crate::analysis::ChangeAnalysis;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "detectedchanges")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    pub source_id: Option<i32>,

    pub detected_at: DateTimeWithTimeZone,

    #[sea_orm(column_type = "String(StringLen::N(64))", nullable)]
    pub previous_content_hash: Option<String>,

    #[sea_orm(column_type = "String(StringLen::N(64))")]
    pub new_content_hash: String,

    #[sea_orm(column_type = "Text", nullable)]
    pub change_summary_from_agent: Option<String>,

    /// Analyser output as JSONB
    #[sea_orm(column_type = "JsonBinary", nullable)]
    pub raw_ai_analysis_result: Option<Json>,

    #[sea_orm(column_type = "Text", nullable)]
    pub full_text_snippet_from_change: Option<String>,

    /// Specific item URL when it differs from the source URL
    #[sea_orm(column_type = "Text", nullable)]
    pub url_of_change: Option<String>,
}

impl Model {
    /// Typed view of the analysis payload, if it has the expected shape
    pub fn analysis(&self) -> Option<ChangeAnalysis> {
        self.raw_ai_analysis_result.as_ref().and_then(ChangeAnalysis::from_json)
    }

    /// Whether this was the first content ever recorded for its source
    pub fn is_first_observation(&self) -> bool {
        self.previous_content_hash.is_none()
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::monitored_source::Entity",
        from = "Column::SourceId",
        to = "super::monitored_source::Column::Id",
        on_delete = "Cascade"
    )]
    MonitoredSource,
}

impl Related<super::monitored_source::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitoredSource.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
