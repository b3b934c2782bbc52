//! Monitored source entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monitoredsources")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,

    #[sea_orm(column_type = "String(StringLen::N(255))", unique)]
    pub name: String,

    #[sea_orm(column_type = "Text")]
    pub url: String,

    pub last_checked_at: Option<DateTimeWithTimeZone>,

    /// Fingerprint of the content seen at the last check
    #[sea_orm(column_type = "String(StringLen::N(64))", nullable)]
    pub last_content_hash: Option<String>,

    #[sea_orm(column_type = "Text", nullable)]
    pub last_summary: Option<String>,

    pub is_active: bool,
}

impl Model {
    /// Whether content with this fingerprint differs from what was last seen.
    /// A source that was never checked has always changed.
    pub fn is_changed_by(&self, fingerprint: &str) -> bool {
        self.last_content_hash.as_deref() != Some(fingerprint)
    }
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::detected_change::Entity")]
    DetectedChanges,
}

impl Related<super::detected_change::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DetectedChanges.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
