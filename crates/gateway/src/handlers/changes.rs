//! Detected change handlers

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Serialize;

use super::PageQuery;
use crate::AppState;
use changewatch_common::{
    analysis::ChangeAnalysis,
    db::{models::DetectedChange, Repository},
    errors::{AppError, Result},
};

/// A change with its analysis parsed, when the payload has the known shape
#[derive(Serialize)]
pub struct ChangeResponse {
    #[serde(flatten)]
    pub change: DetectedChange,
    pub analysis: Option<ChangeAnalysis>,
    pub is_first_observation: bool,
}

impl From<DetectedChange> for ChangeResponse {
    fn from(change: DetectedChange) -> Self {
        Self {
            analysis: change.analysis(),
            is_first_observation: change.is_first_observation(),
            change,
        }
    }
}

/// Latest changes across all sources
pub async fn recent_changes(
    State(state): State<AppState>,
    Query(page): Query<PageQuery>,
) -> Result<Json<Vec<DetectedChange>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.recent_changes(page.limit()).await?))
}

pub async fn get_change(
    State(state): State<AppState>,
    Path(change_id): Path<i32>,
) -> Result<Json<ChangeResponse>> {
    let repo = Repository::new(state.db.clone());

    let change = repo
        .find_change_by_id(change_id)
        .await?
        .ok_or(AppError::ChangeNotFound { id: change_id })?;

    Ok(Json(change.into()))
}
