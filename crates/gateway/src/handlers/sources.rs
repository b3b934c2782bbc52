//! Monitored source handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use validator::Validate;

use super::{validate_body, PageQuery};
use crate::AppState;
use changewatch_common::{
    db::{
        models::{DetectedChange, MonitoredSource},
        CheckOutcome, Observation, Repository,
    },
    errors::{AppError, Result},
};

/// Request to register a source
#[derive(Debug, Deserialize, Validate)]
pub struct CreateSourceRequest {
    #[validate(length(min = 1, max = 255))]
    pub name: String,

    #[validate(url)]
    pub url: String,
}

/// Suspend or resume a source
#[derive(Debug, Deserialize)]
pub struct UpdateSourceRequest {
    pub is_active: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct ListSourcesQuery {
    #[serde(default)]
    pub active_only: bool,
}

#[derive(Serialize)]
pub struct ChangeListResponse {
    pub changes: Vec<DetectedChange>,
    pub total: u64,
    pub offset: u64,
    pub limit: u64,
}

fn source_not_found(id: i32) -> AppError {
    AppError::SourceNotFound { id: id.to_string() }
}

pub async fn list_sources(
    State(state): State<AppState>,
    Query(query): Query<ListSourcesQuery>,
) -> Result<Json<Vec<MonitoredSource>>> {
    let repo = Repository::new(state.db.clone());
    Ok(Json(repo.list_sources(query.active_only).await?))
}

/// Register a new source
pub async fn create_source(
    State(state): State<AppState>,
    Json(request): Json<CreateSourceRequest>,
) -> Result<(StatusCode, Json<MonitoredSource>)> {
    validate_body(&request)?;

    let repo = Repository::new(state.db.clone());
    let source = repo.register_source(request.name.trim(), &request.url).await?;

    tracing::info!(source_id = source.id, name = %source.name, "Source registered");

    Ok((StatusCode::CREATED, Json(source)))
}

pub async fn get_source(
    State(state): State<AppState>,
    Path(source_id): Path<i32>,
) -> Result<Json<MonitoredSource>> {
    let repo = Repository::new(state.db.clone());

    let source = repo
        .find_source_by_id(source_id)
        .await?
        .ok_or_else(|| source_not_found(source_id))?;

    Ok(Json(source))
}

pub async fn update_source(
    State(state): State<AppState>,
    Path(source_id): Path<i32>,
    Json(request): Json<UpdateSourceRequest>,
) -> Result<Json<MonitoredSource>> {
    let repo = Repository::new(state.db.clone());
    let source = repo.set_source_active(source_id, request.is_active).await?;

    tracing::info!(source_id, is_active = source.is_active, "Source updated");

    Ok(Json(source))
}

/// Delete a source together with its detected changes
pub async fn delete_source(
    State(state): State<AppState>,
    Path(source_id): Path<i32>,
) -> Result<StatusCode> {
    let repo = Repository::new(state.db.clone());

    if !repo.delete_source(source_id).await? {
        return Err(source_not_found(source_id));
    }

    tracing::info!(source_id, "Source deleted");

    Ok(StatusCode::NO_CONTENT)
}

/// Record a check. 201 when it produced a change, 200 otherwise.
pub async fn record_check(
    State(state): State<AppState>,
    Path(source_id): Path<i32>,
    Json(observation): Json<Observation>,
) -> Result<(StatusCode, Json<CheckOutcome>)> {
    let repo = Repository::new(state.db.clone());
    let outcome = repo.record_check(source_id, observation).await?;

    let status = if outcome.changed() { StatusCode::CREATED } else { StatusCode::OK };
    Ok((status, Json(outcome)))
}

pub async fn list_source_changes(
    State(state): State<AppState>,
    Path(source_id): Path<i32>,
    Query(page): Query<PageQuery>,
) -> Result<Json<ChangeListResponse>> {
    let repo = Repository::new(state.db.clone());
    let limit = page.limit();

    let (changes, total) = repo
        .list_changes_for_source(source_id, page.offset, limit)
        .await?;

    Ok(Json(ChangeListResponse {
        changes,
        total,
        offset: page.offset,
        limit,
    }))
}
