//! Enquiry handlers: store answers, find them again by keyword, count reuse

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use validator::Validate;

use super::{validate_body, MAX_PAGE_SIZE};
use crate::AppState;
use changewatch_common::{
    db::{models::UserEnquiry, EnquirySearch, NewEnquiry, Repository},
    errors::{AppError, Result},
    DEFAULT_ENQUIRY_SEARCH_LIMIT,
};

/// Body for creating or replacing an enquiry
#[derive(Debug, Deserialize, Validate)]
pub struct EnquiryRequest {
    #[validate(length(min = 1, max = 10000))]
    pub question_text: String,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub keywords: Vec<String>,

    #[serde(default)]
    pub ai_generated_information: Option<String>,

    #[serde(default)]
    #[validate(length(max = 50))]
    pub ai_identified_urls: Vec<String>,

    #[serde(default)]
    pub fetched_content_summary: Option<String>,

    #[serde(default)]
    #[validate(length(max = 100))]
    pub source_of_answer: Option<String>,

    #[serde(default)]
    pub is_verified: bool,
}

impl From<EnquiryRequest> for NewEnquiry {
    fn from(request: EnquiryRequest) -> Self {
        NewEnquiry {
            question_text: request.question_text,
            keywords: request.keywords,
            ai_generated_information: request.ai_generated_information,
            ai_identified_urls: request.ai_identified_urls,
            fetched_content_summary: request.fetched_content_summary,
            source_of_answer: request.source_of_answer,
            is_verified: request.is_verified,
        }
    }
}

fn default_verified_only() -> bool { true }
fn default_search_limit() -> u64 { DEFAULT_ENQUIRY_SEARCH_LIMIT }

#[derive(Debug, Deserialize, Validate)]
pub struct SearchRequest {
    #[validate(length(max = 50))]
    pub keywords: Vec<String>,

    #[serde(default = "default_verified_only")]
    pub verified_only: bool,

    #[serde(default = "default_search_limit")]
    #[validate(range(min = 1, max = 100))]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct VerificationRequest {
    pub is_verified: bool,
}

pub async fn create_enquiry(
    State(state): State<AppState>,
    Json(request): Json<EnquiryRequest>,
) -> Result<(StatusCode, Json<UserEnquiry>)> {
    validate_body(&request)?;

    let repo = Repository::new(state.db.clone());
    let enquiry = repo.create_enquiry(request.into()).await?;

    tracing::info!(
        enquiry_id = enquiry.id,
        state = ?enquiry.answer_state(),
        keywords = enquiry.keyword_list().len(),
        "Enquiry stored"
    );

    Ok((StatusCode::CREATED, Json(enquiry)))
}

pub async fn get_enquiry(
    State(state): State<AppState>,
    Path(enquiry_id): Path<i32>,
) -> Result<Json<UserEnquiry>> {
    let repo = Repository::new(state.db.clone());

    let enquiry = repo
        .find_enquiry_by_id(enquiry_id)
        .await?
        .ok_or(AppError::EnquiryNotFound { id: enquiry_id })?;

    Ok(Json(enquiry))
}

/// Replace an enquiry's question and answer fields
pub async fn update_enquiry(
    State(state): State<AppState>,
    Path(enquiry_id): Path<i32>,
    Json(request): Json<EnquiryRequest>,
) -> Result<Json<UserEnquiry>> {
    validate_body(&request)?;

    let repo = Repository::new(state.db.clone());
    let enquiry = repo.update_enquiry(enquiry_id, request.into()).await?;

    Ok(Json(enquiry))
}

/// Stored enquiries sharing a keyword with the request
pub async fn search_enquiries(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<Vec<UserEnquiry>>> {
    validate_body(&request)?;

    let repo = Repository::new(state.db.clone());
    let results = repo
        .search_enquiries(&EnquirySearch {
            keywords: request.keywords,
            verified_only: request.verified_only,
            limit: request.limit.min(MAX_PAGE_SIZE),
        })
        .await?;

    Ok(Json(results))
}

/// Count a reuse of the stored answer
pub async fn reuse_enquiry(
    State(state): State<AppState>,
    Path(enquiry_id): Path<i32>,
) -> Result<Json<UserEnquiry>> {
    let repo = Repository::new(state.db.clone());
    let enquiry = repo.record_enquiry_reuse(enquiry_id).await?;

    tracing::debug!(
        enquiry_id,
        usage_count = enquiry.usage_count,
        reusable = enquiry.is_reusable(),
        "Enquiry reused"
    );

    Ok(Json(enquiry))
}

pub async fn set_verification(
    State(state): State<AppState>,
    Path(enquiry_id): Path<i32>,
    Json(request): Json<VerificationRequest>,
) -> Result<Json<UserEnquiry>> {
    let repo = Repository::new(state.db.clone());
    let enquiry = repo.set_enquiry_verified(enquiry_id, request.is_verified).await?;

    tracing::info!(enquiry_id, is_verified = enquiry.is_verified, "Enquiry verification changed");

    Ok(Json(enquiry))
}
