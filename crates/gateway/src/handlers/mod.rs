//! API handlers module

pub mod changes;
pub mod enquiries;
pub mod health;
pub mod sources;

use changewatch_common::errors::{AppError, Result};
use serde::Deserialize;
use validator::Validate;

/// Largest page any list endpoint returns
pub const MAX_PAGE_SIZE: u64 = 100;

fn default_page_size() -> u64 { 20 }

/// Offset pagination shared by list endpoints
#[derive(Debug, Deserialize)]
pub struct PageQuery {
    #[serde(default)]
    pub offset: u64,

    #[serde(default = "default_page_size")]
    pub limit: u64,
}

impl PageQuery {
    pub fn limit(&self) -> u64 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

/// Run `validator` rules, reporting the first failing field
pub(crate) fn validate_body<T: Validate>(body: &T) -> Result<()> {
    body.validate().map_err(|e| AppError::Validation {
        field: e.field_errors().keys().next().map(|k| k.to_string()),
        message: e.to_string(),
    })
}
