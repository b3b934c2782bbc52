//! changewatch Common Library
//!
//! Shared code for the changewatch services including:
//! - Schema migrations for the monitoring and enquiry tables
//! - Database models and repository patterns
//! - Content fingerprints and keyword normalization
//! - Error types and handling
//! - Configuration management
//! - Metrics and observability

pub mod analysis;
pub mod config;
pub mod db;
pub mod errors;
pub mod fingerprint;
pub mod keywords;
pub mod metrics;

// Re-export commonly used types
pub use config::AppConfig;
pub use db::{DbPool, Migrator, Repository};
pub use errors::{AppError, Result};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default number of stored enquiries returned by a keyword search
pub const DEFAULT_ENQUIRY_SEARCH_LIMIT: u64 = 5;
