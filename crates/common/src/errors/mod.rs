//! Error types for changewatch services
//!
//! Provides a comprehensive error handling system with:
//! - Distinct error types for different failure modes
//! - Relational constraint violations recovered from the driver
//! - HTTP status code mapping
//! - Structured error responses

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, RuntimeErr};
use serde::{Deserialize, Serialize};
use sqlx::error::ErrorKind;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,
    InvalidFormat,

    // Resource errors (4xxx)
    NotFound,
    SourceNotFound,
    ChangeNotFound,
    EnquiryNotFound,

    // Conflict errors (5xxx)
    DuplicateSource,
    SourceInactive,
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    CheckViolation,

    // Rate limiting (6xxx)
    RateLimited,

    // Database errors (7xxx)
    DatabaseError,
    ConnectionError,
    MigrationError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
    SerializationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            // Validation (1xxx)
            ErrorCode::ValidationError => 1001,
            ErrorCode::InvalidFormat => 1003,

            // Resources (4xxx)
            ErrorCode::NotFound => 4001,
            ErrorCode::SourceNotFound => 4002,
            ErrorCode::ChangeNotFound => 4003,
            ErrorCode::EnquiryNotFound => 4004,

            // Conflicts (5xxx)
            ErrorCode::DuplicateSource => 5002,
            ErrorCode::SourceInactive => 5003,
            ErrorCode::UniqueViolation => 5004,
            ErrorCode::ForeignKeyViolation => 5005,
            ErrorCode::NotNullViolation => 5006,
            ErrorCode::CheckViolation => 5007,

            // Rate limits (6xxx)
            ErrorCode::RateLimited => 6001,

            // Database (7xxx)
            ErrorCode::DatabaseError => 7001,
            ErrorCode::ConnectionError => 7002,
            ErrorCode::MigrationError => 7003,

            // Internal (9xxx)
            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
            ErrorCode::SerializationError => 9003,
        }
    }
}

/// A relational constraint the database refused to break
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConstraintViolation {
    Unique { constraint: Option<String> },
    ForeignKey { constraint: Option<String> },
    NotNull { column: Option<String> },
    Check { constraint: Option<String> },
}

impl ConstraintViolation {
    /// Recover the violated constraint from a driver error, if that is what it was
    pub fn from_db_err(err: &DbErr) -> Option<Self> {
        let db_err = match err {
            DbErr::Exec(RuntimeErr::SqlxError(sqlx::Error::Database(e)))
            | DbErr::Query(RuntimeErr::SqlxError(sqlx::Error::Database(e))) => e,
            _ => return None,
        };

        let constraint = db_err.constraint().map(str::to_string);

        match db_err.kind() {
            ErrorKind::UniqueViolation => Some(Self::Unique { constraint }),
            ErrorKind::ForeignKeyViolation => Some(Self::ForeignKey { constraint }),
            ErrorKind::NotNullViolation => {
                let column = db_err
                    .try_downcast_ref::<sqlx::postgres::PgDatabaseError>()
                    .and_then(|pg| pg.column())
                    .map(str::to_string);
                Some(Self::NotNull { column })
            }
            ErrorKind::CheckViolation => Some(Self::Check { constraint }),
            _ => None,
        }
    }

    fn describe(&self) -> String {
        fn named(kind: &str, name: &Option<String>) -> String {
            match name {
                Some(name) => format!("{} ({})", kind, name),
                None => kind.to_string(),
            }
        }

        match self {
            Self::Unique { constraint } => named("unique constraint", constraint),
            Self::ForeignKey { constraint } => named("foreign key", constraint),
            Self::NotNull { column } => named("not-null column", column),
            Self::Check { constraint } => named("check constraint", constraint),
        }
    }
}

impl std::fmt::Display for ConstraintViolation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.describe())
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("Invalid format: {message}")]
    InvalidFormat { message: String },

    // Resource errors
    #[error("Resource not found: {resource_type} with id {id}")]
    NotFound { resource_type: String, id: String },

    #[error("Monitored source not found: {id}")]
    SourceNotFound { id: String },

    #[error("Detected change not found: {id}")]
    ChangeNotFound { id: i32 },

    #[error("Enquiry not found: {id}")]
    EnquiryNotFound { id: i32 },

    // Conflict errors
    #[error("A monitored source named '{name}' already exists")]
    DuplicateSource { name: String },

    #[error("Monitored source {id} is not active")]
    SourceInactive { id: i32 },

    #[error("Constraint violation: {0}")]
    Constraint(ConstraintViolation),

    // Rate limiting
    #[error("Rate limit exceeded: {limit} requests per second")]
    RateLimited { limit: u32 },

    // Database errors
    #[error("Database error: {0}")]
    Database(DbErr),

    #[error("Database connection error: {message}")]
    DatabaseConnection { message: String },

    #[error("Migration error: {message}")]
    Migration { message: String },

    // Internal errors
    #[error("Internal server error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::InvalidFormat { .. } => ErrorCode::InvalidFormat,
            AppError::NotFound { .. } => ErrorCode::NotFound,
            AppError::SourceNotFound { .. } => ErrorCode::SourceNotFound,
            AppError::ChangeNotFound { .. } => ErrorCode::ChangeNotFound,
            AppError::EnquiryNotFound { .. } => ErrorCode::EnquiryNotFound,
            AppError::DuplicateSource { .. } => ErrorCode::DuplicateSource,
            AppError::SourceInactive { .. } => ErrorCode::SourceInactive,
            AppError::Constraint(violation) => match violation {
                ConstraintViolation::Unique { .. } => ErrorCode::UniqueViolation,
                ConstraintViolation::ForeignKey { .. } => ErrorCode::ForeignKeyViolation,
                ConstraintViolation::NotNull { .. } => ErrorCode::NotNullViolation,
                ConstraintViolation::Check { .. } => ErrorCode::CheckViolation,
            },
            AppError::RateLimited { .. } => ErrorCode::RateLimited,
            AppError::Database(_) => ErrorCode::DatabaseError,
            AppError::DatabaseConnection { .. } => ErrorCode::ConnectionError,
            AppError::Migration { .. } => ErrorCode::MigrationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Serialization(_) => ErrorCode::SerializationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Get the HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            // 400 Bad Request
            AppError::Validation { .. } |
            AppError::InvalidFormat { .. } => StatusCode::BAD_REQUEST,

            // 404 Not Found
            AppError::NotFound { .. } |
            AppError::SourceNotFound { .. } |
            AppError::ChangeNotFound { .. } |
            AppError::EnquiryNotFound { .. } => StatusCode::NOT_FOUND,

            // 409 Conflict
            AppError::DuplicateSource { .. } |
            AppError::SourceInactive { .. } |
            AppError::Constraint(ConstraintViolation::Unique { .. }) => StatusCode::CONFLICT,

            // 422 Unprocessable Entity
            AppError::Constraint(_) => StatusCode::UNPROCESSABLE_ENTITY,

            // 429 Too Many Requests
            AppError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,

            // 500 Internal Server Error
            AppError::Database(_) |
            AppError::Migration { .. } |
            AppError::Internal { .. } |
            AppError::Configuration { .. } |
            AppError::Serialization(_) |
            AppError::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,

            // 503 Service Unavailable
            AppError::DatabaseConnection { .. } => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Check if this error should be logged at error level
    pub fn is_server_error(&self) -> bool {
        self.status_code().is_server_error()
    }

    /// Check if this error is a client error
    pub fn is_client_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// The violated constraint, when the database rejected a write
    pub fn constraint_violation(&self) -> Option<&ConstraintViolation> {
        match self {
            AppError::Constraint(violation) => Some(violation),
            _ => None,
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        match ConstraintViolation::from_db_err(&err) {
            Some(violation) => AppError::Constraint(violation),
            None => match err {
                DbErr::Conn(e) => AppError::DatabaseConnection { message: e.to_string() },
                other => AppError::Database(other),
            },
        }
    }
}

/// Structured error response for API
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: ErrorDetails,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorDetails {
    pub code: ErrorCode,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        // Log based on severity
        if self.is_server_error() {
            tracing::error!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Server error"
            );
        } else if self.is_client_error() {
            tracing::warn!(
                error = %message,
                code = ?code,
                status = status.as_u16(),
                "Client error"
            );
        }

        let field = match &self {
            AppError::Validation { field, .. } => field.clone(),
            AppError::Constraint(ConstraintViolation::NotNull { column }) => column.clone(),
            _ => None,
        };

        let body = ErrorResponse {
            error: ErrorDetails {
                code,
                message,
                field,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::SourceNotFound { id: "7".into() };
        assert_eq!(err.code(), ErrorCode::SourceNotFound);
        assert_eq!(err.status_code(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_conflicts_carry_specific_codes() {
        let duplicate = AppError::DuplicateSource { name: "FCA_Regulations".into() };
        assert_eq!(duplicate.status_code(), StatusCode::CONFLICT);
        assert_eq!(duplicate.code(), ErrorCode::DuplicateSource);
        assert_eq!(duplicate.code().as_code(), 5002);

        let inactive = AppError::SourceInactive { id: 4 };
        assert_eq!(inactive.status_code(), StatusCode::CONFLICT);
        assert_eq!(inactive.code().as_code(), 5003);
    }

    #[test]
    fn test_validation_error() {
        let err = AppError::Validation {
            message: "Invalid name".into(),
            field: Some("name".into()),
        };
        assert_eq!(err.status_code(), StatusCode::BAD_REQUEST);
        assert!(!err.is_server_error());
        assert!(err.is_client_error());
    }

    #[test]
    fn test_constraint_status_codes() {
        let unique = AppError::Constraint(ConstraintViolation::Unique {
            constraint: Some("monitoredsources_name_key".into()),
        });
        assert_eq!(unique.status_code(), StatusCode::CONFLICT);
        assert_eq!(unique.code(), ErrorCode::UniqueViolation);
        assert_eq!(
            unique.to_string(),
            "Constraint violation: unique constraint (monitoredsources_name_key)"
        );

        let fk = AppError::Constraint(ConstraintViolation::ForeignKey { constraint: None });
        assert_eq!(fk.status_code(), StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(fk.code().as_code(), 5005);
    }

    #[test]
    fn test_non_driver_errors_are_not_constraints() {
        let err: AppError = DbErr::RecordNotFound("monitoredsources".into()).into();
        assert!(err.constraint_violation().is_none());
        assert_eq!(err.code(), ErrorCode::DatabaseError);
    }

    #[test]
    fn test_server_error() {
        let err = AppError::Internal {
            message: "Something went wrong".into()
        };
        assert_eq!(err.status_code(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(err.is_server_error());
    }
}
