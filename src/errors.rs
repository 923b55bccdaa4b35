// src/errors.rs
// DOCUMENTATION: Custom error types and HTTP responses
// PURPOSE: Centralized error handling for entire application

use actix_multipart::MultipartError;
use actix_web::{error::ResponseError, http::header::ContentType, http::StatusCode, HttpResponse};
use thiserror::Error;

/// Application-specific error types
/// DOCUMENTATION: One variant per failure class of the photo/record lifecycle.
/// Each variant maps to an HTTP status; the body is the plain Display text.
#[derive(Error, Debug)]
pub enum StudentsError {
    /// Missing or blank form field, malformed multipart body, oversized upload
    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Student not found")]
    NotFound,

    /// Photo file could not be written or removed
    #[error("Storage error: {0}")]
    StorageError(String),

    /// Record store failure
    #[error("Database error: {0}")]
    PersistenceError(String),
}

impl From<MultipartError> for StudentsError {
    fn from(err: MultipartError) -> Self {
        StudentsError::ValidationError(format!("malformed multipart body: {}", err))
    }
}

impl From<sqlx::Error> for StudentsError {
    fn from(err: sqlx::Error) -> Self {
        StudentsError::PersistenceError(err.to_string())
    }
}

/// Convert StudentsError to HTTP response
/// DOCUMENTATION: Clients get status + plain text, no structured error codes
impl ResponseError for StudentsError {
    fn error_response(&self) -> HttpResponse {
        HttpResponse::build(self.status_code())
            .insert_header(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match self {
            StudentsError::ValidationError(_) => StatusCode::BAD_REQUEST,
            StudentsError::NotFound => StatusCode::NOT_FOUND,
            StudentsError::StorageError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            StudentsError::PersistenceError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}
