use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use sql_core::QuestionError;
use thiserror::Error;

/// Failures of the retrieval + generation pipeline.
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error(transparent)]
    InvalidQuery(#[from] QuestionError),

    /// Dataset directory absent or without PDFs; carries the message for the caller.
    #[error("{0}")]
    DatasetNotFound(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM service error: {0}")]
    Llm(String),
}

/// Errors returned by the HTTP layer as `{"error": ...}` bodies.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ApiError {
    #[error("No query provided")]
    NoQuery,

    #[error("Invalid query")]
    InvalidQuery,

    #[error("{0}")]
    DatasetNotFound(String),

    #[error("An error occurred: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the appropriate HTTP status code for this error
    pub fn http_status_code(&self) -> u16 {
        match self {
            ApiError::NoQuery => 400,
            ApiError::InvalidQuery => 400,
            ApiError::DatasetNotFound(_) => 500,
            ApiError::Internal(_) => 500,
        }
    }
}

impl From<InferenceError> for ApiError {
    fn from(err: InferenceError) -> Self {
        match err {
            InferenceError::InvalidQuery(_) => ApiError::InvalidQuery,
            InferenceError::DatasetNotFound(message) => ApiError::DatasetNotFound(message),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
