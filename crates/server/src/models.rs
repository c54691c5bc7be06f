use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ApiError;

pub const WELCOME_MESSAGE: &str =
    "Welcome to the Text-to-SQL API. Use POST /api/text-to-sql to convert text to SQL queries.";

/// Body of `POST /text-to-sql`, after validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToSqlRequest {
    pub query: String,
}

impl TextToSqlRequest {
    /// Validates a raw request body.
    ///
    /// Anything that is not a JSON object with a `query` key is "no query";
    /// a `query` that is not a non-blank string is "invalid".
    pub fn from_body(body: &[u8]) -> Result<Self, ApiError> {
        let value: Value = serde_json::from_slice(body).map_err(|_| ApiError::NoQuery)?;
        let query = value
            .as_object()
            .and_then(|object| object.get("query"))
            .ok_or(ApiError::NoQuery)?;

        match query.as_str() {
            Some(text) if !text.trim().is_empty() => Ok(Self {
                query: text.to_string(),
            }),
            _ => Err(ApiError::InvalidQuery),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextToSqlResponse {
    pub sql_query: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WelcomeResponse {
    pub message: String,
}

impl Default for WelcomeResponse {
    fn default() -> Self {
        Self {
            message: WELCOME_MESSAGE.to_string(),
        }
    }
}
