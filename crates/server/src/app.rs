use axum::{
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
    Router,
};
use log::{error, info};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};

use crate::errors::ApiError;
use crate::inference::SqlGenerator;
use crate::models::{TextToSqlRequest, TextToSqlResponse, WelcomeResponse};

async fn home() -> Json<WelcomeResponse> {
    Json(WelcomeResponse::default())
}

async fn health() -> Json<Value> {
    Json(json!({"status": "ok"}))
}

async fn text_to_sql(
    State(generator): State<Arc<SqlGenerator>>,
    body: Bytes,
) -> Result<Json<TextToSqlResponse>, ApiError> {
    let request = TextToSqlRequest::from_body(&body)?;
    info!("Received text-to-sql request");

    let sql_query = generator
        .generate_sql_query(&request.query)
        .await
        .map_err(|e| {
            error!("Text-to-sql request failed: {}", e);
            ApiError::from(e)
        })?;

    Ok(Json(TextToSqlResponse { sql_query }))
}

pub fn create_app(generator: Arc<SqlGenerator>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/", get(home))
        .route("/health", get(health))
        .route("/text-to-sql", post(text_to_sql))
        .route("/api/text-to-sql", post(text_to_sql))
        .layer(cors)
        .with_state(generator)
}
