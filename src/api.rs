// src/api.rs
//! HTTP surface. One real route: POST /inbound/email consumes the webhook
//! payload and returns the structured run report. Only validation and
//! lookup failures map to non-2xx; everything else is inside the report.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;
use tower_http::cors::CorsLayer;

use crate::error::IngestError;
use crate::pipeline::{InboundEmail, Pipeline};

#[derive(Clone)]
pub struct AppState {
    pub pipeline: Arc<Pipeline>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "OK" }))
        .route("/inbound/email", post(inbound_email))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Serialize)]
struct ErrorBody {
    success: bool,
    error: String,
}

fn status_for(err: &IngestError) -> StatusCode {
    match err {
        IngestError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        IngestError::Lookup(_) => StatusCode::NOT_FOUND,
        IngestError::ExternalService(_) | IngestError::Persistence(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

async fn inbound_email(
    State(state): State<AppState>,
    Json(msg): Json<InboundEmail>,
) -> Response {
    match state.pipeline.process(msg).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => {
            let body = ErrorBody {
                success: false,
                error: err.to_string(),
            };
            (status_for(&err), Json(body)).into_response()
        }
    }
}
