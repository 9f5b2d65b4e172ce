// Copyright 2025 Commugraph Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! HTTP API surface: shared state, the error envelope, and handlers.

pub mod assistant;
pub mod graph;
pub mod import;
pub mod vocabulary;

use crate::assistant::{Assistant, AssistantError};
use crate::graph::GraphService;
use crate::import::Importer;
use crate::llm::LLMError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use commugraph_core::ConnectionEngine;
use commugraph_storage::{SqliteStore, StoreError};
use serde::Serialize;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<SqliteStore>,
    pub engine: Arc<ConnectionEngine>,
    pub graph: Arc<GraphService>,
    pub importer: Arc<Importer>,
    pub assistant: Arc<Assistant>,
}

/// API error type
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Upstream failure: {0}")]
    Upstream(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::Upstream(msg) => (StatusCode::BAD_GATEWAY, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };

        (status, Json(ErrorResponse { error: message })).into_response()
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<LLMError> for ApiError {
    fn from(err: LLMError) -> Self {
        match err {
            // Missing credentials are a deployment problem, not the caller's.
            LLMError::NotConfigured(_) => ApiError::Internal(err.to_string()),
            LLMError::Provider(_) | LLMError::InvalidResponse(_) => {
                ApiError::Upstream(err.to_string())
            }
        }
    }
}

impl From<AssistantError> for ApiError {
    fn from(err: AssistantError) -> Self {
        match err {
            AssistantError::EmptyRoster => ApiError::BadRequest(err.to_string()),
            AssistantError::Llm(llm) => llm.into(),
            AssistantError::Store(store) => store.into(),
            AssistantError::Malformed(_) => ApiError::Upstream(err.to_string()),
        }
    }
}

/// Health check response structure
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// GET /health
pub async fn health_check() -> impl IntoResponse {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
