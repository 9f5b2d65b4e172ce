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

use crate::api::{ApiError, AppState};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use commugraph_core::RawPost;
use serde::Deserialize;

/// Request body for POST /api/import
#[derive(Debug, Deserialize)]
pub struct ImportRequest {
    pub records: Vec<RawPost>,
}

/// POST /api/import - run an import batch over raw posts
///
/// Extraction failures surface inside the report; only store failures
/// become HTTP errors.
#[tracing::instrument(skip(state, request), fields(records = request.records.len()))]
pub async fn import_profiles(
    State(state): State<AppState>,
    Json(request): Json<ImportRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.records.is_empty() {
        return Err(ApiError::BadRequest("records must not be empty".to_string()));
    }

    let report = state.importer.run(request.records).await?;
    Ok(Json(report))
}
