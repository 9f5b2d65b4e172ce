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
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use axum::Json;
use commugraph_core::ProfileFilter;
use serde::Deserialize;

/// Query parameters for GET /api/graph
#[derive(Debug, Deserialize)]
pub struct GraphQueryParams {
    /// Name substring (case-insensitive) or exact tag name
    #[serde(default)]
    pub search: Option<String>,
    /// Exact cluster label
    #[serde(default)]
    pub cluster: Option<String>,
}

/// GET /api/graph - participants and connections, optionally filtered
#[tracing::instrument(skip(state))]
pub async fn get_graph(
    State(state): State<AppState>,
    Query(params): Query<GraphQueryParams>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = ProfileFilter::new(params.search, params.cluster);
    let view = state.graph.get_graph(&filter)?;
    Ok(Json(view))
}
