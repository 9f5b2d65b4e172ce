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
use crate::llm::ChatMessage;
use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use commugraph_core::ProfileId;
use serde::{Deserialize, Serialize};

/// Request body for POST /api/assistant
#[derive(Debug, Deserialize)]
pub struct AssistantRequest {
    pub messages: Vec<IncomingMessage>,
}

#[derive(Debug, Deserialize)]
pub struct IncomingMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantResponse {
    pub reply: String,
    pub related_profile_ids: Vec<ProfileId>,
}

/// POST /api/assistant - one conversation turn over the roster
///
/// Clients send conversation history with "user" and "assistant" roles;
/// the roster system prompt is always built server-side.
#[tracing::instrument(skip(state, request), fields(messages = request.messages.len()))]
pub async fn assistant_chat(
    State(state): State<AppState>,
    Json(request): Json<AssistantRequest>,
) -> Result<impl IntoResponse, ApiError> {
    if request.messages.is_empty() {
        return Err(ApiError::BadRequest("messages must not be empty".to_string()));
    }

    let mut messages = Vec::with_capacity(request.messages.len());
    for message in request.messages {
        if message.role != "user" && message.role != "assistant" {
            return Err(ApiError::BadRequest(format!(
                "unsupported role: {}",
                message.role
            )));
        }
        messages.push(ChatMessage {
            role: message.role,
            content: message.content,
        });
    }

    let reply = state.assistant.respond(messages).await?;
    Ok(Json(AssistantResponse {
        reply: reply.reply,
        related_profile_ids: reply.related_profile_ids,
    }))
}
