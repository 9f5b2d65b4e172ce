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

//! Commugraph Server
//!
//! HTTP API over the community graph: import raw posts through LLM
//! extraction, serve the participant/connection view, expose the tag
//! vocabulary and answer roster questions through the assistant.

use anyhow::Result;
use axum::http::HeaderValue;
use axum::routing::{get, post};
use axum::Router;
use commugraph_core::{ConnectionEngine, Vocabulary};
use commugraph_storage::SqliteStore;
use std::sync::Arc;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

pub mod api;
pub mod assistant;
pub mod config;
pub mod extract;
pub mod graph;
pub mod import;
pub mod llm;

use api::AppState;
use assistant::Assistant;
use config::ServerConfig;
use extract::{LLMExtractor, ProfileExtractor};
use graph::GraphService;
use import::Importer;
use llm::LLMProviderManager;

pub async fn run_server(config: ServerConfig) -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "commugraph=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Commugraph Server");
    config.validate()?;

    tracing::info!("Opening database at {:?}", config.storage.db_path);
    let store = Arc::new(SqliteStore::open(&config.storage.db_path)?);

    if config.storage.seed_builtin_vocabulary && store.vocabulary_is_empty()? {
        tracing::info!("Seeding builtin vocabulary into empty database");
        store.seed_vocabulary(&Vocabulary::builtin())?;
    }
    let vocabulary = Arc::new(store.load_vocabulary()?);
    tracing::info!(
        categories = vocabulary.categories().len(),
        tags = vocabulary.tags().len(),
        clusters = vocabulary.clusters().len(),
        affinities = vocabulary.affinities().len(),
        "Vocabulary loaded"
    );

    let engine = Arc::new(ConnectionEngine::new(
        vocabulary,
        config.engine.engine_config(),
    ));
    tracing::info!(
        backing = config.engine.edge_backing.as_str(),
        "Connection engine ready"
    );

    let llm = Arc::new(LLMProviderManager::new(&config.llm));
    if !llm.is_configured() {
        tracing::warn!(
            provider = %config.llm.provider,
            "Default LLM provider has no credentials; import and assistant requests will fail"
        );
    }

    let extractor: Arc<dyn ProfileExtractor> = Arc::new(LLMExtractor::new(llm.clone()));
    let importer = Arc::new(Importer::new(
        store.clone(),
        engine.clone(),
        extractor,
        config.engine.import_chunk_size,
        config.engine.edge_backing,
    ));
    let graph = Arc::new(GraphService::new(
        store.clone(),
        engine.clone(),
        config.engine.edge_backing,
    ));
    let assistant = Arc::new(Assistant::new(store.clone(), llm));

    let state = AppState {
        store,
        engine,
        graph,
        importer,
        assistant,
    };

    let app = Router::new()
        .route("/health", get(api::health_check))
        .route("/api/graph", get(api::graph::get_graph))
        .route("/api/vocabulary", get(api::vocabulary::get_vocabulary))
        .route("/api/import", post(api::import::import_profiles))
        .route("/api/assistant", post(api::assistant::assistant_chat))
        .with_state(state)
        .layer(if config.server.enable_cors {
            let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);
            if config.server.cors_origins.is_empty() {
                tracing::warn!(
                    "CORS: Allowing all origins (development mode). Set cors_origins in production!"
                );
                cors.allow_origin(Any)
            } else {
                let origins: Vec<HeaderValue> = config
                    .server
                    .cors_origins
                    .iter()
                    .filter_map(|origin| match origin.parse() {
                        Ok(value) => Some(value),
                        Err(_) => {
                            tracing::warn!("Ignoring invalid CORS origin: {origin}");
                            None
                        }
                    })
                    .collect();
                tracing::info!("CORS: Allowing origins: {:?}", config.server.cors_origins);
                cors.allow_origin(AllowOrigin::list(origins))
            }
        } else {
            CorsLayer::new()
        })
        .layer(TraceLayer::new_for_http());

    let addr = config.socket_addr()?;
    tracing::info!("Commugraph API listening on http://{}", addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
