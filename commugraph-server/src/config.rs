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

use anyhow::Result;
use commugraph_core::{EdgeMode, EngineConfig, ScoringMode};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

/// Commugraph server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub server: HttpServerConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub llm: LLMConfig,
    #[serde(default)]
    pub engine: EngineSettings,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HttpServerConfig {
    /// HTTP API listen address (e.g., "127.0.0.1:48100")
    #[serde(default = "default_http_addr")]
    pub listen_addr: String,

    /// Enable CORS
    #[serde(default = "default_enable_cors")]
    pub enable_cors: bool,

    /// Allowed CORS origins (empty = allow all, use specific origins in production)
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Seed the built-in Russian tag vocabulary into an empty database
    #[serde(default = "default_seed_vocabulary")]
    pub seed_builtin_vocabulary: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LLMConfig {
    /// Active provider: "openai", "anthropic" or "ollama"
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// Model name passed through to the provider
    #[serde(default = "default_llm_model")]
    pub model: String,

    /// OpenAI API key
    pub openai_api_key: Option<String>,

    /// Anthropic API key
    pub anthropic_api_key: Option<String>,

    /// Ollama base URL (e.g., "http://localhost:11434")
    pub ollama_base_url: Option<String>,

    /// Request timeout in seconds for provider calls
    #[serde(default = "default_llm_timeout")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EngineSettings {
    /// Pairwise scoring mode: "max-rule" or "average-degree"
    #[serde(default)]
    pub scoring_mode: ScoringMode,

    /// Edge backing: "persist" (edges stored in SQLite) or "on-demand"
    /// (edges recomputed per request)
    #[serde(default)]
    pub edge_backing: EdgeMode,

    /// Minimum strength for an edge to be persisted
    #[serde(default = "default_persist_threshold")]
    pub persist_threshold: f64,

    /// Minimum strength for an edge computed on demand
    #[serde(default = "default_live_threshold")]
    pub live_threshold: f64,

    /// Mutual top-K cap on edges per profile (0 disables the cap)
    #[serde(default = "default_degree_cap")]
    pub degree_cap: usize,

    /// Records per LLM request during import
    #[serde(default = "default_import_chunk_size")]
    pub import_chunk_size: usize,
}

impl EngineSettings {
    /// Engine configuration handed to `ConnectionEngine`
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig {
            mode: self.scoring_mode,
            persist_threshold: self.persist_threshold,
            live_threshold: self.live_threshold,
            degree_cap: self.degree_cap,
        }
    }
}

// Default values
fn default_http_addr() -> String {
    "127.0.0.1:48100".to_string()
}

fn default_enable_cors() -> bool {
    true
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./data/commugraph.db")
}

fn default_seed_vocabulary() -> bool {
    true
}

fn default_llm_provider() -> String {
    "openai".to_string()
}

fn default_llm_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_llm_timeout() -> u64 {
    60
}

fn default_persist_threshold() -> f64 {
    0.5
}

fn default_live_threshold() -> f64 {
    0.3
}

fn default_degree_cap() -> usize {
    10
}

fn default_import_chunk_size() -> usize {
    5
}

impl Default for HttpServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_http_addr(),
            enable_cors: default_enable_cors(),
            cors_origins: vec![], // Empty = allow all (development mode)
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
            seed_builtin_vocabulary: default_seed_vocabulary(),
        }
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            model: default_llm_model(),
            openai_api_key: None,
            anthropic_api_key: None,
            ollama_base_url: None,
            request_timeout_secs: default_llm_timeout(),
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            scoring_mode: ScoringMode::default(),
            edge_backing: EdgeMode::default(),
            persist_threshold: default_persist_threshold(),
            live_threshold: default_live_threshold(),
            degree_cap: default_degree_cap(),
            import_chunk_size: default_import_chunk_size(),
        }
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server: HttpServerConfig::default(),
            storage: StorageConfig::default(),
            llm: LLMConfig::default(),
            engine: EngineSettings::default(),
        }
    }
}

impl ServerConfig {
    /// Load configuration from TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load configuration from environment variables
    ///
    /// Supported environment variables:
    /// - COMMUGRAPH_HTTP_ADDR: HTTP listen address (default: 127.0.0.1:48100)
    /// - COMMUGRAPH_DB_PATH: SQLite database path (default: ./data/commugraph.db)
    /// - COMMUGRAPH_ENABLE_CORS: Enable CORS (default: true)
    /// - COMMUGRAPH_SEED_VOCABULARY: Seed built-in vocabulary into empty db (default: true)
    /// - COMMUGRAPH_LLM_PROVIDER: LLM provider name (default: openai)
    /// - COMMUGRAPH_LLM_MODEL: Model name (default: gpt-4o-mini)
    /// - COMMUGRAPH_SCORING_MODE: "max-rule" or "average-degree"
    /// - COMMUGRAPH_EDGE_BACKING: "persist" or "on-demand"
    /// - OPENAI_API_KEY, ANTHROPIC_API_KEY, OLLAMA_BASE_URL: provider credentials
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Server configuration
        if let Ok(addr) = std::env::var("COMMUGRAPH_HTTP_ADDR") {
            config.server.listen_addr = addr;
        }

        if let Ok(cors) = std::env::var("COMMUGRAPH_ENABLE_CORS") {
            config.server.enable_cors = cors.parse().unwrap_or(true);
        }

        // Storage configuration
        if let Ok(db_path) = std::env::var("COMMUGRAPH_DB_PATH") {
            config.storage.db_path = PathBuf::from(db_path);
        }

        if let Ok(seed) = std::env::var("COMMUGRAPH_SEED_VOCABULARY") {
            config.storage.seed_builtin_vocabulary = seed.parse().unwrap_or(true);
        }

        // Engine configuration
        if let Ok(mode) = std::env::var("COMMUGRAPH_SCORING_MODE") {
            if let Some(parsed) = parse_scoring_mode(&mode) {
                config.engine.scoring_mode = parsed;
            }
        }

        if let Ok(backing) = std::env::var("COMMUGRAPH_EDGE_BACKING") {
            if let Some(parsed) = parse_edge_backing(&backing) {
                config.engine.edge_backing = parsed;
            }
        }

        // LLM configuration
        if let Ok(provider) = std::env::var("COMMUGRAPH_LLM_PROVIDER") {
            config.llm.provider = provider;
        }

        if let Ok(model) = std::env::var("COMMUGRAPH_LLM_MODEL") {
            config.llm.model = model;
        }

        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            config.llm.openai_api_key = Some(key);
        }

        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            config.llm.anthropic_api_key = Some(key);
        }

        if let Ok(base_url) = std::env::var("OLLAMA_BASE_URL") {
            config.llm.ollama_base_url = Some(base_url);
        }

        config
    }

    /// Load configuration with priority: env > file > defaults
    pub fn load(config_file: Option<PathBuf>) -> Result<Self> {
        let mut config = if let Some(path) = config_file {
            if path.exists() {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(&path)?
            } else {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
        } else {
            Self::default()
        };

        // Override with environment variables
        config = Self::merge_with_env(config);

        Ok(config)
    }

    /// Merge config with environment variables (env takes priority)
    fn merge_with_env(mut config: Self) -> Self {
        let env_config = Self::from_env();

        // Only override if env var was explicitly set
        if std::env::var("COMMUGRAPH_HTTP_ADDR").is_ok() {
            config.server.listen_addr = env_config.server.listen_addr;
        }
        if std::env::var("COMMUGRAPH_ENABLE_CORS").is_ok() {
            config.server.enable_cors = env_config.server.enable_cors;
        }
        if std::env::var("COMMUGRAPH_DB_PATH").is_ok() {
            config.storage.db_path = env_config.storage.db_path;
        }
        if std::env::var("COMMUGRAPH_SEED_VOCABULARY").is_ok() {
            config.storage.seed_builtin_vocabulary = env_config.storage.seed_builtin_vocabulary;
        }
        if std::env::var("COMMUGRAPH_SCORING_MODE").is_ok() {
            config.engine.scoring_mode = env_config.engine.scoring_mode;
        }
        if std::env::var("COMMUGRAPH_EDGE_BACKING").is_ok() {
            config.engine.edge_backing = env_config.engine.edge_backing;
        }
        if std::env::var("COMMUGRAPH_LLM_PROVIDER").is_ok() {
            config.llm.provider = env_config.llm.provider;
        }
        if std::env::var("COMMUGRAPH_LLM_MODEL").is_ok() {
            config.llm.model = env_config.llm.model;
        }
        if std::env::var("OPENAI_API_KEY").is_ok() {
            config.llm.openai_api_key = env_config.llm.openai_api_key;
        }
        if std::env::var("ANTHROPIC_API_KEY").is_ok() {
            config.llm.anthropic_api_key = env_config.llm.anthropic_api_key;
        }
        if std::env::var("OLLAMA_BASE_URL").is_ok() {
            config.llm.ollama_base_url = env_config.llm.ollama_base_url;
        }

        config
    }

    /// Parse listen address as SocketAddr
    pub fn socket_addr(&self) -> Result<SocketAddr> {
        Ok(self.server.listen_addr.parse()?)
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<()> {
        self.socket_addr()?;

        match self.llm.provider.as_str() {
            "openai" | "anthropic" | "ollama" => {}
            other => anyhow::bail!("Unknown LLM provider: {other}"),
        }

        if self.engine.persist_threshold <= 0.0 || self.engine.persist_threshold > 1.0 {
            anyhow::bail!("persist_threshold must be in (0, 1]");
        }

        if self.engine.live_threshold <= 0.0 || self.engine.live_threshold > 1.0 {
            anyhow::bail!("live_threshold must be in (0, 1]");
        }

        if self.engine.import_chunk_size == 0 {
            anyhow::bail!("import_chunk_size must be at least 1");
        }

        Ok(())
    }
}

fn parse_scoring_mode(value: &str) -> Option<ScoringMode> {
    match value {
        "max-rule" => Some(ScoringMode::MaxRule),
        "average-degree" => Some(ScoringMode::AverageDegree),
        _ => None,
    }
}

fn parse_edge_backing(value: &str) -> Option<EdgeMode> {
    match value {
        "persist" => Some(EdgeMode::Persist),
        "on-demand" => Some(EdgeMode::OnDemand),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.server.listen_addr, "127.0.0.1:48100");
        assert!(config.server.enable_cors);
        assert!(config.storage.seed_builtin_vocabulary);
        assert_eq!(config.llm.provider, "openai");
        assert_eq!(config.engine.persist_threshold, 0.5);
        assert_eq!(config.engine.live_threshold, 0.3);
        assert_eq!(config.engine.degree_cap, 10);
        assert_eq!(config.engine.import_chunk_size, 5);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_env() {
        std::env::set_var("COMMUGRAPH_HTTP_ADDR", "0.0.0.0:8080");
        std::env::set_var("COMMUGRAPH_EDGE_BACKING", "on-demand");

        let config = ServerConfig::from_env();
        assert_eq!(config.server.listen_addr, "0.0.0.0:8080");
        assert_eq!(config.engine.edge_backing, EdgeMode::OnDemand);

        std::env::remove_var("COMMUGRAPH_HTTP_ADDR");
        std::env::remove_var("COMMUGRAPH_EDGE_BACKING");
    }

    #[test]
    fn test_partial_toml() {
        let toml_src = r#"
            [server]
            listen_addr = "127.0.0.1:9000"

            [engine]
            scoring_mode = "average-degree"
            degree_cap = 0
        "#;
        let config: ServerConfig = toml::from_str(toml_src).unwrap();
        assert_eq!(config.server.listen_addr, "127.0.0.1:9000");
        assert_eq!(config.engine.scoring_mode, ScoringMode::AverageDegree);
        assert_eq!(config.engine.degree_cap, 0);
        // Untouched sections fall back to defaults.
        assert_eq!(config.storage.db_path, PathBuf::from("./data/commugraph.db"));
        assert_eq!(config.engine.persist_threshold, 0.5);
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let mut config = ServerConfig::default();
        config.engine.persist_threshold = 0.0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.engine.import_chunk_size = 0;
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.llm.provider = "petals".to_string();
        assert!(config.validate().is_err());

        let mut config = ServerConfig::default();
        config.server.listen_addr = "not-an-addr".to_string();
        assert!(config.validate().is_err());
    }
}
