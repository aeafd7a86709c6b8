use serde::{Deserialize, Serialize};

/// Top-level application settings container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct AppSettings {
    #[serde(default)]
    pub storage: StorageSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Which record store backs the library.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    Memory,
    Sqlite,
    Remote,
}

impl std::str::FromStr for StoreBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(StoreBackend::Memory),
            "sqlite" => Ok(StoreBackend::Sqlite),
            "remote" => Ok(StoreBackend::Remote),
            other => Err(format!("unknown store backend: {}", other)),
        }
    }
}

/// Record store selection and backend-specific options.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct StorageSettings {
    pub backend: StoreBackend,
    /// SQLite file path; defaults to `tagshelf.db` in the data directory.
    #[serde(default)]
    pub database_path: Option<String>,
    /// Simulated latency for the in-memory backend, in milliseconds.
    #[serde(default)]
    pub memory_latency_ms: u64,
    #[serde(default)]
    pub remote: RemoteStoreSettings,
}

impl Default for StorageSettings {
    fn default() -> Self {
        Self {
            backend: StoreBackend::Memory,
            database_path: None,
            memory_latency_ms: 0,
            remote: RemoteStoreSettings::default(),
        }
    }
}

/// Connection details for the hosted record API.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RemoteStoreSettings {
    pub base_url: String,
    pub bookmark_table: String,
    pub folder_table: String,
    /// Name of the environment variable holding the project key.
    pub api_key_env: String,
}

impl Default for RemoteStoreSettings {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8787/api".to_string(),
            bookmark_table: "bookmark_c".to_string(),
            folder_table: "folder_c".to_string(),
            api_key_env: "TAGSHELF_REMOTE_KEY".to_string(),
        }
    }
}

/// Scoring function and completion provider settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ScoringSettings {
    /// When set, scoring requests go to this function URL instead of running in-process.
    #[serde(default)]
    pub function_url: Option<String>,
    pub completion_endpoint: String,
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Name of the environment variable holding the completion API key.
    pub api_key_env: String,
    pub request_timeout_secs: u64,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            function_url: None,
            completion_endpoint: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o-mini".to_string(),
            temperature: 0.3,
            max_tokens: 200,
            api_key_env: "OPENAI_API_KEY".to_string(),
            request_timeout_secs: 60,
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// `tracing_subscriber::EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            filter: "info".to_string(),
        }
    }
}
