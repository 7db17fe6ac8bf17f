//! Configuration for the helpdesk server and pipelines
//!
//! Loads configuration from config.yml file; secrets come from the environment.

use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Default constants (fallback if config.yml not found)
pub const DEFAULT_BIND: &str = "127.0.0.1:8000";
pub const UPLOAD_DIR: &str = "uploads";
pub const INDEX_DIR: &str = ".";
pub const INDEX_PREFIX: &str = "faiss_index_";
pub const CHAT_DELAY_MS: u64 = 1000;

pub const OLLAMA_URL: &str = "http://localhost:11434";
pub const EMBED_MODEL: &str = "mxbai-embed-large:latest";
pub const GENERATE_MODEL: &str = "mistral:latest";

pub const MISTRAL_URL: &str = "https://api.mistral.ai/v1";
pub const CLASSIFIER_MODEL: &str = "mistral-tiny";
pub const CHAT_MODEL: &str = "mistral-small";

pub const CHUNK_SIZE: usize = 300;
pub const CHUNK_OVERLAP: usize = 20;
pub const TOP_K: usize = 4;

/// Which vector store keeps the indexes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Flat index persisted as JSON under `index_dir`
    Local,
    /// One Qdrant collection per index
    Qdrant,
}

impl StoreBackend {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "local" | "file" => Some(StoreBackend::Local),
            "qdrant" => Some(StoreBackend::Qdrant),
            _ => None,
        }
    }
}

/// YAML config structures
#[derive(Debug, Default, Deserialize)]
struct YamlConfig {
    server: Option<ServerSection>,
    ollama: Option<OllamaSection>,
    mistral: Option<MistralSection>,
    retrieval: Option<RetrievalSection>,
    mysql: Option<MySqlSection>,
}

#[derive(Debug, Default, Deserialize)]
struct ServerSection {
    bind: Option<String>,
    upload_dir: Option<String>,
    index_dir: Option<String>,
    chat_delay_ms: Option<u64>,
    users_file: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct OllamaSection {
    url: Option<String>,
    embed_model: Option<String>,
    generate_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MistralSection {
    url: Option<String>,
    api_key: Option<String>,
    classifier_model: Option<String>,
    chat_model: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RetrievalSection {
    chunk_size: Option<usize>,
    chunk_overlap: Option<usize>,
    top_k: Option<usize>,
    backend: Option<String>,
    qdrant_url: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct MySqlSection {
    host: Option<String>,
    port: Option<u16>,
    database: Option<String>,
    user: Option<String>,
    password: Option<String>,
}

/// Connection settings for the user-record datastore.
#[derive(Debug, Clone)]
pub struct MySqlConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub user: String,
    pub password: String,
}

/// Main configuration struct
#[derive(Debug, Clone)]
pub struct Config {
    pub bind: String,
    pub upload_dir: PathBuf,
    pub index_dir: PathBuf,
    pub chat_delay_ms: u64,
    /// YAML user list used instead of MySQL when set
    pub users_file: Option<PathBuf>,
    pub ollama_url: String,
    pub embed_model: String,
    pub generate_model: String,
    pub mistral_url: String,
    pub mistral_api_key: String,
    pub classifier_model: String,
    pub chat_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    pub backend: StoreBackend,
    pub qdrant_url: String,
    pub mysql: MySqlConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Load configuration from config.yml or use defaults
    /// Environment variables take precedence over config.yml string values
    pub fn new() -> Self {
        Self::load_from_file("config.yml")
            .or_else(|_| Self::load_from_file("../config.yml"))
            .unwrap_or_else(|_| {
                Self::load_dotenv();
                Self::from_yaml(YamlConfig::default())
            })
    }

    /// Resolve a value: prefer env var if config value looks like ${VAR}
    fn resolve_env_string(value: Option<String>, env_key: &str) -> Option<String> {
        if let Some(ref v) = value {
            if v.starts_with("${") && v.ends_with('}') {
                let var_name = &v[2..v.len() - 1];
                if let Ok(env_val) = std::env::var(var_name) {
                    return Some(env_val);
                }
            }
        }
        if let Ok(env_val) = std::env::var(env_key) {
            return Some(env_val);
        }
        value.filter(|v| !(v.starts_with("${") && v.ends_with('}')))
    }

    /// Numeric values from YAML win; the env var is only a fallback.
    fn resolve_env_number<T: std::str::FromStr>(value: Option<T>, env_key: &str) -> Option<T> {
        value.or_else(|| std::env::var(env_key).ok()?.parse().ok())
    }

    /// Load .env file into environment variables using dotenvy
    fn load_dotenv() {
        if dotenvy::dotenv().is_err() {
            let _ = dotenvy::from_filename("../.env");
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, String> {
        Self::load_dotenv();

        let content = fs::read_to_string(path.as_ref())
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let yaml: YamlConfig = if content.trim().is_empty() {
            YamlConfig::default()
        } else {
            serde_yaml::from_str(&content)
                .map_err(|e| format!("Failed to parse config file: {}", e))?
        };

        Ok(Self::from_yaml(yaml))
    }

    fn from_yaml(yaml: YamlConfig) -> Self {
        let server = yaml.server.unwrap_or_default();
        let ollama = yaml.ollama.unwrap_or_default();
        let mistral = yaml.mistral.unwrap_or_default();
        let retrieval = yaml.retrieval.unwrap_or_default();
        let mysql = yaml.mysql.unwrap_or_default();

        let backend = Self::resolve_env_string(retrieval.backend, "RAG_STORE_BACKEND")
            .and_then(|b| StoreBackend::parse(&b))
            .unwrap_or(StoreBackend::Local);

        Self {
            bind: Self::resolve_env_string(server.bind, "RAG_BIND")
                .unwrap_or_else(|| DEFAULT_BIND.to_string()),
            upload_dir: Self::resolve_env_string(server.upload_dir, "RAG_UPLOAD_DIR")
                .unwrap_or_else(|| UPLOAD_DIR.to_string())
                .into(),
            index_dir: Self::resolve_env_string(server.index_dir, "RAG_INDEX_DIR")
                .unwrap_or_else(|| INDEX_DIR.to_string())
                .into(),
            chat_delay_ms: Self::resolve_env_number(server.chat_delay_ms, "RAG_CHAT_DELAY_MS")
                .unwrap_or(CHAT_DELAY_MS),
            users_file: Self::resolve_env_string(server.users_file, "RAG_USERS_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
            ollama_url: Self::resolve_env_string(ollama.url, "OLLAMA_URL")
                .unwrap_or_else(|| OLLAMA_URL.to_string()),
            embed_model: ollama.embed_model.unwrap_or_else(|| EMBED_MODEL.to_string()),
            generate_model: ollama
                .generate_model
                .unwrap_or_else(|| GENERATE_MODEL.to_string()),
            mistral_url: Self::resolve_env_string(mistral.url, "MISTRAL_API_URL")
                .unwrap_or_else(|| MISTRAL_URL.to_string()),
            mistral_api_key: Self::resolve_env_string(mistral.api_key, "MISTRAL_API_KEY")
                .unwrap_or_default(),
            classifier_model: mistral
                .classifier_model
                .unwrap_or_else(|| CLASSIFIER_MODEL.to_string()),
            chat_model: mistral.chat_model.unwrap_or_else(|| CHAT_MODEL.to_string()),
            chunk_size: retrieval.chunk_size.unwrap_or(CHUNK_SIZE),
            chunk_overlap: retrieval.chunk_overlap.unwrap_or(CHUNK_OVERLAP),
            top_k: retrieval.top_k.unwrap_or(TOP_K).max(1),
            backend,
            qdrant_url: Self::resolve_env_string(retrieval.qdrant_url, "QDRANT_URL")
                .unwrap_or_else(|| "http://localhost:6334".to_string()),
            mysql: MySqlConfig {
                host: Self::resolve_env_string(mysql.host, "MYSQL_HOST")
                    .unwrap_or_else(|| "localhost".to_string()),
                port: Self::resolve_env_number(mysql.port, "MYSQL_PORT").unwrap_or(3306),
                database: Self::resolve_env_string(mysql.database, "MYSQL_DATABASE")
                    .unwrap_or_else(|| "rag_helpdesk".to_string()),
                user: Self::resolve_env_string(mysql.user, "MYSQL_USER")
                    .unwrap_or_else(|| "rag_helpdesk".to_string()),
                password: Self::resolve_env_string(mysql.password, "MYSQL_PASSWORD")
                    .unwrap_or_default(),
            },
        }
    }

    /// Create config with built-in defaults, ignoring config.yml
    pub fn defaults() -> Self {
        Self::from_yaml(YamlConfig::default())
    }

    /// Index identifier for an uploaded file name: `faiss_index_<stem>`.
    pub fn index_name_for(file_name: &str) -> String {
        let base = Path::new(file_name)
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(file_name);
        let stem = Path::new(base)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or(base);
        format!("{}{}", INDEX_PREFIX, stem)
    }
}

/// Serializes tests that read or mutate process environment variables.
#[cfg(test)]
pub(crate) static ENV_LOCK: std::sync::LazyLock<std::sync::Mutex<()>> =
    std::sync::LazyLock::new(|| std::sync::Mutex::new(()));
