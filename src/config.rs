use std::env;
use std::path::PathBuf;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum BackendType {
    Jsonl,
    Sqlite,
}

impl BackendType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendType::Jsonl => "jsonl",
            BackendType::Sqlite => "sqlite",
        }
    }
}

pub const DEFAULT_BUFFER_CAPACITY: usize = 30_000;

#[derive(Debug)]
pub enum ConfigError {
    InvalidValue(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidValue(msg) => write!(f, "Invalid configuration value: {}", msg),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub backend: BackendType,
    /// Directory for JSONL output
    pub output_path: PathBuf,
    /// Database file for SQLite output
    pub db_path: PathBuf,
    pub buffer_capacity: usize,
    /// Product version tag passed to the writer's mission context
    pub phase_tag: String,
}

impl RunConfig {
    /// Load configuration from environment variables
    ///
    /// - ALTIPASS_OUTPUT_PATH - JSONL output directory (default: data/passes)
    /// - ALTIPASS_DB_PATH - SQLite database path (default: data/passes.db)
    /// - ALTIPASS_BUFFER_CAPACITY - max buffered records (default: 30000)
    /// - ALTIPASS_PHASE_TAG - output version tag (default: a)
    pub fn from_env(backend: BackendType) -> Result<Self, ConfigError> {
        Self::from_lookup(backend, |key| env::var(key).ok())
    }

    pub fn from_lookup<F>(backend: BackendType, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_path = lookup("ALTIPASS_OUTPUT_PATH")
            .unwrap_or_else(|| "data/passes".to_string())
            .into();
        let db_path = lookup("ALTIPASS_DB_PATH")
            .unwrap_or_else(|| "data/passes.db".to_string())
            .into();

        let buffer_capacity = match lookup("ALTIPASS_BUFFER_CAPACITY") {
            Some(raw) => raw.trim().parse::<usize>().map_err(|_| {
                ConfigError::InvalidValue(format!("ALTIPASS_BUFFER_CAPACITY '{}' is not a count", raw))
            })?,
            None => DEFAULT_BUFFER_CAPACITY,
        };
        if buffer_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "ALTIPASS_BUFFER_CAPACITY must be positive".to_string(),
            ));
        }

        let phase_tag = lookup("ALTIPASS_PHASE_TAG").unwrap_or_else(|| "a".to_string());
        if phase_tag.is_empty() || !phase_tag.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(ConfigError::InvalidValue(format!(
                "ALTIPASS_PHASE_TAG '{}' must be alphanumeric",
                phase_tag
            )));
        }

        Ok(Self {
            backend,
            output_path,
            db_path,
            buffer_capacity,
            phase_tag,
        })
    }

    /// Where the selected backend writes
    pub fn writer_path(&self) -> &PathBuf {
        match self.backend {
            BackendType::Jsonl => &self.output_path,
            BackendType::Sqlite => &self.db_path,
        }
    }
}
