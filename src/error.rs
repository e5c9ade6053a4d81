use thiserror::Error;

/// Failures while reading or interpreting the live tuning source.
///
/// Every variant is recoverable: the retuner logs it and keeps the tuning
/// that was already in effect.
#[derive(Debug, Error)]
pub enum TuneError {
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("{file} is {size} bytes, larger than the {limit} byte limit")]
    TooLarge { file: String, size: u64, limit: u64 },

    #[error("tuning source is being written, snapshot skipped")]
    Busy,

    #[error("missing tuning key '{0}'")]
    MissingKey(String),

    #[error("tuning key '{key}' has invalid numeric value '{value}'")]
    InvalidNumber { key: String, value: String },

    #[error("invalid gain schedule: {0}")]
    InvalidSchedule(String),

    #[error("tuning key '{key}' has {found} values, expected 1 or {expected}")]
    LengthMismatch {
        key: String,
        expected: usize,
        found: usize,
    },
}

/// Failures while loading the static vehicle configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error reading {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Parse error in {file}: {source}")]
    Parse {
        file: String,
        #[source]
        source: toml::de::Error,
    },

    #[error("Validation failed: {0}")]
    Validation(String),
}
