use thiserror::Error;

#[derive(Error, Debug)]
pub enum MixError {
    #[error("Cannot load {path}: {reason}")]
    DataLoad { path: String, reason: String },

    #[error("Schema error in section '{section}': {reason}")]
    Schema { section: String, reason: String },

    #[error("Invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("Cannot compute '{media_key}': {reason}")]
    Computation { media_key: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Export error: {0}")]
    Export(#[from] csv::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl MixError {
    pub(crate) fn schema(section: &str, reason: impl Into<String>) -> Self {
        MixError::Schema { section: section.to_string(), reason: reason.into() }
    }

    pub(crate) fn computation(media_key: &str, reason: impl Into<String>) -> Self {
        MixError::Computation { media_key: media_key.to_string(), reason: reason.into() }
    }
}

pub type MixResult<T> = Result<T, MixError>;
