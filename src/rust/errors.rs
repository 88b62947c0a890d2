use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MapError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("FASTA parsing error in '{path}': {message}")]
    Fasta { path: PathBuf, message: String },

    #[error("No sequences found in '{0}'.")]
    NoSequences(PathBuf),

    #[error("{count} sequences found in '{path}'. Expected only 1.")]
    MultipleSequences { count: usize, path: PathBuf },

    #[error("Invalid residue '{0}' found at position {1}")]
    InvalidResidue(char, usize),

    #[error("Profile error in '{path}': {message}")]
    Profile { path: PathBuf, message: String },

    #[error("Profile construction with {tool} failed: {message}")]
    ProfileBuild { tool: String, message: String },

    #[error("Fragment search failed for window [{start}, {end}): {source}")]
    Search {
        start: usize,
        end: usize,
        #[source]
        source: anyhow::Error,
    },

    #[error("Fragment map computation was cancelled")]
    Cancelled,

    #[error("Descriptor dimension mismatch: expected {expected}, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Anyhow error: {0}")]
    AnyhowError(#[from] anyhow::Error),

    #[error("Validation error: {message}")]
    ValidationError { message: String },

    #[error("Configuration error: {field} - {message}")]
    ConfigurationError { field: String, message: String },
}

impl MapError {
    /// True for errors raised while loading the query, before any search work starts.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            MapError::Io(_)
                | MapError::Fasta { .. }
                | MapError::NoSequences(_)
                | MapError::MultipleSequences { .. }
                | MapError::InvalidResidue(..)
                | MapError::Profile { .. }
                | MapError::ProfileBuild { .. }
        )
    }
}

pub type MapResult<T> = Result<T, MapError>;

/// Extension trait for Result to attach a configuration field
pub trait MapResultExt<T> {
    /// Add context with a field name
    fn with_field_context(self, field: &str, message: &str) -> MapResult<T>;
}

impl<T, E> MapResultExt<T> for Result<T, E>
where
    E: Into<MapError>,
{
    fn with_field_context(self, field: &str, message: &str) -> MapResult<T> {
        self.map_err(|e| MapError::ConfigurationError {
            field: field.to_string(),
            message: format!("{}: {}", message, e.into()),
        })
    }
}
