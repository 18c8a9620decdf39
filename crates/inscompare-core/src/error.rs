//! Error types for Inscompare Core
//!
//! Only infrastructure failures live here: reading configuration, mapping
//! tables and payload files. Domain outcomes (clarification, upstream
//! failures, contract drift) are plain data and never reach this type.

use thiserror::Error;

/// Result type alias for Inscompare operations
pub type Result<T> = std::result::Result<T, CompareError>;

/// Main error type for Inscompare operations
#[derive(Error, Debug)]
pub enum CompareError {
    /// Mapping table errors
    #[error("Mapping table error: {0}")]
    Mapping(#[from] MappingError),

    /// Configuration rejected by validation
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// JSON serialization errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parse errors
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// TOML serialization errors
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        source: Box<CompareError>,
    },
}

/// Errors raised while loading a mapping table
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MappingError {
    #[error("Mapping table has an empty rule version")]
    EmptyRuleVersion,

    #[error("Mapping entry {index} has an empty coverage name")]
    EmptyCoverageName { index: usize },

    #[error("Mapping entry {index} ({name}) has an empty coverage code")]
    EmptyCoverageCode { index: usize, name: String },
}

impl CompareError {
    /// Add context to an error
    pub fn context(self, context: impl Into<String>) -> Self {
        Self::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to a Result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add lazy context to a Result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T, E> ResultExt<T> for std::result::Result<T, E>
where
    E: Into<CompareError>,
{
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.into().context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.into().context(f()))
    }
}
