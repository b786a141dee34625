//! Error types for the OpenShift state metrics exporter

use thiserror::Error;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the exporter
#[derive(Error, Debug)]
pub enum Error {
    /// Kubernetes API error
    #[error("Kubernetes API error: {0}")]
    Kube(#[from] kube::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Whitelist and blacklist supplied together
    #[error(
        "Whitelist and blacklist are both set. They are mutually exclusive, only one of them can be set."
    )]
    ConflictingFilters,

    /// Collector name with no registered resource type
    #[error("Collector {0} is not correct")]
    UnknownCollector(String),

    /// Config file could not be parsed
    #[error("Failed to parse config file: {0}")]
    ConfigFile(#[from] serde_yaml::Error),

    /// JSON (de)serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level list/watch failure
    #[error("Watch of {resource} in {namespace} failed: {reason}")]
    Watch {
        resource: String,
        namespace: String,
        reason: String,
    },

    /// Object delivered to a store of a different resource type
    #[error("Expected object of kind {expected}, got {found}")]
    TypeMismatch { expected: String, found: String },

    /// Self-telemetry registration error
    #[error("Telemetry error: {0}")]
    Telemetry(#[from] prometheus::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Failure of a single family transform for a single object.
///
/// Recovered locally: the family contributes no samples for that object.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GenerateError {
    /// Int-or-percent value that is neither an integer nor `N%`
    #[error("invalid int-or-percent value {0:?}")]
    InvalidIntOrPercent(String),

    /// Unparseable resource quantity
    #[error("invalid quantity {0:?}")]
    InvalidQuantity(String),

    /// Label keys and label values of a sample differ in length
    #[error("sample has {keys} label keys but {values} label values")]
    LabelCardinality { keys: usize, values: usize },

    /// Value does not fit the numeric range used for rendering
    #[error("numeric overflow converting {0:?}")]
    Overflow(String),
}
