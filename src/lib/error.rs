use thiserror::Error;

/// Main error type for the allocated resources report
#[derive(Error, Debug)]
pub enum AllocatedResourcesError {
    /// Label selector could not be parsed
    #[error("Invalid selector: {0}")]
    InvalidSelector(#[from] SelectorError),

    /// Kubernetes API errors, surfaced as returned by the inventory provider
    #[error("Inventory fetch failed: {0}")]
    InventoryFetch(#[from] KubernetesError),

    /// Resource quantity errors
    #[error("Quantity error: {0}")]
    Quantity(#[from] QuantityError),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Report rendering errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Label selector errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// A term carries none of `=`, `==` or `!=`
    #[error("can't understand '{term}' in '{selector}'")]
    MissingOperator { selector: String, term: String },

    /// The key side of a term is not a valid label key
    #[error("invalid label key '{key}': {reason}")]
    InvalidKey { key: String, reason: String },

    /// The value side of a term is not a valid label value
    #[error("invalid label value '{value}' for key '{key}': {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Kubernetes-specific errors
#[derive(Error, Debug)]
pub enum KubernetesError {
    /// API server connection failed
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// Invalid resource specification
    #[error("Invalid resource: {0}")]
    InvalidResource(String),

    /// API error
    #[error("API error: {0}")]
    ApiError(String),
}

/// Resource quantity errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QuantityError {
    /// Empty quantity string
    #[error("empty quantity")]
    Empty,

    /// Number part is malformed
    #[error("invalid number in quantity '{0}'")]
    InvalidNumber(String),

    /// Unknown unit suffix
    #[error("unknown suffix '{suffix}' in quantity '{quantity}'")]
    InvalidSuffix { quantity: String, suffix: String },

    /// Value does not fit the decimal representation
    #[error("quantity '{0}' is out of range")]
    Overflow(String),
}

/// Configuration-specific errors
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Invalid configuration value
    #[error("Invalid value: {0}")]
    InvalidValue(String),

    /// Configuration file error
    #[error("File error: {0}")]
    FileError(String),
}

impl From<serde_json::Error> for AllocatedResourcesError {
    fn from(e: serde_json::Error) -> Self {
        AllocatedResourcesError::Serialization(e.to_string())
    }
}

impl From<serde_yaml::Error> for AllocatedResourcesError {
    fn from(e: serde_yaml::Error) -> Self {
        AllocatedResourcesError::Serialization(e.to_string())
    }
}

/// Helper type alias for Results
pub type Result<T> = std::result::Result<T, AllocatedResourcesError>;
