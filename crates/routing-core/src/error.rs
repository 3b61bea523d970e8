use thiserror::Error;

/// Routing core errors
///
/// Only infrastructure problems are errors. A context that matches no rule is
/// an ordinary outcome and is reported through [`crate::RoutingResult`].
#[derive(Error, Debug)]
pub enum RoutingError {
    /// Database errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The rule or queue lookup could not be reached
    #[error("Routing lookup unavailable: {0}")]
    LookupUnavailable(String),

    /// Not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl RoutingError {
    /// Create a new LookupUnavailable error
    pub fn lookup_unavailable<S: Into<String>>(msg: S) -> Self {
        Self::LookupUnavailable(msg.into())
    }

    /// Create a new NotFound error
    pub fn not_found<S: Into<String>>(msg: S) -> Self {
        Self::NotFound(msg.into())
    }

    /// Create a new InvalidInput error
    pub fn invalid_input<S: Into<String>>(msg: S) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a new Config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new Internal error
    pub fn internal<S: Into<String>>(msg: S) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error means the backing store could not be reached
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::LookupUnavailable(_) | Self::Database(_))
    }
}

/// Result type for routing core operations
pub type Result<T> = std::result::Result<T, RoutingError>;
