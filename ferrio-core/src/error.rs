use thiserror::Error;

pub type Result<T> = std::result::Result<T, FerrioError>;

/// Boxed cause carried by [`FerrioError::Backend`].
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Error, Debug)]
pub enum FerrioError {
    /// The caller-supplied name cannot be mapped to a backend address.
    /// Indicates a programming or input defect, never a transient condition.
    #[error("invalid object reference: {0}")]
    InvalidReference(String),

    /// The target object was absent when a fetch was attempted.
    #[error("object not found: {0}")]
    NotFound(String),

    /// Backend communication or signing failure, wrapping the original cause.
    #[error("{context}")]
    Backend {
        context: String,
        #[source]
        source: BoxError,
    },

    /// Construction-time failure (bad credentials, missing container).
    #[error("storage initialization failed: {0}")]
    Initialization(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

impl FerrioError {
    /// Wrap any error as a backend failure with operation context.
    pub fn backend(context: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Backend {
            context: context.into(),
            source: source.into(),
        }
    }
}
