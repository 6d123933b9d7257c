/// Crate-wide result type for bridge operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Typed bridge errors shared across puppet implementations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Input payload or parameter is invalid.
    #[error("invalid bridge input: {message}")]
    InvalidInput { message: String },

    /// A conversation, participant or message could not be found.
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },
}

impl Error {
    #[must_use]
    pub fn invalid_input(message: impl std::fmt::Display) -> Self {
        Self::InvalidInput {
            message: message.to_string(),
        }
    }

    #[must_use]
    pub fn not_found(what: &'static str, id: impl std::fmt::Display) -> Self {
        Self::NotFound {
            what,
            id: id.to_string(),
        }
    }

    /// Whether this error means the target simply does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
