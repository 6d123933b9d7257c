use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    /// Absent session, conversation, participant or message.
    #[error(transparent)]
    Channel(#[from] marionette_channels::Error),

    /// A remote API call failed.
    #[error("discord request failed: {context}: {source}")]
    Remote {
        context: String,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// A bridge or store collaborator failed.
    #[error(transparent)]
    Collaborator(#[from] anyhow::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error("{message}")]
    Message { message: String },
}

impl Error {
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self::Message {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn not_found(what: &'static str, id: impl std::fmt::Display) -> Self {
        Self::Channel(marionette_channels::Error::not_found(what, id))
    }

    #[must_use]
    pub fn remote(
        context: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Remote {
            context: context.into(),
            source: Box::new(source),
        }
    }

    pub fn is_not_found(&self) -> bool {
        match self {
            Self::Channel(e) => e.is_not_found(),
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
