use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionStoreError {
    #[error("failed to encode data for session '{id}': {source}")]
    Encode {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("cookie '{name}' would be {length} bytes, over the {limit} byte browser limit")]
    CookieTooLarge {
        name: String,
        length: usize,
        limit: usize,
    },

    #[error("cookie name '{name}' is not a valid token")]
    InvalidCookieName { name: String },

    #[error("session backend lock was poisoned while {operation}")]
    BackendPoisoned { operation: &'static str },

    #[error("failed to format cookie expiry: {0}")]
    ExpiryFormat(#[source] time::error::Format),
}

impl SessionStoreError {
    #[must_use]
    pub fn encode(id: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Encode {
            id: id.into(),
            source,
        }
    }

    #[must_use]
    pub fn poisoned(operation: &'static str) -> Self {
        Self::BackendPoisoned { operation }
    }
}
