use form_schema::{SchemaBuildError, ValidationError};
use session_store::SessionStoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TypedSessionError {
    #[error("stored session data does not match the schema: {0}")]
    SchemaCorruption(#[source] ValidationError),

    #[error("key '{key}' is not declared on the session schema")]
    InvalidKey { key: String },

    #[error("session data no longer satisfies the schema: {0}")]
    CommitValidationFailure(#[source] ValidationError),

    #[error("session schema must be an object schema: {0}")]
    InvalidSchema(#[from] SchemaBuildError),

    #[error("failed to decode session key '{key}': {source}")]
    Decode {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Store(#[from] SessionStoreError),
}

impl TypedSessionError {
    #[must_use]
    pub fn invalid_key(key: impl Into<String>) -> Self {
        Self::InvalidKey { key: key.into() }
    }
}
