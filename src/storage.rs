use std::sync::Arc;

use form_coerce::CoerceOptions;
use form_schema::Schema;
use session_store::{CookieOptions, SessionShape, SessionStorage};
use tracing::debug;

use crate::error::TypedSessionError;
use crate::session::{SessionSchema, TypedSession};

/// Wraps a raw [`SessionStorage`] so every session it hands out is validated
/// against one object schema.
///
/// The schema is coerced once, here; stored values that went through a
/// string-only transport (dates, big integers) are parsed back on load.
#[derive(Debug)]
pub struct TypedSessionStorage<S> {
    storage: S,
    schema: Arc<SessionSchema>,
}

impl<S: SessionStorage> TypedSessionStorage<S> {
    pub fn new(storage: S, schema: Schema) -> Result<Self, TypedSessionError> {
        Self::with_options(storage, schema, &CoerceOptions::default())
    }

    pub fn with_options(
        storage: S,
        schema: Schema,
        options: &CoerceOptions,
    ) -> Result<Self, TypedSessionError> {
        let schema = SessionSchema::new(schema, options)?;
        Ok(Self {
            storage,
            schema: Arc::new(schema),
        })
    }

    #[must_use]
    pub fn schema(&self) -> &SessionSchema {
        &self.schema
    }

    #[must_use]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    pub async fn get_session(&self, cookie_header: Option<&str>) -> Result<TypedSession, TypedSessionError> {
        let raw = self.storage.get_session(cookie_header).await?;
        TypedSession::new(raw, Arc::clone(&self.schema)).await
    }

    /// Returns the `Set-Cookie` value that persists `session`.
    pub async fn commit_session(
        &self,
        session: &TypedSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, TypedSessionError> {
        self.check(session, "commit").await?;
        Ok(self.storage.commit_session(&session.to_raw(), options).await?)
    }

    /// Returns the `Set-Cookie` value that clears `session`.
    pub async fn destroy_session(
        &self,
        session: &TypedSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, TypedSessionError> {
        self.check(session, "destroy").await?;
        Ok(self.storage.destroy_session(&session.to_raw(), options).await?)
    }

    async fn check(&self, session: &TypedSession, operation: &'static str) -> Result<(), TypedSessionError> {
        self.schema.validate_real(session.data()).await.map_err(|error| {
            debug!(
                session_id = session.id(),
                operation,
                issues = error.issues().len(),
                "session data failed validation"
            );
            TypedSessionError::CommitValidationFailure(error)
        })
    }
}
