use std::collections::BTreeSet;
use std::sync::Arc;

use form_coerce::{coerce_with, CoerceOptions};
use form_schema::{Issue, IssueCode, Schema, SchemaBuildError, ValidationError, Value};
use serde::de::DeserializeOwned;
use session_store::{flash_key, flash_target, RawSession, Record, SessionShape};
use tracing::{debug, trace};

use crate::error::TypedSessionError;

/// Schemas derived once from a session's object schema.
///
/// `load` is the schema extended with one optional flash field per declared
/// field, switched to strict mode and then coerced; stored records are
/// validated with it. `original` is what committed data must satisfy.
#[derive(Debug, Clone)]
pub struct SessionSchema {
    original: Schema,
    load: Schema,
    fields: BTreeSet<String>,
}

impl SessionSchema {
    pub fn new(schema: Schema, options: &CoerceOptions) -> Result<Self, TypedSessionError> {
        let shape = schema
            .object_shape()
            .ok_or(SchemaBuildError::NotAnObject {
                found: schema.kind().name(),
            })?;

        let fields: BTreeSet<String> = shape.field_names().map(str::to_string).collect();
        // The shadow wraps the declared field in `optional()` before coercion,
        // so a blank or missing flash stays absent instead of taking a default.
        let flash_fields: Vec<(String, Schema)> = shape
            .fields
            .iter()
            .map(|(name, field)| (flash_key(name), field.clone().optional()))
            .collect();
        let load = coerce_with(&schema.extend(flash_fields)?.strict()?, options);

        Ok(Self {
            original: schema,
            load,
            fields,
        })
    }

    #[must_use]
    pub fn original(&self) -> &Schema {
        &self.original
    }

    #[must_use]
    pub fn load(&self) -> &Schema {
        &self.load
    }

    #[must_use]
    pub fn declares(&self, key: &str) -> bool {
        self.fields.contains(key)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }

    /// Checks the real keys of `data` against the original schema.
    ///
    /// Pending flash values are not part of the original schema and are left
    /// out, so a strict user schema does not reject them.
    pub async fn validate_real(&self, data: &Record) -> Result<(), ValidationError> {
        let real: Record = data
            .iter()
            .filter(|(key, _)| flash_target(key).is_none())
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();
        self.original.parse_async(Value::Object(real)).await.map(|_| ())
    }
}

/// A session record validated against a [`SessionSchema`].
///
/// Every accessor rejects keys the schema does not declare. A flashed value
/// shadows the real one for exactly one [`TypedSession::get`].
#[derive(Debug, Clone)]
pub struct TypedSession {
    id: String,
    data: Record,
    schema: Arc<SessionSchema>,
}

impl TypedSession {
    /// Validates `raw` in strict mode and keeps the parsed output (defaults
    /// applied, values coerced) as working state.
    pub async fn new(raw: RawSession, schema: Arc<SessionSchema>) -> Result<Self, TypedSessionError> {
        let id = raw.id().to_string();
        let parsed = schema
            .load
            .parse_async(Value::Object(raw.into_data()))
            .await
            .map_err(|error| {
                debug!(session_id = %id, issues = error.issues().len(), "stored session is corrupt");
                TypedSessionError::SchemaCorruption(error)
            })?;

        let data = match parsed {
            Value::Object(fields) => fields,
            other => {
                let issue = Issue::new(
                    IssueCode::InvalidType,
                    &[],
                    format!("Expected object, received {}", other.type_name()),
                );
                return Err(TypedSessionError::SchemaCorruption(ValidationError::new(vec![issue])));
            }
        };
        trace!(session_id = %id, keys = data.len(), "loaded typed session");

        Ok(Self { id, data, schema })
    }

    #[must_use]
    pub fn schema(&self) -> &SessionSchema {
        &self.schema
    }

    fn declared(&self, key: &str) -> Result<(), TypedSessionError> {
        if self.schema.declares(key) {
            Ok(())
        } else {
            Err(TypedSessionError::invalid_key(key))
        }
    }

    pub fn has(&self, key: &str) -> Result<bool, TypedSessionError> {
        self.declared(key)?;
        Ok(self.data.contains_key(key) || self.data.contains_key(&flash_key(key)))
    }

    /// Returns the pending flash value (consuming it) or else the real value.
    pub fn get(&mut self, key: &str) -> Result<Option<Value>, TypedSessionError> {
        self.declared(key)?;
        if let Some(flashed) = self.data.remove(&flash_key(key)) {
            trace!(key, "consumed flash value");
            return Ok(Some(flashed));
        }
        Ok(self.data.get(key).cloned())
    }

    /// [`TypedSession::get`] followed by a serde conversion into `T`.
    pub fn get_as<T: DeserializeOwned>(&mut self, key: &str) -> Result<Option<T>, TypedSessionError> {
        self.get(key)?
            .map(|value| {
                serde_json::from_value(value.to_json()).map_err(|source| TypedSessionError::Decode {
                    key: key.to_string(),
                    source,
                })
            })
            .transpose()
    }

    pub fn set(&mut self, key: &str, value: impl Into<Value>) -> Result<(), TypedSessionError> {
        self.declared(key)?;
        self.data.insert(key.to_string(), value.into());
        Ok(())
    }

    /// Stores `value` for the next read only; the real value is untouched.
    pub fn flash(&mut self, key: &str, value: impl Into<Value>) -> Result<(), TypedSessionError> {
        self.declared(key)?;
        self.data.insert(flash_key(key), value.into());
        Ok(())
    }

    pub fn unset(&mut self, key: &str) -> Result<(), TypedSessionError> {
        self.declared(key)?;
        self.data.remove(key);
        Ok(())
    }

    #[must_use]
    pub fn to_raw(&self) -> RawSession {
        RawSession::new(self.id.clone(), self.data.clone())
    }
}

impl SessionShape for TypedSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn data(&self) -> &Record {
        &self.data
    }

    fn is_typed(&self) -> bool {
        true
    }
}

/// Whether `session` validates its data against a schema.
#[must_use]
pub fn is_typed_session(session: &dyn SessionShape) -> bool {
    session.is_typed()
}
