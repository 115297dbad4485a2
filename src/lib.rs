//! Schema-validated sessions with flash values.
//!
//! Session data lives in a raw [`SessionStorage`] backend as an untyped
//! record. [`TypedSessionStorage`] validates each record against an object
//! schema when it is loaded and again before it is committed, and
//! [`TypedSession`] restricts reads and writes to the declared fields.
//!
//! # Public API Overview
//! - Describe session data with [`Schema`] constructors.
//! - Coerce raw form input with [`coerce`] before calling [`Schema::parse_async`].
//! - Pick a backend ([`MemorySessionStorage`] or [`CookieSessionStorage`]) and
//!   wrap it in [`TypedSessionStorage`].
//! - Configure from the environment with [`config::EnvConfig`] and install
//!   logging with [`logging::init_logging`].

pub mod config;
pub mod logging;

mod error;
mod session;
mod storage;

pub use crate::error::TypedSessionError;
pub use crate::session::{is_typed_session, SessionSchema, TypedSession};
pub use crate::storage::TypedSessionStorage;

/// Schema nodes, values and validation errors.
pub use form_schema::{
    FileBlob, Issue, IssueCode, PathSegment, Schema, SchemaBuildError, SchemaKind, ValidationError,
    Value,
};

/// Form-input coercion.
pub use form_coerce::{coerce, coerce_with, CoerceOptions};

/// Raw session storage.
pub use session_store::{
    flash_key, Cookie, CookieOptions, CookieSessionStorage, MemorySessionStorage, RawSession,
    Record, SameSite, SessionShape, SessionStorage, SessionStoreError,
};
