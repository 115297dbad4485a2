//! Schema nodes and validation for loosely-typed form and session data.
//!
//! A [`Schema`] is an immutable, reference-counted node drawn from the closed
//! [`SchemaKind`] vocabulary. Validation is asynchronous so refinements may
//! await; [`Schema::safe_parse`] drives it without an executor when no
//! refinement is pending.

mod error;
mod node;
mod validate;
mod value;

pub use error::{Issue, IssueCode, PathSegment, ValidationError};
pub use node::{
    AsyncRefineFn, DiscriminatedUnion, Effect, LazyFn, LazySchema, ObjectShape, PreprocessFn,
    RefineFn, Schema, SchemaBuildError, SchemaKind, TransformFn, UnknownKeys, WeakSchema,
};
pub use value::{FileBlob, Value};
