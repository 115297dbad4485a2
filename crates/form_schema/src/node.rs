use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock, Weak};

use futures_util::future::BoxFuture;
use thiserror::Error;

use crate::value::Value;

pub type PreprocessFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type TransformFn = Arc<dyn Fn(Value) -> Value + Send + Sync>;
pub type RefineFn = Arc<dyn Fn(&Value) -> bool + Send + Sync>;
pub type AsyncRefineFn = Arc<dyn Fn(Value) -> BoxFuture<'static, bool> + Send + Sync>;
pub type LazyFn = Arc<dyn Fn() -> Schema + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaBuildError {
    #[error("expected an object schema, found {found}")]
    NotAnObject { found: &'static str },

    #[error("option {index} of the discriminated union has no literal '{discriminator}' field")]
    MissingDiscriminator { index: usize, discriminator: String },

    #[error("discriminator value '{value}' is used by more than one option")]
    DuplicateDiscriminator { value: String },
}

/// Policy for object keys that have no declared field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UnknownKeys {
    #[default]
    Strip,
    Strict,
    Passthrough,
}

#[derive(Clone)]
pub enum Effect {
    /// Runs before the inner node sees the value.
    Preprocess(PreprocessFn),
    /// Runs on the inner node's successful output.
    Transform(TransformFn),
    Refine {
        check: RefineFn,
        message: String,
    },
    RefineAsync {
        check: AsyncRefineFn,
        message: String,
    },
}

impl Effect {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Preprocess(_) => "preprocess",
            Self::Transform(_) => "transform",
            Self::Refine { .. } => "refine",
            Self::RefineAsync { .. } => "refine_async",
        }
    }
}

#[derive(Clone, Default)]
pub struct ObjectShape {
    pub fields: BTreeMap<String, Schema>,
    pub unknown_keys: UnknownKeys,
}

impl ObjectShape {
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    #[must_use]
    pub fn field(&self, name: &str) -> Option<&Schema> {
        self.fields.get(name)
    }
}

#[derive(Clone)]
pub struct DiscriminatedUnion {
    pub discriminator: String,
    pub options: Vec<Schema>,
    pub lookup: BTreeMap<String, Schema>,
}

impl DiscriminatedUnion {
    pub fn new(
        discriminator: impl Into<String>,
        options: Vec<Schema>,
    ) -> Result<Self, SchemaBuildError> {
        let discriminator = discriminator.into();
        let mut lookup = BTreeMap::new();

        for (index, option) in options.iter().enumerate() {
            let values = option
                .object_shape()
                .and_then(|shape| shape.field(&discriminator))
                .map(discriminator_values)
                .unwrap_or_default();
            if values.is_empty() {
                return Err(SchemaBuildError::MissingDiscriminator {
                    index,
                    discriminator,
                });
            }

            for value in values {
                if lookup.insert(value.clone(), option.clone()).is_some() {
                    return Err(SchemaBuildError::DuplicateDiscriminator { value });
                }
            }
        }

        Ok(Self {
            discriminator,
            options,
            lookup,
        })
    }
}

fn discriminator_values(schema: &Schema) -> Vec<String> {
    match schema.kind() {
        SchemaKind::Literal(Value::String(value)) => vec![value.clone()],
        SchemaKind::Enum(values) => values.clone(),
        SchemaKind::Effects { inner, .. } => discriminator_values(inner),
        _ => Vec::new(),
    }
}

/// Deferred reference to another node.
///
/// The producer runs at most once; its result is cached, so a producer
/// returning a shared node (for example from a `LazyLock`) gives the lazy
/// node a stable target and lets self-referential schemas be expressed.
pub struct LazySchema {
    producer: LazyFn,
    resolved: OnceLock<Schema>,
}

impl LazySchema {
    pub fn new(producer: impl Fn() -> Schema + Send + Sync + 'static) -> Self {
        Self {
            producer: Arc::new(producer),
            resolved: OnceLock::new(),
        }
    }

    #[must_use]
    pub fn resolve(&self) -> &Schema {
        self.resolved.get_or_init(|| (self.producer)())
    }

    #[must_use]
    pub fn is_resolved(&self) -> bool {
        self.resolved.get().is_some()
    }
}

pub enum SchemaKind {
    String,
    Literal(Value),
    Enum(Vec<String>),
    Number,
    Boolean,
    Date,
    BigInt,
    Any,
    Null,
    Array(Schema),
    Object(ObjectShape),
    Effects { inner: Schema, effect: Effect },
    Optional(Schema),
    Default { inner: Schema, value: Value },
    Catch { inner: Schema, value: Value },
    Intersection(Schema, Schema),
    Union(Vec<Schema>),
    DiscriminatedUnion(DiscriminatedUnion),
    Tuple(Vec<Schema>),
    Nullable(Schema),
    Pipeline { input: Schema, output: Schema },
    Lazy(LazySchema),
}

impl SchemaKind {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Literal(_) => "literal",
            Self::Enum(_) => "enum",
            Self::Number => "number",
            Self::Boolean => "boolean",
            Self::Date => "date",
            Self::BigInt => "bigint",
            Self::Any => "any",
            Self::Null => "null",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::Effects { .. } => "effects",
            Self::Optional(_) => "optional",
            Self::Default { .. } => "default",
            Self::Catch { .. } => "catch",
            Self::Intersection(..) => "intersection",
            Self::Union(_) => "union",
            Self::DiscriminatedUnion(_) => "discriminated_union",
            Self::Tuple(_) => "tuple",
            Self::Nullable(_) => "nullable",
            Self::Pipeline { .. } => "pipeline",
            Self::Lazy(_) => "lazy",
        }
    }
}

/// Immutable, shared schema node. Cloning shares the node; identity is the
/// allocation, see [`Schema::id`].
#[derive(Clone)]
pub struct Schema(Arc<SchemaKind>);

#[derive(Clone)]
pub struct WeakSchema(Weak<SchemaKind>);

impl WeakSchema {
    #[must_use]
    pub fn upgrade(&self) -> Option<Schema> {
        self.0.upgrade().map(Schema)
    }
}

impl fmt::Debug for SchemaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl fmt::Debug for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            SchemaKind::Object(shape) => f
                .debug_struct("Object")
                .field("fields", &shape.fields)
                .field("unknown_keys", &shape.unknown_keys)
                .finish(),
            SchemaKind::Effects { inner, effect } => f
                .debug_struct("Effects")
                .field("effect", &effect.name())
                .field("inner", inner)
                .finish(),
            SchemaKind::Lazy(_) => write!(f, "Lazy(#{:x})", self.id()),
            kind => f.write_str(kind.name()),
        }
    }
}

impl Schema {
    #[must_use]
    pub fn new(kind: SchemaKind) -> Self {
        Self(Arc::new(kind))
    }

    #[must_use]
    pub fn kind(&self) -> &SchemaKind {
        &self.0
    }

    /// Stable identity of this node for as long as any clone of it is alive.
    #[must_use]
    pub fn id(&self) -> usize {
        Arc::as_ptr(&self.0) as usize
    }

    #[must_use]
    pub fn same_node(&self, other: &Schema) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Handle that does not keep this node alive.
    #[must_use]
    pub fn downgrade(&self) -> WeakSchema {
        WeakSchema(Arc::downgrade(&self.0))
    }

    #[must_use]
    pub fn string() -> Self {
        Self::new(SchemaKind::String)
    }

    #[must_use]
    pub fn number() -> Self {
        Self::new(SchemaKind::Number)
    }

    #[must_use]
    pub fn boolean() -> Self {
        Self::new(SchemaKind::Boolean)
    }

    #[must_use]
    pub fn date() -> Self {
        Self::new(SchemaKind::Date)
    }

    #[must_use]
    pub fn bigint() -> Self {
        Self::new(SchemaKind::BigInt)
    }

    #[must_use]
    pub fn any() -> Self {
        Self::new(SchemaKind::Any)
    }

    #[must_use]
    pub fn null() -> Self {
        Self::new(SchemaKind::Null)
    }

    pub fn literal(value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Literal(value.into()))
    }

    pub fn enumeration<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(SchemaKind::Enum(values.into_iter().map(Into::into).collect()))
    }

    #[must_use]
    pub fn array(element: Schema) -> Self {
        Self::new(SchemaKind::Array(element))
    }

    pub fn object<I, K>(fields: I) -> Self
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        Self::from_shape(ObjectShape {
            fields: fields
                .into_iter()
                .map(|(name, schema)| (name.into(), schema))
                .collect(),
            unknown_keys: UnknownKeys::Strip,
        })
    }

    #[must_use]
    pub fn from_shape(shape: ObjectShape) -> Self {
        Self::new(SchemaKind::Object(shape))
    }

    #[must_use]
    pub fn tuple(elements: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Tuple(elements))
    }

    #[must_use]
    pub fn union(options: Vec<Schema>) -> Self {
        Self::new(SchemaKind::Union(options))
    }

    pub fn discriminated_union(
        discriminator: impl Into<String>,
        options: Vec<Schema>,
    ) -> Result<Self, SchemaBuildError> {
        DiscriminatedUnion::new(discriminator, options)
            .map(|table| Self::new(SchemaKind::DiscriminatedUnion(table)))
    }

    #[must_use]
    pub fn intersection(left: Schema, right: Schema) -> Self {
        Self::new(SchemaKind::Intersection(left, right))
    }

    pub fn lazy(producer: impl Fn() -> Schema + Send + Sync + 'static) -> Self {
        Self::new(SchemaKind::Lazy(LazySchema::new(producer)))
    }

    pub fn preprocess(f: impl Fn(Value) -> Value + Send + Sync + 'static, inner: Schema) -> Self {
        Self::new(SchemaKind::Effects {
            inner,
            effect: Effect::Preprocess(Arc::new(f)),
        })
    }

    /// Accepts any uploaded file value.
    #[must_use]
    pub fn file() -> Self {
        Self::any().refine(|value| matches!(value, Value::File(_)), "Input not instance of File")
    }

    #[must_use]
    pub fn optional(self) -> Self {
        Self::new(SchemaKind::Optional(self))
    }

    #[must_use]
    pub fn nullable(self) -> Self {
        Self::new(SchemaKind::Nullable(self))
    }

    pub fn default_value(self, value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Default {
            inner: self,
            value: value.into(),
        })
    }

    pub fn catch(self, value: impl Into<Value>) -> Self {
        Self::new(SchemaKind::Catch {
            inner: self,
            value: value.into(),
        })
    }

    pub fn refine(
        self,
        check: impl Fn(&Value) -> bool + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self::new(SchemaKind::Effects {
            inner: self,
            effect: Effect::Refine {
                check: Arc::new(check),
                message: message.into(),
            },
        })
    }

    pub fn refine_async(
        self,
        check: impl Fn(Value) -> BoxFuture<'static, bool> + Send + Sync + 'static,
        message: impl Into<String>,
    ) -> Self {
        Self::new(SchemaKind::Effects {
            inner: self,
            effect: Effect::RefineAsync {
                check: Arc::new(check),
                message: message.into(),
            },
        })
    }

    pub fn transform(self, f: impl Fn(Value) -> Value + Send + Sync + 'static) -> Self {
        Self::new(SchemaKind::Effects {
            inner: self,
            effect: Effect::Transform(Arc::new(f)),
        })
    }

    #[must_use]
    pub fn pipe(self, output: Schema) -> Self {
        Self::new(SchemaKind::Pipeline {
            input: self,
            output,
        })
    }

    #[must_use]
    pub fn object_shape(&self) -> Option<&ObjectShape> {
        match self.kind() {
            SchemaKind::Object(shape) => Some(shape),
            _ => None,
        }
    }

    fn require_shape(&self) -> Result<&ObjectShape, SchemaBuildError> {
        self.object_shape().ok_or(SchemaBuildError::NotAnObject {
            found: self.kind().name(),
        })
    }

    /// New object schema with `fields` added; same-named fields are replaced.
    pub fn extend<I, K>(&self, fields: I) -> Result<Self, SchemaBuildError>
    where
        I: IntoIterator<Item = (K, Schema)>,
        K: Into<String>,
    {
        let mut shape = self.require_shape()?.clone();
        shape
            .fields
            .extend(fields.into_iter().map(|(name, schema)| (name.into(), schema)));
        Ok(Self::from_shape(shape))
    }

    /// New object schema that rejects undeclared keys.
    pub fn strict(&self) -> Result<Self, SchemaBuildError> {
        let mut shape = self.require_shape()?.clone();
        shape.unknown_keys = UnknownKeys::Strict;
        Ok(Self::from_shape(shape))
    }

    pub fn passthrough(&self) -> Result<Self, SchemaBuildError> {
        let mut shape = self.require_shape()?.clone();
        shape.unknown_keys = UnknownKeys::Passthrough;
        Ok(Self::from_shape(shape))
    }

    #[must_use]
    pub fn field_names(&self) -> Vec<String> {
        self.object_shape()
            .map(|shape| shape.fields.keys().cloned().collect())
            .unwrap_or_default()
    }
}
