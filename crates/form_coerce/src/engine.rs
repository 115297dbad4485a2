use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use form_schema::{
    DiscriminatedUnion, FileBlob, ObjectShape, Schema, SchemaKind, Value, WeakSchema,
};
use tracing::{debug, trace};

use crate::normalize::{
    normalize_array, normalize_file, normalize_string, normalize_string_with, parse_bigint,
    parse_boolean, parse_date, parse_number,
};
use crate::options::CoerceOptions;

type Entries = HashMap<usize, (Schema, WeakSchema)>;

/// Source node identity → coerced node, for one top-level transformation.
///
/// Clones share the same table; coerced lazy nodes keep a clone so targets
/// resolved after [`coerce`] returns still map onto known counterparts. The
/// source node is held so its identity cannot be reused while the memo is
/// alive. The coerced node is held weakly since coerced lazy nodes own the
/// memo.
#[derive(Clone, Default)]
pub struct CoercionMemo {
    entries: Arc<Mutex<Entries>>,
}

impl CoercionMemo {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Entries> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    #[must_use]
    pub fn get(&self, source: &Schema) -> Option<Schema> {
        self.lock()
            .get(&source.id())
            .and_then(|(_, coerced)| coerced.upgrade())
    }

    fn insert(&self, source: &Schema, coerced: &Schema) {
        self.lock()
            .insert(source.id(), (source.clone(), coerced.downgrade()));
    }
}

/// Coerces `schema` for an environment that may deliver uploaded files.
#[must_use]
pub fn coerce(schema: &Schema) -> Schema {
    coerce_with(schema, &CoerceOptions::default())
}

#[must_use]
pub fn coerce_with(schema: &Schema, options: &CoerceOptions) -> Schema {
    let memo = CoercionMemo::new();
    let coerced = transform(schema, &memo, options);
    debug!(
        root = schema.kind().name(),
        rewritten = memo.len(),
        file_inputs = options.file_inputs,
        "coerced schema"
    );
    coerced
}

/// Rewrites one node, reusing `memo` for every node reachable from it.
///
/// A memo must not be shared between unrelated schema trees.
pub fn transform(schema: &Schema, memo: &CoercionMemo, options: &CoerceOptions) -> Schema {
    if let Some(coerced) = memo.get(schema) {
        return coerced;
    }

    let captured = *options;
    let coerced = match schema.kind() {
        SchemaKind::Any | SchemaKind::Null => return schema.clone(),
        SchemaKind::Lazy(_) => return transform_lazy(schema, memo, options),
        SchemaKind::String | SchemaKind::Literal(_) | SchemaKind::Enum(_) => {
            Schema::preprocess(normalize_string, schema.clone())
        }
        SchemaKind::Number => Schema::preprocess(
            |value| normalize_string_with(value, parse_number),
            schema.clone(),
        ),
        SchemaKind::Boolean => Schema::preprocess(
            |value| normalize_string_with(value, parse_boolean),
            schema.clone(),
        ),
        SchemaKind::Date => Schema::preprocess(
            |value| normalize_string_with(value, parse_date),
            schema.clone(),
        ),
        SchemaKind::BigInt => Schema::preprocess(
            |value| normalize_string_with(value, parse_bigint),
            schema.clone(),
        ),
        SchemaKind::Array(element) => {
            let element = transform(element, memo, options);
            Schema::preprocess(
                move |value| normalize_array(value, &captured),
                Schema::array(element),
            )
        }
        SchemaKind::Object(shape) => Schema::from_shape(ObjectShape {
            fields: shape
                .fields
                .iter()
                .map(|(name, field)| (name.clone(), transform(field, memo, options)))
                .collect(),
            unknown_keys: shape.unknown_keys,
        }),
        SchemaKind::Effects { inner, .. } if options.file_inputs && is_file_like(schema, inner) => {
            Schema::preprocess(
                move |value| normalize_file(value, &captured),
                schema.clone(),
            )
        }
        SchemaKind::Effects { inner, effect } => Schema::new(SchemaKind::Effects {
            inner: transform(inner, memo, options),
            effect: effect.clone(),
        }),
        SchemaKind::Optional(inner) => Schema::preprocess(
            move |value| normalize_absent(value, &captured),
            transform(inner, memo, options).optional(),
        ),
        SchemaKind::Default { inner, value: fallback } => Schema::preprocess(
            move |value| normalize_absent(value, &captured),
            Schema::new(SchemaKind::Default {
                inner: transform(inner, memo, options),
                value: fallback.clone(),
            }),
        ),
        SchemaKind::Catch { inner, value } => Schema::new(SchemaKind::Catch {
            inner: transform(inner, memo, options),
            value: value.clone(),
        }),
        SchemaKind::Intersection(left, right) => Schema::intersection(
            transform(left, memo, options),
            transform(right, memo, options),
        ),
        SchemaKind::Union(choices) => Schema::union(
            choices
                .iter()
                .map(|choice| transform(choice, memo, options))
                .collect(),
        ),
        SchemaKind::DiscriminatedUnion(table) => {
            Schema::new(SchemaKind::DiscriminatedUnion(DiscriminatedUnion {
                discriminator: table.discriminator.clone(),
                options: table
                    .options
                    .iter()
                    .map(|choice| transform(choice, memo, options))
                    .collect(),
                lookup: table
                    .lookup
                    .iter()
                    .map(|(tag, choice)| (tag.clone(), transform(choice, memo, options)))
                    .collect(),
            }))
        }
        SchemaKind::Tuple(elements) => Schema::tuple(
            elements
                .iter()
                .map(|element| transform(element, memo, options))
                .collect(),
        ),
        SchemaKind::Nullable(inner) => transform(inner, memo, options).nullable(),
        SchemaKind::Pipeline { input, output } => {
            transform(input, memo, options).pipe(transform(output, memo, options))
        }
    };

    // A concurrent lazy resolution may have coerced this node already.
    if let Some(existing) = memo.get(schema) {
        return existing;
    }
    trace!(kind = schema.kind().name(), "coerced schema node");
    memo.insert(schema, &coerced);
    coerced
}

/// The counterpart defers to the source: the target is resolved and
/// transformed on first use, so producers that build a fresh node on every
/// call are only expanded as deep as the input goes.
fn transform_lazy(schema: &Schema, memo: &CoercionMemo, options: &CoerceOptions) -> Schema {
    let source = schema.clone();
    let shared = memo.clone();
    let captured = *options;
    let coerced = Schema::lazy(move || {
        let target = match source.kind() {
            SchemaKind::Lazy(lazy) => lazy.resolve().clone(),
            _ => source.clone(),
        };
        trace!(kind = target.kind().name(), "resolving coerced lazy schema");
        transform(&target, &shared, &captured)
    });
    memo.insert(schema, &coerced);
    coerced
}

fn normalize_absent(value: Value, options: &CoerceOptions) -> Value {
    normalize_file(normalize_string(value), options)
}

/// An effect over `Any` that accepts an empty upload but not an empty string
/// is a file leaf.
fn is_file_like(schema: &Schema, inner: &Schema) -> bool {
    matches!(inner.kind(), SchemaKind::Any)
        && schema.accepts(Value::File(FileBlob::empty()))
        && !schema.accepts(Value::String(String::new()))
}
