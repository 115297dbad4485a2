use std::collections::BTreeMap;

use futures_util::future::{BoxFuture, FutureExt};
use tracing::trace;

use crate::error::{Issue, IssueCode, PathSegment, ValidationError};
use crate::node::{Effect, Schema, SchemaKind, UnknownKeys};
use crate::value::Value;

type Outcome = Result<Value, Vec<Issue>>;

impl Schema {
    /// Validates `value`, returning the parsed output (defaults applied,
    /// transforms run, unknown keys handled per object policy).
    pub async fn parse_async(&self, value: Value) -> Result<Value, ValidationError> {
        check(self.clone(), value, Vec::new()).await.map_err(|issues| {
            trace!(kind = self.kind().name(), issues = issues.len(), "validation failed");
            ValidationError::new(issues)
        })
    }

    /// Validates without an executor.
    ///
    /// Returns `None` when an async refinement is still pending after the
    /// first poll; purely synchronous schemas always produce `Some`.
    #[must_use]
    pub fn safe_parse(&self, value: Value) -> Option<Result<Value, ValidationError>> {
        self.parse_async(value).now_or_never()
    }

    /// Synchronous acceptance check; pending async checks count as rejection.
    #[must_use]
    pub fn accepts(&self, value: Value) -> bool {
        matches!(self.safe_parse(value), Some(Ok(_)))
    }
}

fn child(path: &[PathSegment], segment: PathSegment) -> Vec<PathSegment> {
    let mut path = path.to_vec();
    path.push(segment);
    path
}

fn type_issue(expected: &str, received: &Value, path: &[PathSegment]) -> Issue {
    let message = if received.is_undefined() {
        "Required".to_string()
    } else {
        format!("Expected {expected}, received {}", received.type_name())
    };
    Issue::new(IssueCode::InvalidType, path, message)
}

fn expect_kind(expected: &str, value: Value, path: &[PathSegment], ok: bool) -> Outcome {
    if ok {
        Ok(value)
    } else {
        Err(vec![type_issue(expected, &value, path)])
    }
}

fn check(schema: Schema, value: Value, path: Vec<PathSegment>) -> BoxFuture<'static, Outcome> {
    async move {
        match schema.kind() {
            SchemaKind::String => {
                let ok = matches!(value, Value::String(_));
                expect_kind("string", value, &path, ok)
            }
            SchemaKind::Number => {
                let ok = matches!(value, Value::Number(n) if !n.is_nan());
                expect_kind("number", value, &path, ok)
            }
            SchemaKind::Boolean => {
                let ok = matches!(value, Value::Bool(_));
                expect_kind("boolean", value, &path, ok)
            }
            SchemaKind::Date => {
                let ok = matches!(value, Value::Date(_));
                expect_kind("date", value, &path, ok)
            }
            SchemaKind::BigInt => {
                let ok = matches!(value, Value::BigInt(_));
                expect_kind("bigint", value, &path, ok)
            }
            SchemaKind::Null => {
                let ok = matches!(value, Value::Null);
                expect_kind("null", value, &path, ok)
            }
            SchemaKind::Any => Ok(value),
            SchemaKind::Literal(expected) => {
                if &value == expected {
                    Ok(value)
                } else {
                    Err(vec![Issue::new(
                        IssueCode::InvalidLiteral,
                        &path,
                        format!("Invalid literal value, expected {}", expected.to_json()),
                    )])
                }
            }
            SchemaKind::Enum(options) => {
                let issue = match &value {
                    Value::String(s) if options.iter().any(|option| option == s) => None,
                    Value::String(s) => Some(Issue::new(
                        IssueCode::InvalidEnumValue,
                        &path,
                        format!(
                            "Invalid enum value. Expected {}, received '{s}'",
                            quoted_list(options)
                        ),
                    )),
                    other => Some(type_issue(&quoted_list(options), other, &path)),
                };
                match issue {
                    None => Ok(value),
                    Some(issue) => Err(vec![issue]),
                }
            }
            SchemaKind::Array(element) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(vec![type_issue("array", &other, &path)]),
                };
                let mut output = Vec::with_capacity(items.len());
                let mut issues = Vec::new();
                for (index, item) in items.into_iter().enumerate() {
                    match check(element.clone(), item, child(&path, PathSegment::Index(index)))
                        .await
                    {
                        Ok(parsed) => output.push(parsed),
                        Err(found) => issues.extend(found),
                    }
                }
                if issues.is_empty() {
                    Ok(Value::Array(output))
                } else {
                    Err(issues)
                }
            }
            SchemaKind::Object(shape) => {
                let mut input = match value {
                    Value::Object(fields) => fields,
                    other => return Err(vec![type_issue("object", &other, &path)]),
                };
                let mut output = BTreeMap::new();
                let mut issues = Vec::new();
                for (name, field) in &shape.fields {
                    let raw = input.remove(name).unwrap_or_default();
                    match check(field.clone(), raw, child(&path, PathSegment::Key(name.clone())))
                        .await
                    {
                        Ok(Value::Undefined) => {}
                        Ok(parsed) => {
                            output.insert(name.clone(), parsed);
                        }
                        Err(found) => issues.extend(found),
                    }
                }

                match shape.unknown_keys {
                    UnknownKeys::Strip => {}
                    UnknownKeys::Passthrough => output.extend(input),
                    UnknownKeys::Strict if !input.is_empty() => {
                        let keys = input.keys().cloned().collect::<Vec<_>>();
                        issues.push(Issue::new(
                            IssueCode::UnrecognizedKeys,
                            &path,
                            format!("Unrecognized key(s) in object: {}", quoted_list(&keys)),
                        ));
                    }
                    UnknownKeys::Strict => {}
                }

                if issues.is_empty() {
                    Ok(Value::Object(output))
                } else {
                    Err(issues)
                }
            }
            SchemaKind::Effects { inner, effect } => match effect {
                Effect::Preprocess(f) => check(inner.clone(), f(value), path).await,
                Effect::Transform(f) => check(inner.clone(), value, path).await.map(|v| f(v)),
                Effect::Refine { check: predicate, message } => {
                    let parsed = check(inner.clone(), value, path.clone()).await?;
                    if predicate(&parsed) {
                        Ok(parsed)
                    } else {
                        Err(vec![Issue::new(IssueCode::Custom, &path, message.clone())])
                    }
                }
                Effect::RefineAsync { check: predicate, message } => {
                    let parsed = check(inner.clone(), value, path.clone()).await?;
                    if predicate(parsed.clone()).await {
                        Ok(parsed)
                    } else {
                        Err(vec![Issue::new(IssueCode::Custom, &path, message.clone())])
                    }
                }
            },
            SchemaKind::Optional(inner) => match value {
                Value::Undefined => Ok(Value::Undefined),
                value => check(inner.clone(), value, path).await,
            },
            SchemaKind::Nullable(inner) => match value {
                Value::Null => Ok(Value::Null),
                value => check(inner.clone(), value, path).await,
            },
            SchemaKind::Default { inner, value: fallback } => match value {
                Value::Undefined => check(inner.clone(), fallback.clone(), path).await,
                value => check(inner.clone(), value, path).await,
            },
            SchemaKind::Catch { inner, value: fallback } => {
                Ok(check(inner.clone(), value, path)
                    .await
                    .unwrap_or_else(|_| fallback.clone()))
            }
            SchemaKind::Intersection(left, right) => {
                let left = check(left.clone(), value.clone(), path.clone()).await;
                let right = check(right.clone(), value, path.clone()).await;
                match (left, right) {
                    (Ok(left), Ok(right)) => merge(left, right).ok_or_else(|| {
                        vec![Issue::new(
                            IssueCode::InvalidIntersectionTypes,
                            &path,
                            "Intersection results could not be merged",
                        )]
                    }),
                    (Err(mut issues), Err(more)) => {
                        issues.extend(more);
                        Err(issues)
                    }
                    (Err(issues), Ok(_)) | (Ok(_), Err(issues)) => Err(issues),
                }
            }
            SchemaKind::Union(options) => {
                for option in options {
                    if let Ok(parsed) = check(option.clone(), value.clone(), path.clone()).await {
                        return Ok(parsed);
                    }
                }
                Err(vec![Issue::new(IssueCode::InvalidUnion, &path, "Invalid input")])
            }
            SchemaKind::DiscriminatedUnion(table) => {
                if !matches!(value, Value::Object(_)) {
                    return Err(vec![type_issue("object", &value, &path)]);
                }
                let option = value
                    .get(&table.discriminator)
                    .and_then(Value::as_str)
                    .and_then(|tag| table.lookup.get(tag))
                    .cloned();
                match option {
                    Some(option) => check(option, value, path).await,
                    None => {
                        let keys = table.lookup.keys().cloned().collect::<Vec<_>>();
                        Err(vec![Issue::new(
                            IssueCode::InvalidUnionDiscriminator,
                            &child(&path, PathSegment::Key(table.discriminator.clone())),
                            format!("Invalid discriminator value. Expected {}", quoted_list(&keys)),
                        )])
                    }
                }
            }
            SchemaKind::Tuple(elements) => {
                let items = match value {
                    Value::Array(items) => items,
                    other => return Err(vec![type_issue("array", &other, &path)]),
                };
                if items.len() != elements.len() {
                    let code = if items.len() < elements.len() {
                        IssueCode::TooSmall
                    } else {
                        IssueCode::TooBig
                    };
                    return Err(vec![Issue::new(
                        code,
                        &path,
                        format!(
                            "Tuple expects {} element(s), received {}",
                            elements.len(),
                            items.len()
                        ),
                    )]);
                }
                let mut output = Vec::with_capacity(items.len());
                let mut issues = Vec::new();
                for (index, (element, item)) in elements.iter().zip(items).enumerate() {
                    match check(element.clone(), item, child(&path, PathSegment::Index(index)))
                        .await
                    {
                        Ok(parsed) => output.push(parsed),
                        Err(found) => issues.extend(found),
                    }
                }
                if issues.is_empty() {
                    Ok(Value::Array(output))
                } else {
                    Err(issues)
                }
            }
            SchemaKind::Pipeline { input, output } => {
                let intermediate = check(input.clone(), value, path.clone()).await?;
                check(output.clone(), intermediate, path).await
            }
            SchemaKind::Lazy(lazy) => check(lazy.resolve().clone(), value, path).await,
        }
    }
    .boxed()
}

fn merge(left: Value, right: Value) -> Option<Value> {
    match (left, right) {
        (Value::Object(mut left), Value::Object(right)) => {
            for (key, value) in right {
                let merged = match left.remove(&key) {
                    Some(existing) => merge(existing, value)?,
                    None => value,
                };
                left.insert(key, merged);
            }
            Some(Value::Object(left))
        }
        (Value::Array(left), Value::Array(right)) if left.len() == right.len() => left
            .into_iter()
            .zip(right)
            .map(|(l, r)| merge(l, r))
            .collect::<Option<Vec<_>>>()
            .map(Value::Array),
        (left, right) if left == right => Some(left),
        _ => None,
    }
}

fn quoted_list(values: &[String]) -> String {
    values
        .iter()
        .map(|value| format!("'{value}'"))
        .collect::<Vec<_>>()
        .join(" | ")
}
