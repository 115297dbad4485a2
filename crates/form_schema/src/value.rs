use std::collections::BTreeMap;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Number, Value as JsonValue};
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

/// Metadata of an uploaded file as delivered by a multipart form.
///
/// Browsers submit an empty file input as a blob with no name and no bytes,
/// which [`FileBlob::is_empty_upload`] recognizes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileBlob {
    pub name: String,
    pub size: u64,
    #[serde(rename = "type", default)]
    pub content_type: String,
}

impl FileBlob {
    #[must_use]
    pub fn new(name: impl Into<String>, size: u64) -> Self {
        Self {
            name: name.into(),
            size,
            content_type: String::new(),
        }
    }

    #[must_use]
    pub fn empty() -> Self {
        Self::new("", 0)
    }

    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = content_type.into();
        self
    }

    #[must_use]
    pub fn is_empty_upload(&self) -> bool {
        self.name.is_empty() && self.size == 0
    }
}

/// Dynamic value flowing through validation.
///
/// `Undefined` marks an absent value (a missing object key or an omitted form
/// field) and is distinct from an explicit `Null`.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    BigInt(i128),
    String(String),
    Date(OffsetDateTime),
    Array(Vec<Value>),
    Object(BTreeMap<String, Value>),
    File(FileBlob),
}

impl Value {
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, Value)>,
    {
        Self::Object(
            entries
                .into_iter()
                .map(|(key, value)| (key.into(), value))
                .collect(),
        )
    }

    #[must_use]
    pub fn is_undefined(&self) -> bool {
        matches!(self, Self::Undefined)
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(value) => Some(value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(value) => Some(*value),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_array(&self) -> Option<&[Value]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_object(&self) -> Option<&BTreeMap<String, Value>> {
        match self {
            Self::Object(fields) => Some(fields),
            _ => None,
        }
    }

    /// Looks up an object field; any other value yields `None`.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.as_object().and_then(|fields| fields.get(key))
    }

    /// Name of the runtime type, as reported in validation issues.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::Null => "null",
            Self::Bool(_) => "boolean",
            Self::Number(value) if value.is_nan() => "nan",
            Self::Number(_) => "number",
            Self::BigInt(_) => "bigint",
            Self::String(_) => "string",
            Self::Date(_) => "date",
            Self::Array(_) => "array",
            Self::Object(_) => "object",
            Self::File(_) => "file",
        }
    }

    /// Lossy conversion into JSON.
    ///
    /// Dates become RFC 3339 strings, big integers decimal strings, integral
    /// numbers JSON integers and non-finite numbers `null`. Undefined object
    /// entries are dropped.
    #[must_use]
    pub fn to_json(&self) -> JsonValue {
        match self {
            Self::Undefined | Self::Null => JsonValue::Null,
            Self::Bool(value) => JsonValue::Bool(*value),
            Self::Number(value) if value.fract() == 0.0 && value.abs() < 9_007_199_254_740_992.0 => {
                JsonValue::Number(Number::from(*value as i64))
            }
            Self::Number(value) => Number::from_f64(*value)
                .map(JsonValue::Number)
                .unwrap_or(JsonValue::Null),
            Self::BigInt(value) => JsonValue::String(value.to_string()),
            Self::String(value) => JsonValue::String(value.clone()),
            Self::Date(value) => value
                .format(&Rfc3339)
                .map(JsonValue::String)
                .unwrap_or(JsonValue::Null),
            Self::Array(items) => JsonValue::Array(items.iter().map(Value::to_json).collect()),
            Self::Object(fields) => JsonValue::Object(
                fields
                    .iter()
                    .filter(|(_, value)| !value.is_undefined())
                    .map(|(key, value)| (key.clone(), value.to_json()))
                    .collect::<Map<String, JsonValue>>(),
            ),
            Self::File(file) => serde_json::to_value(file).unwrap_or(JsonValue::Null),
        }
    }
}

impl From<JsonValue> for Value {
    fn from(value: JsonValue) -> Self {
        match value {
            JsonValue::Null => Self::Null,
            JsonValue::Bool(value) => Self::Bool(value),
            JsonValue::Number(value) => Self::Number(value.as_f64().unwrap_or(f64::NAN)),
            JsonValue::String(value) => Self::String(value),
            JsonValue::Array(items) => Self::Array(items.into_iter().map(Value::from).collect()),
            JsonValue::Object(fields) => Self::Object(
                fields
                    .into_iter()
                    .map(|(key, value)| (key, Value::from(value)))
                    .collect(),
            ),
        }
    }
}

impl Serialize for Value {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_json().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Value {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        JsonValue::deserialize(deserializer).map(Value::from)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl From<i128> for Value {
    fn from(value: i128) -> Self {
        Self::BigInt(value)
    }
}

impl From<OffsetDateTime> for Value {
    fn from(value: OffsetDateTime) -> Self {
        Self::Date(value)
    }
}

impl From<FileBlob> for Value {
    fn from(value: FileBlob) -> Self {
        Self::File(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(items: Vec<Value>) -> Self {
        Self::Array(items)
    }
}

impl From<BTreeMap<String, Value>> for Value {
    fn from(fields: BTreeMap<String, Value>) -> Self {
        Self::Object(fields)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Undefined, Into::into)
    }
}
