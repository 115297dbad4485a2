use std::collections::BTreeMap;

use form_schema::Value;

/// Key/value data of one session, real and flash keys side by side.
pub type Record = BTreeMap<String, Value>;

const FLASH_PREFIX: &str = "__flash_";
const FLASH_SUFFIX: &str = "__";

/// Shadow key under which a flash value for `key` is stored.
#[must_use]
pub fn flash_key(key: &str) -> String {
    format!("{FLASH_PREFIX}{key}{FLASH_SUFFIX}")
}

/// Inverse of [`flash_key`].
#[must_use]
pub fn flash_target(key: &str) -> Option<&str> {
    key.strip_prefix(FLASH_PREFIX)?
        .strip_suffix(FLASH_SUFFIX)
        .filter(|target| !target.is_empty())
}

/// Shape shared by every session value handed out by a store.
pub trait SessionShape {
    /// Durable identifier; empty when the backend keeps no server-side record.
    fn id(&self) -> &str;

    fn data(&self) -> &Record;

    /// Whether the session validates its data against a schema.
    fn is_typed(&self) -> bool {
        false
    }
}

/// Untyped session as produced by a [`crate::SessionStorage`] backend.
///
/// A flashed value shadows the real value for exactly one [`RawSession::get`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawSession {
    id: String,
    data: Record,
}

impl RawSession {
    pub fn new(id: impl Into<String>, data: Record) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    #[must_use]
    pub fn into_data(self) -> Record {
        self.data
    }

    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.data.contains_key(key) || self.data.contains_key(&flash_key(key))
    }

    /// Returns the pending flash value (consuming it) or else the real value.
    pub fn get(&mut self, key: &str) -> Option<Value> {
        if let Some(flashed) = self.data.remove(&flash_key(key)) {
            return Some(flashed);
        }
        self.data.get(key).cloned()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.data.insert(key.into(), value.into());
    }

    pub fn flash(&mut self, key: &str, value: impl Into<Value>) {
        self.data.insert(flash_key(key), value.into());
    }

    pub fn unset(&mut self, key: &str) {
        self.data.remove(key);
    }
}

impl SessionShape for RawSession {
    fn id(&self) -> &str {
        &self.id
    }

    fn data(&self) -> &Record {
        &self.data
    }
}

#[cfg(test)]
mod tests {
    use super::{flash_key, flash_target, RawSession, SessionShape};
    use form_schema::Value;

    #[test]
    fn flash_keys_round_trip() {
        assert_eq!(flash_key("name"), "__flash_name__");
        assert_eq!(flash_target("__flash_name__"), Some("name"));
        assert_eq!(flash_target("name"), None);
        assert_eq!(flash_target("__flash___"), None);
    }

    #[test]
    fn flash_value_is_read_once() {
        let mut session = RawSession::default();
        session.set("notice", "kept");
        session.flash("notice", "once");

        assert!(session.has("notice"));
        assert_eq!(session.get("notice"), Some(Value::from("once")));
        assert_eq!(session.get("notice"), Some(Value::from("kept")));
        session.unset("notice");
        assert!(!session.has("notice"));
        assert_eq!(session.get("notice"), None);
    }

    #[test]
    fn raw_sessions_are_untyped() {
        let session = RawSession::new("abc", Default::default());
        assert_eq!(session.id(), "abc");
        assert!(!session.is_typed());
    }
}
