use std::collections::HashMap;
use std::sync::Mutex;

use time::OffsetDateTime;
use tracing::debug;
use uuid::Uuid;

use crate::cookie::{Cookie, CookieOptions};
use crate::error::SessionStoreError;
use crate::session::{RawSession, Record, SessionShape};
use crate::storage::SessionStorage;

#[derive(Debug)]
struct StoredRecord {
    data: Record,
    expires: Option<OffsetDateTime>,
}

impl StoredRecord {
    fn is_expired(&self, now: OffsetDateTime) -> bool {
        self.expires.is_some_and(|expires| expires <= now)
    }
}

/// Keeps session data in process memory; the cookie carries only the id.
#[derive(Debug)]
pub struct MemorySessionStorage {
    cookie: Cookie,
    records: Mutex<HashMap<String, StoredRecord>>,
}

impl MemorySessionStorage {
    #[must_use]
    pub fn new(cookie: Cookie) -> Self {
        Self {
            cookie,
            records: Mutex::new(HashMap::new()),
        }
    }

    #[must_use]
    pub fn cookie(&self) -> &Cookie {
        &self.cookie
    }

    /// Number of stored, unexpired sessions.
    pub fn len(&self) -> Result<usize, SessionStoreError> {
        let now = OffsetDateTime::now_utc();
        let records = self
            .records
            .lock()
            .map_err(|_| SessionStoreError::poisoned("counting sessions"))?;
        Ok(records.values().filter(|record| !record.is_expired(now)).count())
    }

    pub fn is_empty(&self) -> Result<bool, SessionStoreError> {
        self.len().map(|len| len == 0)
    }

    fn load(&self, id: &str) -> Result<Option<Record>, SessionStoreError> {
        let mut records = self
            .records
            .lock()
            .map_err(|_| SessionStoreError::poisoned("reading a session"))?;
        let now = OffsetDateTime::now_utc();
        let expired = match records.get(id) {
            Some(record) => record.is_expired(now),
            None => return Ok(None),
        };
        if expired {
            debug!(session_id = id, "dropping expired session");
            records.remove(id);
            return Ok(None);
        }
        Ok(records.get(id).map(|record| record.data.clone()))
    }
}

impl SessionStorage for MemorySessionStorage {
    async fn get_session(&self, cookie_header: Option<&str>) -> Result<RawSession, SessionStoreError> {
        let Some(id) = self.cookie.parse(cookie_header) else {
            return Ok(RawSession::default());
        };
        match self.load(id)? {
            Some(data) => Ok(RawSession::new(id, data)),
            None => {
                debug!(session_id = id, "unknown session id; starting a new session");
                Ok(RawSession::default())
            }
        }
    }

    async fn commit_session(
        &self,
        session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, SessionStoreError> {
        let effective = options.unwrap_or(self.cookie.options());
        let id = if session.id().is_empty() {
            Uuid::new_v4().to_string()
        } else {
            session.id().to_string()
        };
        let now = OffsetDateTime::now_utc();
        let record = StoredRecord {
            data: session.data().clone(),
            expires: effective.expiry(now),
        };

        let mut records = self
            .records
            .lock()
            .map_err(|_| SessionStoreError::poisoned("committing a session"))?;
        // Sessions that are never requested again are only reclaimed here.
        let before = records.len();
        records.retain(|_, stored| !stored.is_expired(now));
        let swept = before - records.len();
        if swept > 0 {
            debug!(swept, "swept expired sessions");
        }
        records.insert(id.clone(), record);
        drop(records);
        debug!(session_id = %id, keys = session.data().len(), "committed session");

        self.cookie.serialize(&id, Some(effective))
    }

    async fn destroy_session(
        &self,
        session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, SessionStoreError> {
        if !session.id().is_empty() {
            self.records
                .lock()
                .map_err(|_| SessionStoreError::poisoned("destroying a session"))?
                .remove(session.id());
            debug!(session_id = session.id(), "destroyed session");
        }
        let effective = options.unwrap_or(self.cookie.options()).expired();
        self.cookie.serialize("", Some(&effective))
    }
}

#[cfg(test)]
mod tests {
    use super::MemorySessionStorage;
    use crate::cookie::{Cookie, CookieOptions};
    use crate::session::{RawSession, Record};
    use crate::storage::SessionStorage;
    use form_schema::Value;

    fn record(value: &str) -> Record {
        Record::from([("user".to_string(), Value::from(value))])
    }

    fn stored(storage: &MemorySessionStorage) -> usize {
        storage.records.lock().expect("lock should be healthy").len()
    }

    #[tokio::test]
    async fn commit_sweeps_expired_records() {
        let storage = MemorySessionStorage::new(
            Cookie::new("__session", CookieOptions::default()).expect("cookie name should be valid"),
        );

        let short_lived = CookieOptions::default().with_max_age(0);
        for user in ["ann", "bob"] {
            storage
                .commit_session(&RawSession::new("", record(user)), Some(&short_lived))
                .await
                .expect("commit succeeds");
        }
        assert_eq!(stored(&storage), 1, "the first expired record is swept by the second commit");

        storage
            .commit_session(&RawSession::new("", record("cy")), None)
            .await
            .expect("commit succeeds");
        assert_eq!(stored(&storage), 1);
        assert_eq!(storage.len().expect("lock should be healthy"), 1);
    }
}
