use base64::{engine::general_purpose, Engine as _};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::cookie::{Cookie, CookieOptions};
use crate::error::SessionStoreError;
use crate::session::{RawSession, Record, SessionShape};
use crate::storage::SessionStorage;

const PAYLOAD_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct CookiePayload {
    version: u32,
    data: Record,
}

/// Keeps the whole session inside the cookie as base64-encoded JSON.
///
/// Sessions have no durable identity, so their id is always empty. The
/// payload is not signed.
pub struct CookieSessionStorage {
    cookie: Cookie,
}

impl CookieSessionStorage {
    #[must_use]
    pub fn new(cookie: Cookie) -> Self {
        Self { cookie }
    }

    #[must_use]
    pub fn cookie(&self) -> &Cookie {
        &self.cookie
    }

    pub fn encode(data: &Record) -> Result<String, SessionStoreError> {
        let payload = CookiePayload {
            version: PAYLOAD_VERSION,
            data: data.clone(),
        };
        let json = serde_json::to_vec(&payload).map_err(|source| SessionStoreError::encode("", source))?;
        Ok(general_purpose::URL_SAFE_NO_PAD.encode(json))
    }

    /// Returns `None` for values that are not a payload this storage wrote.
    #[must_use]
    pub fn decode(value: &str) -> Option<Record> {
        let bytes = general_purpose::URL_SAFE_NO_PAD.decode(value).ok()?;
        let payload = serde_json::from_slice::<CookiePayload>(&bytes).ok()?;
        if payload.version != PAYLOAD_VERSION {
            debug!(found = payload.version, "ignoring cookie payload with unsupported version");
            return None;
        }
        Some(payload.data)
    }
}

impl SessionStorage for CookieSessionStorage {
    async fn get_session(&self, cookie_header: Option<&str>) -> Result<RawSession, SessionStoreError> {
        let data = match self.cookie.parse(cookie_header) {
            Some(value) => Self::decode(value).unwrap_or_else(|| {
                debug!(cookie = self.cookie.name(), "undecodable session cookie; starting a new session");
                Record::new()
            }),
            None => Record::new(),
        };
        Ok(RawSession::new("", data))
    }

    async fn commit_session(
        &self,
        session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, SessionStoreError> {
        let value = Self::encode(session.data())?;
        self.cookie.serialize(&value, options)
    }

    async fn destroy_session(
        &self,
        _session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> Result<String, SessionStoreError> {
        let expired = options.unwrap_or(self.cookie.options()).expired();
        self.cookie.serialize("", Some(&expired))
    }
}
