use std::fmt::Write as _;

use time::macros::format_description;
use time::{Duration, OffsetDateTime, UtcOffset};

use crate::error::SessionStoreError;

/// Largest cookie most browsers will store.
pub const MAX_COOKIE_BYTES: usize = 4096;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Strict => "Strict",
            Self::Lax => "Lax",
            Self::None => "None",
        }
    }
}

/// Attributes written into a `Set-Cookie` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieOptions {
    pub path: Option<String>,
    pub domain: Option<String>,
    /// Lifetime in seconds; takes precedence over `expires` for backends
    /// that compute an expiry.
    pub max_age: Option<i64>,
    pub expires: Option<OffsetDateTime>,
    pub http_only: bool,
    pub secure: bool,
    pub same_site: Option<SameSite>,
}

impl Default for CookieOptions {
    fn default() -> Self {
        Self {
            path: Some("/".to_string()),
            domain: None,
            max_age: None,
            expires: None,
            http_only: true,
            secure: false,
            same_site: Some(SameSite::Lax),
        }
    }
}

impl CookieOptions {
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, seconds: i64) -> Self {
        self.max_age = Some(seconds);
        self
    }

    #[must_use]
    pub fn with_expires(mut self, expires: OffsetDateTime) -> Self {
        self.expires = Some(expires);
        self
    }

    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    #[must_use]
    pub fn with_http_only(mut self, http_only: bool) -> Self {
        self.http_only = http_only;
        self
    }

    #[must_use]
    pub fn with_same_site(mut self, same_site: Option<SameSite>) -> Self {
        self.same_site = same_site;
        self
    }

    /// Absolute expiry implied by these options, relative to `now`.
    #[must_use]
    pub fn expiry(&self, now: OffsetDateTime) -> Option<OffsetDateTime> {
        match self.max_age {
            Some(seconds) => Some(now + Duration::seconds(seconds)),
            None => self.expires,
        }
    }

    /// Options that make a browser drop the cookie immediately.
    #[must_use]
    pub fn expired(&self) -> Self {
        Self {
            max_age: None,
            expires: Some(OffsetDateTime::UNIX_EPOCH),
            ..self.clone()
        }
    }
}

/// Named cookie carrying a session reference or payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cookie {
    name: String,
    options: CookieOptions,
}

impl Cookie {
    pub fn new(name: impl Into<String>, options: CookieOptions) -> Result<Self, SessionStoreError> {
        let name = name.into();
        let valid = !name.is_empty()
            && name
                .bytes()
                .all(|b| b.is_ascii_graphic() && !b"()<>@,;:\\\"/[]?={}".contains(&b));
        if !valid {
            return Err(SessionStoreError::InvalidCookieName { name });
        }
        Ok(Self { name, options })
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn options(&self) -> &CookieOptions {
        &self.options
    }

    /// Extracts this cookie's value from a `Cookie` request header.
    #[must_use]
    pub fn parse<'a>(&self, header: Option<&'a str>) -> Option<&'a str> {
        header?
            .split(';')
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| name.trim() == self.name)
            .map(|(_, value)| value.trim().trim_matches('"'))
    }

    /// Builds a `Set-Cookie` value; `overrides` replaces this cookie's
    /// default attributes when given.
    pub fn serialize(
        &self,
        value: &str,
        overrides: Option<&CookieOptions>,
    ) -> Result<String, SessionStoreError> {
        let options = overrides.unwrap_or(&self.options);
        let mut header = format!("{}={}", self.name, value);

        if let Some(max_age) = options.max_age {
            let _ = write!(header, "; Max-Age={max_age}");
        }
        if let Some(domain) = &options.domain {
            let _ = write!(header, "; Domain={domain}");
        }
        if let Some(path) = &options.path {
            let _ = write!(header, "; Path={path}");
        }
        if let Some(expires) = options.expires {
            let _ = write!(header, "; Expires={}", http_date(expires)?);
        }
        if options.http_only {
            header.push_str("; HttpOnly");
        }
        if options.secure {
            header.push_str("; Secure");
        }
        if let Some(same_site) = options.same_site {
            let _ = write!(header, "; SameSite={}", same_site.as_str());
        }

        if header.len() > MAX_COOKIE_BYTES {
            return Err(SessionStoreError::CookieTooLarge {
                name: self.name.clone(),
                length: header.len(),
                limit: MAX_COOKIE_BYTES,
            });
        }
        Ok(header)
    }
}

fn http_date(at: OffsetDateTime) -> Result<String, SessionStoreError> {
    at.to_offset(UtcOffset::UTC)
        .format(format_description!(
            "[weekday repr:short], [day] [month repr:short] [year] [hour]:[minute]:[second] GMT"
        ))
        .map_err(SessionStoreError::ExpiryFormat)
}
