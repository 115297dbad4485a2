//! Environment configuration.

use std::env;

use form_coerce::CoerceOptions;
use session_store::{Cookie, CookieOptions, SessionStoreError};

pub const DEFAULT_COOKIE_NAME: &str = "__session";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvConfig {
    pub cookie_name: String,
    pub file_inputs: bool,
    pub log_filter: Option<String>,
}

impl Default for EnvConfig {
    fn default() -> Self {
        Self {
            cookie_name: DEFAULT_COOKIE_NAME.to_string(),
            file_inputs: true,
            log_filter: None,
        }
    }
}

impl EnvConfig {
    pub fn from_env() -> Self {
        Self {
            cookie_name: env_string_opt("TYPED_SESSION_COOKIE_NAME")
                .unwrap_or_else(|| DEFAULT_COOKIE_NAME.to_string()),
            file_inputs: env_flag("TYPED_SESSION_FILE_INPUTS").unwrap_or(true),
            log_filter: env_string_opt("TYPED_SESSION_LOG"),
        }
    }

    #[must_use]
    pub fn coerce_options(&self) -> CoerceOptions {
        CoerceOptions::new().with_file_inputs(self.file_inputs)
    }

    pub fn cookie(&self, options: CookieOptions) -> Result<Cookie, SessionStoreError> {
        Cookie::new(self.cookie_name.clone(), options)
    }
}

/// `1`/`true` and `0`/`false`; anything else counts as unset.
fn env_flag(key: &str) -> Option<bool> {
    match env::var(key).ok()?.trim() {
        "1" | "true" => Some(true),
        "0" | "false" => Some(false),
        _ => None,
    }
}

fn env_string_opt(key: &str) -> Option<String> {
    env::var(key).ok().and_then(|value| {
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    })
}

#[cfg(test)]
mod tests {
    use super::{EnvConfig, DEFAULT_COOKIE_NAME};
    use std::env;
    use std::sync::{Mutex, OnceLock};

    struct EnvGuard {
        key: &'static str,
        previous: Option<String>,
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            if let Some(value) = &self.previous {
                env::set_var(self.key, value);
            } else {
                env::remove_var(self.key);
            }
        }
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        LOCK.get_or_init(|| Mutex::new(()))
            .lock()
            .expect("env lock poisoned")
    }

    fn set_env_guard(key: &'static str, value: Option<&str>) -> EnvGuard {
        let previous = env::var(key).ok();
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
        EnvGuard { key, previous }
    }

    #[test]
    fn env_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard("TYPED_SESSION_COOKIE_NAME", None);
        let _g2 = set_env_guard("TYPED_SESSION_FILE_INPUTS", None);
        let _g3 = set_env_guard("TYPED_SESSION_LOG", None);

        let config = EnvConfig::from_env();
        assert_eq!(config, EnvConfig::default());
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
        assert!(config.coerce_options().file_inputs);
    }

    #[test]
    fn env_values_override_defaults() {
        let _lock = env_lock();
        let _g1 = set_env_guard("TYPED_SESSION_COOKIE_NAME", Some("sid"));
        let _g2 = set_env_guard("TYPED_SESSION_FILE_INPUTS", Some("0"));
        let _g3 = set_env_guard("TYPED_SESSION_LOG", Some("typed_session=debug"));

        let config = EnvConfig::from_env();
        assert_eq!(config.cookie_name, "sid");
        assert!(!config.file_inputs);
        assert_eq!(config.log_filter.as_deref(), Some("typed_session=debug"));
        let cookie = config
            .cookie(Default::default())
            .expect("sid is a valid cookie name");
        assert_eq!(cookie.name(), "sid");
    }

    #[test]
    fn unrecognized_flag_keeps_default() {
        let _lock = env_lock();
        let _g1 = set_env_guard("TYPED_SESSION_FILE_INPUTS", Some("maybe"));
        let _g2 = set_env_guard("TYPED_SESSION_COOKIE_NAME", Some("  "));
        let config = EnvConfig::from_env();
        assert!(config.file_inputs);
        assert_eq!(config.cookie_name, DEFAULT_COOKIE_NAME);
    }
}
