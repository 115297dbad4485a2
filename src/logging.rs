//! Tracing subscriber setup.

use std::sync::OnceLock;

use thiserror::Error;
use tracing::debug;
use tracing_subscriber::EnvFilter;

const DEFAULT_FILTER: &str = "typed_session=info,session_store=info,form_coerce=info";

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter '{filter}': {source}")]
    Filter {
        filter: String,
        #[source]
        source: tracing_subscriber::filter::ParseError,
    },
}

/// Installs a stderr `fmt` subscriber once per process.
///
/// `filter` takes precedence over `RUST_LOG`. Returns `true` only for the
/// call that installed the subscriber. Later calls return `false`, as does
/// the first call when another global subscriber is already installed; that
/// case is reported as a debug event to the existing subscriber.
pub fn init_logging(filter: Option<&str>) -> Result<bool, LoggingError> {
    static INIT: OnceLock<()> = OnceLock::new();

    let filter = match filter {
        Some(directives) => EnvFilter::try_new(directives).map_err(|source| LoggingError::Filter {
            filter: directives.to_string(),
            source,
        })?,
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER)),
    };

    let mut installed = false;
    INIT.get_or_init(|| {
        match tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .try_init()
        {
            Ok(()) => installed = true,
            Err(error) => debug!(%error, "another tracing subscriber is already installed"),
        }
    });
    Ok(installed)
}
