use std::future::Future;

use crate::cookie::CookieOptions;
use crate::error::SessionStoreError;
use crate::session::RawSession;

/// Backend that turns a `Cookie` header into a session and back.
///
/// `commit_session` and `destroy_session` return the `Set-Cookie` value the
/// caller must send; `options` replaces the backend cookie's attributes for
/// that one header.
pub trait SessionStorage: Send + Sync {
    fn get_session(
        &self,
        cookie_header: Option<&str>,
    ) -> impl Future<Output = Result<RawSession, SessionStoreError>> + Send;

    fn commit_session(
        &self,
        session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> impl Future<Output = Result<String, SessionStoreError>> + Send;

    fn destroy_session(
        &self,
        session: &RawSession,
        options: Option<&CookieOptions>,
    ) -> impl Future<Output = Result<String, SessionStoreError>> + Send;
}
