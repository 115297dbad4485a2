//! Untyped session storage: the session record, the cookie codec and two
//! backends (process memory and cookie payload) behind [`SessionStorage`].

mod cookie;
mod cookie_storage;
mod error;
mod memory;
mod session;
mod storage;

pub use cookie::{Cookie, CookieOptions, SameSite, MAX_COOKIE_BYTES};
pub use cookie_storage::CookieSessionStorage;
pub use error::SessionStoreError;
pub use memory::MemorySessionStorage;
pub use session::{flash_key, flash_target, RawSession, Record, SessionShape};
pub use storage::SessionStorage;
