//! pbsync-http - PocketBase HTTP session implementation.
//!
//! [`HttpBackend`] logs in to PocketBase instances through their
//! administrative API and hands out [`HttpSession`]s implementing
//! [`pbsync_core::Session`].

mod api;
mod backend;
mod session;

pub use api::ApiClient;
pub use backend::HttpBackend;
pub use session::HttpSession;
