//! PocketBase API client implementation.
//!
//! This module provides the HTTP client and the wire types of the
//! administrative endpoints used during a migration.

mod client;
mod endpoints;

pub use client::ApiClient;
pub(crate) use client::{CallError, transport_error};
pub(crate) use endpoints::*;
