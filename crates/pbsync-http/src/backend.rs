//! Backend that logs in over HTTP.

use std::time::Duration;

use async_trait::async_trait;

use pbsync_core::{Backend, Credentials, Result, Role};

use crate::api::{ApiClient, transport_error};
use crate::session::HttpSession;

/// Upper bound for establishing a TCP/TLS connection.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Hands out [`HttpSession`]s for any PocketBase instance.
///
/// All sessions share one connection pool.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend with its own HTTP client.
    ///
    /// # Errors
    ///
    /// Returns a transport error if the TLS backend cannot be initialized.
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("pbsync/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(transport_error)?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Backend for HttpBackend {
    type Session = HttpSession;

    async fn authenticate(&self, role: Role, credentials: Credentials) -> Result<HttpSession> {
        let client = ApiClient::new(self.client.clone(), credentials.url().clone());
        HttpSession::login(client, role, &credentials).await
    }
}
