//! PocketBase HTTP client implementation.

use reqwest::header::AUTHORIZATION;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, trace};

use pbsync_core::error::{ApiErrorDetail, AuthError, Error, RemoteOpError, TransportError};
use pbsync_core::{AuthToken, InstanceUrl};

use super::endpoints::ApiErrorResponse;

/// Why an API call failed.
#[derive(Debug)]
pub(crate) enum CallError {
    /// The request never got a response, or the body could not be read.
    Transport(TransportError),
    /// The server answered with a non-success status.
    Status(ApiErrorDetail),
}

impl CallError {
    /// Attribute the failure to a control-plane operation.
    pub(crate) fn into_remote(self, operation: &'static str) -> Error {
        match self {
            CallError::Transport(e) => e.into(),
            CallError::Status(detail) => RemoteOpError::new(operation, detail).into(),
        }
    }

    /// Attribute the failure to the login call.
    pub(crate) fn into_auth(self) -> Error {
        match self {
            CallError::Transport(e) => e.into(),
            CallError::Status(detail) => AuthError::Rejected(detail).into(),
        }
    }
}

impl From<reqwest::Error> for CallError {
    fn from(err: reqwest::Error) -> Self {
        CallError::Transport(transport_error(err))
    }
}

/// Map a reqwest error onto the transport error taxonomy.
pub(crate) fn transport_error(err: reqwest::Error) -> TransportError {
    if err.is_timeout() {
        TransportError::Timeout {
            message: err.to_string(),
        }
    } else if err.is_connect() {
        TransportError::Connection {
            message: err.to_string(),
        }
    } else {
        TransportError::Http {
            message: err.to_string(),
        }
    }
}

/// HTTP client for one PocketBase instance.
#[derive(Debug, Clone)]
pub struct ApiClient {
    client: reqwest::Client,
    base: InstanceUrl,
}

impl ApiClient {
    /// Create a client for `base` sharing the given connection pool.
    pub fn new(client: reqwest::Client, base: InstanceUrl) -> Self {
        Self { client, base }
    }

    /// Returns the instance URL this client is configured for.
    pub fn base(&self) -> &InstanceUrl {
        &self.base
    }

    /// Returns the full URL of an API path.
    pub fn url(&self, path: &str) -> String {
        self.base.api_url(path)
    }

    /// Start a request to an API path, authenticated when `token` is given.
    pub(crate) fn request(
        &self,
        method: Method,
        path: &str,
        token: Option<&AuthToken>,
    ) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, authed = token.is_some(), "API request");

        let builder = self.client.request(method, url);
        match token {
            Some(token) => builder.header(AUTHORIZATION, token.as_str()),
            None => builder,
        }
    }

    /// Start a GET of an absolute URL.
    pub(crate) fn get_absolute(&self, url: &str) -> RequestBuilder {
        self.client.get(url)
    }

    /// Send a request and decode a JSON response body.
    pub(crate) async fn call<R>(&self, request: RequestBuilder) -> Result<R, CallError>
    where
        R: DeserializeOwned,
    {
        let response = self.send(request).await?;
        Ok(response.json::<R>().await?)
    }

    /// Send a request whose response body is not needed.
    pub(crate) async fn call_no_content(&self, request: RequestBuilder) -> Result<(), CallError> {
        self.send(request).await.map(drop)
    }

    /// Send a request, turning non-success statuses into errors.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, CallError> {
        let response = request.send().await?;
        let status = response.status();
        trace!(status = %status, "API response");

        if status.is_success() {
            Ok(response)
        } else {
            Err(CallError::Status(parse_error_response(response).await))
        }
    }
}

/// Parse a PocketBase error response.
async fn parse_error_response(response: Response) -> ApiErrorDetail {
    let status = response.status().as_u16();

    match response.json::<ApiErrorResponse>().await {
        Ok(body) => ApiErrorDetail::new(status, body.describe()),
        Err(_) => ApiErrorDetail::new(status, None),
    }
}
