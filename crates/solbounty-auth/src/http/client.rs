/*
[INPUT]:  HTTP configuration (base URL, timeouts) and session cookies
[OUTPUT]: Configured reqwest client with a credentialed cookie store
[POS]:    HTTP layer - core client implementation
[UPDATE]: When adding connection options or changing client behavior
*/

use std::sync::Arc;
use std::time::Duration;

use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, Method, RequestBuilder, Response, Url};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::auth::SessionCredential;
use crate::http::{AuthError, FlowStage, Result};
use crate::types::ErrorResponse;

/// Default identity API base URL
const DEFAULT_API_URL: &str = "http://localhost:8080";

/// HTTP client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

/// HTTP client for the identity API
///
/// Sessions are carried as cookies, so every request goes through one shared
/// cookie jar (the `withCredentials` behaviour of a browser client). Issued
/// cookies are returned to the caller and only land in the jar through
/// [`IdentityClient::store_session`].
#[derive(Debug, Clone)]
pub struct IdentityClient {
    http_client: Client,
    base_url: Url,
    cookie_jar: Arc<Jar>,
    timeout: Duration,
}

impl IdentityClient {
    /// Create a new client with default configuration
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    /// Create a new client with custom configuration
    pub fn with_config(config: ClientConfig) -> Result<Self> {
        Self::with_config_and_base_url(config, DEFAULT_API_URL)
    }

    /// Create a client against an explicit API base URL
    pub fn with_config_and_base_url(config: ClientConfig, base_url: &str) -> Result<Self> {
        let http_client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .build()?;

        Ok(Self {
            http_client,
            base_url: Url::parse(base_url)?,
            cookie_jar: Arc::new(Jar::default()),
            timeout: config.timeout,
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Seed the jar with a session cookie, e.g. `session=abc123`
    pub fn set_session_cookie(&self, cookie: &str) {
        self.cookie_jar.add_cookie_str(cookie, &self.base_url);
    }

    /// `Cookie` header value the client would send to the API
    pub fn session_cookie(&self) -> Option<String> {
        self.cookie_jar
            .cookies(&self.base_url)
            .and_then(|value| value.to_str().ok().map(str::to_string))
    }

    /// Whether any credential cookie is held for the API
    pub fn has_session(&self) -> bool {
        self.session_cookie().is_some_and(|cookie| !cookie.is_empty())
    }

    /// Put issued `Set-Cookie` values into the jar
    pub fn store_session(&self, credential: &SessionCredential) {
        for cookie in credential.values() {
            self.cookie_jar.add_cookie_str(cookie, &self.base_url);
        }
    }

    /// Build full URL for an endpoint
    pub(crate) fn url(&self, endpoint: &str) -> Result<Url> {
        Ok(self.base_url.join(endpoint)?)
    }

    /// Build request builder for an endpoint, carrying the session cookie
    pub(crate) fn request(&self, method: Method, endpoint: &str) -> Result<RequestBuilder> {
        let url = self.url(endpoint)?;
        let cookie = self.cookie_jar.cookies(&url);
        let builder = self.http_client.request(method, url);
        Ok(match cookie {
            Some(cookie) => builder.header(COOKIE, cookie),
            None => builder,
        })
    }

    /// Send and turn non-2xx answers into taxonomy errors
    pub(crate) async fn execute(
        &self,
        builder: RequestBuilder,
        wallet_hint: Option<&str>,
    ) -> Result<Response> {
        let response = builder.send().await.map_err(|err| {
            if err.is_timeout() {
                AuthError::Timeout {
                    stage: FlowStage::ServerVerification,
                    duration: self.timeout.as_secs(),
                }
            } else {
                AuthError::NetworkFailure(err)
            }
        })?;

        let status = response.status();
        debug!(url = %response.url(), %status, "identity API response");
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let error_body = serde_json::from_str::<ErrorResponse>(&body).unwrap_or_else(|_| {
            ErrorResponse {
                error: None,
                message: (!body.trim().is_empty()).then(|| body.trim().to_string()),
            }
        });
        Err(error_body.into_error(status, wallet_hint))
    }

    /// Send and decode a JSON body
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T> {
        let response = self.execute(builder, None).await?;
        let body = response.text().await?;
        decode_body(&body)
    }
}

/// `Set-Cookie` values of a response, without installing them
pub(crate) fn issued_credential(response: &Response) -> Option<SessionCredential> {
    let cookies = response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .map(str::to_string)
        .collect();
    SessionCredential::new(cookies)
}

pub(crate) fn decode_body<T: DeserializeOwned>(body: &str) -> Result<T> {
    serde_json::from_str(body)
        .map_err(|e| AuthError::InvalidResponse(format!("{e}; body: {body}")))
}
