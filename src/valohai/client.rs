//! Valohai API client implementation.
//!
//! One HTTP client is built at construction time (timeout included) and
//! shared by every operation; resources never build their own transport.
//! All four resource kinds speak the same protocol: POST to the collection,
//! GET/PUT/DELETE on the individual object, token-style authorization on
//! every request.

use reqwest::{Client, Method, StatusCode, header};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

use crate::error::{ApiError, ConfigError, Result, ValosyncError};

use super::error_body::extract_message;

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://app.valohai.com/api/v0";

/// Environment variable consulted when the manifest carries no token.
pub const TOKEN_ENV_VAR: &str = "VALOHAI_API_TOKEN";

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// API credentials, resolved once and injected into the client.
#[derive(Debug, Clone)]
pub struct ApiCredentials {
    /// API token.
    token: String,
}

impl ApiCredentials {
    /// Creates credentials from an explicit token.
    #[must_use]
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }

    /// Resolves credentials from an explicit value with an environment
    /// fallback. Absence of both is a fatal configuration error, raised
    /// before any resource operation runs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingToken`] if no token is available.
    pub fn resolve(explicit: Option<&str>) -> Result<Self> {
        Self::resolve_with(explicit, std::env::var(TOKEN_ENV_VAR).ok())
    }

    fn resolve_with(explicit: Option<&str>, env_token: Option<String>) -> Result<Self> {
        if let Some(token) = explicit
            && !token.trim().is_empty()
        {
            return Ok(Self::new(token));
        }

        env_token
            .filter(|token| !token.trim().is_empty())
            .map(Self::new)
            .ok_or_else(|| ValosyncError::Config(ConfigError::MissingToken))
    }

    /// Returns the token value.
    #[must_use]
    pub fn token(&self) -> &str {
        &self.token
    }
}

/// Valohai API client.
#[derive(Debug, Clone)]
pub struct ValohaiClient {
    /// Shared HTTP client.
    http: Client,
    /// API root, without a trailing slash.
    base_url: String,
    /// Injected credentials.
    credentials: ApiCredentials,
}

impl ValohaiClient {
    /// Creates a new client with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(credentials: ApiCredentials) -> Result<Self> {
        Self::with_timeout(credentials, DEFAULT_TIMEOUT_SECS)
    }

    /// Creates a client with a custom timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn with_timeout(credentials: ApiCredentials, timeout_secs: u64) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| ApiError::transport(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: DEFAULT_API_URL.to_string(),
            credentials,
        })
    }

    /// Overrides the API root (self-hosted installs, tests).
    #[must_use]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    /// Creates a resource. Success is exactly HTTP 201.
    ///
    /// # Errors
    ///
    /// Returns an error for any other status, with the best-effort message
    /// extracted from the response body.
    pub async fn create<T, B>(&self, collection: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.collection_url(collection);
        debug!("POST {url}");

        let response = self.send(self.request(Method::POST, &url).json(body)).await?;
        if response.status() != StatusCode::CREATED {
            return Err(Self::status_error(response).await.into());
        }
        Self::decode(response).await
    }

    /// Reads a resource. HTTP 404 yields `None`; it is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error for any status other than 200 and 404.
    pub async fn read<T>(&self, collection: &str, id: &str) -> Result<Option<T>>
    where
        T: DeserializeOwned,
    {
        let url = self.resource_url(collection, id);
        debug!("GET {url}");

        let response = self.send(self.request(Method::GET, &url)).await?;
        match response.status() {
            StatusCode::OK => Ok(Some(Self::decode(response).await?)),
            StatusCode::NOT_FOUND => Ok(None),
            _ => Err(Self::status_error(response).await.into()),
        }
    }

    /// Replaces a resource via PUT. Success is exactly HTTP 200.
    ///
    /// # Errors
    ///
    /// Returns an error for any other status.
    pub async fn update<T, B>(&self, collection: &str, id: &str, body: &B) -> Result<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let url = self.resource_url(collection, id);
        debug!("PUT {url}");

        let response = self.send(self.request(Method::PUT, &url).json(body)).await?;
        if response.status() != StatusCode::OK {
            return Err(Self::status_error(response).await.into());
        }
        Self::decode(response).await
    }

    /// Deletes a resource. 200 and 204 mean deleted; 404 means the remote
    /// object is already gone, which also counts as success.
    ///
    /// # Errors
    ///
    /// Returns an error for any other status.
    pub async fn delete(&self, collection: &str, id: &str) -> Result<()> {
        let url = self.resource_url(collection, id);
        debug!("DELETE {url}");

        let response = self.send(self.request(Method::DELETE, &url)).await?;
        match response.status() {
            StatusCode::OK | StatusCode::NO_CONTENT | StatusCode::NOT_FOUND => Ok(()),
            _ => Err(Self::status_error(response).await.into()),
        }
    }

    fn collection_url(&self, collection: &str) -> String {
        format!("{}/{collection}/", self.base_url)
    }

    fn resource_url(&self, collection: &str, id: &str) -> String {
        format!("{}/{collection}/{id}/", self.base_url)
    }

    fn request(&self, method: Method, url: &str) -> reqwest::RequestBuilder {
        self.http.request(method, url).header(
            header::AUTHORIZATION,
            format!("Token {}", self.credentials.token()),
        )
    }

    async fn send(&self, builder: reqwest::RequestBuilder) -> Result<reqwest::Response> {
        builder
            .send()
            .await
            .map_err(|e| ApiError::transport(format!("Request failed: {e}")).into())
    }

    async fn status_error(response: reqwest::Response) -> ApiError {
        let status = response.status().as_u16();
        let body = response.bytes().await.unwrap_or_default();
        ApiError::status(status, extract_message(&body))
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        response
            .json::<T>()
            .await
            .map_err(|e| ApiError::invalid_response(format!("Failed to parse response: {e}")).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_credentials_resolve_explicit() {
        let credentials = ApiCredentials::resolve_with(Some("abc123"), None).unwrap();
        assert_eq!(credentials.token(), "abc123");
    }

    #[test]
    fn test_credentials_blank_explicit_falls_back_to_env() {
        let credentials =
            ApiCredentials::resolve_with(Some("   "), Some(String::from("env-token"))).unwrap();
        assert_eq!(credentials.token(), "env-token");
    }

    #[test]
    fn test_credentials_missing_everywhere_is_fatal() {
        let result = ApiCredentials::resolve_with(None, None);
        assert!(matches!(
            result,
            Err(ValosyncError::Config(ConfigError::MissingToken))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let client = ValohaiClient::new(ApiCredentials::new("t"))
            .unwrap()
            .with_base_url("http://localhost:8080/api/v0/");
        assert_eq!(
            client.resource_url("stores", "s-1"),
            "http://localhost:8080/api/v0/stores/s-1/"
        );
        assert_eq!(
            client.collection_url("projects"),
            "http://localhost:8080/api/v0/projects/"
        );
    }
}
