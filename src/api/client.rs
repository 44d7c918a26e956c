//! Authenticated HTTP client for the Minicord API
//!
//! Wraps reqwest::Client with base URL handling and bearer token injection.

use anyhow::{bail, Context, Result};
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use super::error::{ApiError, ApiResult};
use crate::auth::TokenStore;
use crate::config::Config;

/// Client for the Minicord REST API.
///
/// The bearer token is read from the persisted config once, when the client
/// is built, and attached to every outgoing request.
pub struct MinicordClient {
    http: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl MinicordClient {
    /// Load config and build an authenticated client.
    pub fn new() -> Result<Self> {
        let config = Config::load()?;
        Self::from_config(&config)
    }

    /// Build an authenticated client from an already loaded config.
    pub fn from_config(config: &Config) -> Result<Self> {
        let token = config
            .get_token()
            .context("Not logged in. Run 'minicord login' first.")?;
        if token.is_expired() {
            bail!("Session expired. Run 'minicord login'.");
        }
        Self::build(config, Some(token.token))
    }

    /// Build a client that sends no Authorization header (login, signup).
    pub fn anonymous(config: &Config) -> Result<Self> {
        Self::build(config, None)
    }

    fn build(config: &Config, token: Option<String>) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            http,
            base_url: config.api_url(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Start a request with the bearer token and a request id attached.
    fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let mut req = self
            .http
            .request(method, url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string());
        if let Some(ref token) = self.token {
            req = req.bearer_auth(token);
        }
        req
    }

    async fn send(&self, req: RequestBuilder, method: &Method, url: &str) -> ApiResult<Response> {
        tracing::debug!("{} {}", method, url);
        let resp = req.send().await.map_err(|source| ApiError::Transport {
            url: url.to_string(),
            source,
        })?;
        check_response(resp, url).await
    }

    /// GET a JSON document.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ApiResult<T> {
        let url = self.url(path);
        let req = self.request(Method::GET, &url).query(query);
        let resp = self.send(req, &Method::GET, &url).await?;
        decode(resp, &url).await
    }

    /// GET a raw body (profile pictures).
    pub async fn get_bytes(&self, path: &str) -> ApiResult<Vec<u8>> {
        let url = self.url(path);
        let req = self.request(Method::GET, &url);
        let resp = self.send(req, &Method::GET, &url).await?;
        let bytes = resp.bytes().await.map_err(|source| ApiError::Transport {
            url: url.clone(),
            source,
        })?;
        Ok(bytes.to_vec())
    }

    /// Send a JSON body and decode a JSON response.
    pub async fn send_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<T> {
        let url = self.url(path);
        let req = self.request(method.clone(), &url).json(body);
        let resp = self.send(req, &method, &url).await?;
        decode(resp, &url).await
    }

    /// Send a request whose response body is irrelevant.
    pub async fn send_empty(&self, method: Method, path: &str) -> ApiResult<()> {
        let url = self.url(path);
        let req = self.request(method.clone(), &url);
        self.send(req, &method, &url).await?;
        Ok(())
    }

    /// Send a JSON body and ignore the response body.
    pub async fn send_json_ignore<B: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &B,
    ) -> ApiResult<()> {
        let url = self.url(path);
        let req = self.request(method.clone(), &url).json(body);
        self.send(req, &method, &url).await?;
        Ok(())
    }

    /// POST a multipart form.
    pub async fn post_multipart(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> ApiResult<()> {
        let url = self.url(path);
        let req = self.request(Method::POST, &url).multipart(form);
        self.send(req, &Method::POST, &url).await?;
        Ok(())
    }
}

/// Check HTTP response status code and map failures onto `ApiError`.
async fn check_response(resp: Response, url: &str) -> ApiResult<Response> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let body = resp.text().await.unwrap_or_default();
    tracing::debug!("HTTP {} for {}: {}", status.as_u16(), url, body);
    Err(ApiError::from_status(status, url, body))
}

async fn decode<T: DeserializeOwned>(resp: Response, url: &str) -> ApiResult<T> {
    let text = resp.text().await.map_err(|source| ApiError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str(&text).map_err(|e| ApiError::Decode {
        url: url.to_string(),
        message: e.to_string(),
    })
}

/// Percent-encode a single path segment (usernames, ids).
pub fn segment(s: &str) -> String {
    url::form_urlencoded::byte_serialize(s.as_bytes())
        .collect::<String>()
        .replace('+', "%20")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_encoding() {
        assert_eq!(segment("alice"), "alice");
        assert_eq!(segment("bob smith"), "bob%20smith");
        assert_eq!(segment("a/b"), "a%2Fb");
    }

    #[test]
    fn test_from_config_requires_token() {
        let config = Config::default();
        assert!(MinicordClient::from_config(&config).is_err());
        assert!(MinicordClient::anonymous(&config).is_ok());
    }

    #[test]
    fn test_from_config_with_token() {
        let mut config = Config {
            api_url: Some("https://chat.example.com/".into()),
            ..Config::default()
        };
        config.set_token("opaque".into());
        let client = MinicordClient::from_config(&config).unwrap();
        assert_eq!(client.base_url(), config.api_url());
        assert!(!client.base_url().ends_with('/'));
    }
}
