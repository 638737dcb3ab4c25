use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use crate::config::DEFAULT_CIRCLECI_API_URL;
use crate::error::Result;

/// Raw outcome of one GET against the CircleCI API.
///
/// The body is read eagerly; a failure to read it is kept as an error so the
/// caller can decide whether the attempt counts.
#[derive(Debug)]
pub struct SourceResponse {
    pub status: StatusCode,
    pub rate_limit_remaining: Option<String>,
    pub body: Result<String>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SourceApi: Send + Sync {
    /// Issues a GET for `endpoint`, relative to the API root.
    async fn get(&self, endpoint: &str) -> Result<SourceResponse>;
}

pub struct CircleClient {
    client: Client,
    base_url: String,
}

impl CircleClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_CIRCLECI_API_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut credential = header::HeaderValue::from_str(token)?;
        credential.set_sensitive(true);
        headers.insert("circle-token", credential);
        headers.insert(
            header::ACCEPT,
            header::HeaderValue::from_static("application/json"),
        );
        headers.insert(
            header::USER_AGENT,
            header::HeaderValue::from_static("circleci-releases/0.1"),
        );

        let client = Client::builder().default_headers(headers).build()?;

        let mut base_url = base_url.to_string();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }

        Ok(Self { client, base_url })
    }
}

#[async_trait]
impl SourceApi for CircleClient {
    async fn get(&self, endpoint: &str) -> Result<SourceResponse> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!("Fetching: {}", url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let rate_limit_remaining = response
            .headers()
            .get("x-ratelimit-remaining")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await.map_err(Into::into);

        Ok(SourceResponse {
            status,
            rate_limit_remaining,
            body,
        })
    }
}
