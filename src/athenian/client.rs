use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};

use crate::athenian::sink::ReleaseSink;
use crate::config::DEFAULT_ATHENIAN_API_URL;
use crate::error::{Error, Result};
use crate::models::Release;

pub struct AthenianClient {
    client: Client,
    endpoint: String,
}

impl AthenianClient {
    pub fn new(token: &str) -> Result<Self> {
        Self::with_base_url(token, DEFAULT_ATHENIAN_API_URL)
    }

    pub fn with_base_url(token: &str, base_url: &str) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        let mut credential = header::HeaderValue::from_str(token)?;
        credential.set_sensitive(true);
        headers.insert("x-api-key", credential);
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(120))
            .build()?;

        Ok(Self {
            client,
            endpoint: format!("{}/events/releases", base_url.trim_end_matches('/')),
        })
    }
}

#[async_trait]
impl ReleaseSink for AthenianClient {
    async fn submit(&self, batch: &[Release]) -> Result<()> {
        let body = serde_json::to_vec(batch)?;
        tracing::debug!("Posting {} releases to {}", batch.len(), self.endpoint);

        let response = self
            .client
            .post(&self.endpoint)
            .body(body)
            .send()
            .await?;

        let status = response.status();
        if status != StatusCode::OK {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::SinkRejected {
                status: status.as_u16(),
                body,
            });
        }

        Ok(())
    }
}
