use reqwest::{Client, ClientBuilder, StatusCode, header};
use std::time::Duration;
use url::Url;
use crate::error::{AppError, FetchError, Result};

/// Desktop browser identity sent with every page request.
pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

const ACCEPT_HTML: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8";

/// Single-attempt page retrieval over a shared connection pool.
#[derive(Clone)]
pub struct Fetcher {
    client: Client,
    max_response_bytes: usize,
}

impl Fetcher {
    pub fn new(timeout: Duration, max_response_bytes: usize) -> Result<Self> {
        let client = ClientBuilder::new()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(5)))
            .pool_max_idle_per_host(10)
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| AppError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, max_response_bytes })
    }

    /// GETs `url` once and returns the body as text.
    pub async fn fetch_html(&self, url: &Url) -> std::result::Result<String, FetchError> {
        let mut response = self
            .client
            .get(url.clone())
            .header(header::ACCEPT, ACCEPT_HTML)
            .send()
            .await
            .map_err(classify)?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(FetchError::NotFound);
        }
        if !status.is_success() {
            return Err(FetchError::Upstream(format!("upstream responded with {}", status)));
        }

        if let Some(length) = response.content_length() {
            if length > self.max_response_bytes as u64 {
                return Err(self.too_large());
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await.map_err(classify)? {
            if body.len() + chunk.len() > self.max_response_bytes {
                return Err(self.too_large());
            }
            body.extend_from_slice(&chunk);
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn too_large(&self) -> FetchError {
        FetchError::Upstream(format!("response body exceeds {} bytes", self.max_response_bytes))
    }
}

fn classify(err: reqwest::Error) -> FetchError {
    if err.is_timeout() {
        FetchError::Timeout
    } else if err.status() == Some(StatusCode::NOT_FOUND) {
        FetchError::NotFound
    } else {
        FetchError::Upstream(err.to_string())
    }
}
