pub mod api;
pub mod config;
pub mod error;
pub mod extract;
pub mod fetch;
pub mod llm;
pub mod pipeline;
pub mod readable;
pub mod summarize;
pub mod throttle;
pub mod validate;

use std::sync::Arc;
use config::Config;
use error::Result;
use fetch::Fetcher;
use llm::LlmClient;
use throttle::{FixedWindowThrottle, RequestThrottle};

/// Application state that will be shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub fetcher: Fetcher,
    pub llm: LlmClient,
    pub throttle: Arc<dyn RequestThrottle>,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let fetcher = Fetcher::new(config.fetch_timeout, config.max_response_bytes)?;
        let llm = LlmClient::from_config(&config)?;
        let throttle = Arc::new(FixedWindowThrottle::new(
            config.rate_limit_requests,
            config.rate_limit_window,
        ));

        Ok(Self {
            config: Arc::new(config),
            fetcher,
            llm,
            throttle,
        })
    }

    /// Replaces the in-memory throttle, e.g. with a shared store.
    pub fn with_throttle(mut self, throttle: Arc<dyn RequestThrottle>) -> Self {
        self.throttle = throttle;
        self
    }
}
