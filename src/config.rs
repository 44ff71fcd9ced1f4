use std::env;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;
use std::time::Duration;
use crate::error::{AppError, Result};

pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Clone, Debug)]
pub struct Config {
    pub server_addr: SocketAddr,
    pub openai_api_key: String,
    pub openai_base_url: String,
    pub openai_model: String,
    /// Language the summary is written in.
    pub summary_language: String,
    pub fetch_timeout: Duration,
    pub llm_timeout: Duration,
    pub max_response_bytes: usize,
    pub rate_limit_requests: u32,
    pub rate_limit_window: Duration,
}

impl Config {
    /// Configuration with every default filled in.
    pub fn new(openai_api_key: impl Into<String>) -> Self {
        Config {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 4000)),
            openai_api_key: openai_api_key.into(),
            openai_base_url: DEFAULT_OPENAI_BASE_URL.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            summary_language: "English".to_string(),
            fetch_timeout: Duration::from_secs(10),
            llm_timeout: Duration::from_secs(60),
            max_response_bytes: 10 * 1024 * 1024,
            rate_limit_requests: 10,
            rate_limit_window: Duration::from_secs(60),
        }
    }

    pub fn load() -> Result<Self> {
        // Load environment variables from .env file if it exists
        dotenv::dotenv().ok();

        let mut config = Config::new(env::var("OPENAI_API_KEY")?);

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("PORT").unwrap_or_else(|_| "4000".to_string());
        let port = port.parse::<u16>().map_err(|e| AppError::ConfigError(format!("Invalid port: {}", e)))?;
        let ip = IpAddr::from_str(&host).map_err(|e| AppError::ConfigError(format!("Invalid host address: {}", e)))?;
        config.server_addr = SocketAddr::new(ip, port);

        if let Ok(base_url) = env::var("OPENAI_BASE_URL") {
            config.openai_base_url = base_url.trim_end_matches('/').to_string();
        }
        if let Ok(model) = env::var("OPENAI_MODEL") {
            config.openai_model = model;
        }
        if let Ok(language) = env::var("SUMMARY_LANGUAGE") {
            config.summary_language = language;
        }

        if let Some(secs) = parse_positive::<u64>("FETCH_TIMEOUT_SECS")? {
            config.fetch_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_positive::<u64>("LLM_TIMEOUT_SECS")? {
            config.llm_timeout = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var::<usize>("MAX_RESPONSE_BYTES")? {
            config.max_response_bytes = bytes;
        }
        if let Some(requests) = parse_positive::<u32>("RATE_LIMIT_REQUESTS")? {
            config.rate_limit_requests = requests;
        }
        if let Some(secs) = parse_var::<u64>("RATE_LIMIT_WINDOW_SECS")? {
            config.rate_limit_window = Duration::from_secs(secs);
        }

        Ok(config)
    }
}

fn parse_var<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| AppError::ConfigError(format!("Invalid {}: {}", name, e))),
        Err(_) => Ok(None),
    }
}

/// Like `parse_var`, but zero is rejected.
fn parse_positive<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr + Default + PartialEq,
    T::Err: std::fmt::Display,
{
    require_positive(name, parse_var::<T>(name)?)
}

fn require_positive<T: Default + PartialEq>(name: &str, value: Option<T>) -> Result<Option<T>> {
    match value {
        Some(value) if value == T::default() => {
            Err(AppError::ConfigError(format!("{} must be positive", name)))
        }
        value => Ok(value),
    }
}
