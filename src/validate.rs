use url::Url;
use crate::error::{AppError, Result};

/// Accepts only absolute `http`/`https` URLs. Runs before any network I/O.
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| AppError::InvalidUrl(format!("{}: {}", raw, e)))?;

    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(AppError::InvalidUrl(format!("unsupported scheme '{}'", other))),
    }
}
