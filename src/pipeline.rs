use std::time::Instant;
use tracing::info;

use crate::AppState;
use crate::api::models::{AnalyzeRequest, AnalyzeResponse};
use crate::error::{AppError, Result};
use crate::extract::extract_document;
use crate::summarize::summarize;
use crate::validate::validate_url;

/// Validate, fetch, extract, summarize. Each stage runs once and the first
/// failure ends the request.
pub async fn analyze(state: &AppState, request: AnalyzeRequest) -> Result<AnalyzeResponse> {
    let raw_url = request
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(AppError::MissingUrl)?;
    let url = validate_url(raw_url)?;

    info!(%url, "Fetching HTML");
    let fetch_start = Instant::now();
    let html = state.fetcher.fetch_html(&url).await?;
    info!(elapsed = ?fetch_start.elapsed(), bytes = html.len(), "HTML fetch successful");

    let document = tokio::task::spawn_blocking(move || extract_document(&html))
        .await
        .map_err(|e| AppError::ExtractionError(e.to_string()))??;
    info!(title = %document.title, content_chars = document.content.chars().count(), "Extracted page content");

    let user_prompt = request
        .user_prompt()
        .map(str::trim)
        .filter(|prompt| !prompt.is_empty());

    let llm_start = Instant::now();
    let summary = summarize(
        &state.llm,
        &document.title,
        &document.content,
        user_prompt,
        &state.config.summary_language,
    )
    .await?;
    info!(elapsed = ?llm_start.elapsed(), "LLM API call successful");

    Ok(AnalyzeResponse {
        summary,
        original_content: document.content,
        original_html: document.html,
        title: document.title,
    })
}
