use tracing::info;
use crate::error::Result;
use crate::llm::{LlmClient, Message};

pub const SYSTEM_PROMPT: &str = "You are an expert at summarizing web page content into well-structured Markdown.";

/// Returned when the model produces no text.
pub const NO_SUMMARY: &str = "Could not generate a summary.";

pub const MAX_TOKENS: u32 = 2000;
pub const TEMPERATURE: f32 = 0.7;

/// User message for the model: page title and text, the formatting brief,
/// and the steering prompt when one is given.
pub fn build_prompt(title: &str, content: &str, user_prompt: Option<&str>, language: &str) -> String {
    let mut result = String::with_capacity(content.len() + title.len() + 700);
    result.push_str("Summarize the content of the following web page in Markdown.\n\n");
    result.push_str("Title: ");
    result.push_str(title);
    result.push_str("\n\nContent:\n");
    result.push_str(content);
    result.push_str("\n\nRequirements:\n");
    result.push_str("1. Write a structured summary using Markdown syntax\n");
    result.push_str("2. Organize the main content into sections\n");
    result.push_str("3. Mark key points as bullet points\n");
    result.push_str("4. Use the > marker for any quotations\n");
    result.push_str("5. Put important terms in **bold**\n");
    result.push_str("6. Build a heading hierarchy with #, ## and ###\n");
    result.push_str("7. Write in ");
    result.push_str(language);
    result.push('\n');

    if let Some(extra) = user_prompt.map(str::trim).filter(|p| !p.is_empty()) {
        result.push_str("\n\nAdditional instructions:\n");
        result.push_str(extra);
    }

    result
}

/// One LLM round-trip. No retries.
pub async fn summarize(
    llm: &LlmClient,
    title: &str,
    content: &str,
    user_prompt: Option<&str>,
    language: &str,
) -> Result<String> {
    let prompt = build_prompt(title, content, user_prompt, language);
    info!(prompt_chars = prompt.len(), model = llm.model(), "Calling LLM API");

    let messages = vec![Message::system(SYSTEM_PROMPT), Message::user(prompt)];
    let reply = llm.complete(messages, MAX_TOKENS, TEMPERATURE).await?;

    Ok(reply.unwrap_or_else(|| NO_SUMMARY.to_string()))
}
