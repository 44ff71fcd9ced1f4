use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Deserialize, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRequest {
    pub url: Option<String>,
    /// Any JSON value is accepted; only a string steers the summary.
    pub user_prompt: Option<Value>,
}

impl AnalyzeRequest {
    pub fn user_prompt(&self) -> Option<&str> {
        self.user_prompt.as_ref().and_then(Value::as_str)
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub summary: String,
    pub original_content: String,
    pub original_html: String,
    pub title: String,
}

#[derive(Deserialize, Debug)]
pub struct ReadableRequest {
    pub html: String,
    /// Base for resolving relative image URLs.
    pub url: Option<String>,
}

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
}
