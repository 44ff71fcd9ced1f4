use lol_html::{HtmlRewriter, Settings, element};
use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use crate::error::{AppError, Result};

/// Upper bound on extracted text, in characters.
pub const MAX_CONTENT_CHARS: usize = 1024 * 1024;

/// Appended once to content cut at [`MAX_CONTENT_CHARS`].
pub const TRUNCATION_NOTICE: &str = "... (content truncated because it was too long)";

/// Title used when the page has neither `<title>` nor `<h1>`.
pub const NO_TITLE: &str = "Untitled";

static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("title").expect("Failed to parse title selector")
});

static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("h1").expect("Failed to parse h1 selector")
});

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("body").expect("Failed to parse body selector")
});

#[derive(Debug, Clone, PartialEq)]
pub struct ExtractedDocument {
    pub title: String,
    /// Whitespace-collapsed body text, capped at [`MAX_CONTENT_CHARS`].
    pub content: String,
    /// The page markup with script and style elements removed.
    pub html: String,
}

pub fn extract_document(raw_html: &str) -> Result<ExtractedDocument> {
    let html = strip_scripts_and_styles(raw_html)?;
    let document = Html::parse_document(&html);

    let title = first_text(&document, &TITLE_SELECTOR)
        .or_else(|| first_text(&document, &H1_SELECTOR))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let body_text: String = document
        .select(&BODY_SELECTOR)
        .next()
        .map(|body| body.text().collect())
        .unwrap_or_default();

    let content = cap_content(collapse_whitespace(&body_text));

    Ok(ExtractedDocument { title, content, html })
}

/// Removes `<script>` and `<style>` elements and leaves everything else as-is.
pub fn strip_scripts_and_styles(html: &str) -> Result<String> {
    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: vec![
                element!("script", |el| {
                    el.remove();
                    Ok(())
                }),
                element!("style", |el| {
                    el.remove();
                    Ok(())
                }),
            ],
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    rewriter
        .write(html.as_bytes())
        .map_err(|e| AppError::ExtractionError(e.to_string()))?;
    rewriter.end().map_err(|e| AppError::ExtractionError(e.to_string()))?;

    Ok(String::from_utf8_lossy(&output).into_owned())
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
        .filter(|text| !text.is_empty())
}

pub fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Cuts `content` to [`MAX_CONTENT_CHARS`] characters and marks the cut.
pub fn cap_content(content: String) -> String {
    match content.char_indices().nth(MAX_CONTENT_CHARS) {
        Some((byte_idx, _)) => {
            let mut truncated = String::with_capacity(byte_idx + TRUNCATION_NOTICE.len());
            truncated.push_str(&content[..byte_idx]);
            truncated.push_str(TRUNCATION_NOTICE);
            truncated
        }
        None => content,
    }
}
