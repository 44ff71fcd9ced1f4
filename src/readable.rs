//! Display-oriented article view.
//!
//! Article detection is delegated to `readability`; this module strips the
//! remaining boilerplate, makes image URLs absolute, and gathers the
//! metadata a reader view shows next to the body. This never fails: when no
//! article qualifies the view degrades to a title and a main image with an
//! empty body.

use std::io::Cursor;

use lol_html::{HtmlRewriter, Settings, element};
use once_cell::sync::Lazy;
use readability::extractor;
use scraper::{Html, Selector};
use serde::Serialize;
use tracing::{debug, warn};
use url::Url;

use crate::extract::{NO_TITLE, collapse_whitespace};

/// Articles with less text than this are treated as not found.
pub const MIN_ARTICLE_CHARS: usize = 25;

pub const MAX_EXCERPT_CHARS: usize = 300;

/// Stand-in base handed to the extractor when the caller has none.
const NO_BASE: &str = "about:blank";

/// Elements dropped from the article body before display.
const STRIPPED_TAGS: [&str; 8] = ["nav", "aside", "footer", "form", "iframe", "noscript", "script", "style"];

/// Fallback image selectors, tried in order.
const GENERIC_IMAGE_SELECTORS: [&str; 7] = [
    "article img[src]",
    "main img[src]",
    ".content img[src]",
    ".post-content img[src]",
    ".article-content img[src]",
    ".entry-content img[src]",
    "img[src]",
];

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadableView {
    pub title: String,
    /// Sanitized article body with absolute image URLs.
    pub content: String,
    pub excerpt: String,
    pub site_name: String,
    pub byline: String,
    /// Character count of the article text.
    pub length: usize,
    pub main_image: Option<String>,
}

/// Where a main image may come from, in the order they are consulted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MainImageStrategy {
    OpenGraph,
    ArticleFirstImage,
    GenericFirstImage,
}

const ARTICLE_IMAGE_STRATEGIES: [MainImageStrategy; 3] = [
    MainImageStrategy::OpenGraph,
    MainImageStrategy::ArticleFirstImage,
    MainImageStrategy::GenericFirstImage,
];

const FALLBACK_IMAGE_STRATEGIES: [MainImageStrategy; 2] =
    [MainImageStrategy::OpenGraph, MainImageStrategy::GenericFirstImage];

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector must parse")
}

static PARAGRAPH_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("p"));
static IMG_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("img[src]"));
static TITLE_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("title"));
static H1_SELECTOR: Lazy<Selector> = Lazy::new(|| selector("h1"));
static OG_IMAGE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:image"], meta[name="og:image"]"#));
static OG_TITLE: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:title"]"#));
static OG_SITE_NAME: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:site_name"]"#));
static OG_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[property="og:description"]"#));
static META_DESCRIPTION: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="description"]"#));
static META_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"meta[name="author"]"#));
static REL_AUTHOR: Lazy<Selector> = Lazy::new(|| selector(r#"[rel="author"]"#));
static BYLINE_CLASS: Lazy<Selector> = Lazy::new(|| selector(r#"[class*="byline"], [class*="author"]"#));
static GENERIC_IMAGES: Lazy<Vec<Selector>> = Lazy::new(|| GENERIC_IMAGE_SELECTORS.iter().map(|css| selector(css)).collect());

/// Article found by the extractor.
struct Article {
    title: String,
    content: String,
}

/// Builds the reader view of `html`. Relative image URLs are resolved
/// against `base_url`; an unparsable base leaves them untouched.
pub fn to_readable_view(html: &str, base_url: &str) -> ReadableView {
    let base = match Url::parse(base_url) {
        Ok(url) => Some(url),
        Err(e) => {
            if !base_url.is_empty() {
                debug!("Base URL {:?} is not absolute: {}", base_url, e);
            }
            None
        }
    };
    let base = base.as_ref();
    let document = Html::parse_document(html);

    let Some(article) = find_article(html, base) else {
        return fallback_view(&document, base);
    };

    let content = clean_article_html(&article.content, base);
    let body = Html::parse_fragment(&content);
    let body_text = collapse_whitespace(&body.root_element().text().collect::<String>());
    if body_text.chars().count() < MIN_ARTICLE_CHARS {
        return fallback_view(&document, base);
    }

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| Some(collapse_whitespace(&article.title)).filter(|t| !t.is_empty()))
        .or_else(|| first_text(&document, &TITLE_SELECTOR))
        .or_else(|| first_text(&document, &H1_SELECTOR))
        .unwrap_or_else(|| NO_TITLE.to_string());

    let excerpt = meta_content(&document, &OG_DESCRIPTION)
        .or_else(|| meta_content(&document, &META_DESCRIPTION))
        .or_else(|| first_paragraph(&body))
        .map(|text| truncate_chars(&text, MAX_EXCERPT_CHARS))
        .unwrap_or_default();

    ReadableView {
        title,
        excerpt,
        site_name: meta_content(&document, &OG_SITE_NAME).unwrap_or_default(),
        byline: find_byline(&document).unwrap_or_default(),
        length: body_text.chars().count(),
        main_image: select_main_image(&ARTICLE_IMAGE_STRATEGIES, &document, Some(&body), base),
        content,
    }
}

/// Runs the readability extractor over `html`.
fn find_article(html: &str, base: Option<&Url>) -> Option<Article> {
    let placeholder;
    let url = match base {
        Some(url) => url,
        None => {
            placeholder = Url::parse(NO_BASE).ok()?;
            &placeholder
        }
    };

    let mut cursor = Cursor::new(html.as_bytes());
    match extractor::extract(&mut cursor, url) {
        Ok(product) if !collapse_whitespace(&product.text).is_empty() => Some(Article {
            title: product.title,
            content: product.content,
        }),
        Ok(_) => None,
        Err(e) => {
            debug!("Readability extraction failed: {}", e);
            None
        }
    }
}

fn fallback_view(document: &Html, base: Option<&Url>) -> ReadableView {
    let title = first_text(document, &H1_SELECTOR)
        .or_else(|| first_text(document, &TITLE_SELECTOR))
        .unwrap_or_else(|| NO_TITLE.to_string());

    ReadableView {
        title,
        content: String::new(),
        excerpt: String::new(),
        site_name: String::new(),
        byline: String::new(),
        length: 0,
        main_image: select_main_image(&FALLBACK_IMAGE_STRATEGIES, document, None, base),
    }
}

/// Returns the first image produced by `strategies`, in order.
pub fn select_main_image(
    strategies: &[MainImageStrategy],
    document: &Html,
    article: Option<&Html>,
    base: Option<&Url>,
) -> Option<String> {
    strategies.iter().find_map(|strategy| match strategy {
        MainImageStrategy::OpenGraph => meta_content(document, &OG_IMAGE).map(|src| resolve_or_keep(&src, base)),
        MainImageStrategy::ArticleFirstImage => article
            .and_then(|body| first_image_src(body, &IMG_SELECTOR))
            .map(|src| resolve_or_keep(&src, base)),
        MainImageStrategy::GenericFirstImage => GENERIC_IMAGES
            .iter()
            .find_map(|sel| first_image_src(document, sel))
            .map(|src| resolve_or_keep(&src, base)),
    })
}

/// Drops non-content elements and makes image sources absolute.
fn clean_article_html(html: &str, base: Option<&Url>) -> String {
    let mut handlers: Vec<_> = STRIPPED_TAGS
        .iter()
        .map(|tag| {
            element!(tag, |el| {
                el.remove();
                Ok(())
            })
        })
        .collect();
    handlers.push(element!("img[src]", |el| {
        if let Some(src) = el.get_attribute("src") {
            match resolve(&src, base) {
                Some(absolute) => {
                    el.set_attribute("src", &absolute).ok();
                }
                None => warn!("Could not resolve image URL {:?}", src),
            }
        }
        Ok(())
    }));

    let mut output = Vec::with_capacity(html.len());
    let mut rewriter = HtmlRewriter::new(
        Settings {
            element_content_handlers: handlers,
            ..Default::default()
        },
        |c: &[u8]| output.extend_from_slice(c),
    );

    if rewriter.write(html.as_bytes()).is_err() || rewriter.end().is_err() {
        return html.to_string();
    }

    String::from_utf8_lossy(&output).into_owned()
}

fn resolve(src: &str, base: Option<&Url>) -> Option<String> {
    let resolved = match base {
        Some(base) => base.join(src),
        None => Url::parse(src),
    };
    resolved.ok().map(String::from)
}

fn resolve_or_keep(src: &str, base: Option<&Url>) -> String {
    resolve(src, base).unwrap_or_else(|| {
        warn!("Could not resolve image URL {:?}", src);
        src.to_string()
    })
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|el| el.value().attr("content"))
        .map(str::trim)
        .find(|content| !content.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn first_image_src(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|img| img.value().attr("src"))
        .map(str::trim)
        .find(|src| !src.is_empty())
        .map(str::to_string)
}

fn first_paragraph(body: &Html) -> Option<String> {
    body.select(&PARAGRAPH_SELECTOR)
        .map(|p| collapse_whitespace(&p.text().collect::<String>()))
        .find(|text| text.chars().count() >= MIN_ARTICLE_CHARS)
}

fn find_byline(document: &Html) -> Option<String> {
    if let Some(author) = meta_content(document, &META_AUTHOR) {
        return Some(author);
    }
    document
        .select(&REL_AUTHOR)
        .chain(document.select(&BYLINE_CLASS).take(3))
        .map(|el| collapse_whitespace(&el.text().collect::<String>()))
        .find(|text| !text.is_empty() && text.chars().count() < 100)
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => format!("{}...", &text[..idx]),
        None => text.to_string(),
    }
}
