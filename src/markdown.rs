//! HTML to Markdown conversion for fetched web pages.
//!
//! Conversion itself is done by `htmd`. Around it this module keeps only the
//! page's `<article>` when there is one, resolves relative link and image URLs
//! against the page URL, and drops inline `data:` images.

use htmd::options::{BulletListMarker, CodeBlockStyle, HeadingStyle, HrStyle, Options};
use htmd::HtmlToMarkdown;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::warn;
use url::Url;

/// Elements whose whole content is discarded.
const SKIPPED_TAGS: &[&str] = &["script", "style", "noscript", "template", "head", "svg"];

static COMMENT: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").expect("invalid comment regex"));

static ARTICLE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?is)<article\b[^>]*>(.*)</article\s*>").expect("invalid article regex"));

static DATA_IMAGE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"!\[[^\]]*\]\(\s*data:[^)]*\)").expect("invalid data image regex"));

/// Destination of an inline link or image, up to an optional title.
static DESTINATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\]\(([^)\s]+)").expect("invalid link destination regex"));

static EXTRA_NEWLINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").expect("invalid newline regex"));

fn converter() -> HtmlToMarkdown {
    HtmlToMarkdown::builder()
        .skip_tags(SKIPPED_TAGS.to_vec())
        .options(Options {
            heading_style: HeadingStyle::Atx,
            hr_style: HrStyle::Dashes,
            bullet_list_marker: BulletListMarker::Dash,
            code_block_style: CodeBlockStyle::Fenced,
            ..Default::default()
        })
        .build()
}

/// Convert an HTML document to Markdown.
///
/// Relative link and image URLs are resolved against `base_url` when given.
/// A document the converter rejects yields an empty string.
pub fn convert(html: &str, base_url: Option<&str>) -> String {
    let cleaned = COMMENT.replace_all(html, "");
    let body = ARTICLE
        .captures(&cleaned)
        .and_then(|c| c.get(1))
        .map_or(&*cleaned, |m| m.as_str());

    let markdown = match converter().convert(body) {
        Ok(markdown) => markdown,
        Err(e) => {
            warn!("Failed to convert HTML to Markdown: {}", e);
            return String::new();
        }
    };

    let markdown = DATA_IMAGE.replace_all(&markdown, "");
    let markdown = match base_url.and_then(|base| Url::parse(base).ok()) {
        Some(base) => DESTINATION
            .replace_all(&markdown, |caps: &Captures| format!("]({}", resolve(&base, &caps[1])))
            .into_owned(),
        None => markdown.into_owned(),
    };

    EXTRA_NEWLINES.replace_all(markdown.trim(), "\n\n").into_owned()
}

/// Absolute http(s) URLs pass through; everything else is joined onto `base`.
fn resolve(base: &Url, target: &str) -> String {
    if target.starts_with("http://") || target.starts_with("https://") {
        return target.to_string();
    }
    base.join(target)
        .map(String::from)
        .unwrap_or_else(|_| target.to_string())
}
