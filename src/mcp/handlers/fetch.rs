//! `fetch` -- read a web page and return it as Markdown.
//!
//! HTML is simplified with [`crate::markdown::convert`] unless `raw` is set.
//! Long content is paged by character offset.

use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{parse_arguments, McpToolResult};
use crate::markdown;
use crate::mcp::contract::{ArgumentShape, Field, FieldKind, ToolContract};
use crate::mcp::error::McpError;
use crate::mcp::tools::{HandlerContext, RegistryError, ToolRegistry, ToolRequest};

pub const DEFAULT_USER_AGENT: &str =
    "ModelContextProtocol/1.0 (Autonomous; +https://github.com/modelcontextprotocol/servers)";

const DEFAULT_MAX_LENGTH: usize = 5000;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        ToolContract::new(
            "fetch",
            "Reads and returns the content of any web page. Returns the content in Markdown format by default, or can return raw HTML if raw=true parameter is set. Supports pagination through maxLength and startIndex parameters.",
        )
        .with_arguments(
            ArgumentShape::new()
                .with(Field::required("url", FieldKind::string()))
                .with(Field::optional("maxLength", FieldKind::number()).describe("Limit response length."))
                .with(
                    Field::optional("startIndex", FieldKind::number())
                        .describe("Supports paginated retrieval of content."),
                )
                .with(Field::optional("raw", FieldKind::Boolean).describe("Returns raw HTML content if raw=true.")),
        ),
        fetch,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FetchArgs {
    url: String,
    #[serde(default)]
    max_length: Option<f64>,
    #[serde(default)]
    start_index: Option<f64>,
    #[serde(default)]
    raw: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total_length: usize,
    start_index: usize,
    end_index: usize,
    has_more: bool,
}

/// One window of `content`, measured in characters.
struct Page {
    text: String,
    pagination: Pagination,
}

fn paginate(content: &str, start_index: usize, max_length: usize) -> Page {
    let total_length = content.chars().count();
    let start = start_index.min(total_length);
    let end = start.saturating_add(max_length).min(total_length);

    let mut text: String = content.chars().skip(start).take(end - start).collect();
    let has_more = end < total_length;
    if has_more {
        text.push_str(&format!(
            "\n\n<error>Content truncated. Call the fetch tool with a startIndex of {} to get more content.</error>",
            end
        ));
    }

    Page {
        text,
        pagination: Pagination {
            total_length,
            start_index: start,
            end_index: end,
            has_more,
        },
    }
}

fn is_html(body: &str, content_type: &str) -> bool {
    content_type.is_empty() || content_type.contains("text/html") || body.to_lowercase().contains("<html")
}

pub async fn fetch(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FetchArgs = parse_arguments(&request)?;
    info!("[fetch] Fetching URL: {}", args.url);

    let response = ctx
        .http()
        .get(&args.url)
        .header(USER_AGENT, DEFAULT_USER_AGENT)
        .send()
        .await
        .map_err(|e| {
            error!(url = %args.url, "Failed to fetch URL: {}", e);
            McpError::internal(format!("Failed to fetch {}: {}", args.url, e))
        })?;

    let status = response.status();
    if !status.is_success() {
        return Err(McpError::internal(format!(
            "Failed to fetch {} - status code {}",
            args.url,
            status.as_u16()
        ))
        .into());
    }

    let content_type = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default()
        .to_string();
    let body = response
        .text()
        .await
        .map_err(|e| McpError::internal(format!("Failed to fetch {}: {}", args.url, e)))?;

    let (content, prefix) = if is_html(&body, &content_type) && !args.raw.unwrap_or(false) {
        (markdown::convert(&body, Some(&args.url)), String::new())
    } else {
        (
            body,
            format!(
                "Content type {} cannot be simplified to markdown, but here is the raw content:\n",
                content_type
            ),
        )
    };

    let max_length = args
        .max_length
        .filter(|m| *m >= 1.0)
        .map(|m| m as usize)
        .unwrap_or(DEFAULT_MAX_LENGTH);
    let start_index = args.start_index.filter(|s| *s > 0.0).map(|s| s as usize).unwrap_or(0);
    let page = paginate(&content, start_index, max_length);

    debug!(url = %args.url, length = page.text.len(), "URL fetched successfully");
    Ok(McpToolResult::multi_text(vec![
        format!("{}Contents of {}:\n{}", prefix, args.url, page.text),
        format!("Pagination: {}", serde_json::to_string(&page.pagination)?),
    ]))
}
