//! MCP tool handler implementations.
//!
//! Each module implements a group of related tools:
//! - `vault`     -- server status, active file and vault file operations
//! - `search`    -- Dataview/JsonLogic, simple text and semantic search
//! - `templates` -- Templater execution (execute_template)
//! - `fetch`     -- web page retrieval with Markdown conversion

pub mod fetch;
pub mod search;
pub mod templates;
pub mod vault;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use super::error::McpError;
use super::tools::{RegistryError, ToolRegistry, ToolRequest};

/// Result type returned by all MCP tool handlers.
///
/// Matches the MCP protocol's tool result format:
/// ```json
/// {
///   "content": [{ "type": "text", "text": "..." }],
///   "isError": false
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct McpToolResult {
    /// Content items (text, image, etc.)
    pub content: Vec<McpContent>,
    /// Whether this result represents an error.
    #[serde(rename = "isError", default)]
    pub is_error: bool,
}

/// A single content item in an MCP tool result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum McpContent {
    /// Text content.
    #[serde(rename = "text")]
    Text {
        text: String,
    },
    /// Base64-encoded image content.
    #[serde(rename = "image")]
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

impl McpToolResult {
    /// Create a successful text result.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text {
                text: text.into(),
            }],
            is_error: false,
        }
    }

    /// Create an error text result.
    pub fn error(text: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Text {
                text: text.into(),
            }],
            is_error: true,
        }
    }

    /// Create a result holding one base64-encoded image.
    pub fn image(data: impl Into<String>, mime_type: impl Into<String>) -> Self {
        Self {
            content: vec![McpContent::Image {
                data: data.into(),
                mime_type: mime_type.into(),
            }],
            is_error: false,
        }
    }

    /// Create a result with multiple text items.
    pub fn multi_text(texts: Vec<String>) -> Self {
        Self {
            content: texts
                .into_iter()
                .map(|t| McpContent::Text { text: t })
                .collect(),
            is_error: false,
        }
    }

    /// Create a text result holding `value` as indented JSON.
    pub fn json<T: Serialize>(value: &T) -> anyhow::Result<Self> {
        Ok(Self::text(serde_json::to_string_pretty(value)?))
    }
}

/// Deserialize the (already validated) arguments of a request.
pub(crate) fn parse_arguments<T: DeserializeOwned>(request: &ToolRequest) -> Result<T, McpError> {
    serde_json::from_value(request.arguments.clone())
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments for {}: {}", request.name, e)))
}

/// Register every built-in tool, in `tools/list` order.
pub fn register_all(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    vault::register(registry)?;
    search::register(registry)?;
    templates::register(registry)?;
    fetch::register(registry)?;
    Ok(())
}
