//! Prompt surface: vault templates tagged `mcp-tools-prompt` exposed through
//! `prompts/list` and `prompts/get`.
//!
//! Prompts live in the vault's `Prompts/` folder. Their parameters come from
//! the Templater calls in the template body, and rendering runs the template
//! through the companion plugin.

use futures_util::future::try_join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::error::McpError;
use super::handlers::templates::{execute, read_prompt_file, validate_template_arguments, PROMPT_DIRNAME};
use super::handlers::McpContent;
use crate::template::{parse_template_parameters, PromptParameter};
use crate::vault::types::{ApiVaultDirectoryResponse, ApiVaultFileResponse, TemplateExecutionParams};
use crate::vault::{RequestInit, VaultClient};

/// Tag marking a vault file as a prompt.
pub const PROMPT_TAG: &str = "mcp-tools-prompt";

/// One entry of `prompts/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMetadata {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub arguments: Vec<PromptParameter>,
}

/// Parameters of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptRequest {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arguments: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: Role,
    pub content: McpContent,
}

/// Result of `prompts/get`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetPromptResult {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub messages: Vec<PromptMessage>,
}

fn is_prompt(file: &ApiVaultFileResponse) -> bool {
    file.tags.iter().any(|t| t == PROMPT_TAG) || file.frontmatter.tags.iter().any(|t| t == PROMPT_TAG)
}

/// Rendered templates may carry their own frontmatter. Keep what follows the
/// last `---`.
fn strip_frontmatter(content: &str) -> &str {
    content.rsplit("---").next().unwrap_or_default().trim()
}

/// `prompts/list`
pub async fn list_prompts(vault: &VaultClient) -> Result<Vec<PromptMetadata>, McpError> {
    let outcome = collect_prompts(vault).await;
    if let Err(err) = &outcome {
        error!(code = err.code.as_i64(), data = ?err.data, "Error listing prompts: {}", err.message);
    }
    outcome
}

async fn collect_prompts(vault: &VaultClient) -> Result<Vec<PromptMetadata>, McpError> {
    let listing: ApiVaultDirectoryResponse = vault
        .request(&format!("/vault/{}/", PROMPT_DIRNAME), RequestInit::get())
        .await?;

    let markdown: Vec<&String> = listing.files.iter().filter(|f| f.ends_with(".md")).collect();
    let files = try_join_all(markdown.iter().map(|f| read_prompt_file(vault, f))).await?;

    let prompts: Vec<PromptMetadata> = markdown
        .into_iter()
        .zip(files)
        .filter(|(_, file)| is_prompt(file))
        .map(|(filename, file)| PromptMetadata {
            name: filename.clone(),
            description: file.frontmatter.description.clone(),
            arguments: parse_template_parameters(&file.content),
        })
        .collect();

    debug!("[Prompts] Found {} prompts", prompts.len());
    Ok(prompts)
}

/// `prompts/get`
pub async fn get_prompt(vault: &VaultClient, request: GetPromptRequest) -> Result<GetPromptResult, McpError> {
    let name = request.name.clone();
    let outcome = render_prompt(vault, request).await;
    if let Err(err) = &outcome {
        error!(
            prompt = %name,
            code = err.code.as_i64(),
            data = ?err.data,
            "Error getting prompt {}: {}",
            name,
            err.message
        );
    }
    outcome
}

async fn render_prompt(vault: &VaultClient, request: GetPromptRequest) -> Result<GetPromptResult, McpError> {
    let file = read_prompt_file(vault, &request.name).await?;
    if !is_prompt(&file) {
        return Err(McpError::invalid_params(format!(
            "{}/{} is not a prompt: tags must include \"{}\"",
            PROMPT_DIRNAME, request.name, PROMPT_TAG
        )));
    }

    let raw_arguments = request
        .arguments
        .unwrap_or_else(|| Value::Object(Default::default()));
    let arguments = validate_template_arguments(&file.content, &raw_arguments)
        .map_err(|e| McpError::invalid_params(format!("Invalid arguments: {}", e.summary())))?;

    let params = TemplateExecutionParams {
        name: request.name,
        arguments,
        create_file: None,
        target_path: None,
    };
    let response = execute(vault, &params).await?;

    Ok(GetPromptResult {
        description: file.frontmatter.description,
        messages: vec![PromptMessage {
            role: Role::User,
            content: McpContent::Text {
                text: strip_frontmatter(&response.content).to_string(),
            },
        }],
    })
}
