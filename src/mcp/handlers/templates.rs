//! Templater execution (`execute_template`).
//!
//! The template is read from the vault's `Prompts/` folder, its declared
//! parameters are extracted, and the caller's arguments are checked against
//! them before the plugin runs it.

use std::collections::BTreeMap;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{parse_arguments, McpToolResult};
use crate::mcp::contract::{ArgumentShape, Field, FieldKind, ToolContract, ValidationErrors};
use crate::mcp::error::McpError;
use crate::mcp::tools::{HandlerContext, RegistryError, ToolRegistry, ToolRequest};
use crate::template::{build_template_arguments_shape, parse_template_parameters};
use crate::vault::types::{
    ApiTemplateExecutionResponse, ApiVaultFileResponse, TemplateExecutionParams, MIME_TYPE_NOTE_JSON,
};
use crate::vault::{encode_segment, RequestInit, VaultClient};

/// Vault folder holding prompt templates.
pub const PROMPT_DIRNAME: &str = "Prompts";

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        ToolContract::new("execute_template", "Execute a Templater template with the given arguments")
            .with_arguments(
                ArgumentShape::new()
                    .with(Field::required("name", FieldKind::string()))
                    .with(Field::required("arguments", FieldKind::string_record()))
                    .with(Field::optional("createFile", FieldKind::Boolean))
                    .with(Field::optional("targetPath", FieldKind::string())),
            ),
        execute_template,
    )
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ExecuteTemplateArgs {
    name: String,
    arguments: Value,
    #[serde(default)]
    create_file: Option<bool>,
    #[serde(default)]
    target_path: Option<String>,
}

/// Read a file under `Prompts/` as note JSON.
pub(crate) async fn read_prompt_file(vault: &VaultClient, filename: &str) -> Result<ApiVaultFileResponse, McpError> {
    let path = format!("/vault/{}/{}", PROMPT_DIRNAME, encode_segment(filename));
    vault
        .request(&path, RequestInit::get().header("Accept", MIME_TYPE_NOTE_JSON))
        .await
}

/// Check `arguments` against the parameters declared in `template`.
///
/// Returns the arguments as the string map the execution endpoint expects.
pub(crate) fn validate_template_arguments(
    template: &str,
    arguments: &Value,
) -> Result<BTreeMap<String, String>, ValidationErrors> {
    let parameters = parse_template_parameters(template);
    build_template_arguments_shape(&parameters).validate(arguments)?;

    Ok(arguments
        .as_object()
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default())
}

/// Run a template through `POST /templates/execute`.
pub(crate) async fn execute(
    vault: &VaultClient,
    params: &TemplateExecutionParams,
) -> Result<ApiTemplateExecutionResponse, McpError> {
    let body = serde_json::to_string(params)
        .map_err(|e| McpError::internal(format!("Failed to encode template parameters: {}", e)))?;
    vault
        .request(
            "/templates/execute",
            RequestInit::post()
                .header("Content-Type", "application/json")
                .body(body),
        )
        .await
}

/// `execute_template` -- validate arguments against `Prompts/<name>.md` and run it.
pub async fn execute_template(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: ExecuteTemplateArgs = parse_arguments(&request)?;
    let filename = format!("{}.md", args.name);

    let file = read_prompt_file(ctx.vault(), &filename).await?;
    let arguments = validate_template_arguments(&file.content, &args.arguments)?;

    info!("[Templates] Executing {}", filename);
    let params = TemplateExecutionParams {
        name: filename,
        arguments,
        create_file: args.create_file,
        target_path: args.target_path,
    };
    let response = execute(ctx.vault(), &params).await?;
    McpToolResult::json(&response)
}
