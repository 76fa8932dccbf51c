//! Vault handlers: server status, the active file, and files by path.
//!
//! All of these are thin wrappers over one Local REST API call each.

use serde::de::IgnoredAny;
use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use super::{parse_arguments, McpToolResult};
use crate::mcp::contract::{ArgumentShape, Field, FieldKind, ToolContract};
use crate::mcp::tools::{HandlerContext, RegistryError, ToolRegistry, ToolRequest};
use crate::vault::types::{
    ApiNoteJson, ApiStatusResponse, ApiVaultDirectoryResponse, ApiVaultFileResponse, NoteContent,
    MIME_TYPE_MARKDOWN, MIME_TYPE_NOTE_JSON,
};
use crate::vault::{encode_segment, RequestInit};

const ACTIVE_FILE: &str = "/active/";

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        ToolContract::new(
            "get_server_info",
            "Returns basic details about the Obsidian Local REST API and authentication status. This is the only API request that does not require authentication.",
        ),
        get_server_info,
    )?;
    registry.register(
        ToolContract::new(
            "get_active_file",
            "Returns the content of the currently active file in Obsidian. Can return either markdown content or a JSON representation including parsed tags and frontmatter.",
        )
        .with_arguments(ArgumentShape::new().with(format_field())),
        get_active_file,
    )?;
    registry.register(
        ToolContract::new("update_active_file", "Update the content of the active file open in Obsidian.")
            .with_arguments(ArgumentShape::new().with(Field::required("content", FieldKind::string()))),
        update_active_file,
    )?;
    registry.register(
        ToolContract::new("append_to_active_file", "Append content to the end of the currently-open note.")
            .with_arguments(ArgumentShape::new().with(Field::required("content", FieldKind::string()))),
        append_to_active_file,
    )?;
    registry.register(
        ToolContract::new(
            "patch_active_file",
            "Insert or modify content in the currently-open note relative to a heading, block reference, or frontmatter field.",
        )
        .with_arguments(patch_shape()),
        patch_active_file,
    )?;
    registry.register(
        ToolContract::new("delete_active_file", "Delete the currently-active file in Obsidian."),
        delete_active_file,
    )?;
    registry.register(
        ToolContract::new(
            "open_file_in_obsidian",
            "Open a document in the Obsidian UI. Creates a new document if it doesn't exist. Returns a confirmation if the file was opened successfully.",
        )
        .with_arguments(
            ArgumentShape::new()
                .with(Field::required("filename", FieldKind::string()))
                .with(Field::optional("newLeaf", FieldKind::Boolean)),
        ),
        open_file_in_obsidian,
    )?;
    registry.register(
        ToolContract::new(
            "list_vault_files",
            "List files in the root directory or a specified subdirectory of your vault.",
        )
        .with_arguments(ArgumentShape::new().with(Field::optional("directory", FieldKind::string()))),
        list_vault_files,
    )?;
    registry.register(
        ToolContract::new("get_vault_file", "Get the content of a file from your vault.").with_arguments(
            ArgumentShape::new()
                .with(Field::required("filename", FieldKind::string()))
                .with(format_field()),
        ),
        get_vault_file,
    )?;
    registry.register(
        ToolContract::new(
            "create_vault_file",
            "Create a new file in your vault or update an existing one.",
        )
        .with_arguments(filename_and_content()),
        create_vault_file,
    )?;
    registry.register(
        ToolContract::new("append_to_vault_file", "Append content to a new or existing file.")
            .with_arguments(filename_and_content()),
        append_to_vault_file,
    )?;
    registry.register(
        ToolContract::new(
            "patch_vault_file",
            "Insert or modify content in a file relative to a heading, block reference, or frontmatter field.",
        )
        .with_arguments(
            ArgumentShape::new()
                .with(Field::required("filename", FieldKind::string()))
                .merge(patch_shape()),
        ),
        patch_vault_file,
    )?;
    registry.register(
        ToolContract::new("delete_vault_file", "Delete a file from your vault.")
            .with_arguments(ArgumentShape::new().with(Field::required("filename", FieldKind::string()))),
        delete_vault_file,
    )?;
    Ok(())
}

fn format_field() -> Field {
    Field::optional("format", FieldKind::literals(["markdown", "json"]))
}

fn filename_and_content() -> ArgumentShape {
    ArgumentShape::new()
        .with(Field::required("filename", FieldKind::string()))
        .with(Field::required("content", FieldKind::string()))
}

/// Arguments shared by both patch tools.
fn patch_shape() -> ArgumentShape {
    ArgumentShape::new()
        .with(
            Field::required("operation", FieldKind::literals(["append", "prepend", "replace"]))
                .describe("The operation to perform on the target."),
        )
        .with(
            Field::required("targetType", FieldKind::literals(["heading", "block", "frontmatter"]))
                .describe("The type of target to patch."),
        )
        .with(
            Field::required("target", FieldKind::string())
                .describe("The heading path, block reference, or frontmatter field to target."),
        )
        .with(
            Field::optional("targetDelimiter", FieldKind::string())
                .describe("Delimiter between nested heading names. Defaults to '::'."),
        )
        .with(
            Field::optional("trimTargetWhitespace", FieldKind::Boolean)
                .describe("Trim whitespace around the target before applying the patch."),
        )
        .with(Field::required("content", FieldKind::string()).describe("The content to insert."))
        .with(
            Field::optional("contentType", FieldKind::literals(["text/markdown", "application/json"]))
                .describe("Format of the content. Use application/json for frontmatter values."),
        )
}

#[derive(Debug, Deserialize)]
struct ContentArgs {
    content: String,
}

#[derive(Debug, Deserialize)]
struct FormatArgs {
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileArgs {
    filename: String,
    #[serde(default)]
    format: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileContentArgs {
    filename: String,
    content: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OpenArgs {
    filename: String,
    #[serde(default)]
    new_leaf: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct DirectoryArgs {
    #[serde(default)]
    directory: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PatchArgs {
    operation: String,
    target_type: String,
    target: String,
    #[serde(default)]
    target_delimiter: Option<String>,
    #[serde(default)]
    trim_target_whitespace: Option<bool>,
    content: String,
    #[serde(default)]
    content_type: Option<String>,
}

impl PatchArgs {
    fn into_request(self) -> RequestInit {
        let mut init = RequestInit::patch()
            .header("Operation", self.operation)
            .header("Target-Type", self.target_type)
            .header("Target", self.target)
            .header("Create-Target-If-Missing", "true");
        if let Some(delimiter) = self.target_delimiter.filter(|d| !d.is_empty()) {
            init = init.header("Target-Delimiter", delimiter);
        }
        if let Some(trim) = self.trim_target_whitespace {
            init = init.header("Trim-Target-Whitespace", trim.to_string());
        }
        if let Some(content_type) = self.content_type.filter(|c| !c.is_empty()) {
            init = init.header("Content-Type", content_type);
        }
        init.body(self.content)
    }
}

#[derive(Debug, Deserialize)]
struct PatchVaultArgs {
    filename: String,
    #[serde(flatten)]
    patch: PatchArgs,
}

fn accept_for(format: Option<&str>) -> &'static str {
    match format {
        Some("json") => MIME_TYPE_NOTE_JSON,
        _ => MIME_TYPE_MARKDOWN,
    }
}

fn render_note<T: serde::Serialize>(note: NoteContent<T>) -> anyhow::Result<McpToolResult> {
    match note {
        NoteContent::Markdown(text) => Ok(McpToolResult::text(text)),
        NoteContent::Json(data) => McpToolResult::json(&data),
    }
}

fn text_of(value: Value) -> anyhow::Result<String> {
    match value {
        Value::String(text) => Ok(text),
        Value::Null => Ok(String::new()),
        other => Ok(serde_json::to_string_pretty(&other)?),
    }
}

fn vault_path(filename: &str) -> String {
    format!("/vault/{}", encode_segment(filename))
}

/// `get_server_info` -- GET /
pub async fn get_server_info(_request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let status: ApiStatusResponse = ctx.vault().request("/", RequestInit::get()).await?;
    McpToolResult::json(&status)
}

/// `get_active_file` -- GET /active/ as markdown or note JSON.
pub async fn get_active_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FormatArgs = parse_arguments(&request)?;
    let note: NoteContent<ApiNoteJson> = ctx
        .vault()
        .request(
            ACTIVE_FILE,
            RequestInit::get().header("Accept", accept_for(args.format.as_deref())),
        )
        .await?;
    render_note(note)
}

pub async fn update_active_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: ContentArgs = parse_arguments(&request)?;
    let _: IgnoredAny = ctx
        .vault()
        .request(ACTIVE_FILE, RequestInit::put().body(args.content))
        .await?;
    Ok(McpToolResult::text("File updated successfully"))
}

pub async fn append_to_active_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: ContentArgs = parse_arguments(&request)?;
    let _: IgnoredAny = ctx
        .vault()
        .request(ACTIVE_FILE, RequestInit::post().body(args.content))
        .await?;
    Ok(McpToolResult::text("Content appended successfully"))
}

pub async fn patch_active_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: PatchArgs = parse_arguments(&request)?;
    let response: Value = ctx.vault().request(ACTIVE_FILE, args.into_request()).await?;
    Ok(McpToolResult::multi_text(vec![
        "File patched successfully".into(),
        text_of(response)?,
    ]))
}

pub async fn delete_active_file(_request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let _: IgnoredAny = ctx.vault().request(ACTIVE_FILE, RequestInit::delete()).await?;
    Ok(McpToolResult::text("File deleted successfully"))
}

pub async fn open_file_in_obsidian(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: OpenArgs = parse_arguments(&request)?;
    let query = if args.new_leaf.unwrap_or(false) { "?newLeaf=true" } else { "" };
    let path = format!("/open/{}{}", encode_segment(&args.filename), query);

    info!("[Vault] Opening {}", args.filename);
    let _: IgnoredAny = ctx.vault().request(&path, RequestInit::post()).await?;
    Ok(McpToolResult::text("File opened successfully"))
}

/// `list_vault_files` -- GET /vault/ or /vault/<directory>/
pub async fn list_vault_files(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: DirectoryArgs = parse_arguments(&request)?;
    let directory = args
        .directory
        .as_deref()
        .map(|d| d.trim_matches('/'))
        .filter(|d| !d.is_empty())
        .map(|d| {
            let encoded: Vec<String> = d.split('/').map(encode_segment).collect();
            format!("{}/", encoded.join("/"))
        })
        .unwrap_or_default();

    let listing: ApiVaultDirectoryResponse = ctx
        .vault()
        .request(&format!("/vault/{}", directory), RequestInit::get())
        .await?;
    McpToolResult::json(&listing)
}

pub async fn get_vault_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FileArgs = parse_arguments(&request)?;
    let note: NoteContent<ApiVaultFileResponse> = ctx
        .vault()
        .request(
            &vault_path(&args.filename),
            RequestInit::get().header("Accept", accept_for(args.format.as_deref())),
        )
        .await?;
    render_note(note)
}

pub async fn create_vault_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FileContentArgs = parse_arguments(&request)?;
    let _: IgnoredAny = ctx
        .vault()
        .request(&vault_path(&args.filename), RequestInit::put().body(args.content))
        .await?;
    Ok(McpToolResult::text("File created successfully"))
}

pub async fn append_to_vault_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FileContentArgs = parse_arguments(&request)?;
    let _: IgnoredAny = ctx
        .vault()
        .request(&vault_path(&args.filename), RequestInit::post().body(args.content))
        .await?;
    Ok(McpToolResult::text("Content appended successfully"))
}

pub async fn patch_vault_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: PatchVaultArgs = parse_arguments(&request)?;
    let path = vault_path(&args.filename);
    let response: Value = ctx.vault().request(&path, args.patch.into_request()).await?;
    Ok(McpToolResult::multi_text(vec![
        "File patched successfully".into(),
        text_of(response)?,
    ]))
}

pub async fn delete_vault_file(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: FileArgs = parse_arguments(&request)?;
    let _: IgnoredAny = ctx
        .vault()
        .request(&vault_path(&args.filename), RequestInit::delete())
        .await?;
    Ok(McpToolResult::text("File deleted successfully"))
}
