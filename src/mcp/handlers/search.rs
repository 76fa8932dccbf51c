//! Search handlers: structured queries, plain text search, and semantic search
//! through the Smart Connections endpoint.

use serde::Deserialize;
use url::form_urlencoded;

use super::{parse_arguments, McpToolResult};
use crate::mcp::contract::{ArgumentShape, Field, FieldKind, ToolContract};
use crate::mcp::tools::{HandlerContext, RegistryError, ToolRegistry, ToolRequest};
use crate::vault::types::{
    ApiSearchResult, ApiSimpleSearchResult, ApiSmartSearchResponse, SmartSearchParams,
    MIME_TYPE_DATAVIEW_DQL, MIME_TYPE_JSONLOGIC,
};
use crate::vault::RequestInit;

pub fn register(registry: &mut ToolRegistry) -> Result<(), RegistryError> {
    registry.register(
        ToolContract::new(
            "search_vault",
            "Search for documents matching a specified query using either Dataview DQL or JsonLogic.",
        )
        .with_arguments(
            ArgumentShape::new()
                .with(Field::required("queryType", FieldKind::literals(["dataview", "jsonlogic"])))
                .with(Field::required("query", FieldKind::string())),
        ),
        search_vault,
    )?;
    registry.register(
        ToolContract::new("search_vault_simple", "Search for documents matching a text query.").with_arguments(
            ArgumentShape::new()
                .with(Field::required("query", FieldKind::string()))
                .with(Field::optional("contextLength", FieldKind::number())),
        ),
        search_vault_simple,
    )?;
    registry.register(
        ToolContract::new(
            "search_vault_smart",
            "Search for documents semantically matching a text string.",
        )
        .with_arguments(smart_search_shape()),
        search_vault_smart,
    )?;
    Ok(())
}

fn smart_search_shape() -> ArgumentShape {
    let filter = ArgumentShape::new()
        .with(
            Field::optional("folders", FieldKind::string_array())
                .describe(r#"An array of folder names to include. For example, ["Public", "Work"]"#),
        )
        .with(
            Field::optional("excludeFolders", FieldKind::string_array())
                .describe(r#"An array of folder names to exclude. For example, ["Private", "Archive"]"#),
        )
        .with(
            Field::optional("limit", FieldKind::positive_number())
                .describe("The maximum number of results to return"),
        );

    ArgumentShape::new()
        .with(
            Field::required("query", FieldKind::non_empty_string())
                .describe("A search phrase for semantic search"),
        )
        .with(Field::optional("filter", FieldKind::Object(filter)))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SearchArgs {
    query_type: String,
    query: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SimpleSearchArgs {
    query: String,
    #[serde(default)]
    context_length: Option<f64>,
}

/// `search_vault` -- POST /search/ with a DQL or JsonLogic body.
pub async fn search_vault(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: SearchArgs = parse_arguments(&request)?;
    let content_type = if args.query_type == "dataview" {
        MIME_TYPE_DATAVIEW_DQL
    } else {
        MIME_TYPE_JSONLOGIC
    };

    let results: Vec<ApiSearchResult> = ctx
        .vault()
        .request(
            "/search/",
            RequestInit::post()
                .header("Content-Type", content_type)
                .body(args.query),
        )
        .await?;
    McpToolResult::json(&results)
}

/// `search_vault_simple` -- POST /search/simple/?query=...
pub async fn search_vault_simple(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let args: SimpleSearchArgs = parse_arguments(&request)?;

    // The serializer is not Send and must not live across the await below.
    let path = {
        let mut query = form_urlencoded::Serializer::new(String::new());
        query.append_pair("query", &args.query);
        if let Some(length) = args.context_length.filter(|l| *l != 0.0) {
            query.append_pair("contextLength", &length.to_string());
        }
        format!("/search/simple/?{}", query.finish())
    };
    let results: Vec<ApiSimpleSearchResult> = ctx.vault().request(&path, RequestInit::post()).await?;
    McpToolResult::json(&results)
}

/// `search_vault_smart` -- POST /search/smart with the arguments as JSON.
pub async fn search_vault_smart(request: ToolRequest, ctx: HandlerContext) -> anyhow::Result<McpToolResult> {
    let params: SmartSearchParams = parse_arguments(&request)?;
    let body = serde_json::to_string(&params)?;

    let response: ApiSmartSearchResponse = ctx
        .vault()
        .request(
            "/search/smart",
            RequestInit::post()
                .header("Content-Type", "application/json")
                .body(body),
        )
        .await?;
    McpToolResult::json(&response)
}
