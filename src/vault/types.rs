//! Wire types of the Obsidian Local REST API.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub const MIME_TYPE_NOTE_JSON: &str = "application/vnd.olrapi.note+json";
pub const MIME_TYPE_MARKDOWN: &str = "text/markdown";
pub const MIME_TYPE_DATAVIEW_DQL: &str = "application/vnd.olrapi.dataview.dql+txt";
pub const MIME_TYPE_JSONLOGIC: &str = "application/vnd.olrapi.jsonlogic+json";

/// `GET /`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiStatusResponse {
    pub authenticated: bool,
    pub ok: String,
    pub service: String,
    pub versions: ApiVersions,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiVersions {
    pub obsidian: String,
    #[serde(rename = "self")]
    pub plugin: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiFileStat {
    pub ctime: i64,
    pub mtime: i64,
    pub size: u64,
}

/// A note in `application/vnd.olrapi.note+json` form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiNoteJson {
    pub content: String,
    #[serde(default)]
    pub frontmatter: Map<String, Value>,
    pub path: String,
    pub stat: ApiFileStat,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Frontmatter fields the prompt surface relies on. Other keys are kept.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct VaultFileFrontmatter {
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A vault file fetched as note JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiVaultFileResponse {
    #[serde(default)]
    pub frontmatter: VaultFileFrontmatter,
    pub content: String,
    pub path: String,
    pub stat: ApiFileStat,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// Either raw markdown or the note JSON form, depending on the `Accept` header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NoteContent<T> {
    Markdown(String),
    Json(T),
}

/// `GET /vault/<dir>/`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiVaultDirectoryResponse {
    pub files: Vec<String>,
}

/// One hit of `POST /search/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSearchResult {
    pub filename: String,
    pub result: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiMatchSpan {
    pub start: i64,
    pub end: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSimpleSearchMatch {
    #[serde(rename = "match")]
    pub span: ApiMatchSpan,
    pub context: String,
}

/// One hit of `POST /search/simple/`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSimpleSearchResult {
    pub filename: String,
    pub matches: Vec<ApiSimpleSearchMatch>,
    pub score: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSmartSearchResult {
    pub path: String,
    pub text: String,
    pub score: f64,
    pub breadcrumbs: String,
}

/// `POST /search/smart`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiSmartSearchResponse {
    pub results: Vec<ApiSmartSearchResult>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SmartSearchFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub folders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exclude_folders: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<f64>,
}

/// Body of `POST /search/smart`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SmartSearchParams {
    pub query: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<SmartSearchFilter>,
}

/// Body of `POST /templates/execute`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TemplateExecutionParams {
    pub name: String,
    pub arguments: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_file: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_path: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiTemplateExecutionResponse {
    pub message: String,
    pub content: String,
}
