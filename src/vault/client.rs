use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use super::types::MIME_TYPE_MARKDOWN;
use crate::config::ServerConfig;
use crate::mcp::error::McpError;

/// Method, headers and body of one REST call.
#[derive(Debug, Clone)]
pub struct RequestInit {
    pub method: Method,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl Default for RequestInit {
    fn default() -> Self {
        Self::new(Method::GET)
    }
}

impl RequestInit {
    pub fn new(method: Method) -> Self {
        Self {
            method,
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get() -> Self {
        Self::new(Method::GET)
    }

    pub fn post() -> Self {
        Self::new(Method::POST)
    }

    pub fn put() -> Self {
        Self::new(Method::PUT)
    }

    pub fn patch() -> Self {
        Self::new(Method::PATCH)
    }

    pub fn delete() -> Self {
        Self::new(Method::DELETE)
    }

    #[must_use]
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    #[must_use]
    pub fn body(mut self, body: impl Into<String>) -> Self {
        self.body = Some(body.into());
        self
    }
}

/// Client for the Obsidian Local REST API.
///
/// The plugin serves a self-signed certificate on localhost, so certificate
/// validation is disabled.
#[derive(Debug, Clone)]
pub struct VaultClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl VaultClient {
    pub fn new(config: &ServerConfig) -> Result<Self, reqwest::Error> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url(),
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Perform one request and decode the response body into `T`.
    ///
    /// JSON responses are parsed, anything else is treated as a JSON string,
    /// and `204 No Content` decodes from `null`. Use
    /// [`serde::de::IgnoredAny`] when the body does not matter.
    pub async fn request<T: DeserializeOwned>(
        &self,
        path: &str,
        init: RequestInit,
    ) -> Result<T, McpError> {
        let method = init.method.clone();
        let url = format!("{}{}", self.base_url, path);
        let headers = self.build_headers(&init.headers)?;

        debug!("[Vault] {} {}", method, path);

        let mut builder = self.http.request(method.clone(), &url).headers(headers);
        if let Some(body) = init.body {
            builder = builder.body(body);
        }

        let response = builder.send().await.map_err(|e| {
            let reason = if e.is_connect() {
                "Cannot connect to Obsidian. Is the Local REST API plugin running?".to_string()
            } else if e.is_timeout() {
                "Request timed out".to_string()
            } else {
                e.to_string()
            };
            McpError::internal(format!("{} {} failed: {}", method, path, reason))
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(McpError::internal(format!(
                "{} {} {}: {}",
                method,
                path,
                status.as_u16(),
                body
            )));
        }

        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|ct| ct.contains("json"))
            .unwrap_or(false);

        let text = response.text().await.map_err(|e| {
            McpError::internal(format!("{} {} {}: {}", method, path, status.as_u16(), e))
        })?;

        let data = if status == StatusCode::NO_CONTENT {
            Value::Null
        } else if is_json {
            serde_json::from_str(&text).map_err(|e| {
                McpError::internal(format!("{} {} {}: {}", method, path, status.as_u16(), e))
            })?
        } else {
            Value::String(text)
        };

        serde_json::from_value(data.clone()).map_err(|e| {
            error!(
                status = status.as_u16(),
                data = %data,
                "Invalid response from Obsidian API: {}",
                e
            );
            McpError::internal(format!("{} {} {}: {}", method, path, status.as_u16(), e))
        })
    }

    fn build_headers(&self, extra: &[(String, String)]) -> Result<HeaderMap, McpError> {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, header_value(&format!("Bearer {}", self.api_key))?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static(MIME_TYPE_MARKDOWN));

        for (name, value) in extra {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| McpError::internal(format!("Invalid header name {}: {}", name, e)))?;
            headers.insert(name, header_value(value)?);
        }
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, McpError> {
    HeaderValue::from_bytes(value.as_bytes())
        .map_err(|e| McpError::internal(format!("Invalid header value: {}", e)))
}

/// Percent-encode one path segment, slashes included.
pub fn encode_segment(segment: &str) -> String {
    urlencoding::encode(segment).into_owned()
}
