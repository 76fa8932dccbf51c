//! Tool registry: binds contracts to handlers and dispatches `tools/call`.
//!
//! Dispatch flow for one request:
//! 1. find the first enabled binding with the requested name
//! 2. coerce `"true"`/`"false"` strings on declared boolean fields
//! 3. validate name and arguments against the contract
//! 4. run the handler, catching both errors and panics
//! 5. normalize any failure, log it with the request, and return it

use std::collections::HashSet;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use super::coerce::coerce_booleans;
use super::contract::ToolContract;
use super::error::{normalize, normalize_panic, McpError};
use super::handlers::McpToolResult;
use crate::vault::VaultClient;

/// A `tools/call` request after the transport has unpacked it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequest {
    pub name: String,
    #[serde(default = "empty_arguments")]
    pub arguments: Value,
}

impl ToolRequest {
    pub fn new(name: impl Into<String>, arguments: Value) -> Self {
        Self {
            name: name.into(),
            arguments,
        }
    }
}

fn empty_arguments() -> Value {
    Value::Object(Default::default())
}

/// Ambient collaborators handed to every handler.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    vault: Arc<VaultClient>,
    http: reqwest::Client,
}

impl HandlerContext {
    pub fn new(vault: VaultClient, http: reqwest::Client) -> Self {
        Self {
            vault: Arc::new(vault),
            http,
        }
    }

    /// Local REST API client.
    pub fn vault(&self) -> &VaultClient {
        &self.vault
    }

    /// General-purpose HTTP client for outbound fetches.
    pub fn http(&self) -> &reqwest::Client {
        &self.http
    }
}

/// An async tool implementation.
///
/// Implemented for any `Fn(ToolRequest, HandlerContext) -> Future` so plain
/// async functions register directly.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(&self, request: ToolRequest, context: HandlerContext) -> anyhow::Result<McpToolResult>;
}

#[async_trait]
impl<F, Fut> ToolHandler for F
where
    F: Fn(ToolRequest, HandlerContext) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<McpToolResult>> + Send + 'static,
{
    async fn call(&self, request: ToolRequest, context: HandlerContext) -> anyhow::Result<McpToolResult> {
        (self)(request, context).await
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    AlreadyRegistered(String),
}

/// One entry of `tools/list`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

struct Binding {
    contract: Arc<ToolContract>,
    handler: Arc<dyn ToolHandler>,
}

/// Ordered contract/handler bindings plus the set of enabled names.
#[derive(Default)]
pub struct ToolRegistry {
    bindings: Vec<Binding>,
    enabled: HashSet<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a handler to a contract and enable it.
    pub fn register<H>(&mut self, contract: ToolContract, handler: H) -> Result<(), RegistryError>
    where
        H: ToolHandler + 'static,
    {
        if self.bindings.iter().any(|b| b.contract.name == contract.name) {
            return Err(RegistryError::AlreadyRegistered(contract.name));
        }
        self.enabled.insert(contract.name.clone());
        self.bindings.push(Binding {
            contract: Arc::new(contract),
            handler: Arc::new(handler),
        });
        Ok(())
    }

    pub fn enable(&mut self, name: &str) {
        if self.bindings.iter().any(|b| b.contract.name == name) {
            self.enabled.insert(name.to_string());
        }
    }

    pub fn disable(&mut self, name: &str) {
        self.enabled.remove(name);
    }

    pub fn is_enabled(&self, name: &str) -> bool {
        self.enabled.contains(name)
    }

    /// Enabled tools in registration order.
    pub fn list(&self) -> Vec<ToolDescriptor> {
        self.bindings
            .iter()
            .filter(|b| self.enabled.contains(&b.contract.name))
            .map(|b| ToolDescriptor {
                name: b.contract.name.clone(),
                description: b.contract.description.clone(),
                input_schema: b.contract.arguments.json_schema(),
            })
            .collect()
    }

    fn resolve(&self, name: &str) -> Option<(Arc<ToolContract>, Arc<dyn ToolHandler>)> {
        if !self.enabled.contains(name) {
            return None;
        }
        self.bindings
            .iter()
            .find(|b| b.contract.name == name)
            .map(|b| (b.contract.clone(), b.handler.clone()))
    }

    /// Validate and run one request.
    pub async fn dispatch(
        &self,
        request: ToolRequest,
        context: HandlerContext,
    ) -> Result<McpToolResult, McpError> {
        let resolved = self.resolve(&request.name);
        run(resolved, request, context).await
    }
}

/// A registry shared between concurrent dispatches and runtime toggles.
///
/// The lock only covers lookups and toggles. It is released before the
/// handler runs.
#[derive(Clone, Default)]
pub struct SharedToolRegistry {
    inner: Arc<RwLock<ToolRegistry>>,
}

impl SharedToolRegistry {
    pub fn new(registry: ToolRegistry) -> Self {
        Self {
            inner: Arc::new(RwLock::new(registry)),
        }
    }

    pub fn enable(&self, name: &str) {
        match self.inner.write() {
            Ok(mut registry) => registry.enable(name),
            Err(poisoned) => poisoned.into_inner().enable(name),
        }
    }

    pub fn disable(&self, name: &str) {
        match self.inner.write() {
            Ok(mut registry) => registry.disable(name),
            Err(poisoned) => poisoned.into_inner().disable(name),
        }
    }

    pub fn list(&self) -> Vec<ToolDescriptor> {
        match self.inner.read() {
            Ok(registry) => registry.list(),
            Err(poisoned) => poisoned.into_inner().list(),
        }
    }

    pub async fn dispatch(
        &self,
        request: ToolRequest,
        context: HandlerContext,
    ) -> Result<McpToolResult, McpError> {
        let resolved = self.resolve(&request.name);
        run(resolved, request, context).await
    }

    fn resolve(&self, name: &str) -> Option<(Arc<ToolContract>, Arc<dyn ToolHandler>)> {
        match self.inner.read() {
            Ok(registry) => registry.resolve(name),
            Err(poisoned) => poisoned.into_inner().resolve(name),
        }
    }
}

async fn run(
    resolved: Option<(Arc<ToolContract>, Arc<dyn ToolHandler>)>,
    request: ToolRequest,
    context: HandlerContext,
) -> Result<McpToolResult, McpError> {
    debug!(tool = %request.name, "Handling tool call");
    let original = request.clone();

    let outcome = match resolved {
        None => Err(McpError::unknown_tool(&request.name)),
        Some((contract, handler)) => invoke(&contract, handler.as_ref(), request, context).await,
    };

    if let Err(err) = &outcome {
        error!(
            tool = %original.name,
            arguments = %original.arguments,
            code = err.code.as_i64(),
            data = ?err.data,
            "Error handling {}: {}",
            original.name,
            err.message
        );
    }
    outcome
}

async fn invoke(
    contract: &ToolContract,
    handler: &dyn ToolHandler,
    request: ToolRequest,
    context: HandlerContext,
) -> Result<McpToolResult, McpError> {
    let ToolRequest { name, mut arguments } = request;
    coerce_booleans(&contract.arguments, &mut arguments);
    contract.validate(&name, &arguments)?;

    let request = ToolRequest { name, arguments };
    match AssertUnwindSafe(handler.call(request, context)).catch_unwind().await {
        Ok(Ok(result)) => Ok(result),
        Ok(Err(err)) => Err(normalize(err)),
        Err(panic) => Err(normalize_panic(panic)),
    }
}
