//! MCP (Model Context Protocol) server implementation.
//!
//! Provides a JSON-RPC over stdio server that exposes Obsidian vault tools and
//! prompt templates to MCP clients.
//!
//! Architecture:
//! - `server.rs`   -- JSON-RPC protocol handler (stdin/stdout)
//! - `tools.rs`    -- Tool registry, handler trait and dispatch
//! - `contract.rs` -- Declared argument shapes and validation
//! - `coerce.rs`   -- Boolean string coercion ahead of validation
//! - `error.rs`    -- Canonical errors and the normalizer
//! - `prompts.rs`  -- `prompts/list` and `prompts/get`
//! - `handlers/`   -- Tool handler implementations (vault, search, templates, fetch)

pub mod coerce;
pub mod contract;
pub mod error;
pub mod handlers;
pub mod prompts;
pub mod server;
pub mod tools;
