//! MCP server exposing an Obsidian vault through the Local REST API plugin.

pub mod config;
pub mod markdown;
pub mod mcp;
pub mod services;
pub mod template;
pub mod vault;
