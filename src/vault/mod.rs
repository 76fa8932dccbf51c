//! Obsidian Local REST API access.

pub mod client;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use client::{encode_segment, RequestInit, VaultClient};
