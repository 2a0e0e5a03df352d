//! # vaultlink-mcp
//!
//! MCP (Model Context Protocol) server for a markdown vault.
//!
//! Reads show front-matter directives as a banner; writes canonicalize links.
//! Exposed tools:
//! - `vault_list_files`: List every vault file
//! - `vault_get_file_contents`: Read a file, banner first
//! - `vault_batch_get_file_contents`: Read several files at once
//! - `vault_put_content`: Create or replace a file
//! - `vault_append_content`: Append to a file
//! - `vault_get_frontmatter` / `vault_update_frontmatter` / `vault_delete_frontmatter_field`
//! - `vault_get_links`: Links in a file with their resolution status
//! - `vault_get_backlinks`: Files linking to a file
//! - `vault_update_links`: Repoint links after a file moves
//! - `vault_normalize`: Vault-wide link normalization (dry run by default)
//! - `vault_create_project` / `vault_create_daily_progress`: Project scaffolding

pub mod tools;

pub use tools::VaultlinkMcpService;
