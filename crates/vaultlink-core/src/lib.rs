//! # vaultlink-core
//!
//! Pure document transformations for markdown vaults.
//!
//! This crate holds everything that does not touch storage:
//! - [`frontmatter`]: lossless split and join of the YAML block
//! - [`VaultIndex`]: immutable, versioned snapshot of vault names
//! - [`scan`]: tokenizer for links, code and path mentions
//! - [`normalize`]: canonical link rewriting ([`LinkNormalizer`])
//! - [`directive`]: behavioral keys ([`DirectiveRecord`])
//! - [`banner`]: the instruction banner shown on read
//! - [`pipeline`]: read- and write-path transformations
//! - [`VaultlinkConfig`]: `.vaultlink.toml`
//! - Error hierarchy ([`VaultlinkError`], [`StorageError`])

pub mod banner;
pub mod config;
pub mod directive;
pub mod error;
pub mod frontmatter;
pub mod index;
pub mod normalize;
pub mod paths;
pub mod pipeline;
pub mod scan;

pub use config::VaultlinkConfig;
pub use directive::DirectiveRecord;
pub use error::{Result, StorageError, VaultlinkError};
pub use frontmatter::{Document, FrontMatter};
pub use index::{Resolution, VaultIndex};
pub use normalize::{normalize, LinkNormalizer, LinkRetargeter, LinkStatus, NormalizeReport};
pub use pipeline::{NormalizedDocument, PipelineOptions, Presented};
