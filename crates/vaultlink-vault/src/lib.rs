//! # vaultlink-vault
//!
//! Storage-bound side of vaultlink.
//!
//! The vault is the source of truth; the index is a snapshot derived from
//! its listing and rebuilt on demand.
//! - [`VaultStorage`] with [`FsVault`] and [`MemoryVault`]
//! - [`DocumentPipeline`]: read, write, append and front-matter editing
//! - [`VaultWatcher`]: change events for refreshing the snapshot
//! - [`templates`]: project scaffolds and daily progress notes

pub mod pipeline;
pub mod storage;
pub mod templates;
pub mod watcher;

pub use pipeline::{
    Backlink, DocumentPipeline, FileReport, LinkUpdateReport, VaultReport, WriteOutcome,
};
pub use storage::{FsVault, MemoryVault, VaultStorage};
pub use templates::{CreatedPaths, ProjectTemplate};
pub use watcher::{VaultEvent, VaultWatcher};
