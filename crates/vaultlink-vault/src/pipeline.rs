//! Storage-bound document pipeline.
//!
//! [`DocumentPipeline`] owns a storage backend and the current index
//! snapshot. Reads go through the banner path, writes through the
//! normalization path. Storage errors are returned unchanged.

use serde::Serialize;
use serde_yaml::Mapping;
use tracing::{debug, info};

use vaultlink_core::error::{Result, StorageError};
use vaultlink_core::paths;
use vaultlink_core::pipeline::{self, LinkEntry, NormalizedDocument, PipelineOptions, Presented};
use vaultlink_core::{Document, NormalizeReport, Resolution, VaultIndex};

use crate::storage::{vault_relative, VaultStorage};

const SECTION_RULE_WIDTH: usize = 80;

/// What a write did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WriteOutcome {
    pub path: String,
    /// The file did not exist before.
    pub created: bool,
    #[serde(flatten)]
    pub normalized: NormalizedDocument,
}

/// Normalization result for one file of a vault-wide pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileReport {
    pub path: String,
    pub changed: bool,
    pub front_matter: NormalizeReport,
    pub body: NormalizeReport,
}

/// Result of [`DocumentPipeline::normalize_vault`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultReport {
    pub dry_run: bool,
    pub scanned: usize,
    pub changed: usize,
    pub totals: NormalizeReport,
    /// Files whose bytes changed (or would change).
    pub files: Vec<FileReport>,
}

/// Files linking to one target, with the links that do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Backlink {
    pub source: String,
    pub links: Vec<LinkEntry>,
}

/// Result of [`DocumentPipeline::update_links`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkUpdateReport {
    pub old_path: String,
    pub new_path: String,
    /// What the links were rewritten to.
    pub target: String,
    /// Links rewritten across all files.
    pub links: usize,
    /// Files that were rewritten.
    pub files: Vec<String>,
}

/// Read and write path over one storage backend.
#[derive(Debug)]
pub struct DocumentPipeline<S> {
    storage: S,
    index: VaultIndex,
    options: PipelineOptions,
}

impl<S: VaultStorage> DocumentPipeline<S> {
    /// List the vault and build the first index snapshot.
    ///
    /// # Errors
    ///
    /// Propagates listing failures from the storage backend.
    pub fn open(storage: S, options: PipelineOptions) -> Result<Self> {
        let index = VaultIndex::from_paths(storage.list_all_files()?);
        debug!(files = index.file_count(), version = index.version(), "indexed vault");
        Ok(Self {
            storage,
            index,
            options,
        })
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// The current snapshot.
    pub fn index(&self) -> &VaultIndex {
        &self.index
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    /// Re-list the vault and swap in a new snapshot.
    ///
    /// # Errors
    ///
    /// Propagates listing failures; the old snapshot is kept on error.
    pub fn refresh_index(&mut self) -> Result<&VaultIndex> {
        let index = VaultIndex::from_paths(self.storage.list_all_files()?);
        if index.version() != self.index.version() {
            debug!(files = index.file_count(), "index snapshot replaced");
        }
        self.index = index;
        Ok(&self.index)
    }

    /// Every indexed file path, sorted.
    #[must_use]
    pub fn list_files(&self) -> Vec<String> {
        let mut files: Vec<String> = self.index.paths().map(str::to_string).collect();
        files.sort();
        files
    }

    /// Read a file through the banner path. Stored bytes are not changed.
    ///
    /// # Errors
    ///
    /// Propagates storage errors such as [`StorageError::NotFound`].
    pub fn read(&self, path: &str) -> Result<Presented> {
        let raw = self.storage.read_file(path)?;
        Ok(pipeline::present(&raw, &self.index, &self.options))
    }

    /// Read several files into one text, each under a `FILE:` header.
    ///
    /// A file that cannot be read gets an error line; the rest are still
    /// read.
    #[must_use]
    pub fn read_batch<P: AsRef<str>>(&self, files: &[P]) -> String {
        let rule = "=".repeat(SECTION_RULE_WIDTH);
        let mut parts: Vec<String> = Vec::new();
        for path in files {
            let path = path.as_ref();
            parts.push(format!("\n{rule}"));
            parts.push(format!("FILE: {path}"));
            parts.push(rule.clone());
            match self.read(path) {
                Ok(presented) => {
                    if let Some(banner) = presented.banner {
                        parts.push(banner);
                    }
                    parts.push(presented.content);
                }
                Err(err) => parts.push(format!("Error reading file: {err}")),
            }
        }
        parts.join("\n")
    }

    /// Normalize `content` and store it at `path`.
    ///
    /// A path that is not yet indexed is added to the snapshot, so links
    /// to it from elsewhere resolve from now on.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for paths outside the vault
    /// and propagates write failures.
    pub fn write(&mut self, path: &str, content: &str) -> Result<WriteOutcome> {
        let path = vault_relative(path)?;
        let created = !self.index.contains_path(&path);
        let index = if created {
            self.index.with_path(&path)
        } else {
            self.index.clone()
        };

        let normalized = pipeline::normalize_document(content, &index, &self.options);
        self.storage.write_file(&path, &normalized.text)?;
        if created {
            self.index = index;
        }
        info!(path = %path, created, rewritten = normalized.report().rewritten, "stored document");
        Ok(WriteOutcome {
            path,
            created,
            normalized,
        })
    }

    /// Append `content` to a file, creating it if missing.
    ///
    /// # Errors
    ///
    /// Propagates storage errors other than a missing file.
    pub fn append(&mut self, path: &str, content: &str) -> Result<WriteOutcome> {
        let mut text = self.read_existing(path)?.unwrap_or_default();
        text.push_str(content);
        self.write(path, &text)
    }

    /// The front-matter mapping of a file; empty without front matter.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn front_matter(&self, path: &str) -> Result<Mapping> {
        let raw = self.storage.read_file(path)?;
        Ok(Document::parse(&raw).fields().cloned().unwrap_or_default())
    }

    /// Merge `updates` into a file's front matter and store it.
    ///
    /// # Errors
    ///
    /// Propagates storage errors, including [`StorageError::NotFound`].
    pub fn update_front_matter(&mut self, path: &str, updates: Mapping) -> Result<WriteOutcome> {
        let raw = self.storage.read_file(path)?;
        let mut doc = Document::parse(&raw);
        doc.update_fields(updates)?;
        self.write(path, &doc.to_markdown())
    }

    /// Remove one front-matter key; returns whether it was present.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn delete_front_matter_field(&mut self, path: &str, key: &str) -> Result<bool> {
        let raw = self.storage.read_file(path)?;
        let mut doc = Document::parse(&raw);
        if !doc.remove_field(key)? {
            return Ok(false);
        }
        self.write(path, &doc.to_markdown())?;
        Ok(true)
    }

    /// Every link in a file, classified against the current snapshot.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn links(&self, path: &str) -> Result<Vec<LinkEntry>> {
        let raw = self.storage.read_file(path)?;
        Ok(pipeline::link_report(&raw, &self.index))
    }

    /// Files whose links resolve to `path`, sorted by source path.
    ///
    /// A path that is not indexed (deleted, or not yet created) is looked
    /// up as if it existed.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for paths outside the vault
    /// and stops at the first read failure.
    pub fn backlinks(&self, path: &str) -> Result<Vec<Backlink>> {
        let target = vault_relative(path)?;
        let index = if self.index.contains_path(&target) {
            self.index.clone()
        } else {
            self.index.with_path(&target)
        };

        let mut found = Vec::new();
        for source in self.list_files() {
            if source == target || !paths::is_markdown_path(&source) {
                continue;
            }
            let raw = self.storage.read_file(&source)?;
            let links: Vec<LinkEntry> = pipeline::link_report(&raw, &index)
                .into_iter()
                .filter(|entry| entry.path.as_deref() == Some(target.as_str()))
                .collect();
            if !links.is_empty() {
                found.push(Backlink { source, links });
            }
        }
        debug!(path = %target, sources = found.len(), "collected backlinks");
        Ok(found)
    }

    /// Rewrite every link to `old_path` so it points at `new_path`.
    ///
    /// Files are not moved; call this before or after moving the file
    /// itself. Links use the new file's name, or its full vault path when
    /// that name is shared with another file. Changed files go through
    /// [`DocumentPipeline::write`].
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] for paths outside the vault
    /// and propagates storage errors.
    pub fn update_links(&mut self, old_path: &str, new_path: &str) -> Result<LinkUpdateReport> {
        let old_path = vault_relative(old_path)?;
        let new_path = vault_relative(new_path)?;
        let before = self.index.without_path(&new_path).with_path(&old_path);
        let after = self.index.without_path(&old_path).with_path(&new_path);
        let target = match paths::index_key(&new_path) {
            Some(name) if after.resolve(name) == Resolution::Unique(new_path.as_str()) => {
                name.to_string()
            }
            _ => new_path.clone(),
        };

        let mut report = LinkUpdateReport {
            old_path: old_path.clone(),
            new_path: new_path.clone(),
            target: target.clone(),
            ..LinkUpdateReport::default()
        };
        for source in self.list_files() {
            if !paths::is_markdown_path(&source) {
                continue;
            }
            let raw = self.storage.read_file(&source)?;
            let retargeted = pipeline::retarget_document(&raw, &before, &old_path, &target);
            let count = retargeted.report().rewritten;
            if count == 0 || retargeted.text == raw {
                continue;
            }
            self.write(&source, &retargeted.text)?;
            report.links += count;
            report.files.push(source);
        }
        info!(
            old = %old_path,
            new = %new_path,
            files = report.files.len(),
            links = report.links,
            "updated links"
        );
        Ok(report)
    }

    /// Normalize one stored file, writing only if its bytes change.
    ///
    /// # Errors
    ///
    /// Propagates storage errors.
    pub fn normalize_file(&mut self, path: &str, dry_run: bool) -> Result<FileReport> {
        let raw = self.storage.read_file(path)?;
        let normalized = pipeline::normalize_document(&raw, &self.index, &self.options);
        let changed = normalized.text != raw;
        if changed && !dry_run {
            self.storage.write_file(path, &normalized.text)?;
            info!(path, rewritten = normalized.report().rewritten, "normalized document");
        }
        Ok(FileReport {
            path: path.to_string(),
            changed,
            front_matter: normalized.front_matter,
            body: normalized.body,
        })
    }

    /// Normalize every markdown file in the snapshot.
    ///
    /// # Errors
    ///
    /// Stops at the first storage error.
    pub fn normalize_vault(&mut self, dry_run: bool) -> Result<VaultReport> {
        let targets: Vec<String> = self
            .list_files()
            .into_iter()
            .filter(|p| paths::is_markdown_path(p))
            .collect();

        let mut report = VaultReport {
            dry_run,
            ..VaultReport::default()
        };
        for path in targets {
            let file = self.normalize_file(&path, dry_run)?;
            report.scanned += 1;
            report.totals += file.front_matter;
            report.totals += file.body;
            if file.changed {
                report.changed += 1;
                report.files.push(file);
            }
        }
        info!(
            scanned = report.scanned,
            changed = report.changed,
            dry_run,
            "vault normalization finished"
        );
        Ok(report)
    }

    fn read_existing(&self, path: &str) -> Result<Option<String>> {
        match self.storage.read_file(path) {
            Ok(text) => Ok(Some(text)),
            Err(StorageError::NotFound(_)) => Ok(None),
            Err(err) => Err(err.into()),
        }
    }
}
