//! Vault storage backends.
//!
//! The pipeline only needs three operations: list every file, read one,
//! write one. [`FsVault`] serves a directory on disk; [`MemoryVault`]
//! keeps files in a map and is used by tests and dry runs.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::RwLock;

use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

use vaultlink_core::error::StorageError;
use vaultlink_core::paths;

/// Access to the files of one vault.
pub trait VaultStorage: Send + Sync {
    /// Every file in the vault as a `/`-separated path relative to the root.
    fn list_all_files(&self) -> Result<Vec<String>, StorageError>;

    /// Read a file as UTF-8 text.
    fn read_file(&self, path: &str) -> Result<String, StorageError>;

    /// Create or replace a file, creating parent folders as needed.
    fn write_file(&self, path: &str, text: &str) -> Result<(), StorageError>;
}

/// Validate a caller-supplied vault path and return its canonical form.
///
/// # Errors
///
/// Returns [`StorageError::InvalidPath`] for absolute paths, paths that
/// climb out of the vault with `..`, and empty or directory paths.
pub fn vault_relative(path: &str) -> Result<String, StorageError> {
    let invalid = || StorageError::InvalidPath(path.to_string());
    let trimmed = path.trim();
    if trimmed.starts_with(['/', '\\']) || Path::new(trimmed).is_absolute() {
        return Err(invalid());
    }
    if trimmed.split(['/', '\\']).any(|part| part == "..") {
        return Err(invalid());
    }
    paths::normalize_vault_path(trimmed).ok_or_else(invalid)
}

/// A vault stored as a directory tree.
#[derive(Debug, Clone)]
pub struct FsVault {
    root: PathBuf,
    ignore: Vec<String>,
}

impl FsVault {
    /// Serve the directory at `root`. Hidden entries are always skipped.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ignore: Vec::new(),
        }
    }

    /// Also skip directories with these names.
    #[must_use]
    pub fn with_ignore(mut self, ignore: Vec<String>) -> Self {
        self.ignore = ignore;
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Absolute location of a vault path.
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidPath`] if the path is not a valid
    /// vault-relative path.
    pub fn full_path(&self, path: &str) -> Result<PathBuf, StorageError> {
        Ok(self.root.join(vault_relative(path)?))
    }

    /// The vault path of an absolute file location, if it lies inside the
    /// vault and outside any skipped directory.
    #[must_use]
    pub fn relative_path(&self, full: &Path) -> Option<String> {
        let relative = full.strip_prefix(&self.root).ok()?;
        let mut parts = Vec::new();
        for component in relative.components() {
            let Component::Normal(part) = component else {
                return None;
            };
            let part = part.to_str()?;
            if self.is_skipped_name(part) {
                return None;
            }
            parts.push(part);
        }
        (!parts.is_empty()).then(|| parts.join("/"))
    }

    fn is_skipped_name(&self, name: &str) -> bool {
        name.starts_with('.') || self.ignore.iter().any(|ignored| ignored == name)
    }

    fn is_skipped(&self, entry: &DirEntry) -> bool {
        entry.depth() > 0
            && entry
                .file_name()
                .to_str()
                .map_or(true, |name| self.is_skipped_name(name))
    }
}

impl VaultStorage for FsVault {
    fn list_all_files(&self) -> Result<Vec<String>, StorageError> {
        if !self.root.is_dir() {
            return Err(StorageError::NotFound(self.root.display().to_string()));
        }

        let mut files = Vec::new();
        for entry in WalkDir::new(&self.root)
            .into_iter()
            .filter_entry(|e| !self.is_skipped(e))
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(err) => {
                    warn!(error = %err, "skipping unreadable vault entry");
                    continue;
                }
            };
            if !entry.file_type().is_file() {
                continue;
            }
            if let Some(path) = self.relative_path(entry.path()) {
                files.push(path);
            }
        }
        files.sort();
        debug!(root = %self.root.display(), count = files.len(), "listed vault files");
        Ok(files)
    }

    fn read_file(&self, path: &str) -> Result<String, StorageError> {
        let full = self.full_path(path)?;
        fs::read_to_string(&full).map_err(|e| StorageError::from_io(path, e))
    }

    fn write_file(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let full = self.full_path(path)?;
        let write_error = |err: std::io::Error| match err.kind() {
            std::io::ErrorKind::PermissionDenied => StorageError::PermissionDenied(path.to_string()),
            _ => StorageError::WriteError {
                path: path.to_string(),
                reason: err.to_string(),
            },
        };
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(&full, text).map_err(write_error)?;
        debug!(path, bytes = text.len(), "wrote vault file");
        Ok(())
    }
}

/// An in-memory vault.
#[derive(Debug, Default)]
pub struct MemoryVault {
    files: RwLock<BTreeMap<String, String>>,
    writes: AtomicUsize,
}

impl MemoryVault {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A vault pre-filled with `(path, text)` pairs.
    pub fn from_files<I, P, T>(files: I) -> Self
    where
        I: IntoIterator<Item = (P, T)>,
        P: Into<String>,
        T: Into<String>,
    {
        let files = files
            .into_iter()
            .map(|(path, text)| (path.into(), text.into()))
            .collect();
        Self {
            files: RwLock::new(files),
            writes: AtomicUsize::new(0),
        }
    }

    /// Current text of a file.
    #[must_use]
    pub fn get(&self, path: &str) -> Option<String> {
        let path = vault_relative(path).ok()?;
        self.files.read().ok()?.get(&path).cloned()
    }

    /// Number of successful writes so far.
    #[must_use]
    pub fn writes(&self) -> usize {
        self.writes.load(Ordering::Relaxed)
    }
}

impl VaultStorage for MemoryVault {
    fn list_all_files(&self) -> Result<Vec<String>, StorageError> {
        let files = self
            .files
            .read()
            .map_err(|_| StorageError::NotFound("memory vault".to_string()))?;
        Ok(files.keys().cloned().collect())
    }

    fn read_file(&self, path: &str) -> Result<String, StorageError> {
        let key = vault_relative(path)?;
        let files = self
            .files
            .read()
            .map_err(|_| StorageError::NotFound(path.to_string()))?;
        files
            .get(&key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(path.to_string()))
    }

    fn write_file(&self, path: &str, text: &str) -> Result<(), StorageError> {
        let key = vault_relative(path)?;
        let mut files = self.files.write().map_err(|_| StorageError::WriteError {
            path: path.to_string(),
            reason: "memory vault lock poisoned".to_string(),
        })?;
        files.insert(key, text.to_string());
        self.writes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vault_relative_rejects_escapes() {
        assert_eq!(vault_relative("./Research/a.md").unwrap(), "Research/a.md");
        assert!(matches!(
            vault_relative("../secrets.md"),
            Err(StorageError::InvalidPath(_))
        ));
        assert!(vault_relative("Research/../../x.md").is_err());
        assert!(vault_relative("/etc/passwd").is_err());
        assert!(vault_relative("Research/").is_err());
        assert!(vault_relative("").is_err());
    }

    #[test]
    fn fs_vault_lists_files_skipping_hidden_and_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::create_dir_all(root.join(".obsidian")).unwrap();
        fs::create_dir_all(root.join("Research")).unwrap();
        fs::create_dir_all(root.join("Templates")).unwrap();
        fs::write(root.join(".obsidian/app.json"), "{}").unwrap();
        fs::write(root.join("Research/article.md"), "# A").unwrap();
        fs::write(root.join("Templates/t.md"), "# T").unwrap();
        fs::write(root.join("inbox.md"), "").unwrap();
        fs::write(root.join(".hidden.md"), "").unwrap();

        let vault = FsVault::new(root).with_ignore(vec!["Templates".to_string()]);
        assert_eq!(
            vault.list_all_files().unwrap(),
            vec!["Research/article.md".to_string(), "inbox.md".to_string()]
        );
    }

    #[test]
    fn fs_vault_reads_and_writes() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path());

        vault.write_file("Projects/Alpha/index.md", "# Alpha\n").unwrap();
        assert_eq!(vault.read_file("Projects/Alpha/index.md").unwrap(), "# Alpha\n");

        let err = vault.read_file("missing.md").unwrap_err();
        assert!(err.is_not_found());

        assert!(matches!(
            vault.write_file("../outside.md", "x"),
            Err(StorageError::InvalidPath(_))
        ));
    }

    #[test]
    fn missing_root_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let vault = FsVault::new(dir.path().join("nope"));
        assert!(vault.list_all_files().unwrap_err().is_not_found());
    }

    #[test]
    fn relative_path_filters_hidden_locations() {
        let vault = FsVault::new("/vault");
        assert_eq!(
            vault.relative_path(Path::new("/vault/Research/a.md")).as_deref(),
            Some("Research/a.md")
        );
        assert_eq!(vault.relative_path(Path::new("/vault/.git/HEAD")), None);
        assert_eq!(vault.relative_path(Path::new("/elsewhere/a.md")), None);
    }

    #[test]
    fn memory_vault_counts_writes() {
        let vault = MemoryVault::from_files([("a.md", "A")]);
        assert_eq!(vault.read_file("./a.md").unwrap(), "A");
        vault.write_file("b/c.md", "C").unwrap();
        assert_eq!(vault.writes(), 1);
        assert_eq!(vault.list_all_files().unwrap(), vec!["a.md", "b/c.md"]);
        assert!(vault.read_file("zzz.md").unwrap_err().is_not_found());
    }
}
