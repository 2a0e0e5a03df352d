//! Vault index: an immutable snapshot of which names exist in the vault.
//!
//! The index answers one question for the normalizer: does a file with
//! this name exist, and is it unique? Snapshots are never mutated; a
//! refresh builds a new one. Every snapshot carries a version fingerprint
//! derived from its path listing.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use sha2::{Digest, Sha256};

use crate::paths;

/// Result of looking a name up in a [`VaultIndex`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution<'a> {
    /// No file carries this name.
    Missing,
    /// Exactly one file carries this name.
    Unique(&'a str),
    /// Several files in different folders share this name.
    Ambiguous(Vec<&'a str>),
}

/// Snapshot mapping note names to the vault paths that carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct VaultIndex {
    names: BTreeMap<String, BTreeSet<String>>,
    version: String,
}

impl VaultIndex {
    /// Build a snapshot from a full vault listing.
    ///
    /// Directory entries and empty paths are ignored.
    pub fn from_paths<I, S>(listing: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut names: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();
        for path in listing {
            let Some(path) = paths::normalize_vault_path(path.as_ref()) else {
                continue;
            };
            let Some(key) = paths::index_key(&path) else {
                continue;
            };
            names.entry(key.to_string()).or_default().insert(path);
        }
        let version = fingerprint(&names);
        Self { names, version }
    }

    /// A new snapshot that also contains `path`.
    #[must_use]
    pub fn with_path(&self, path: &str) -> Self {
        Self::from_paths(self.paths().chain(std::iter::once(path)))
    }

    /// A new snapshot without `path`.
    #[must_use]
    pub fn without_path(&self, path: &str) -> Self {
        let removed = paths::normalize_vault_path(path);
        Self::from_paths(self.paths().filter(|p| Some(*p) != removed.as_deref()))
    }

    /// Look up a note name (case as stored, no extension).
    #[must_use]
    pub fn resolve(&self, name: &str) -> Resolution<'_> {
        match self.names.get(name) {
            None => Resolution::Missing,
            Some(paths) if paths.len() == 1 => match paths.iter().next() {
                Some(path) => Resolution::Unique(path),
                None => Resolution::Missing,
            },
            Some(paths) => Resolution::Ambiguous(paths.iter().map(String::as_str).collect()),
        }
    }

    /// Look up a path as written in prose: a full vault path, or a tail of
    /// one (`Alpha/index.md` for `Projects/Alpha/index.md`). Only whole
    /// `/`-separated components match.
    #[must_use]
    pub fn resolve_path(&self, path: &str) -> Resolution<'_> {
        let Some(candidate) = paths::prose_path(path) else {
            return Resolution::Missing;
        };
        let Some(key) = paths::index_key(&candidate) else {
            return Resolution::Missing;
        };
        let suffix = format!("/{candidate}");
        let mut matches: Vec<&str> = self
            .paths_for(key)
            .filter(|p| *p == candidate || p.ends_with(&suffix))
            .collect();
        match matches.len() {
            0 => Resolution::Missing,
            1 => Resolution::Unique(matches.remove(0)),
            _ => Resolution::Ambiguous(matches),
        }
    }

    /// Every path sharing `name`, in sorted order.
    pub fn paths_for(&self, name: &str) -> impl Iterator<Item = &str> {
        self.names
            .get(name)
            .into_iter()
            .flat_map(|paths| paths.iter().map(String::as_str))
    }

    /// Returns `true` if the exact vault path is part of the snapshot.
    #[must_use]
    pub fn contains_path(&self, path: &str) -> bool {
        let Some(path) = paths::normalize_vault_path(path) else {
            return false;
        };
        paths::index_key(&path)
            .and_then(|key| self.names.get(key))
            .is_some_and(|paths| paths.contains(&path))
    }

    /// All indexed paths, grouped by name.
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.names
            .values()
            .flat_map(|paths| paths.iter().map(String::as_str))
    }

    /// Indexed markdown documents.
    pub fn markdown_paths(&self) -> impl Iterator<Item = &str> {
        self.paths().filter(|p| paths::is_markdown_path(p))
    }

    /// Number of distinct names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Number of indexed files.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.names.values().map(BTreeSet::len).sum()
    }

    /// Names shared by more than one file.
    pub fn ambiguous_names(&self) -> impl Iterator<Item = &str> {
        self.names
            .iter()
            .filter(|(_, paths)| paths.len() > 1)
            .map(|(name, _)| name.as_str())
    }

    /// Hex SHA-256 of the sorted path listing.
    #[must_use]
    pub fn version(&self) -> &str {
        &self.version
    }
}

fn fingerprint(names: &BTreeMap<String, BTreeSet<String>>) -> String {
    let all: BTreeSet<&str> = names
        .values()
        .flat_map(|paths| paths.iter().map(String::as_str))
        .collect();
    let mut hasher = Sha256::new();
    for path in all {
        hasher.update(path.as_bytes());
        hasher.update(b"\n");
    }
    format!("{:x}", hasher.finalize())
}
