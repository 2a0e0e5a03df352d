//! Error types for vaultlink.
//!
//! Only storage and configuration problems surface as errors. Malformed
//! front matter and unresolvable links are recovered locally by the
//! splitter and the normalizer and never reach this hierarchy.

use thiserror::Error;

/// Top-level result type for vaultlink operations.
pub type Result<T> = std::result::Result<T, VaultlinkError>;

/// Top-level error type for vaultlink.
#[derive(Debug, Error)]
pub enum VaultlinkError {
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("config error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("invalid input: {0}")]
    InvalidInput(String),
}

/// Failures reported by a vault storage backend.
///
/// These are propagated unchanged to the caller; nothing in vaultlink
/// retries them.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file not found: {0}")]
    NotFound(String),

    #[error("failed to write '{path}': {reason}")]
    WriteError { path: String, reason: String },

    #[error("permission denied: {0}")]
    PermissionDenied(String),

    #[error("invalid vault path '{0}': paths must be relative and stay inside the vault")]
    InvalidPath(String),

    #[error("io failure on '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl StorageError {
    /// Map an I/O error raised while touching `path` onto the storage taxonomy.
    pub fn from_io(path: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(path.to_string()),
            _ => Self::Io {
                path: path.to_string(),
                source: err,
            },
        }
    }

    /// Returns `true` for [`StorageError::NotFound`].
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_display_human_readable_messages() {
        let err = StorageError::NotFound("Research/article.md".to_string());
        assert!(err.to_string().contains("Research/article.md"));

        let err = StorageError::WriteError {
            path: "notes/a.md".to_string(),
            reason: "disk full".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("notes/a.md"));
        assert!(msg.contains("disk full"));

        let err: VaultlinkError = StorageError::InvalidPath("../x.md".to_string()).into();
        assert!(err.to_string().starts_with("storage error:"));
    }

    #[test]
    fn io_errors_map_onto_storage_taxonomy() {
        let not_found = std::io::Error::from(std::io::ErrorKind::NotFound);
        assert!(StorageError::from_io("a.md", not_found).is_not_found());

        let denied = std::io::Error::from(std::io::ErrorKind::PermissionDenied);
        assert!(matches!(
            StorageError::from_io("a.md", denied),
            StorageError::PermissionDenied(_)
        ));

        let other = std::io::Error::other("boom");
        assert!(matches!(
            StorageError::from_io("a.md", other),
            StorageError::Io { .. }
        ));
    }
}
