//! File system watcher for keeping the index snapshot current.
//!
//! Uses the `notify` crate for cross-platform file system events
//! (FSEvents on macOS, inotify on Linux, ReadDirectoryChanges on Windows).
//! Events are reported as vault-relative paths.

use std::path::Path;
use std::sync::mpsc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, warn};

use vaultlink_core::error::VaultlinkError;

use crate::storage::FsVault;

/// Events emitted by the vault watcher.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VaultEvent {
    /// A file was created or modified.
    Changed(String),
    /// A file was deleted.
    Removed(String),
}

impl VaultEvent {
    /// The vault path the event is about.
    #[must_use]
    pub fn path(&self) -> &str {
        match self {
            Self::Changed(path) | Self::Removed(path) => path,
        }
    }
}

/// Watches a vault directory for file changes and emits events.
pub struct VaultWatcher {
    _watcher: RecommendedWatcher,
    receiver: mpsc::Receiver<VaultEvent>,
}

impl VaultWatcher {
    /// Start watching the directory behind `vault`.
    ///
    /// Files in hidden or ignored directories produce no events.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Io`] if the watcher cannot be created.
    pub fn start(vault: &FsVault) -> Result<Self, VaultlinkError> {
        let (tx, rx) = mpsc::channel();
        let filter = vault.clone();

        let mut watcher = notify::recommended_watcher(move |res: Result<Event, notify::Error>| {
            let event = match res {
                Ok(event) => event,
                Err(err) => {
                    warn!(error = %err, "file watcher error");
                    return;
                }
            };
            for path in &event.paths {
                let Some(relative) = filter.relative_path(path) else {
                    continue;
                };
                let vault_event = match event.kind {
                    EventKind::Create(_) | EventKind::Modify(_) => {
                        if !path.is_file() {
                            continue;
                        }
                        VaultEvent::Changed(relative)
                    }
                    EventKind::Remove(_) => VaultEvent::Removed(relative),
                    _ => continue,
                };
                debug!(?vault_event, "vault change");
                let _ = tx.send(vault_event);
            }
        })
        .map_err(|e| VaultlinkError::Io(std::io::Error::other(e)))?;

        watcher
            .watch(vault.root(), RecursiveMode::Recursive)
            .map_err(|e| VaultlinkError::Io(std::io::Error::other(e)))?;

        Ok(Self {
            _watcher: watcher,
            receiver: rx,
        })
    }

    /// Watch a directory with no extra ignore list.
    ///
    /// # Errors
    ///
    /// Returns [`VaultlinkError::Io`] if the watcher cannot be created.
    pub fn start_at(root: &Path) -> Result<Self, VaultlinkError> {
        Self::start(&FsVault::new(root))
    }

    /// Try to receive the next event with a timeout.
    ///
    /// Returns `None` if no event is available within the timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<VaultEvent> {
        self.receiver.recv_timeout(timeout).ok()
    }

    /// Try to receive the next event without blocking.
    pub fn try_recv(&self) -> Option<VaultEvent> {
        self.receiver.try_recv().ok()
    }

    /// Collect events arriving within `window` after the first one.
    ///
    /// Editors often emit several events per save; draining them together
    /// lets the caller refresh once.
    pub fn recv_batch(&self, timeout: Duration, window: Duration) -> Vec<VaultEvent> {
        let Some(first) = self.recv_timeout(timeout) else {
            return Vec::new();
        };
        let mut events = vec![first];
        while let Some(event) = self.recv_timeout(window) {
            if !events.contains(&event) {
                events.push(event);
            }
        }
        events
    }
}
