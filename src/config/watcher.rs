//! Hot reload of the service configuration file.
//!
//! The watch is placed on the file's directory, not the file. Editors and
//! deploy tools usually save by writing a sibling and renaming it over the
//! original, which replaces the inode a file-level watch is attached to.
//! Events are filtered down to the configured file name, and a reload is only
//! attempted while the file exists (a remove or rename-away is followed by the
//! create or rename-in that brings the new version).

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Config, Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::config::loader::load_config;
use crate::config::schema::AppConfig;

pub struct ConfigWatcher {
    path: PathBuf,
    dir: PathBuf,
    file_name: OsString,
    update_tx: mpsc::UnboundedSender<AppConfig>,
}

impl ConfigWatcher {
    /// Returns the watcher and the receiver that gets every successful reload.
    pub fn new(path: &Path) -> (Self, mpsc::UnboundedReceiver<AppConfig>) {
        let (update_tx, update_rx) = mpsc::unbounded_channel();
        let dir = match path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        let file_name = path.file_name().map(OsString::from).unwrap_or_default();

        let watcher = Self {
            path: path.to_path_buf(),
            dir,
            file_name,
            update_tx,
        };
        (watcher, update_rx)
    }

    /// Whether `event` may have produced a new version of the file.
    fn touches_file(&self, event: &Event) -> bool {
        let kind_matches = matches!(event.kind, EventKind::Create(_) | EventKind::Modify(_) | EventKind::Any);
        kind_matches
            && event
                .paths
                .iter()
                .any(|p| p.file_name() == Some(self.file_name.as_os_str()))
    }

    fn reload(&self) {
        if !self.path.exists() {
            tracing::debug!(path = ?self.path, "Config file replaced, waiting for the new version");
            return;
        }
        match load_config(&self.path) {
            Ok(config) => {
                tracing::info!(path = ?self.path, "Service config reloaded");
                let _ = self.update_tx.send(config);
            }
            Err(e) => {
                tracing::error!(path = ?self.path, error = %e, "Reload failed, keeping current config");
            }
        }
    }

    /// Start watching. The returned handle must be kept alive.
    pub fn run(self) -> Result<RecommendedWatcher, notify::Error> {
        let dir = self.dir.clone();
        let path = self.path.clone();

        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) if self.touches_file(&event) => self.reload(),
                Ok(_) => {}
                Err(e) => tracing::error!(error = ?e, "Config watch error"),
            },
            Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?path, dir = ?dir, "Config watcher started");
        Ok(watcher)
    }
}
