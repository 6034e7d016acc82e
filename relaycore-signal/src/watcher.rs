//! Optional filesystem watcher: watches the directory containing the
//! config file and posts a [`SignalEvent::Reload`] through the same queue
//! signals feed whenever the config file itself (or the `..data` symlink
//! sentinel some orchestrators swap atomically, e.g. Kubernetes
//! ConfigMap mounts) changes. Failure to set this up is non-fatal — the
//! server just runs without auto-reload-on-edit.

use crate::event::SignalEvent;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use relaycore_error::{core_err, CoreError, ErrorKind};
use std::path::{Path, PathBuf};
use tokio::sync::mpsc::UnboundedSender;

/// Starts watching. The returned watcher must be kept alive for as long as
/// watching should continue — dropping it stops delivery.
pub fn spawn_watcher(config_path: &Path, tx: UnboundedSender<SignalEvent>) -> Result<RecommendedWatcher, CoreError> {
    let watched_path = config_path.to_path_buf();
    let dir = watched_path.parent().map(Path::to_path_buf).unwrap_or_else(|| PathBuf::from("."));
    let basename = watched_path.file_name().map(|n| n.to_os_string());

    let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
        let Ok(event) = res else { return };
        if !matches!(event.kind, EventKind::Modify(_) | EventKind::Create(_)) {
            return;
        }
        let touched = event.paths.iter().any(|p| match p.file_name() {
            Some(name) => Some(name.to_os_string()) == basename || name.to_string_lossy() == "..data",
            None => false,
        });
        if touched && watched_path.exists() {
            let _ = tx.send(SignalEvent::Reload);
        }
    })
    .map_err(|e| core_err!(ErrorKind::InotifyCreate, "failed creating filesystem watcher: {e}"))?;

    watcher
        .watch(&dir, RecursiveMode::NonRecursive)
        .map_err(|e| core_err!(ErrorKind::InotifyWatch, "failed watching directory '{}': {e}", dir.display()))?;

    Ok(watcher)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn editing_the_config_file_posts_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaycore.conf");
        std::fs::write(&path, "listen 1935;\n").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _watcher = spawn_watcher(&path, tx).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(&path, "listen 1936;\n").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv()).await;
        assert_eq!(event.unwrap(), Some(SignalEvent::Reload));
    }

    #[tokio::test]
    async fn editing_an_unrelated_file_is_ignored() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaycore.conf");
        std::fs::write(&path, "listen 1935;\n").unwrap();

        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let _watcher = spawn_watcher(&path, tx).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        std::fs::write(dir.path().join("unrelated.txt"), "noise").unwrap();

        let event = tokio::time::timeout(Duration::from_millis(500), rx.recv()).await;
        assert!(event.is_err(), "unrelated file change should not trigger reload");
    }
}
