//! Translates POSIX signals into [`SignalEvent`]s delivered over a single
//! channel. Each signal kind gets its own `tokio::signal::unix` stream and
//! a small forwarding task — `tokio`/`mio` own the actual async-signal-safe
//! handler (a self-pipe write) underneath, so nothing here runs inside a
//! real signal handler.

use crate::event::SignalEvent;
use relaycore_error::{core_err, CoreError, ErrorKind};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;

pub struct SignalController {
    rx: mpsc::UnboundedReceiver<SignalEvent>,
}

impl SignalController {
    /// Installs handlers for every signal spec names (`SIGHUP`, `SIGUSR1`,
    /// `SIGQUIT`, `SIGTERM`, `SIGINT`). `force_grace_quit` remaps
    /// `SIGTERM`'s default fast-quit to graceful-quit. `SIGABRT` is not
    /// installed here — it is this process's own intentional exit path,
    /// see [`abort_for_coredump`]. `SIGUSR2` is reserved and not wired to
    /// any event.
    ///
    /// Returns the controller plus a cloneable sender so callers (the
    /// filesystem watcher, a `PersistConfig` trigger from the HTTP API)
    /// can post events into the same queue.
    pub fn spawn(force_grace_quit: bool) -> Result<(Self, mpsc::UnboundedSender<SignalEvent>), CoreError> {
        let (tx, rx) = mpsc::unbounded_channel();

        spawn_one("SIGHUP", SignalKind::hangup(), SignalEvent::Reload, tx.clone())?;
        spawn_one("SIGUSR1", SignalKind::user_defined1(), SignalEvent::ReopenLog, tx.clone())?;
        spawn_one("SIGQUIT", SignalKind::quit(), SignalEvent::GracefulQuit, tx.clone())?;

        let term_event = if force_grace_quit { SignalEvent::GracefulQuit } else { SignalEvent::FastQuit };
        spawn_one("SIGTERM", SignalKind::terminate(), term_event, tx.clone())?;
        spawn_one("SIGINT", SignalKind::interrupt(), SignalEvent::FastQuit, tx.clone())?;

        Ok((Self { rx }, tx))
    }

    /// Waits indefinitely for the next event — signal reads never time out.
    pub async fn recv(&mut self) -> Option<SignalEvent> {
        self.rx.recv().await
    }
}

fn spawn_one(
    label: &'static str,
    kind: SignalKind,
    event: SignalEvent,
    tx: mpsc::UnboundedSender<SignalEvent>,
) -> Result<(), CoreError> {
    let mut stream = signal(kind)
        .map_err(|e| core_err!(ErrorKind::SystemAssertFailed, "failed installing {label} handler: {e}"))?;
    tokio::spawn(async move {
        while stream.recv().await.is_some() {
            if tx.send(event).is_err() {
                break;
            }
        }
    });
    Ok(())
}

/// Intentionally aborts the process to produce a core dump — the Rust
/// equivalent of the source's `assert(false)` on an `AbortForCoredump`
/// event.
pub fn abort_for_coredump(reason: &str) -> ! {
    tracing::error!(reason, "aborting intentionally to produce a core dump");
    std::process::abort()
}
