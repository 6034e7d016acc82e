//! Builds the listener table from the active config, and runs each
//! listener's accept procedure: peer-IP check, admission control,
//! WebRTC/HTTP demux classification, and handoff to the resource manager.

pub mod accept;
pub mod classify;
pub mod table;

pub use accept::{accept_loop, AcceptOptions, AcceptedConnection};
pub use classify::{classify, Peeked};
pub use table::{build_listener_table, Demux, ListenerEntry};

use relaycore_resource::ResourceManager;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns one accept loop per entry in `table`, all sharing `cancel`.
/// Returns a handle per listener so the caller can await clean shutdown
/// after cancelling.
#[must_use]
pub fn spawn_listeners(
    table: Vec<ListenerEntry>,
    manager: Arc<ResourceManager>,
    opts: AcceptOptions,
    cancel: &CancellationToken,
) -> Vec<JoinHandle<()>> {
    table
        .into_iter()
        .map(|entry| {
            let manager = manager.clone();
            let cancel = cancel.clone();
            let label = entry.display_name.clone();
            tokio::spawn(async move {
                if let Err(err) = accept_loop(entry, manager, opts, cancel).await {
                    tracing::error!(label = %label, error = %err, "listener stopped unexpectedly");
                }
            })
        })
        .collect()
}
