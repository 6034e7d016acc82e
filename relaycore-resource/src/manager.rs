//! The resource manager: a generational index over tracked connections
//! (slots are assigned by a monotonically increasing counter and never
//! reused, so a stale slot handle can never silently refer to a different
//! connection), deferred disposal, and the two shutdown modes.

use crate::resource::ConnectionResource;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// A resource's slot in the manager — opaque, stable for the resource's
/// lifetime, never reused.
pub type Slot = u64;

/// Produces the growing poll interval graceful shutdown waits on between
/// emptiness checks: 1, 2, 4, 8, 16ms, then wraps back to 1ms — a ~31ms
/// window repeated rather than growing without bound.
pub struct GracePoller {
    step: u32,
}

impl GracePoller {
    #[must_use]
    pub fn new() -> Self {
        Self { step: 0 }
    }

    pub fn next_delay(&mut self) -> Duration {
        let ms = 1u64 << (self.step % 5);
        self.step = self.step.wrapping_add(1);
        Duration::from_millis(ms)
    }
}

impl Default for GracePoller {
    fn default() -> Self {
        Self::new()
    }
}

pub struct ResourceManager {
    next_slot: AtomicU64,
    resources: DashMap<Slot, Arc<dyn ConnectionResource>>,
    pending_disposal: parking_lot::Mutex<Vec<Slot>>,
}

impl ResourceManager {
    #[must_use]
    pub fn new() -> Self {
        Self { next_slot: AtomicU64::new(1), resources: DashMap::new(), pending_disposal: parking_lot::Mutex::new(Vec::new()) }
    }

    pub fn add(&self, resource: Arc<dyn ConnectionResource>) -> Slot {
        let slot = self.next_slot.fetch_add(1, Ordering::Relaxed);
        self.resources.insert(slot, resource);
        slot
    }

    /// Queues `slot` for disposal. Never removes it from the index
    /// synchronously — even when called from the resource's own running
    /// fiber, the entry is still present until a sweep pass runs, which
    /// is what makes calling this from inside `ConnectionResource::run`
    /// itself safe.
    pub fn remove(&self, slot: Slot) {
        self.pending_disposal.lock().push(slot);
    }

    #[must_use]
    pub fn at(&self, slot: Slot) -> Option<Arc<dyn ConnectionResource>> {
        self.resources.get(&slot).map(|r| r.clone())
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.resources.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Actually drops every queued slot's entry. Called from the sweeper
    /// task, never from a resource's own fiber.
    pub fn sweep_once(&self) -> usize {
        let pending = std::mem::take(&mut *self.pending_disposal.lock());
        let n = pending.len();
        for slot in pending {
            self.resources.remove(&slot);
        }
        n
    }

    /// Spawns the periodic sweeper fiber. Dropping the returned
    /// `CancellationToken`'s guard is not required — callers keep it to
    /// stop the sweeper on shutdown.
    pub fn start(self: &Arc<Self>, interval: Duration) -> (tokio::task::JoinHandle<()>, CancellationToken) {
        let cancel = CancellationToken::new();
        let manager = self.clone();
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = tokio::time::sleep(interval) => {
                        manager.sweep_once();
                    }
                }
            }
        });
        (handle, cancel)
    }

    /// Fast shutdown: the caller is expected to have already closed
    /// listeners and stopped ingesters; this just stops waiting for
    /// connections to finish — there is nothing else for the manager to
    /// do.
    pub fn shutdown_fast(&self) {
        tracing::info!(remaining = self.size(), "fast shutdown: not waiting for connections to finish");
    }

    /// Graceful shutdown: polls at [`GracePoller`]'s growing interval
    /// until the manager is empty, or until `fast_quit` fires — a
    /// subsequent fast-quit signal interrupts an in-progress graceful
    /// wait. Returns `true` if it drained to empty, `false` if
    /// interrupted.
    pub async fn wait_until_empty_or_fast_quit(&self, fast_quit: &CancellationToken) -> bool {
        let mut poller = GracePoller::new();
        loop {
            if self.is_empty() {
                return true;
            }
            tokio::select! {
                _ = fast_quit.cancelled() => return false,
                _ = tokio::time::sleep(poller.next_delay()) => {}
            }
        }
    }
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resource::{ResourceBookkeeping, ConnectionResource};
    use crate::state::ResourceState;
    use async_trait::async_trait;

    struct Dummy {
        book: ResourceBookkeeping,
        id: String,
    }

    #[async_trait]
    impl ConnectionResource for Dummy {
        fn context_id(&self) -> &str {
            &self.id
        }
        fn remote_ip(&self) -> &str {
            "127.0.0.1"
        }
        fn state(&self) -> ResourceState {
            self.book.state()
        }
        async fn run(self: Arc<Self>) {}
        fn expire(&self) {
            self.book.set_state(ResourceState::Expired);
        }
    }

    fn dummy(id: &str) -> Arc<Dummy> {
        Arc::new(Dummy { book: ResourceBookkeeping::new(), id: id.to_string() })
    }

    #[test]
    fn grace_poller_cycles_through_growing_then_resets() {
        let mut poller = GracePoller::new();
        let ms: Vec<u64> = (0..7).map(|_| poller.next_delay().as_millis() as u64).collect();
        assert_eq!(ms, vec![1, 2, 4, 8, 16, 1, 2]);
    }

    #[test]
    fn remove_does_not_destroy_before_a_sweep_runs() {
        let manager = ResourceManager::new();
        let slot = manager.add(dummy("c1"));
        manager.remove(slot);
        assert!(manager.at(slot).is_some(), "entry must survive until a sweep pass runs");
        let swept = manager.sweep_once();
        assert_eq!(swept, 1);
        assert!(manager.at(slot).is_none());
    }

    #[tokio::test]
    async fn graceful_wait_returns_true_once_empty() {
        let manager = Arc::new(ResourceManager::new());
        let slot = manager.add(dummy("c1"));
        let cancel = CancellationToken::new();

        let m2 = manager.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            m2.remove(slot);
            m2.sweep_once();
        });

        let drained = manager.wait_until_empty_or_fast_quit(&cancel).await;
        assert!(drained);
    }

    #[tokio::test]
    async fn graceful_wait_is_interrupted_by_fast_quit() {
        let manager = Arc::new(ResourceManager::new());
        let _slot = manager.add(dummy("c1"));
        let cancel = CancellationToken::new();

        let c2 = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            c2.cancel();
        });

        let drained = manager.wait_until_empty_or_fast_quit(&cancel).await;
        assert!(!drained);
    }
}
