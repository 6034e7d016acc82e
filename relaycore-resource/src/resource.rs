//! The trait every tracked connection implements: owns its I/O endpoint
//! and fiber, accumulates the bandwidth delta the statistics layer reads,
//! and carries the context id every log line and error it raises is
//! tagged with.

use crate::state::ResourceState;
use async_trait::async_trait;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};

/// A connection the resource manager tracks from accept through disposal.
#[async_trait]
pub trait ConnectionResource: Send + Sync {
    /// Stable per-connection context id, used in every log line and error
    /// this resource's fiber raises.
    fn context_id(&self) -> &str;

    /// The peer address captured at accept time.
    fn remote_ip(&self) -> &str;

    fn state(&self) -> ResourceState;

    /// Runs the connection's protocol handler to completion. Implementors
    /// drive their own suspension points and observe `cancel` for
    /// cooperative shutdown; this method returns once the connection is
    /// done one way or another (peer closed, errored, or cancelled).
    async fn run(self: std::sync::Arc<Self>);

    /// Marks the resource expired (idle/age timeout) from outside its own
    /// fiber.
    fn expire(&self);

    fn disposal_eligible(&self) -> bool {
        self.state().is_disposal_eligible()
    }
}

/// Shared bookkeeping most `ConnectionResource` implementors embed:
/// lifecycle state and the accumulated bytes-in/bytes-out delta the
/// statistics layer drains periodically.
pub struct ResourceBookkeeping {
    state: AtomicU8,
    bandwidth_delta_bytes: AtomicI64,
}

impl ResourceBookkeeping {
    #[must_use]
    pub fn new() -> Self {
        Self { state: AtomicU8::new(ResourceState::Accepted as u8), bandwidth_delta_bytes: AtomicI64::new(0) }
    }

    #[must_use]
    pub fn state(&self) -> ResourceState {
        match self.state.load(Ordering::Acquire) {
            0 => ResourceState::Accepted,
            1 => ResourceState::Running,
            2 => ResourceState::Expired,
            3 => ResourceState::PeerClosed,
            4 => ResourceState::Errored,
            5 => ResourceState::AwaitingSweep,
            _ => ResourceState::Destroyed,
        }
    }

    pub fn set_state(&self, state: ResourceState) {
        self.state.store(state as u8, Ordering::Release);
    }

    /// Adds to the running bandwidth delta; may be negative (reset after
    /// a drain).
    pub fn add_bandwidth_delta(&self, bytes: i64) {
        self.bandwidth_delta_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    /// Reads and resets the accumulated delta — the statistics collector's
    /// drain operation.
    pub fn drain_bandwidth_delta(&self) -> i64 {
        self.bandwidth_delta_bytes.swap(0, Ordering::Relaxed)
    }
}

impl Default for ResourceBookkeeping {
    fn default() -> Self {
        Self::new()
    }
}
