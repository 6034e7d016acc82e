//! The connection resource lifecycle.

/// Where a tracked connection resource sits in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceState {
    /// Accepted off a listener, not yet handed to its protocol handler.
    Accepted,
    /// Handler running normally.
    Running,
    /// Expired by an idle/age timeout.
    Expired,
    /// The peer closed its end.
    PeerClosed,
    /// The handler observed an unrecoverable I/O or protocol error.
    Errored,
    /// Past `Running`, queued for disposal by the sweeper — never
    /// destroyed synchronously by the resource's own fiber.
    AwaitingSweep,
    /// Removed from the manager's index; terminal.
    Destroyed,
}

impl ResourceState {
    /// Whether a resource in this state is eligible to be queued for
    /// disposal at all (disposal itself always goes through
    /// [`ResourceState::AwaitingSweep`]).
    #[must_use]
    pub const fn is_disposal_eligible(self) -> bool {
        matches!(self, Self::Expired | Self::PeerClosed | Self::Errored | Self::AwaitingSweep)
    }
}
