//! The flattened reload-event shape. The source this crate is modeled on
//! dispatches reload notifications through roughly two dozen virtual
//! `ISrsReloadHandler` methods, one per granularity of change; here that
//! collapses into a single enum and a single [`crate::Subscriber::on_reload`]
//! method; a subscriber that only cares about a few variants just matches
//! on them and ignores the rest.

/// One detected change between the previous active tree and a reload
/// candidate, in the order diffing would naturally produce it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReloadEvent {
    Listen,
    MaxConnections,
    PithyPrintMs,
    RtcServer,
    VhostAdded { vhost: String },
    VhostRemoved { vhost: String },
    VhostChunkSize { vhost: String },
    VhostTcpNodelay { vhost: String },
    VhostMinLatency { vhost: String },
    VhostPlay { vhost: String },
    VhostForward { vhost: String },
    VhostDash { vhost: String },
    VhostHls { vhost: String },
    VhostHds { vhost: String },
    VhostDvr { vhost: String },
    VhostExec { vhost: String },
    VhostPublish { vhost: String },
    /// Coalesced: fires once per vhost even if several transcode entries
    /// changed.
    VhostTranscode { vhost: String },
    IngestAdded { vhost: String, id: String },
    IngestRemoved { vhost: String, id: String },
    IngestUpdated { vhost: String, id: String },
}
