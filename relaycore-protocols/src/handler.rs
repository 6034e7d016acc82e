//! The trait the acceptor hands every classified connection to. Each
//! implementor owns its protocol's framing at the boundary only — enough
//! to be a believable collaborator, not a full codec/demuxer/muxer.

use async_trait::async_trait;
use tokio::net::TcpStream;

/// What a handler needs to know about the connection it was handed, set
/// by the acceptor at classification time.
#[derive(Debug, Clone)]
pub struct HandlerContext {
    pub context_id: String,
    pub remote_ip: String,
    pub listener_label: &'static str,
}

#[async_trait]
pub trait ConnectionHandler: Send + Sync {
    /// Runs this connection's protocol loop to completion. Implementors
    /// read/write only the framing needed to keep the connection alive
    /// and to recognize the shape of what crosses the boundary — not to
    /// decode or mux media.
    async fn handle(&self, stream: TcpStream, ctx: HandlerContext) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;

    /// The listener label this handler serves, for logging.
    fn label(&self) -> &'static str;
}
