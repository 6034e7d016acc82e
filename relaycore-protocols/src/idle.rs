//! A handler for listener labels whose wire framing this core has no
//! business decoding at all (WebRTC-over-TCP once the acceptor's STUN/HTTP
//! peek has classified it, and stream casters ingesting RTSP/GB28181/SIP):
//! read and discard until the peer closes or goes quiet.

use crate::handler::{ConnectionHandler, HandlerContext};
use async_trait::async_trait;
use bytes::BytesMut;
use tokio::io::AsyncReadExt;
use tokio::net::TcpStream;
use tokio::time::Duration;

const RECV_TIMEOUT: Duration = Duration::from_secs(15);

pub struct IdleHandler {
    label: &'static str,
}

impl IdleHandler {
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl ConnectionHandler for IdleHandler {
    async fn handle(&self, mut stream: TcpStream, ctx: HandlerContext) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(context_id = %ctx.context_id, label = self.label, "idling boundary connection");
        let mut buf = BytesMut::with_capacity(4096);
        loop {
            buf.clear();
            match tokio::time::timeout(RECV_TIMEOUT, stream.read_buf(&mut buf)).await {
                Ok(Ok(0)) | Err(_) => return Ok(()),
                Ok(Ok(_)) => {}
                Ok(Err(e)) => return Err(Box::new(e)),
            }
        }
    }

    fn label(&self) -> &'static str {
        self.label
    }
}
