//! RTMP handler: performs the plain (unencrypted) handshake — C0/C1 in,
//! S0/S1/S2 out, C2 in — then idles on the chunk stream, discarding
//! bytes, until the peer closes or goes quiet past the receive timeout.
//! Chunk parsing, AMF decoding and muxing are out of scope here; this
//! exists only to be a believable collaborator at the boundary the
//! acceptor hands connections across.

use crate::errors::{RtmpError, RtmpErrorValue};
use crate::handler::{ConnectionHandler, HandlerContext};
use async_trait::async_trait;
use bytes::BytesMut;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

/// How long the handler waits for more bytes before deciding the peer
/// went quiet and closing — matches the receive timeout spec calls out
/// for accepted connections generally.
pub const RECV_TIMEOUT: Duration = Duration::from_secs(15);

const HANDSHAKE_SIZE: usize = 1536;
const RTMP_VERSION: u8 = 3;

pub struct RtmpHandler;

#[async_trait]
impl ConnectionHandler for RtmpHandler {
    async fn handle(&self, mut stream: TcpStream, ctx: HandlerContext) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        tracing::debug!(context_id = %ctx.context_id, remote_ip = %ctx.remote_ip, "rtmp handshake starting");
        handshake(&mut stream).await.map_err(|e| Box::new(e) as Box<dyn std::error::Error + Send + Sync>)?;
        tracing::debug!(context_id = %ctx.context_id, "rtmp handshake complete, idling on chunk stream");
        idle_until_quiet_or_closed(&mut stream).await;
        Ok(())
    }

    fn label(&self) -> &'static str {
        "rtmp"
    }
}

async fn handshake(stream: &mut TcpStream) -> Result<(), RtmpError> {
    let mut c0 = [0u8; 1];
    stream.read_exact(&mut c0).await?;
    if c0[0] != RTMP_VERSION {
        return Err(RtmpErrorValue::UnsupportedVersion(c0[0]).into());
    }

    let mut c1 = [0u8; HANDSHAKE_SIZE];
    stream.read_exact(&mut c1).await?;

    let mut s1 = [0u8; HANDSHAKE_SIZE];
    s1[8..].fill(0x42);

    stream.write_all(&[RTMP_VERSION]).await?;
    stream.write_all(&s1).await?;
    stream.write_all(&c1).await?; // S2 echoes C1

    let mut c2 = [0u8; HANDSHAKE_SIZE];
    stream.read_exact(&mut c2).await?;

    Ok(())
}

async fn idle_until_quiet_or_closed(stream: &mut TcpStream) {
    let mut buf = BytesMut::with_capacity(4096);
    loop {
        buf.clear();
        match tokio::time::timeout(RECV_TIMEOUT, stream.read_buf(&mut buf)).await {
            Ok(Ok(0)) | Err(_) => return, // peer closed, or went quiet past the timeout
            Ok(Ok(_)) => {}               // discard: chunk-stream parsing is out of scope
            Ok(Err(_)) => return,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;

    #[tokio::test]
    async fn handshake_completes_with_a_compliant_peer() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let handler = RtmpHandler;
            let ctx = HandlerContext { context_id: "c1".into(), remote_ip: "127.0.0.1".into(), listener_label: "rtmp" };
            handler.handle(stream, ctx).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[RTMP_VERSION]).await.unwrap();
        client.write_all(&[0u8; HANDSHAKE_SIZE]).await.unwrap();

        let mut s0 = [0u8; 1];
        client.read_exact(&mut s0).await.unwrap();
        assert_eq!(s0[0], RTMP_VERSION);
        let mut s1 = [0u8; HANDSHAKE_SIZE];
        client.read_exact(&mut s1).await.unwrap();
        let mut s2 = [0u8; HANDSHAKE_SIZE];
        client.read_exact(&mut s2).await.unwrap();

        client.write_all(&s1).await.unwrap(); // C2 echoes S1
        drop(client);

        server.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn non_rtmp_version_byte_is_rejected() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            let handler = RtmpHandler;
            let ctx = HandlerContext { context_id: "c1".into(), remote_ip: "127.0.0.1".into(), listener_label: "rtmp" };
            handler.handle(stream, ctx).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&[9u8]).await.unwrap();

        assert!(server.await.unwrap().is_err());
    }
}
