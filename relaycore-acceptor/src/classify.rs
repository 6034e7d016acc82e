//! Peek-based classification for a listener shared between WebRTC-over-TCP
//! and HTTP/S: ten bytes are enough to tell a STUN binding request from an
//! HTTP request line without consuming anything from the stream.

use tokio::net::TcpStream;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Peeked {
    Stun,
    Http,
}

/// A STUN binding request framed with a 2-byte length prefix looks like:
///
/// ```text
///      00 6c  # frame length: 0x006c = 108
///      00 01  # message type: Binding Request
///      00 58  # message length: 0x58 = 88 (frame length minus the 20-byte STUN header)
///      21 12 a4 42          # magic cookie
///      48 32 6c 61 ...      # 12-byte transaction id
/// ```
///
/// so the signature fits in the first ten bytes: byte 0 is the high byte
/// of the frame length (always zero for anything we'd see over a proxy
/// uplink), bytes 2-3 are the Binding Request message type, the low byte
/// of the frame length minus the low byte of the message length is 20,
/// and bytes 6-9 are the magic cookie. Anything else is treated as HTTP.
fn looks_like_stun(peeked: &[u8]) -> bool {
    peeked.len() == 10
        && peeked[0] == 0
        && peeked[2] == 0
        && peeked[3] == 1
        && peeked[1].wrapping_sub(peeked[5]) == 20
        && peeked[6] == 0x21
        && peeked[7] == 0x12
        && peeked[8] == 0xa4
        && peeked[9] == 0x42
}

/// Peeks the first ten bytes of `stream` without consuming them and
/// classifies the connection. Short reads (a peer that sends fewer than
/// ten bytes before going quiet) classify as HTTP, matching the only other
/// thing that can arrive on this listener.
pub async fn classify(stream: &TcpStream) -> Peeked {
    let mut buf = [0u8; 10];
    match stream.peek(&mut buf).await {
        Ok(10) if looks_like_stun(&buf) => Peeked::Stun,
        _ => Peeked::Http,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::AsyncWriteExt;
    use tokio::net::TcpListener;

    fn stun_binding_request() -> Vec<u8> {
        let mut msg = vec![0x00, 0x6c, 0x00, 0x01, 0x00, 0x58, 0x21, 0x12, 0xa4, 0x42];
        msg.extend_from_slice(b"transactionid");
        msg
    }

    #[tokio::test]
    async fn a_stun_binding_request_is_classified_as_stun() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            classify(&stream).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(&stun_binding_request()).await.unwrap();

        assert_eq!(server.await.unwrap(), Peeked::Stun);
    }

    #[tokio::test]
    async fn an_http_request_line_is_classified_as_http() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let server = tokio::spawn(async move {
            let (stream, _) = listener.accept().await.unwrap();
            classify(&stream).await
        });

        let mut client = TcpStream::connect(addr).await.unwrap();
        client.write_all(b"GET / HTTP/1.1\r\n").await.unwrap();

        assert_eq!(server.await.unwrap(), Peeked::Http);
    }
}
