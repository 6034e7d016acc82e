//! Per-protocol error values, one enum per handler, each wrapped in a
//! newtype struct the way the retained `synctv-xiu` fragment's own
//! per-module error types are shaped (a `FooErrorValue` enum plus a
//! `FooError { value: FooErrorValue }` wrapper) — modernized here onto
//! `thiserror` rather than the fragment's `failure` crate, matching the
//! rest of this workspace's error stack.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RtmpErrorValue {
    #[error("bytes read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("handshake c0 version {0} is not supported")]
    UnsupportedVersion(u8),
    #[error("peer closed during handshake")]
    PeerClosedDuringHandshake,
}

#[derive(Debug, Error)]
#[error("rtmp handler error: {value}")]
pub struct RtmpError {
    #[from]
    pub value: RtmpErrorValue,
}

#[derive(Debug, Error)]
pub enum HandlerErrorValue {
    #[error("bytes read error: {0}")]
    Io(#[from] std::io::Error),
    #[error("peer sent fewer than the minimum bytes expected for this protocol")]
    ShortRead,
}

#[derive(Debug, Error)]
#[error("handler error: {value}")]
pub struct HandlerError {
    #[from]
    pub value: HandlerErrorValue,
}

impl From<std::io::Error> for HandlerError {
    fn from(e: std::io::Error) -> Self {
        Self { value: HandlerErrorValue::Io(e) }
    }
}

impl From<std::io::Error> for RtmpError {
    fn from(e: std::io::Error) -> Self {
        Self { value: RtmpErrorValue::Io(e) }
    }
}
