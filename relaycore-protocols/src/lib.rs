//! The boundary contract for everything spec names as an out-of-scope
//! external collaborator: a [`ConnectionHandler`] trait plus one handler
//! per listener label. Handlers read/write their protocol's framing at
//! the boundary only — enough to be a believable collaborator — without
//! implementing codec, demuxing, or muxer logic.

pub mod errors;
pub mod generic;
pub mod handler;
pub mod idle;
pub mod rtmp;

pub use generic::HttpLikeHandler;
pub use handler::{ConnectionHandler, HandlerContext};
pub use idle::IdleHandler;
pub use rtmp::RtmpHandler;
use std::sync::Arc;

/// Every listener label the acceptor can classify a connection as,
/// paired with the handler the acceptor should hand it to.
#[must_use]
pub fn handler_for_label(label: &'static str) -> Arc<dyn ConnectionHandler> {
    match label {
        "rtmp" => Arc::new(RtmpHandler),
        "webrtc_tcp" | "stream_caster" => Arc::new(IdleHandler::new(label)),
        other => Arc::new(HttpLikeHandler::new(other)),
    }
}
