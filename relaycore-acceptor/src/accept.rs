//! The accept procedure: peer-IP read, admission control, connection
//! classification, and handoff into the resource manager — the same five
//! steps for every listener, parameterized by its [`Demux`] rule.

use crate::classify::{classify, Peeked};
use crate::table::{Demux, ListenerEntry};
use async_trait::async_trait;
use relaycore_error::{core_err, ErrorKind};
use relaycore_protocols::{handler_for_label, ConnectionHandler, HandlerContext};
use relaycore_resource::{ConnectionResource, ResourceBookkeeping, ResourceManager, ResourceState};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio_util::sync::CancellationToken;

/// Inputs to admission control the acceptor must not query for itself —
/// same reasoning as the validator's `ValidateOptions`: pure function of
/// its arguments, trivial to exercise in tests.
#[derive(Debug, Clone, Copy)]
pub struct AcceptOptions {
    pub max_connections: u64,
    pub empty_ip_ok: bool,
}

/// A connection handed off from the accept procedure to its protocol
/// handler. Holds the accepted socket until `run` claims it, so it can sit
/// in the resource manager's index between `add` and the fiber actually
/// starting.
pub struct AcceptedConnection {
    context_id: String,
    remote_ip: String,
    listener_label: &'static str,
    book: ResourceBookkeeping,
    handler: Arc<dyn ConnectionHandler>,
    stream: tokio::sync::Mutex<Option<TcpStream>>,
}

#[async_trait]
impl ConnectionResource for AcceptedConnection {
    fn context_id(&self) -> &str {
        &self.context_id
    }

    fn remote_ip(&self) -> &str {
        &self.remote_ip
    }

    fn state(&self) -> ResourceState {
        self.book.state()
    }

    async fn run(self: Arc<Self>) {
        self.book.set_state(ResourceState::Running);
        let stream = self.stream.lock().await.take();
        let Some(stream) = stream else { return };
        let ctx = HandlerContext {
            context_id: self.context_id.clone(),
            remote_ip: self.remote_ip.clone(),
            listener_label: self.listener_label,
        };
        match self.handler.handle(stream, ctx).await {
            Ok(()) => self.book.set_state(ResourceState::PeerClosed),
            Err(err) => {
                tracing::warn!(context_id = %self.context_id, label = self.listener_label, error = %err, "connection ended with an error");
                self.book.set_state(ResourceState::Errored);
            }
        }
    }

    fn expire(&self) {
        self.book.set_state(ResourceState::Expired);
    }
}

fn label_for(demux: Demux, peek: Option<Peeked>) -> &'static str {
    match (demux, peek) {
        (Demux::Single(label), _) => label,
        (Demux::WebrtcOrHttp { .. }, Some(Peeked::Stun)) => "webrtc_tcp",
        (Demux::WebrtcOrHttp { http_label }, _) => http_label,
    }
}

/// Runs one listener's accept loop until `cancel` fires. Every accepted
/// connection goes through peer-IP check, admission control, the
/// listener's demux rule, and registration before its handler fiber is
/// spawned.
pub async fn accept_loop(
    entry: ListenerEntry,
    manager: Arc<ResourceManager>,
    opts: AcceptOptions,
    cancel: CancellationToken,
) -> Result<(), relaycore_error::CoreError> {
    let listener = TcpListener::bind(entry.bind).await.map_err(|e| {
        core_err!(ErrorKind::SystemConfigInvalid, "failed to bind {} listener on {}: {e}", entry.display_name, entry.bind)
    })?;
    tracing::info!(bind = %entry.bind, label = %entry.display_name, "listening");

    loop {
        tokio::select! {
            _ = cancel.cancelled() => return Ok(()),
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, addr)) => {
                        let entry = entry.clone();
                        let manager = manager.clone();
                        tokio::spawn(async move {
                            handle_one(stream, addr, &entry, &manager, opts).await;
                        });
                    }
                    Err(e) => {
                        tracing::warn!(label = %entry.display_name, error = %e, "accept failed");
                    }
                }
            }
        }
    }
}

static CONTEXT_COUNTER: AtomicU64 = AtomicU64::new(1);

fn next_context_id() -> String {
    format!("c{}-{}", CONTEXT_COUNTER.fetch_add(1, Ordering::Relaxed), nanoid::nanoid!(6))
}

async fn handle_one(stream: TcpStream, addr: std::net::SocketAddr, entry: &ListenerEntry, manager: &Arc<ResourceManager>, opts: AcceptOptions) {
    let ip = addr.ip();
    if ip.is_unspecified() && !opts.empty_ip_ok {
        tracing::warn!(label = %entry.display_name, "dropping connection with empty peer ip");
        return;
    }

    let cur = manager.size() as u64;
    if cur >= opts.max_connections {
        tracing::warn!(
            label = %entry.display_name,
            remote = %addr,
            "{}: max={}, cur={}",
            ErrorKind::ExceedConnections.as_str(),
            opts.max_connections,
            cur
        );
        return;
    }

    // tokio binds listening sockets with CLOEXEC already set via socket2,
    // so there is no separate fcntl step to perform here.

    let peek = match entry.demux {
        Demux::WebrtcOrHttp { .. } => Some(classify(&stream).await),
        Demux::Single(_) => None,
    };
    let label = label_for(entry.demux, peek);

    let resource = Arc::new(AcceptedConnection {
        context_id: next_context_id(),
        remote_ip: ip.to_string(),
        listener_label: label,
        book: ResourceBookkeeping::new(),
        handler: handler_for_label(label),
        stream: tokio::sync::Mutex::new(Some(stream)),
    });

    let slot = manager.add(resource.clone());
    resource.run().await;
    manager.remove(slot);
}

impl Clone for ListenerEntry {
    fn clone(&self) -> Self {
        Self { bind: self.bind, demux: self.demux, display_name: self.display_name.clone() }
    }
}
