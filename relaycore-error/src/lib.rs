//! Flat error-kind enumeration and context-chain error type shared by every
//! relaycore crate.
//!
//! The kinds are partitioned by subsystem the way the source's error codes
//! are (system / rtmp / app / http / user); only the kinds this core
//! actually raises are modeled here. `CoreError` carries the context chain
//! the source's `ComplexError` carries: a code, a message, a context id, a
//! source location, an optional wrapped cause, and the errno observed at
//! the failing syscall, if any.

use std::fmt;
use thiserror::Error;

/// One entry in the flat, subsystem-partitioned error taxonomy.
///
/// Each variant documents its propagation policy; this enum only carries
/// identity, not policy. The `#[error(...)]` messages are the taxonomy's
/// human-readable names, not full diagnostics — `CoreError::message` carries
/// the actual per-call-site detail.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Parse/transform/validate failure. Fatal at startup, reload-scoped at
    /// runtime.
    #[error("SystemConfigInvalid")]
    SystemConfigInvalid,
    /// I/O error persisting the config file.
    #[error("SystemConfigPersistence")]
    SystemConfigPersistence,
    /// A vhost's edge/origin mode changed between old and new trees during
    /// a reload.
    #[error("RtmpEdgeReload")]
    RtmpEdgeReload,
    /// Admission denied: live-connection count reached `max_connections`.
    #[error("ExceedConnections")]
    ExceedConnections,
    /// Accept produced an empty peer IP and `empty_ip_ok` is false.
    #[error("SocketGetPeerIp")]
    SocketGetPeerIp,
    /// Process control failed tearing down a child (transcoder/ingester).
    #[error("SystemKill")]
    SystemKill,
    /// An invariant the process assumed at startup does not hold.
    #[error("SystemAssertFailed")]
    SystemAssertFailed,
    /// Filesystem watcher setup failed: `inotify_init`-equivalent.
    #[error("InotifyCreate")]
    InotifyCreate,
    /// Filesystem watcher setup failed: adding the watch itself.
    #[error("InotifyWatch")]
    InotifyWatch,
    /// Filesystem watcher setup failed: the watch fd could not be wrapped.
    #[error("InotifyOpenfd")]
    InotifyOpenfd,
    /// A byte or descriptor count round-tripped through the network failed.
    #[error("SocketIo")]
    SocketIo,
}

impl ErrorKind {
    /// Short stable string used in log lines and by callers matching on
    /// the kind by name (mirrors the source's `ERRORCODESTR`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::SystemConfigInvalid => "SystemConfigInvalid",
            Self::SystemConfigPersistence => "SystemConfigPersistence",
            Self::RtmpEdgeReload => "RtmpEdgeReload",
            Self::ExceedConnections => "ExceedConnections",
            Self::SocketGetPeerIp => "SocketGetPeerIp",
            Self::SystemKill => "SystemKill",
            Self::SystemAssertFailed => "SystemAssertFailed",
            Self::InotifyCreate => "InotifyCreate",
            Self::InotifyWatch => "InotifyWatch",
            Self::InotifyOpenfd => "InotifyOpenfd",
            Self::SocketIo => "SocketIo",
        }
    }
}

/// Where an error was raised: file, line, enclosing function.
#[derive(Debug, Clone, Copy)]
pub struct Location {
    pub file: &'static str,
    pub line: u32,
    pub function: &'static str,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}() [{}:{}]", self.function, self.file, self.line)
    }
}

/// A context-chain error: a code, a message, the fiber/task context id that
/// raised it, the source location, the errno observed (if the failure was
/// a syscall), and an optional wrapped cause.
///
/// Plain `thiserror` enums don't carry a context chain on their own — this
/// is modeled on a C++ `ComplexError` ancestor instead: code, message,
/// context id, source location, and an optional wrapped cause.
#[derive(Debug)]
pub struct CoreError {
    kind: ErrorKind,
    message: String,
    context_id: String,
    location: Location,
    errno: Option<i32>,
    wrapped: Option<Box<CoreError>>,
}

impl CoreError {
    /// Construct a new root error. Prefer the [`core_err`] macro, which
    /// fills in `location` automatically.
    #[must_use]
    pub fn new(kind: ErrorKind, message: impl Into<String>, location: Location) -> Self {
        Self {
            kind,
            message: message.into(),
            context_id: String::new(),
            location,
            errno: None,
            wrapped: None,
        }
    }

    /// Wrap an existing error, inheriting its kind unless `kind` overrides
    /// it. Prefer the [`core_err_wrap`] macro.
    #[must_use]
    pub fn wrap(inner: Self, message: impl Into<String>, location: Location) -> Self {
        let kind = inner.kind;
        Self {
            kind,
            message: message.into(),
            context_id: inner.context_id.clone(),
            location,
            errno: None,
            wrapped: Some(Box::new(inner)),
        }
    }

    #[must_use]
    pub fn with_context_id(mut self, context_id: impl Into<String>) -> Self {
        self.context_id = context_id.into();
        self
    }

    /// Stashes the last OS error observed at this site, the way
    /// `ComplexError::Create` captures `errno` at construction.
    #[must_use]
    pub fn with_errno_from_last_os_error(mut self) -> Self {
        self.errno = Some(std::io::Error::last_os_error().raw_os_error().unwrap_or(0));
        self
    }

    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    #[must_use]
    pub fn context_id(&self) -> &str {
        &self.context_id
    }

    /// Full chain, deepest last, one line per link — mirrors
    /// `ComplexError::Description`.
    #[must_use]
    pub fn description(&self) -> String {
        let mut messages = Vec::new();
        let mut sites = Vec::new();
        let mut cur = Some(self);
        while let Some(e) = cur {
            messages.push(e.message.as_str());
            sites.push(format!(
                "[{}]: {} [errno={}]",
                e.context_id,
                e.location,
                e.errno.unwrap_or(0)
            ));
            cur = e.wrapped.as_deref();
        }
        let mut out = format!("code={}({})", self.kind as i32, self.kind.as_str());
        for m in &messages {
            out.push_str(" : ");
            out.push_str(m);
        }
        for s in &sites {
            out.push('\n');
            out.push_str(s);
        }
        out
    }

    /// Top message plus code only — mirrors `ComplexError::Summary`.
    #[must_use]
    pub fn summary(&self) -> String {
        format!("code={}({}) : {}", self.kind as i32, self.kind.as_str(), self.message)
    }

    /// The source's `IsClientGracefullyClose`/`IsServerGracefullyClose`
    /// classification, narrowed to the kinds this core raises: a peer or
    /// server closing the socket mid-read/write is not worth an error-level
    /// log line.
    #[must_use]
    pub const fn is_graceful_peer_close(&self) -> bool {
        matches!(self.kind, ErrorKind::SocketIo)
    }
}

impl fmt::Display for CoreError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.summary())
    }
}

impl std::error::Error for CoreError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.wrapped.as_ref().map(|b| b.as_ref() as &(dyn std::error::Error + 'static))
    }
}

pub type Result<T> = std::result::Result<T, CoreError>;

/// Expands to the enclosing function's path, the way `function!()` macros
/// in other crates do it — there is no `std` primitive for this.
#[macro_export]
macro_rules! function_name {
    () => {{
        fn f() {}
        fn type_name_of<T>(_: T) -> &'static str {
            std::any::type_name::<T>()
        }
        let name = type_name_of(f);
        &name[..name.len() - 3]
    }};
}

/// Builds a root [`CoreError`] with `location` filled in automatically.
#[macro_export]
macro_rules! core_err {
    ($kind:expr, $($arg:tt)*) => {
        $crate::CoreError::new(
            $kind,
            format!($($arg)*),
            $crate::Location { file: file!(), line: line!(), function: $crate::function_name!() },
        )
    };
}

/// Wraps an existing [`CoreError`] with `location` filled in automatically.
#[macro_export]
macro_rules! core_err_wrap {
    ($inner:expr, $($arg:tt)*) => {
        $crate::CoreError::wrap(
            $inner,
            format!($($arg)*),
            $crate::Location { file: file!(), line: line!(), function: $crate::function_name!() },
        )
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_prints_full_chain_deepest_last() {
        let inner = core_err!(ErrorKind::SocketIo, "read failed");
        let outer = core_err_wrap!(inner, "accepting connection");
        let desc = outer.description();
        assert!(desc.contains("accepting connection"));
        assert!(desc.contains("read failed"));
        assert!(desc.find("accepting connection").unwrap() < desc.find("read failed").unwrap());
    }

    #[test]
    fn summary_has_top_message_and_code_only() {
        let e = core_err!(ErrorKind::ExceedConnections, "max=2, cur=2");
        let s = e.summary();
        assert!(s.contains("ExceedConnections"));
        assert!(s.contains("max=2, cur=2"));
        assert!(!s.contains("errno"));
    }

    #[test]
    fn wrap_inherits_kind_from_inner() {
        let inner = core_err!(ErrorKind::SystemConfigInvalid, "bad directive");
        let outer = core_err_wrap!(inner, "loading config");
        assert_eq!(outer.kind(), ErrorKind::SystemConfigInvalid);
    }

    #[test]
    fn with_context_id_round_trips() {
        let e = core_err!(ErrorKind::SystemKill, "kill failed").with_context_id("c1a2b3");
        assert_eq!(e.context_id(), "c1a2b3");
    }
}
