//! The serialized event set a signal or filesystem-watch translates into.
//! Everything downstream of the signal handler only ever sees these —
//! never a raw `libc::SIGxxx` number.

/// One event read off the signal/watch pipe by the main-loop fiber.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalEvent {
    /// `SIGHUP`: re-parse, transform, validate and (if valid) swap in the
    /// config file.
    Reload,
    /// `SIGUSR1`: close and reopen the log file sink.
    ReopenLog,
    /// `SIGTERM`/`SIGINT`: tear down without waiting for connections to
    /// finish, unless `force_grace_quit` remaps it to [`SignalEvent::GracefulQuit`].
    FastQuit,
    /// `SIGQUIT`: tear down, waiting for active connections to finish.
    GracefulQuit,
    /// `SIGHUP`-adjacent persistence request: serialize the active tree
    /// back to the config file.
    PersistConfig,
    /// `SIGABRT`: the process observed an invariant violation and is
    /// intentionally crashing to produce a core dump.
    AbortForCoredump,
}
