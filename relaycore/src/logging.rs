//! Logging setup: pretty output for an interactive terminal, JSON when
//! the tree's `log_tank`/
//! `log_level`/`log_file` directives ask for it, with an optional file
//! sink. `SIGUSR1` ("reopen log") is realized by closing and reopening the
//! underlying file rather than tearing down and reinstalling the global
//! subscriber, which `tracing_subscriber` does not support doing twice.

use relaycore_config::Directive;
use std::fs::File;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::Level;
use tracing_subscriber::fmt::{self, format::FmtSpan};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
    pub file_path: Option<PathBuf>,
}

impl LoggingConfig {
    #[must_use]
    pub fn from_tree(tree: &Directive) -> Self {
        let file_path =
            if relaycore_config::server::log_tank_is_file(tree) { Some(PathBuf::from(relaycore_config::server::log_file(tree))) } else { None };
        Self { level: relaycore_config::server::log_level(tree), json: relaycore_config::server::log_format_is_json(tree), file_path }
    }
}

fn parse_level(level: &str) -> Level {
    match level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" | "warning" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    }
}

/// A file writer that can be reopened in place: every clone shares the
/// same underlying handle, so reopening it from the signal path is
/// visible to in-flight `MakeWriter` clones without re-running
/// `tracing_subscriber`'s layered init (which can only run once per
/// process).
#[derive(Clone)]
pub struct ReopenableFile {
    path: PathBuf,
    inner: std::sync::Arc<Mutex<File>>,
}

impl ReopenableFile {
    pub fn open(path: PathBuf) -> io::Result<Self> {
        let file = open_append(&path)?;
        Ok(Self { path, inner: std::sync::Arc::new(Mutex::new(file)) })
    }

    /// Closes and reopens the file at the same path — the effect of
    /// `SIGUSR1` for a file-backed log sink, matching log-rotation tools
    /// that move the old file aside before the signal arrives.
    pub fn reopen(&self) -> io::Result<()> {
        let fresh = open_append(&self.path)?;
        *self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = fresh;
        Ok(())
    }
}

fn open_append(path: &std::path::Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    File::options().create(true).append(true).open(path)
}

impl Write for ReopenableFile {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).write(buf)
    }
    fn flush(&mut self) -> io::Result<()> {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).flush()
    }
}

impl<'a> fmt::MakeWriter<'a> for ReopenableFile {
    type Writer = Self;
    fn make_writer(&'a self) -> Self::Writer {
        self.clone()
    }
}

/// Installs the global subscriber. Returns the reopenable file handle
/// (`None` for console-only logging) so the main loop can reopen it when
/// a `ReopenLog` event arrives.
pub fn init_logging(config: &LoggingConfig) -> Result<Option<ReopenableFile>, io::Error> {
    let level = parse_level(&config.level);
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    let registry = tracing_subscriber::registry().with(env_filter);

    let reopenable = match &config.file_path {
        Some(path) => Some(ReopenableFile::open(path.clone())?),
        None => None,
    };

    if config.json {
        let layer = fmt::layer().json().with_span_events(FmtSpan::CLOSE).with_target(true).with_line_number(true).with_file(true);
        match &reopenable {
            Some(w) => registry.with(layer.with_writer(w.clone())).init(),
            None => registry.with(layer).init(),
        }
    } else {
        let layer = fmt::layer().with_span_events(FmtSpan::CLOSE).with_target(true);
        match &reopenable {
            Some(w) => registry.with(layer.with_writer(w.clone())).init(),
            None => registry.with(layer).init(),
        }
    }

    Ok(reopenable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_level_falls_back_to_info_on_garbage() {
        assert_eq!(parse_level("not-a-level"), Level::INFO);
        assert_eq!(parse_level("DEBUG"), Level::DEBUG);
    }

    #[test]
    fn reopen_truncates_nothing_but_reattaches_the_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaycore.log");
        let writer = ReopenableFile::open(path.clone()).unwrap();
        {
            let mut w = writer.clone();
            w.write_all(b"first\n").unwrap();
        }
        writer.reopen().unwrap();
        {
            let mut w = writer.clone();
            w.write_all(b"second\n").unwrap();
        }
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("first"));
        assert!(contents.contains("second"));
    }

    #[test]
    fn logging_config_from_tree_honors_console_tank() {
        let tree = relaycore_config::parser::parse_str("log_tank console;\nlog_level debug;\n").unwrap();
        let cfg = LoggingConfig::from_tree(&tree);
        assert!(cfg.file_path.is_none());
        assert_eq!(cfg.level, "debug");
    }
}
