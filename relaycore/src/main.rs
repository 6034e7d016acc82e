//! Binary entry point: CLI parsing, config file search and load, logging
//! setup, server-id/pidfile persistence, and the main loop wiring the
//! signal controller, the reload dispatcher, the resource manager and the
//! acceptor together. Startup/shutdown sequencing follows the usual
//! `tokio::select!` race between work and a shutdown signal, with a
//! dedicated drain-with-timeout loop generalized to this system's two
//! named shutdown policies instead of one.

mod cli;
mod config_search;
mod logging;
mod persisted_state;
mod system_facts;

use relaycore_config::validator::ValidateOptions;
use relaycore_config::Directive;
use relaycore_error::CoreError;
use relaycore_reload::{ReloadDispatcher, ReloadEvent, Subscriber};
use relaycore_resource::ResourceManager;
use relaycore_signal::{SignalController, SignalEvent};
use parking_lot::RwLock;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Subscriber that stands in for the streaming runtime's own vhost/
/// transcode/ingest/dash/hls/dvr state machines — all out of scope here.
/// It only logs, the way a glue layer with nothing real wired up
/// yet would, but it is a real [`Subscriber`] so the dispatch contract
/// (registration-order invocation, first-error abort) is genuinely
/// exercised at runtime rather than merely unit-tested.
struct LoggingSubscriber;

impl Subscriber for LoggingSubscriber {
    fn name(&self) -> &str {
        "main-loop"
    }

    fn on_reload(&self, event: &ReloadEvent) -> Result<(), CoreError> {
        tracing::info!(?event, "reload event dispatched");
        Ok(())
    }
}

fn validate_options(env_only: bool) -> ValidateOptions {
    ValidateOptions {
        env_only,
        local_interface_count: system_facts::detect_local_interface_count(),
        open_max: system_facts::detect_open_max(),
    }
}

/// Loads the active tree at startup or on reload: in env-only mode the
/// tree is synthetically empty (every accessor then falls through to its
/// environment variable or compiled default); otherwise the usual
/// parse → transform → validate pipeline runs against `path`.
fn load_tree(path: &Path, env_only: bool, opts: &ValidateOptions) -> Result<(Directive, Vec<String>), CoreError> {
    if env_only {
        let empty = Directive::root(vec![]);
        let report = relaycore_config::validator::validate(&empty, opts)?;
        return Ok((empty, report.warnings));
    }
    let (tree, report) = relaycore_config::load(path, opts)?;
    Ok((tree, report.warnings))
}

fn main() -> ExitCode {
    let cli = cli::parse(std::env::args_os());

    if cli.help {
        cli::print_help();
        return ExitCode::SUCCESS;
    }
    if cli.version {
        cli::print_version();
        return ExitCode::SUCCESS;
    }
    if cli.signature {
        cli::print_signature();
        return ExitCode::SUCCESS;
    }

    let runtime = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("relaycore: failed to start async runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(cli)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("relaycore: {}", e.description());
            // Fatal startup errors (and `-t` validation failures) exit with
            // the error's own numeric code, not a generic failure status.
            ExitCode::from((e.kind() as i32 as u8).max(1))
        }
    }
}

async fn run(cli: cli::Cli) -> Result<(), CoreError> {
    let opts = validate_options(cli.env_only);

    let resolved = if cli.env_only { None } else { Some(config_search::resolve(cli.config.as_deref())) };
    if let Some(r) = &resolved {
        if r.used_fallback {
            tracing::warn!(path = %r.path.display(), "configured path not found, using fallback");
        }
    }
    let config_path: PathBuf = resolved.as_ref().map(|r| r.path.clone()).unwrap_or_default();

    let (tree, warnings) = load_tree(&config_path, cli.env_only, &opts)?;
    for w in &warnings {
        tracing::warn!(%w, "configuration warning");
    }

    if cli.test_config {
        println!("configuration ok");
        return Ok(());
    }

    let logging_config = logging::LoggingConfig::from_tree(&tree);
    let reopenable = logging::init_logging(&logging_config)
        .map_err(|e| relaycore_error::core_err!(relaycore_error::ErrorKind::SystemAssertFailed, "failed to initialize logging: {e}"))?;

    tracing::info!(signature = cli::SIGNATURE, "starting");

    let pid_path = PathBuf::from(relaycore_config::server::pid_file(&tree));
    let id_path = persisted_state::server_id_path(&pid_path);
    let server_id = relaycore_config::server::server_id_override(&tree)
        .unwrap_or_else(|| persisted_state::load_or_create_server_id(&id_path).unwrap_or_else(|_| "vid-0000000".to_string()));
    if let Err(e) = persisted_state::write_pid_file(&pid_path) {
        tracing::warn!(error = %e, path = %pid_path.display(), "failed to write pid file");
    }
    tracing::info!(server_id = %server_id, "server identity established");

    let manager = Arc::new(ResourceManager::new());
    let (sweeper_handle, sweeper_cancel) = manager.start(Duration::from_millis(500));

    let active: Arc<RwLock<Arc<Directive>>> = Arc::new(RwLock::new(Arc::new(tree.clone())));

    let mut dispatcher = ReloadDispatcher::new();
    dispatcher.register(Box::new(LoggingSubscriber));

    let max_connections = relaycore_config::server::max_connections(&tree);
    let empty_ip_ok = relaycore_config::server::empty_ip_ok(&tree);
    let accept_opts = relaycore_acceptor::AcceptOptions { max_connections, empty_ip_ok };

    let listener_cancel = CancellationToken::new();
    let table = relaycore_acceptor::build_listener_table(&tree);
    tracing::info!(count = table.len(), "binding listeners");
    let listener_handles = relaycore_acceptor::spawn_listeners(table, manager.clone(), accept_opts, &listener_cancel);

    let force_grace_quit = relaycore_config::server::force_grace_quit(&tree);
    let (mut signal_controller, signal_tx) = SignalController::spawn(force_grace_quit)?;

    let watcher = if cli.env_only {
        None
    } else {
        match relaycore_signal::spawn_watcher(&config_path, signal_tx.clone()) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(error = %e.summary(), "filesystem watcher unavailable, continuing without auto-reload");
                None
            }
        }
    };

    let grace_start_wait = relaycore_config::server::grace_start_wait(&tree);
    let grace_final_wait = relaycore_config::server::grace_final_wait(&tree);

    loop {
        let Some(event) = signal_controller.recv().await else { break };
        match event {
            SignalEvent::Reload => {
                do_reload(&config_path, &opts, &active, &dispatcher).await;
            }
            SignalEvent::ReopenLog => {
                if let Some(w) = &reopenable {
                    if let Err(e) = w.reopen() {
                        tracing::warn!(error = %e, "failed to reopen log file");
                    } else {
                        tracing::info!("log file reopened");
                    }
                }
            }
            SignalEvent::PersistConfig => {
                let snapshot = active.read().clone();
                if let Err(e) = relaycore_config::persist::persist_to_file(&snapshot, &config_path) {
                    tracing::error!(error = %e.summary(), "failed to persist configuration");
                }
            }
            SignalEvent::FastQuit => {
                tracing::info!("fast quit requested");
                shutdown(&manager, &listener_cancel, &mut signal_controller, false, grace_start_wait, grace_final_wait).await;
                break;
            }
            SignalEvent::GracefulQuit => {
                tracing::info!("graceful quit requested");
                shutdown(&manager, &listener_cancel, &mut signal_controller, true, grace_start_wait, grace_final_wait).await;
                break;
            }
            SignalEvent::AbortForCoredump => relaycore_signal::abort_for_coredump("SIGABRT received"),
        }
    }

    drop(watcher);
    sweeper_cancel.cancel();
    let _ = sweeper_handle.await;
    for h in listener_handles {
        let _ = tokio::time::timeout(Duration::from_secs(1), h).await;
    }
    persisted_state::remove_pid_file(&pid_path);
    tracing::info!("shutdown complete");
    Ok(())
}

async fn do_reload(path: &Path, opts: &ValidateOptions, active: &Arc<RwLock<Arc<Directive>>>, dispatcher: &ReloadDispatcher) {
    match relaycore_config::load(path, opts) {
        Ok((new_tree, report)) => {
            for w in &report.warnings {
                tracing::warn!(%w, "configuration warning");
            }
            let old = active.read().clone();
            let new_arc = Arc::new(new_tree);
            *active.write() = new_arc.clone();
            match dispatcher.dispatch(&old, &new_arc) {
                Ok(events) => tracing::info!(count = events.len(), "reload applied"),
                Err(e) => tracing::error!(error = %e.summary(), "reload subscriber failed; continuing with the already-swapped tree"),
            }
        }
        Err(e) => {
            tracing::error!(error = %e.summary(), "reload aborted: candidate configuration invalid");
        }
    }
}

/// Runs the documented shutdown policy. Fast: close listeners and return
/// immediately, leaving connection teardown to process exit. Graceful:
/// wait `grace_start_wait`, close listeners, poll the manager at its
/// growing interval until empty — interruptible by a subsequent
/// `FastQuit` signal observed on the same controller — then wait
/// `grace_final_wait` before returning.
async fn shutdown(
    manager: &Arc<ResourceManager>,
    listener_cancel: &CancellationToken,
    controller: &mut SignalController,
    graceful: bool,
    grace_start_wait: Duration,
    grace_final_wait: Duration,
) {
    if graceful {
        tracing::info!(wait = ?grace_start_wait, "graceful shutdown: waiting before closing listeners");
        tokio::time::sleep(grace_start_wait).await;
    }

    listener_cancel.cancel();
    manager.shutdown_fast();

    if !graceful {
        return;
    }

    let fast_quit = CancellationToken::new();
    let wait_fut = manager.wait_until_empty_or_fast_quit(&fast_quit);
    tokio::pin!(wait_fut);

    loop {
        tokio::select! {
            drained = &mut wait_fut => {
                if drained {
                    tracing::info!("graceful shutdown: all connections drained");
                } else {
                    tracing::info!("graceful shutdown: interrupted by a subsequent fast quit");
                }
                break;
            }
            event = controller.recv() => {
                match event {
                    Some(SignalEvent::FastQuit) => {
                        tracing::info!("fast quit received during graceful drain, no longer waiting");
                        fast_quit.cancel();
                    }
                    Some(_) | None => {}
                }
            }
        }
    }

    tracing::info!(wait = ?grace_final_wait, "graceful shutdown: final wait before exit");
    tokio::time::sleep(grace_final_wait).await;
}
