//! Named, root-level accessors the binary's main loop consults directly —
//! the concrete specializations of the generic combinators in
//! [`crate::accessor`], one per server-wide setting `original_source/
//! app_config.cpp`'s `Config` class exposes as its own getter
//! (`GetMaxConnections`, `GetPithyPrint`, `GetGraceStartWait`, ...).
//! `relaycore-acceptor` and the vhost/reload layer consult the generic
//! combinators directly against their own paths; these are only the
//! handful the process-level startup/shutdown/logging code needs by name.

use crate::accessor::{self, derive_env_key};
use crate::directive::Directive;
use std::time::Duration;

/// `max_connections` — default 1000, matching the source.
#[must_use]
pub fn max_connections(tree: &Directive) -> u64 {
    accessor::u64_clamped(tree, &["max_connections"], &derive_env_key("max_connections"), 1000, 0, u64::MAX)
}

/// Every `listen` endpoint argument across all `listen` directives, in
/// document order. The source's `GetListens` env override replaces the
/// whole list with a single value; reproduced here as a one-element
/// override.
#[must_use]
pub fn listens(tree: &Directive) -> Vec<String> {
    if let Ok(v) = std::env::var(derive_env_key("listen")) {
        if !v.is_empty() {
            return vec![v];
        }
    }
    tree.get_all("listen").flat_map(|d| d.args.iter().cloned()).collect()
}

/// `pid` — the pid-file path, default `./objs/relaycore.pid`.
#[must_use]
pub fn pid_file(tree: &Directive) -> String {
    accessor::string(tree, &["pid"], &derive_env_key("pid"), "./objs/relaycore.pid")
}

/// `pithy_print_ms` — default 10s.
#[must_use]
pub fn pithy_print_ms(tree: &Directive) -> Duration {
    accessor::duration_ms(tree, &["pithy_print_ms"], &derive_env_key("pithy_print_ms"), Duration::from_secs(10))
}

/// `utc_time` — perfer-false, default `false`.
#[must_use]
pub fn utc_time(tree: &Directive) -> bool {
    accessor::bool_prefer_false(tree, &["utc_time"], &derive_env_key("utc_time"))
}

/// `work_dir` — default `./`.
#[must_use]
pub fn work_dir(tree: &Directive) -> String {
    accessor::string(tree, &["work_dir"], &derive_env_key("work_dir"), "./")
}

/// `server_id` — the directive/env override only; the file-backed default
/// (read-or-generate `vid-XXXXXXX`) is the binary's job, see
/// `relaycore::persisted_state`.
#[must_use]
pub fn server_id_override(tree: &Directive) -> Option<String> {
    std::env::var(derive_env_key("server_id")).ok().filter(|v| !v.is_empty()).or_else(|| {
        tree.get("server_id").and_then(Directive::arg0).map(str::to_string).filter(|v| !v.is_empty())
    })
}

/// `empty_ip_ok` — perfer-true, default `true`: accept connections whose
/// peer address resolved empty (e.g. some Unix-domain-over-TCP shims).
#[must_use]
pub fn empty_ip_ok(tree: &Directive) -> bool {
    accessor::bool_prefer_true(tree, &["empty_ip_ok"], &derive_env_key("empty_ip_ok"))
}

/// `grace_start_wait` — how long graceful shutdown waits before closing
/// listeners at all; default 2300ms.
#[must_use]
pub fn grace_start_wait(tree: &Directive) -> Duration {
    accessor::duration_ms(tree, &["grace_start_wait"], &derive_env_key("grace_start_wait"), Duration::from_millis(2300))
}

/// `grace_final_wait` — how long graceful shutdown waits after the
/// resource manager has drained, before actually exiting; default 3200ms.
#[must_use]
pub fn grace_final_wait(tree: &Directive) -> Duration {
    accessor::duration_ms(tree, &["grace_final_wait"], &derive_env_key("grace_final_wait"), Duration::from_millis(3200))
}

/// `force_grace_quit` — perfer-false, default `false`: remap `SIGTERM`'s
/// default fast-quit to graceful-quit.
#[must_use]
pub fn force_grace_quit(tree: &Directive) -> bool {
    accessor::bool_prefer_false(tree, &["force_grace_quit"], &derive_env_key("force_grace_quit"))
}

/// `daemon` — perfer-true, default `true` in the source; this port never
/// daemonizes (no fork-and-detach in a `tokio` process), but the accessor
/// is kept so the validator's mutual-exclusion rule with `asprocess` has
/// something to read.
#[must_use]
pub fn daemon(tree: &Directive) -> bool {
    accessor::bool_prefer_true(tree, &["daemon"], &derive_env_key("daemon"))
}

/// `asprocess` — perfer-false, default `false`.
#[must_use]
pub fn asprocess(tree: &Directive) -> bool {
    accessor::bool_prefer_false(tree, &["asprocess"], &derive_env_key("asprocess"))
}

/// `log_level` — default `"trace"`, matching the source (despite how
/// noisy that sounds, it is what `original_source/app_config.cpp`
/// defaults to; operators override it in practically every real config).
#[must_use]
pub fn log_level(tree: &Directive) -> String {
    accessor::string(tree, &["log_level"], &derive_env_key("log_level"), "trace")
}

/// `log_file` — default `./objs/relaycore.log`.
#[must_use]
pub fn log_file(tree: &Directive) -> String {
    accessor::string(tree, &["log_file"], &derive_env_key("log_file"), "./objs/relaycore.log")
}

/// `log_format` — `"json"` or `"pretty"`, default `"pretty"`. No
/// counterpart in `original_source/app_config.cpp` (its log sink is a
/// plain text writer); structured-vs-pretty log output is an ambient
/// concern this port carries regardless.
#[must_use]
pub fn log_format_is_json(tree: &Directive) -> bool {
    accessor::string(tree, &["log_format"], &derive_env_key("log_format"), "pretty") == "json"
}

/// `log_tank` — `true` means file-backed, `false` means console; default
/// file-backed, matching the source's non-container default.
#[must_use]
pub fn log_tank_is_file(tree: &Directive) -> bool {
    if let Ok(v) = std::env::var(derive_env_key("log_tank")) {
        if !v.is_empty() {
            return v != "console";
        }
    }
    tree.get("log_tank").and_then(Directive::arg0).map(|v| v != "console").unwrap_or(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn max_connections_defaults_to_one_thousand() {
        let empty = Directive::root(vec![]);
        assert_eq!(max_connections(&empty), 1000);
    }

    #[test]
    fn listens_collects_every_listen_directives_args_in_order() {
        let tree = parse_str("listen 1935 1936;\nlisten 1937;\n").unwrap();
        assert_eq!(listens(&tree), vec!["1935", "1936", "1937"]);
    }

    #[test]
    fn grace_waits_have_the_documented_millisecond_defaults() {
        let empty = Directive::root(vec![]);
        assert_eq!(grace_start_wait(&empty), Duration::from_millis(2300));
        assert_eq!(grace_final_wait(&empty), Duration::from_millis(3200));
    }

    #[test]
    fn force_grace_quit_defaults_off() {
        let empty = Directive::root(vec![]);
        assert!(!force_grace_quit(&empty));
        let on = parse_str("force_grace_quit on;").unwrap();
        assert!(force_grace_quit(&on));
    }

    #[test]
    fn log_tank_console_opts_out_of_file_logging() {
        let tree = parse_str("log_tank console;").unwrap();
        assert!(!log_tank_is_file(&tree));
        let empty = Directive::root(vec![]);
        assert!(log_tank_is_file(&empty));
    }

    #[test]
    fn empty_ip_ok_defaults_true() {
        let empty = Directive::root(vec![]);
        assert!(empty_ip_ok(&empty));
    }
}
