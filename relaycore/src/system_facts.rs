//! The two platform facts [`relaycore_config::validator::ValidateOptions`]
//! needs but must not query for itself: the open-file-descriptor ceiling
//! (`RLIMIT_NOFILE`) and the number of local network interfaces. Both are
//! read from `/proc` rather than a raw `getrlimit(2)`/`getifaddrs(3)` call
//! so no `unsafe` is needed anywhere in this workspace (see the
//! workspace-level `unsafe_code = "deny"` lint); on a non-Linux host or a
//! sandboxed `/proc`, both fall back to conservative defaults.

use std::fs;

const DEFAULT_OPEN_MAX: u64 = 65536;
const DEFAULT_INTERFACE_COUNT: u32 = 1;

/// Reads the soft `RLIMIT_NOFILE` ("Max open files") from
/// `/proc/self/limits`, the budget the validator checks
/// `max_connections + 128` against.
#[must_use]
pub fn detect_open_max() -> u64 {
    let Ok(text) = fs::read_to_string("/proc/self/limits") else { return DEFAULT_OPEN_MAX };
    for line in text.lines() {
        if !line.starts_with("Max open files") {
            continue;
        }
        if let Some(soft) = line.split_whitespace().nth(3) {
            if let Ok(v) = soft.parse::<u64>() {
                return v;
            }
        }
    }
    DEFAULT_OPEN_MAX
}

/// Counts distinct interface names in `/proc/net/dev`, the bound
/// `stats.network` is validated against. Deliberately a `/proc`-specific,
/// best-effort approach — not a contract to keep exact, only good enough
/// to bound a config value sanely.
#[must_use]
pub fn detect_local_interface_count() -> u32 {
    let Ok(text) = fs::read_to_string("/proc/net/dev") else { return DEFAULT_INTERFACE_COUNT };
    let count = text
        .lines()
        .skip(2)
        .filter_map(|line| line.split_once(':'))
        .map(|(name, _)| name.trim())
        .filter(|name| !name.is_empty())
        .count() as u32;
    count.max(1)
}
