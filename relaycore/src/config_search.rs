//! Configuration file search order: the user's `-c` path, a `docker.conf`
//! → sibling `srs.conf` special case, then two compiled-in fallbacks. The
//! first path that exists on disk wins.

use std::path::{Path, PathBuf};

pub struct Resolved {
    pub path: PathBuf,
    /// True when the chosen path isn't the user-specified one (or no
    /// `-c` was given at all) — callers should warn in this case.
    pub used_fallback: bool,
}

const COMPILED_DEFAULT: &str = "/conf.conf";
const ETC_DEFAULT: &str = "/etc/srs/srs.conf";

/// Builds the ordered candidate list without touching the filesystem —
/// exposed separately so tests can assert on the order itself.
#[must_use]
pub fn candidates(user_path: Option<&Path>) -> Vec<PathBuf> {
    let mut out = Vec::new();
    if let Some(p) = user_path {
        out.push(p.to_path_buf());
        if p.file_name().map(|f| f == "docker.conf").unwrap_or(false) {
            out.push(p.with_file_name("srs.conf"));
        }
    }
    out.push(PathBuf::from(COMPILED_DEFAULT));
    out.push(PathBuf::from(ETC_DEFAULT));
    out
}

/// Resolves the config path to load, per `candidates`' order: the first
/// one that exists on disk wins. If none exist, the first candidate is
/// returned anyway so the caller's load attempt produces a normal
/// file-not-found error rather than this function inventing one.
#[must_use]
pub fn resolve(user_path: Option<&Path>) -> Resolved {
    let list = candidates(user_path);
    let first = list[0].clone();
    let chosen = list.iter().find(|p| p.exists()).cloned().unwrap_or_else(|| first.clone());
    Resolved { used_fallback: chosen != first, path: chosen }
}
