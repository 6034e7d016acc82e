//! Typed accessor layer: every accessor is the same three-source
//! combinator (environment variable, then tree directive, then compiled
//! default) expressed once and specialized per value type. Accessors never
//! fail — an accessor that can't parse what it finds falls through to the
//! next source exactly as if that source were absent, and the compiled
//! default is always a valid fallback.

use crate::directive::Directive;

/// Derives an accessor's environment-variable name from its dotted config
/// path: lowercase, dots become underscores, then uppercased — e.g.
/// `"heartbeat.interval"` becomes `"HEARTBEAT_INTERVAL"`.
#[must_use]
pub fn derive_env_key(dotted_path: &str) -> String {
    dotted_path.to_lowercase().replace('.', "_").to_uppercase()
}

/// Reads an environment variable, treating an empty value the same as an
/// unset one — spec precedence rule 1 requires the variable be "set and
/// non-empty" before it outranks the tree.
fn env_lookup(env_key: &str) -> Option<String> {
    std::env::var(env_key).ok().filter(|v| !v.is_empty())
}

fn tree_lookup<'a>(tree: &'a Directive, path: &[&str]) -> Option<&'a str> {
    tree.get_path(path).and_then(Directive::arg0)
}

/// String accessor: env var, else tree value, else default.
#[must_use]
pub fn string(tree: &Directive, path: &[&str], env_key: &str, default: &str) -> String {
    env_lookup(env_key).or_else(|| tree_lookup(tree, path).map(str::to_string)).unwrap_or_else(|| default.to_string())
}

fn parse_onoff(s: &str) -> Option<bool> {
    match s {
        "on" => Some(true),
        "off" => Some(false),
        _ => None,
    }
}

/// Boolean accessor, `perfer-false` flavor: treats anything that isn't a
/// parseable `on`/`off` as absent, falling through each source in turn,
/// finally resolving to `false` if nothing parses.
#[must_use]
pub fn bool_prefer_false(tree: &Directive, path: &[&str], env_key: &str) -> bool {
    bool_with_default(tree, path, env_key, false)
}

/// Boolean accessor, `perfer-true` flavor — same precedence, default `true`.
#[must_use]
pub fn bool_prefer_true(tree: &Directive, path: &[&str], env_key: &str) -> bool {
    bool_with_default(tree, path, env_key, true)
}

fn bool_with_default(tree: &Directive, path: &[&str], env_key: &str, default: bool) -> bool {
    if let Some(v) = env_lookup(env_key).and_then(|v| parse_onoff(&v)) {
        return v;
    }
    if let Some(v) = tree_lookup(tree, path).and_then(parse_onoff) {
        return v;
    }
    default
}

/// Signed integer accessor.
#[must_use]
pub fn i64_value(tree: &Directive, path: &[&str], env_key: &str, default: i64) -> i64 {
    env_lookup(env_key)
        .and_then(|v| v.parse().ok())
        .or_else(|| tree_lookup(tree, path).and_then(|v| v.parse().ok()))
        .unwrap_or(default)
}

/// Unsigned integer accessor clamped to `[min, max]`, the way
/// `tcmalloc_release_rate` is clamped to `[0, 10]`.
#[must_use]
pub fn u64_clamped(tree: &Directive, path: &[&str], env_key: &str, default: u64, min: u64, max: u64) -> u64 {
    let raw = env_lookup(env_key)
        .and_then(|v| v.parse().ok())
        .or_else(|| tree_lookup(tree, path).and_then(|v| v.parse().ok()))
        .unwrap_or(default);
    raw.clamp(min, max)
}

/// Millisecond-duration accessor — the tree/env value is itself already in
/// milliseconds, matching the `*_MILLISECONDS` accessor family.
#[must_use]
pub fn duration_ms(tree: &Directive, path: &[&str], env_key: &str, default: std::time::Duration) -> std::time::Duration {
    let ms = i64_value(tree, path, env_key, default.as_millis() as i64).max(0);
    std::time::Duration::from_millis(ms as u64)
}

/// Second-duration accessor — the tree/env value is in seconds, matching
/// the `*_SECONDS` accessor family.
#[must_use]
pub fn duration_s(tree: &Directive, path: &[&str], env_key: &str, default: std::time::Duration) -> std::time::Duration {
    let s = i64_value(tree, path, env_key, default.as_secs() as i64).max(0);
    std::time::Duration::from_secs(s as u64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use std::sync::Mutex;

    // Accessor tests mutate process environment; serialize them so parallel
    // test threads don't race on the same variables.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn derive_env_key_lowercases_dots_then_uppercases() {
        assert_eq!(derive_env_key("heartbeat.interval"), "HEARTBEAT_INTERVAL");
        assert_eq!(derive_env_key("Vhost.Play.GopCache"), "VHOST_PLAY_GOPCACHE");
    }

    #[test]
    fn env_overrides_tree_which_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        let root = parse_str("max_connections 10;").unwrap();
        assert_eq!(i64_value(&root, &["max_connections"], "RC_TEST_MAXCONN_UNSET", 1), 10);

        std::env::set_var("RC_TEST_MAXCONN", "20");
        assert_eq!(i64_value(&root, &["max_connections"], "RC_TEST_MAXCONN", 1), 20);
        std::env::remove_var("RC_TEST_MAXCONN");

        let empty = crate::directive::Directive::root(vec![]);
        assert_eq!(i64_value(&empty, &["max_connections"], "RC_TEST_MAXCONN_UNSET2", 7), 7);
    }

    #[test]
    fn empty_env_var_does_not_override_the_tree() {
        let _guard = ENV_LOCK.lock().unwrap();
        let root = parse_str("max_connections 10;").unwrap();
        std::env::set_var("RC_TEST_MAXCONN_EMPTY", "");
        assert_eq!(i64_value(&root, &["max_connections"], "RC_TEST_MAXCONN_EMPTY", 1), 10);
        std::env::remove_var("RC_TEST_MAXCONN_EMPTY");
    }

    #[test]
    fn totality_fresh_engine_returns_compiled_defaults() {
        let empty = crate::directive::Directive::root(vec![]);
        assert_eq!(i64_value(&empty, &["whatever"], "RC_TEST_NOPE", 42), 42);
        assert!(!bool_prefer_false(&empty, &["whatever"], "RC_TEST_NOPE_BOOL"));
        assert!(bool_prefer_true(&empty, &["whatever"], "RC_TEST_NOPE_BOOL2"));
        assert_eq!(u64_clamped(&empty, &["whatever"], "RC_TEST_NOPE_U64", 5, 0, 10), 5);
    }

    #[test]
    fn u64_clamped_bounds_the_result() {
        let root = parse_str("tcmalloc_release_rate 99;").unwrap();
        assert_eq!(u64_clamped(&root, &["tcmalloc_release_rate"], "RC_TEST_NOPE3", 0, 0, 10), 10);
    }

    #[test]
    fn bool_accessor_flavors_differ_only_in_default() {
        let empty = crate::directive::Directive::root(vec![]);
        assert!(!bool_prefer_false(&empty, &["srt_to_rtmp"], "RC_TEST_NOPE4"));
        assert!(bool_prefer_true(&empty, &["srt_to_rtmp"], "RC_TEST_NOPE5"));
    }
}
