//! Schema and semantic validation: runs after the transformer, before the
//! candidate tree is allowed to become active. Unknown directive names are
//! always fatal; the remaining rules below are mostly fatal but a few are
//! warn-only, as noted per rule.

use crate::directive::Directive;
use relaycore_error::{core_err, CoreError, ErrorKind};
use std::net::IpAddr;

/// System facts the validator needs but must not query for itself — kept
/// as explicit inputs so validation stays a pure function of its
/// arguments and is trivial to exercise in tests.
#[derive(Debug, Clone, Copy)]
pub struct ValidateOptions {
    /// Set when the process is running in env-only mode (`-e`): `listen`
    /// is then not required to appear in the tree.
    pub env_only: bool,
    /// Number of local network interfaces, for bounding `stats.network`.
    pub local_interface_count: u32,
    /// The platform's open-file-descriptor ceiling (`OPEN_MAX`), for the
    /// `max_connections` FD budget check.
    pub open_max: u64,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self { env_only: false, local_interface_count: 1, open_max: 65536 }
    }
}

const ROOT_KNOWN: &[&str] = &[
    "listen",
    "max_connections",
    "pithy_print_ms",
    "daemon",
    "asprocess",
    "work_dir",
    "pid",
    "pid_file",
    "server_id",
    "utc_time",
    "chunk_size",
    "heartbeat",
    "stats",
    "http_api",
    "https_api",
    "http_server",
    "https_server",
    "http_stream",
    "rtc_server",
    "webrtc",
    "service_server",
    "exporter",
    "stream_caster",
    "vhost",
    "log_level",
    "log_file",
    "log_tank",
    "log_format",
    "ff_log_dir",
    "srt_server",
    "empty_ip_ok",
    "grace_start_wait",
    "grace_final_wait",
    "force_grace_quit",
];

const HEARTBEAT_KNOWN: &[&str] = &["enabled", "interval", "url", "device_id", "summaries"];
const STATS_KNOWN: &[&str] = &["network", "disk"];

const VHOST_KNOWN: &[&str] = &[
    "enabled",
    "chunk_size",
    "tcp_nodelay",
    "min_latency",
    "play",
    "forward",
    "dash",
    "hls",
    "hds",
    "dvr",
    "exec",
    "publish",
    "http_static",
    "http_remux",
    "hls_keys",
    "refer",
    "cluster",
    "rtc",
    "transcode",
    "ingest",
    "security",
    "bandcheck",
];

const STREAM_CASTER_KNOWN: &[&str] =
    &["enabled", "caster", "output", "listen", "sip", "rtp_port_min", "rtp_port_max"];

pub struct ValidationReport {
    pub warnings: Vec<String>,
}

pub fn validate(root: &Directive, opts: &ValidateOptions) -> Result<ValidationReport, CoreError> {
    let mut warnings = Vec::new();
    check_known(&root.children, ROOT_KNOWN, "root")?;

    if !opts.env_only && root.get("listen").is_none() {
        return Err(core_err!(ErrorKind::SystemConfigInvalid, "'listen' is required unless running in env-only mode"));
    }
    for listen in root.get_all("listen") {
        for endpoint in &listen.args {
            validate_listen_endpoint(endpoint)?;
        }
    }

    if let Some(heartbeat) = root.get("heartbeat") {
        check_known(&heartbeat.children, HEARTBEAT_KNOWN, "heartbeat")?;
        if let Some(interval) = heartbeat.get("interval").and_then(|d| d.arg0()) {
            let v: i64 = interval
                .parse()
                .map_err(|_| core_err!(ErrorKind::SystemConfigInvalid, "heartbeat.interval '{interval}' is not an integer"))?;
            if v <= 0 {
                return Err(core_err!(ErrorKind::SystemConfigInvalid, "heartbeat.interval must be > 0, got {v}"));
            }
        }
    }

    if let Some(stats) = root.get("stats") {
        check_known(&stats.children, STATS_KNOWN, "stats")?;
        if let Some(network) = stats.get("network").and_then(|d| d.arg0()) {
            let v: i64 = network
                .parse()
                .map_err(|_| core_err!(ErrorKind::SystemConfigInvalid, "stats.network '{network}' is not an integer"))?;
            if v < 0 || v as u32 >= opts.local_interface_count.max(1) {
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "stats.network={v} is out of range [0, {})",
                    opts.local_interface_count
                ));
            }
        }
    }

    validate_http_https_endpoint_sharing(root)?;

    if present_and_enabled(root.get("https_server")) && !present_and_enabled(root.get("http_server")) {
        return Err(core_err!(ErrorKind::SystemConfigInvalid, "https_server requires http_server to be enabled"));
    }
    if present_and_enabled(root.get("https_api")) && !present_and_enabled(root.get("http_api")) {
        return Err(core_err!(ErrorKind::SystemConfigInvalid, "https_api requires http_api to be enabled"));
    }

    if root.get("log_tank").and_then(|d| d.arg0()) == Some("file") {
        let path_empty = root.get("log_file").and_then(|d| d.arg0()).map(str::is_empty).unwrap_or(true);
        if path_empty {
            return Err(core_err!(ErrorKind::SystemConfigInvalid, "log_tank file requires a non-empty log_file path"));
        }
    }

    if present_and_enabled_leaf(root.get("asprocess")) && present_and_enabled_leaf(root.get("daemon")) {
        return Err(core_err!(ErrorKind::SystemConfigInvalid, "asprocess and daemon are mutually exclusive"));
    }

    if let Some(max_conn) = root.get("max_connections").and_then(|d| d.arg0()) {
        let v: u64 = max_conn
            .parse()
            .map_err(|_| core_err!(ErrorKind::SystemConfigInvalid, "max_connections '{max_conn}' is not an integer"))?;
        if v + 128 >= opts.open_max {
            return Err(core_err!(
                ErrorKind::SystemConfigInvalid,
                "max_connections={v} leaves no headroom under the open-file-descriptor ceiling {}",
                opts.open_max
            ));
        }
    }

    for stream_caster in root.get_all("stream_caster") {
        check_known(&stream_caster.children, STREAM_CASTER_KNOWN, "stream_caster")?;
    }

    for vhost in root.get_all("vhost") {
        check_known(&vhost.children, VHOST_KNOWN, "vhost")?;
        validate_vhost(vhost, &mut warnings)?;
    }

    Ok(ValidationReport { warnings })
}

fn validate_vhost(vhost: &Directive, warnings: &mut Vec<String>) -> Result<(), CoreError> {
    if let Some(chunk_size) = vhost.get("chunk_size").and_then(|d| d.arg0()) {
        let v: i64 = chunk_size
            .parse()
            .map_err(|_| core_err!(ErrorKind::SystemConfigInvalid, "vhost.chunk_size '{chunk_size}' is not an integer"))?;
        if !(128..=65536).contains(&v) {
            warnings.push(format!(
                "vhost '{}' chunk_size={v} is outside the recommended range [128, 65536]",
                vhost.arg0().unwrap_or("?")
            ));
        }
    }

    if let Some(ingests) = Some(vhost.get_all("ingest").collect::<Vec<_>>()).filter(|v| !v.is_empty()) {
        let mut seen = std::collections::HashSet::new();
        for ingest in &ingests {
            let id = ingest.arg0().unwrap_or_default();
            if !seen.insert(id) {
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "duplicate ingest id '{id}' in vhost '{}'",
                    vhost.arg0().unwrap_or("?")
                ));
            }
        }
    }

    Ok(())
}

fn present_and_enabled(d: Option<&Directive>) -> bool {
    match d {
        None => false,
        Some(d) => d.get("enabled").and_then(|e| e.arg0()).map(|v| v == "on").unwrap_or(false),
    }
}

fn present_and_enabled_leaf(d: Option<&Directive>) -> bool {
    matches!(d.and_then(|d| d.arg0()), Some("on"))
}

/// If the HTTP API and HTTP server share a listen endpoint, their HTTPS
/// counterparts must share theirs too, and conversely — the reuse decision
/// has to be made consistently on both sides of the TLS split.
fn validate_http_https_endpoint_sharing(root: &Directive) -> Result<(), CoreError> {
    let http_shares = shares_endpoint(root.get("http_api"), root.get("http_server"));
    let https_shares = shares_endpoint(root.get("https_api"), root.get("https_server"));
    if let (Some(http_shares), Some(https_shares)) = (http_shares, https_shares) {
        if http_shares != https_shares {
            return Err(core_err!(
                ErrorKind::SystemConfigInvalid,
                "http_api/http_server and https_api/https_server must agree on whether they share a listen endpoint"
            ));
        }
    }
    Ok(())
}

/// `None` when either side is absent or lacks a `listen` endpoint, meaning
/// the pair isn't comparable and the caller should skip the check.
fn shares_endpoint(a: Option<&Directive>, b: Option<&Directive>) -> Option<bool> {
    let a_listen = a?.get("listen").and_then(|d| d.arg0())?;
    let b_listen = b?.get("listen").and_then(|d| d.arg0())?;
    Some(a_listen == b_listen)
}

fn validate_listen_endpoint(endpoint: &str) -> Result<(), CoreError> {
    let (host, port) = match endpoint.rsplit_once(':') {
        Some((h, p)) => (Some(h), p),
        None => (None, endpoint),
    };
    let port: u32 = port
        .parse()
        .map_err(|_| core_err!(ErrorKind::SystemConfigInvalid, "listen endpoint '{endpoint}' has a non-numeric port"))?;
    if port == 0 {
        return Err(core_err!(ErrorKind::SystemConfigInvalid, "listen endpoint '{endpoint}' must use a port > 0"));
    }
    if let Some(host) = host {
        if host != "*" && host.parse::<IpAddr>().is_err() {
            return Err(core_err!(
                ErrorKind::SystemConfigInvalid,
                "listen endpoint '{endpoint}' has a host that is neither '*' nor a valid IP literal"
            ));
        }
    }
    Ok(())
}

fn check_known(children: &[Directive], known: &[&str], level: &str) -> Result<(), CoreError> {
    for child in children {
        if !known.contains(&child.name.as_str()) {
            return Err(core_err!(
                ErrorKind::SystemConfigInvalid,
                "unknown directive '{}' at line {} (not valid inside {level})",
                child.name,
                child.line
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;
    use crate::transformer::transform;

    fn validate_src(src: &str, opts: &ValidateOptions) -> Result<ValidationReport, CoreError> {
        let root = transform(parse_str(src).unwrap());
        validate(&root, opts)
    }

    #[test]
    fn minimal_valid_config_passes() {
        let src = r#"
            listen 1935;
            max_connections 1000;
            vhost __defaultVhost__ {
                refer on;
            }
        "#;
        let report = validate_src(src, &ValidateOptions::default()).unwrap();
        assert!(report.warnings.is_empty());
    }

    #[test]
    fn unknown_directive_is_rejected() {
        let src = "listen 1935;\nbogus_directive 1;\n";
        assert!(validate_src(src, &ValidateOptions::default()).is_err());
    }

    #[test]
    fn missing_listen_is_rejected_unless_env_only() {
        let src = "max_connections 10;";
        assert!(validate_src(src, &ValidateOptions::default()).is_err());
        let opts = ValidateOptions { env_only: true, ..Default::default() };
        assert!(validate_src(src, &opts).is_ok());
    }

    #[test]
    fn listen_endpoint_syntax_is_checked() {
        assert!(validate_listen_endpoint("1935").is_ok());
        assert!(validate_listen_endpoint("*:1935").is_ok());
        assert!(validate_listen_endpoint("127.0.0.1:1935").is_ok());
        assert!(validate_listen_endpoint("127.0.0.1:0").is_err());
        assert!(validate_listen_endpoint("not-an-ip:1935").is_err());
    }

    #[test]
    fn chunk_size_out_of_range_is_warning_only() {
        let src = "listen 1935;\nvhost foo { chunk_size 99999; }\n";
        let report = validate_src(src, &ValidateOptions::default()).unwrap();
        assert_eq!(report.warnings.len(), 1);
    }

    #[test]
    fn duplicate_ingest_ids_are_rejected() {
        let src = r#"
            listen 1935;
            vhost foo {
                ingest cam1 { enabled on; }
                ingest cam1 { enabled off; }
            }
        "#;
        assert!(validate_src(src, &ValidateOptions::default()).is_err());
    }

    #[test]
    fn asprocess_and_daemon_are_mutually_exclusive() {
        let src = "listen 1935;\nasprocess on;\ndaemon on;\n";
        assert!(validate_src(src, &ValidateOptions::default()).is_err());
    }

    #[test]
    fn http_https_endpoint_sharing_must_agree_across_the_tls_split() {
        let shared = r#"
            listen 1935;
            http_api { listen 127.0.0.1:8080; }
            http_server { listen 127.0.0.1:8080; }
            https_api { listen 127.0.0.1:8443; }
            https_server { listen 127.0.0.1:8443; }
        "#;
        assert!(validate_src(shared, &ValidateOptions::default()).is_ok());

        let separate = r#"
            listen 1935;
            http_api { listen 127.0.0.1:8080; }
            http_server { listen 127.0.0.1:8081; }
            https_api { listen 127.0.0.1:8443; }
            https_server { listen 127.0.0.1:8444; }
        "#;
        assert!(validate_src(separate, &ValidateOptions::default()).is_ok());

        let mismatched = r#"
            listen 1935;
            http_api { listen 127.0.0.1:8080; }
            http_server { listen 127.0.0.1:8080; }
            https_api { listen 127.0.0.1:8443; }
            https_server { listen 127.0.0.1:8444; }
        "#;
        assert!(validate_src(mismatched, &ValidateOptions::default()).is_err());
    }

    #[test]
    fn max_connections_fd_budget_is_checked() {
        let src = "listen 1935;\nmax_connections 100;\n";
        let opts = ValidateOptions { open_max: 200, ..Default::default() };
        assert!(validate_src(src, &opts).is_err());
        let opts = ValidateOptions { open_max: 100_000, ..Default::default() };
        assert!(validate_src(src, &opts).is_ok());
    }
}
