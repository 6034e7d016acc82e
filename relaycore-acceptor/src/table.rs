//! Builds the set of listeners the server binds at startup from the active
//! config tree: which logical listeners are enabled, and which pairs of
//! them share a physical port (HTTP API over the HTTP server, WebRTC-TCP
//! over HTTP/S) and so collapse into one bind with a demux rule instead of
//! two.

use relaycore_config::Directive;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};

/// What a physical listener demuxes accepted connections into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Demux {
    /// Every connection on this listener gets the same label.
    Single(&'static str),
    /// Peek the first bytes to tell a WebRTC-over-TCP client from an
    /// ordinary HTTP request; `http_label` is what non-STUN traffic gets.
    WebrtcOrHttp { http_label: &'static str },
}

#[derive(Debug, Clone)]
pub struct ListenerEntry {
    pub bind: SocketAddr,
    pub demux: Demux,
    /// Human-readable name for logs, matching the label conventions of
    /// the system this was ported from (`RTMP`, `HTTP-API`, ...).
    pub display_name: String,
}

fn parse_endpoint(raw: &str) -> Option<SocketAddr> {
    let (host, port) = match raw.rsplit_once(':') {
        Some((h, p)) => (h, p),
        None => ("*", raw),
    };
    let port: u16 = port.parse().ok()?;
    let ip = if host == "*" || host.is_empty() {
        IpAddr::V4(Ipv4Addr::UNSPECIFIED)
    } else {
        host.parse().ok()?
    };
    Some(SocketAddr::new(ip, port))
}

fn enabled(block: Option<&Directive>) -> bool {
    block.and_then(|d| d.get("enabled")).and_then(relaycore_config::Directive::arg0).map(|v| v == "on").unwrap_or(false)
}

fn listen_of(block: Option<&Directive>) -> Option<SocketAddr> {
    block.and_then(|d| d.get("listen")).and_then(relaycore_config::Directive::arg0).and_then(parse_endpoint)
}

/// Builds the listener table from the active tree. Returns one entry per
/// physical bind — reused endpoints (API over server, WebRTC over
/// HTTP/HTTPS) collapse into a single entry with a [`Demux`] rule instead
/// of appearing twice.
#[must_use]
pub fn build_listener_table(root: &Directive) -> Vec<ListenerEntry> {
    let mut entries = Vec::new();

    for listen in root.get_all("listen") {
        for arg in &listen.args {
            if let Some(bind) = parse_endpoint(arg) {
                entries.push(ListenerEntry { bind, demux: Demux::Single("rtmp"), display_name: "RTMP".to_string() });
            }
        }
    }

    if enabled(root.get("service_server")) {
        if let Some(bind) = listen_of(root.get("service_server")) {
            entries.push(ListenerEntry { bind, demux: Demux::Single("service"), display_name: "SERVICE".to_string() });
        }
    }

    let http_server = root.get("http_server");
    let https_server = root.get("https_server");
    let http_listen = listen_of(http_server);
    let https_listen = listen_of(https_server);

    let http_api = root.get("http_api");
    let https_api = root.get("https_api");
    let reuse_api_over_server = enabled(http_server)
        && enabled(http_api)
        && listen_of(http_api).is_some()
        && listen_of(http_api) == http_listen
        && (!enabled(https_api) || listen_of(https_api) == https_listen);

    if enabled(http_api) && !reuse_api_over_server {
        if let Some(bind) = listen_of(http_api) {
            entries.push(ListenerEntry { bind, demux: Demux::Single("http_api"), display_name: "HTTP-API".to_string() });
        }
    }
    if enabled(https_api) && !reuse_api_over_server {
        if let Some(bind) = listen_of(https_api) {
            entries.push(ListenerEntry { bind, demux: Demux::Single("https_api"), display_name: "HTTPS-API".to_string() });
        }
    } else if enabled(https_api) && reuse_api_over_server {
        tracing::info!(endpoint = ?listen_of(https_api), "HTTPS-API reuses the HTTPS server listener");
    }
    if enabled(http_api) && reuse_api_over_server {
        tracing::info!(endpoint = ?http_listen, "HTTP-API reuses the HTTP server listener");
    }

    let rtc_server = root.get("rtc_server");
    let rtc_tcp = rtc_server.and_then(|d| d.get("tcp"));
    let rtc_tcp_enabled = enabled(rtc_server) && enabled(rtc_tcp);
    let rtc_tcp_listen = listen_of(rtc_tcp);

    let reuse_rtc_over_http = rtc_tcp_enabled && enabled(http_server) && rtc_tcp_listen == http_listen;
    let reuse_rtc_over_https = rtc_tcp_enabled && enabled(https_server) && rtc_tcp_listen == https_listen;

    if enabled(http_server) {
        if let Some(bind) = http_listen {
            let demux = if reuse_rtc_over_http {
                tracing::info!(?bind, "WebRTC-over-TCP reuses the HTTP server listener");
                Demux::WebrtcOrHttp { http_label: "http_server" }
            } else {
                Demux::Single("http_server")
            };
            entries.push(ListenerEntry { bind, demux, display_name: "HTTP-Server".to_string() });
        }
    }
    if enabled(https_server) {
        if let Some(bind) = https_listen {
            let demux = if reuse_rtc_over_https {
                tracing::info!(?bind, "WebRTC-over-TCP reuses the HTTPS server listener");
                Demux::WebrtcOrHttp { http_label: "https_server" }
            } else {
                Demux::Single("https_server")
            };
            entries.push(ListenerEntry { bind, demux, display_name: "HTTPS-Server".to_string() });
        }
    }

    if rtc_tcp_enabled && !reuse_rtc_over_http && !reuse_rtc_over_https {
        if let Some(bind) = rtc_tcp_listen {
            entries.push(ListenerEntry { bind, demux: Demux::Single("webrtc_tcp"), display_name: "WebRTC".to_string() });
        }
    }

    for caster in root.get_all("stream_caster") {
        if !enabled(Some(caster)) {
            continue;
        }
        if let Some(listen) = caster.get("listen").and_then(relaycore_config::Directive::arg0).and_then(parse_endpoint) {
            entries.push(ListenerEntry { bind: listen, demux: Demux::Single("stream_caster"), display_name: "StreamCaster".to_string() });
        }
    }

    if enabled(root.get("exporter")) {
        if let Some(bind) = listen_of(root.get("exporter")) {
            entries.push(ListenerEntry { bind, demux: Demux::Single("exporter"), display_name: "Exporter-Server".to_string() });
        }
    }

    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use relaycore_config::{parser::parse_str, transformer::transform};

    fn tree(src: &str) -> Directive {
        transform(parse_str(src).unwrap())
    }

    #[test]
    fn rtmp_listener_is_always_present() {
        let root = tree("listen 1935;");
        let table = build_listener_table(&root);
        assert!(table.iter().any(|e| e.display_name == "RTMP" && e.bind.port() == 1935));
    }

    #[test]
    fn multiple_listen_args_each_bind_their_own_rtmp_listener() {
        let root = tree("listen 1935 1936;");
        let table = build_listener_table(&root);
        let rtmp: Vec<_> = table.iter().filter(|e| e.display_name == "RTMP").collect();
        assert_eq!(rtmp.len(), 2);
    }

    #[test]
    fn http_api_sharing_the_http_server_endpoint_is_reused_not_duplicated() {
        let root = tree(
            r#"
            listen 1935;
            http_server { enabled on; listen 8080; }
            http_api { enabled on; listen 8080; }
        "#,
        );
        let table = build_listener_table(&root);
        assert_eq!(table.iter().filter(|e| e.bind.port() == 8080).count(), 1);
        assert!(!table.iter().any(|e| e.display_name == "HTTP-API"));
    }

    #[test]
    fn http_api_on_its_own_endpoint_gets_its_own_listener() {
        let root = tree(
            r#"
            listen 1935;
            http_server { enabled on; listen 8080; }
            http_api { enabled on; listen 1985; }
        "#,
        );
        let table = build_listener_table(&root);
        assert!(table.iter().any(|e| e.display_name == "HTTP-API" && e.bind.port() == 1985));
    }

    #[test]
    fn webrtc_tcp_sharing_http_server_endpoint_demuxes_instead_of_binding_twice() {
        let root = tree(
            r#"
            listen 1935;
            http_server { enabled on; listen 8000; }
            rtc_server { enabled on; tcp { enabled on; listen 8000; } }
        "#,
        );
        let table = build_listener_table(&root);
        let http_entry = table.iter().find(|e| e.bind.port() == 8000).unwrap();
        assert!(matches!(http_entry.demux, Demux::WebrtcOrHttp { .. }));
        assert!(!table.iter().any(|e| e.display_name == "WebRTC"));
    }

    #[test]
    fn webrtc_tcp_on_its_own_endpoint_gets_its_own_listener() {
        let root = tree(
            r#"
            listen 1935;
            rtc_server { enabled on; tcp { enabled on; listen 8000; } }
        "#,
        );
        let table = build_listener_table(&root);
        assert!(table.iter().any(|e| e.display_name == "WebRTC" && e.bind.port() == 8000));
    }

    #[test]
    fn disabled_optional_listeners_are_absent() {
        let root = tree("listen 1935;\nhttp_server { enabled off; listen 8080; }\n");
        let table = build_listener_table(&root);
        assert!(!table.iter().any(|e| e.display_name == "HTTP-Server"));
    }
}
