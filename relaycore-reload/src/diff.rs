//! Structural diff between the previous active tree and a reload
//! candidate, producing the ordered list of [`ReloadEvent`]s a dispatch
//! pass notifies subscribers of.

use crate::event::ReloadEvent;
use relaycore_config::Directive;
use relaycore_error::{core_err, CoreError, ErrorKind};
use std::collections::BTreeSet;

const DVR_EXCEPT: &[&str] = &["dvr_apply"];

fn vhost_enabled(v: &Directive) -> bool {
    v.get("enabled").and_then(|d| d.arg0()).map(|s| s != "off").unwrap_or(true)
}

fn vhost_names(root: &Directive) -> BTreeSet<String> {
    root.get_all("vhost").filter_map(|v| v.arg0().map(str::to_string)).collect()
}

fn find_vhost<'a>(root: &'a Directive, name: &str) -> Option<&'a Directive> {
    root.get_all("vhost").find(|v| v.arg0() == Some(name))
}

fn eq_child(a: Option<&Directive>, b: Option<&Directive>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

fn eq_child_except(a: Option<&Directive>, b: Option<&Directive>, except: &[&str]) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(a), Some(b)) => a.eq_except(b, except),
        _ => false,
    }
}

/// Runs the full comparison and returns the ordered event list, or an
/// error if a vhost's edge/origin mode changed — that case is not a hook,
/// it fails the reload outright.
pub fn diff(old: &Directive, new: &Directive) -> Result<Vec<ReloadEvent>, CoreError> {
    let mut events = Vec::new();

    if !eq_child(old.get("listen"), new.get("listen")) {
        events.push(ReloadEvent::Listen);
    }
    if !eq_child(old.get("max_connections"), new.get("max_connections")) {
        events.push(ReloadEvent::MaxConnections);
    }
    if !eq_child(old.get("pithy_print_ms"), new.get("pithy_print_ms")) {
        events.push(ReloadEvent::PithyPrintMs);
    }

    let old_rtc = old.get("rtc_server");
    let new_rtc = new.get("rtc_server");
    let both_enabled = |d: Option<&Directive>| d.map(|d| d.get("enabled").and_then(|e| e.arg0()) == Some("on")).unwrap_or(false);
    if both_enabled(old_rtc) && both_enabled(new_rtc) && !eq_child(old_rtc, new_rtc) {
        events.push(ReloadEvent::RtcServer);
    }

    for name in vhost_names(old).union(&vhost_names(new)) {
        let old_v = find_vhost(old, name);
        let new_v = find_vhost(new, name);
        let was_enabled = old_v.map(vhost_enabled).unwrap_or(false);
        let is_enabled = new_v.map(vhost_enabled).unwrap_or(false);

        match (was_enabled, is_enabled) {
            (false, true) => events.push(ReloadEvent::VhostAdded { vhost: name.clone() }),
            (true, false) => events.push(ReloadEvent::VhostRemoved { vhost: name.clone() }),
            (true, true) => diff_enabled_vhost(old_v.unwrap(), new_v.unwrap(), name, &mut events)?,
            (false, false) => {}
        }
    }

    Ok(events)
}

fn diff_enabled_vhost(
    old_v: &Directive,
    new_v: &Directive,
    name: &str,
    events: &mut Vec<ReloadEvent>,
) -> Result<(), CoreError> {
    let old_mode = old_v.get_path(&["cluster", "mode"]).and_then(Directive::arg0);
    let new_mode = new_v.get_path(&["cluster", "mode"]).and_then(Directive::arg0);
    if old_mode != new_mode {
        return Err(core_err!(
            ErrorKind::RtmpEdgeReload,
            "vhost '{name}' changed cluster.mode from {:?} to {:?}; edge/origin mode cannot be reloaded",
            old_mode,
            new_mode
        ));
    }

    macro_rules! leaf_field {
        ($field:literal, $variant:ident) => {
            if !eq_child(old_v.get($field), new_v.get($field)) {
                events.push(ReloadEvent::$variant { vhost: name.to_string() });
            }
        };
    }

    leaf_field!("chunk_size", VhostChunkSize);
    leaf_field!("tcp_nodelay", VhostTcpNodelay);
    leaf_field!("min_latency", VhostMinLatency);
    leaf_field!("play", VhostPlay);
    leaf_field!("forward", VhostForward);
    leaf_field!("dash", VhostDash);
    leaf_field!("hls", VhostHls);
    leaf_field!("hds", VhostHds);
    leaf_field!("exec", VhostExec);
    leaf_field!("publish", VhostPublish);

    if !eq_child_except(old_v.get("dvr"), new_v.get("dvr"), DVR_EXCEPT) {
        events.push(ReloadEvent::VhostDvr { vhost: name.to_string() });
    }

    if !transcode_entries(old_v).eq(&transcode_entries(new_v)) {
        events.push(ReloadEvent::VhostTranscode { vhost: name.to_string() });
    }

    diff_ingests(old_v, new_v, name, events);

    Ok(())
}

/// Canonical `(id, serialized-children)` pairs for every `transcode` entry,
/// comparable without requiring `Directive` to implement `Ord` itself.
fn transcode_entries(vhost: &Directive) -> BTreeSet<(String, String)> {
    vhost
        .get_all("transcode")
        .map(|t| (t.arg0().unwrap_or_default().to_string(), format!("{:?}", t.children)))
        .collect()
}

fn ingest_ids(vhost: &Directive) -> BTreeSet<String> {
    vhost.get_all("ingest").filter_map(|i| i.arg0().map(str::to_string)).collect()
}

fn find_ingest<'a>(vhost: &'a Directive, id: &str) -> Option<&'a Directive> {
    vhost.get_all("ingest").find(|i| i.arg0() == Some(id))
}

fn diff_ingests(old_v: &Directive, new_v: &Directive, vhost: &str, events: &mut Vec<ReloadEvent>) {
    let old_ids = ingest_ids(old_v);
    let new_ids = ingest_ids(new_v);
    for id in new_ids.difference(&old_ids) {
        events.push(ReloadEvent::IngestAdded { vhost: vhost.to_string(), id: id.clone() });
    }
    for id in old_ids.difference(&new_ids) {
        events.push(ReloadEvent::IngestRemoved { vhost: vhost.to_string(), id: id.clone() });
    }
    for id in old_ids.intersection(&new_ids) {
        let old_i = find_ingest(old_v, id);
        let new_i = find_ingest(new_v, id);
        if !eq_child(old_i, new_i) {
            events.push(ReloadEvent::IngestUpdated { vhost: vhost.to_string(), id: id.clone() });
        }
    }
}
