//! Legacy-directive transformer: runs once, after parsing and before
//! validation, rewriting older directive shapes into their canonical form.
//! Idempotent — applying it to an already-canonical tree is a no-op — and
//! semantically preserving: a legacy accessor reading the pre-transform
//! tree must observe the same effective value the canonical accessor reads
//! post-transform.
//!
//! Every rule below takes its child out of the tree with [`take_child`]
//! before re-inserting it under its new name/parent, which is what makes a
//! second pass a no-op for free: the second pass finds nothing left to
//! rewrite.

use crate::directive::Directive;

fn take_child(children: &mut Vec<Directive>, name: &str) -> Option<Directive> {
    children.iter().position(|c| c.name == name).map(|idx| children.remove(idx))
}

fn remove_children_named(children: &mut Vec<Directive>, name: &str) {
    children.retain(|c| c.name != name);
}

fn rename_children(children: &mut [Directive], old: &str, new: &str) {
    for c in children.iter_mut() {
        if c.name == old {
            c.name = new.to_string();
        }
    }
}

fn get_or_create_block<'a>(children: &'a mut Vec<Directive>, name: &str) -> &'a mut Directive {
    if !children.iter().any(|c| c.name == name) {
        children.push(Directive::block(name, vec![], vec![], 0));
    }
    children.iter_mut().find(|c| c.name == name).unwrap()
}

/// Moves `child_name` from `src` into `dst` unchanged, under the same name.
fn move_into(src: &mut Vec<Directive>, dst: &mut Vec<Directive>, child_name: &str) {
    if let Some(d) = take_child(src, child_name) {
        dst.push(d);
    }
}

/// Moves `child_name` from `src` into `dst`, renaming it to `new_name`.
fn move_rename_into(src: &mut Vec<Directive>, dst: &mut Vec<Directive>, child_name: &str, new_name: &str) {
    if let Some(mut d) = take_child(src, child_name) {
        d.name = new_name.to_string();
        dst.push(d);
    }
}

/// Top-level entry point: runs every rule, in document order where it
/// matters (none of the rules below depend on another's output, so order
/// among them is otherwise immaterial).
pub fn transform(root: Directive) -> Directive {
    let mut root = root;
    rename_children(&mut root.children, "http_stream", "http_server");

    if let Some(rtc_server) = root.children.iter_mut().find(|c| c.name == "rtc_server") {
        remove_children_named(&mut rtc_server.children, "perf_stat");
        remove_children_named(&mut rtc_server.children, "queue_length");
    }

    for stream_caster in root.children.iter_mut().filter(|c| c.name == "stream_caster") {
        transform_stream_caster(stream_caster);
    }

    for vhost in root.children.iter_mut().filter(|c| c.name == "vhost") {
        transform_vhost(vhost);
    }

    root
}

const SIP_DROPPED_FIELDS: &[&str] = &[
    "serial",
    "realm",
    "ack_timeout",
    "keepalive_timeout",
    "invite_port_fixed",
    "query_catalog_interval",
    "auto_play",
];

const CASTER_DROPPED_FIELDS: &[&str] = &[
    "tcp_enable",
    "rtp_port_min",
    "rtp_port_max",
    "wait_keyframe",
    "rtp_idle_timeout",
    "audio_enable",
    "auto_create_channel",
];

fn transform_stream_caster(caster: &mut Directive) {
    for field in CASTER_DROPPED_FIELDS {
        if take_child(&mut caster.children, field).is_some() {
            tracing::warn!(field, "dropping removed stream_caster field during config transform");
        }
    }
    if let Some(sip) = caster.children.iter_mut().find(|c| c.name == "sip") {
        for field in SIP_DROPPED_FIELDS {
            if take_child(&mut sip.children, field).is_some() {
                tracing::warn!(field, "dropping removed stream_caster.sip field during config transform");
            }
        }
    }
    if let Some(host) = take_child(&mut caster.children, "host") {
        let sip = get_or_create_block(&mut caster.children, "sip");
        sip.children.push(Directive::leaf("candidate", host.args, host.line));
    }
}

const PLAY_GROUP_FIELDS: &[&str] = &[
    "time_jitter",
    "mix_correct",
    "atc",
    "atc_auto",
    "mw_latency",
    "gop_cache",
    "queue_length",
    "send_min_interval",
    "reduce_sequence_header",
];

const CLUSTER_GROUP_FIELDS: &[&str] = &["mode", "origin", "token_traverse", "vhost", "debug_srs_upnode"];

fn transform_vhost(vhost: &mut Directive) {
    rename_children(&mut vhost.children, "http", "http_static");

    if let Some(http_remux) = vhost.children.iter_mut().find(|c| c.name == "http_remux") {
        remove_children_named(&mut http_remux.children, "hstrs");
    }

    transform_refer_merge(vhost);

    if let Some(mr) = take_child(&mut vhost.children, "mr") {
        let publish = get_or_create_block(&mut vhost.children, "publish");
        if let Some(enabled) = mr.children.iter().find(|c| c.name == "enabled") {
            publish.children.push(Directive::leaf("mr", enabled.args.clone(), enabled.line));
        }
        if let Some(latency) = mr.children.iter().find(|c| c.name == "latency") {
            publish.children.push(Directive::leaf("mr_latency", latency.args.clone(), latency.line));
        }
    }
    {
        let mut dst: Vec<Directive> = Vec::new();
        move_rename_into(&mut vhost.children, &mut dst, "publish_1stpkt_timeout", "firstpkt_timeout");
        move_rename_into(&mut vhost.children, &mut dst, "publish_normal_timeout", "normal_timeout");
        if !dst.is_empty() {
            get_or_create_block(&mut vhost.children, "publish").children.extend(dst);
        }
    }

    {
        let mut dst: Vec<Directive> = Vec::new();
        for field in PLAY_GROUP_FIELDS {
            move_into(&mut vhost.children, &mut dst, field);
        }
        if !dst.is_empty() {
            get_or_create_block(&mut vhost.children, "play").children.extend(dst);
        }
    }

    if let Some(forward) = take_child(&mut vhost.children, "forward") {
        if !forward.is_block {
            let block = Directive::block(
                "forward",
                vec![],
                vec![
                    Directive::leaf("enabled", vec!["on".to_string()], forward.line),
                    Directive::leaf("destination", forward.args, forward.line),
                ],
                forward.line,
            );
            vhost.children.push(block);
        } else {
            vhost.children.push(forward);
        }
    }

    {
        let mut dst: Vec<Directive> = Vec::new();
        for field in CLUSTER_GROUP_FIELDS {
            move_into(&mut vhost.children, &mut dst, field);
        }
        if !dst.is_empty() {
            get_or_create_block(&mut vhost.children, "cluster").children.extend(dst);
        }
    }

    transform_rtc(vhost);
}

fn transform_refer_merge(vhost: &mut Directive) {
    let play_leaf = take_child(&mut vhost.children, "refer_play");
    let publish_leaf = take_child(&mut vhost.children, "refer_publish");
    let refer_leaf_idx = vhost.children.iter().position(|c| c.name == "refer" && !c.is_block);
    let refer_leaf_val = refer_leaf_idx.map(|idx| vhost.children.remove(idx));

    if refer_leaf_val.is_none() && play_leaf.is_none() && publish_leaf.is_none() {
        return;
    }
    let refer = get_or_create_block(&mut vhost.children, "refer");
    if let Some(d) = refer_leaf_val {
        refer.children.push(Directive::leaf("enabled", vec!["on".to_string()], d.line));
        refer.children.push(Directive::leaf("all", d.args, d.line));
    }
    if let Some(d) = play_leaf {
        refer.children.push(Directive::leaf("play", d.args, d.line));
    }
    if let Some(d) = publish_leaf {
        refer.children.push(Directive::leaf("publish", d.args, d.line));
    }
}

fn transform_rtc(vhost: &mut Directive) {
    if let Some(nack) = take_child(&mut vhost.children, "nack") {
        let rtc = get_or_create_block(&mut vhost.children, "rtc");
        if let Some(enabled) = nack.children.iter().find(|c| c.name == "enabled") {
            rtc.children.push(Directive::leaf("nack", enabled.args.clone(), enabled.line));
        }
        if let Some(no_copy) = nack.children.iter().find(|c| c.name == "no_copy") {
            rtc.children.push(Directive::leaf("nack_no_copy", no_copy.args.clone(), no_copy.line));
        }
    }
    if let Some(twcc) = take_child(&mut vhost.children, "twcc") {
        let rtc = get_or_create_block(&mut vhost.children, "rtc");
        if let Some(enabled) = twcc.children.iter().find(|c| c.name == "enabled") {
            rtc.children.push(Directive::leaf("twcc", enabled.args.clone(), enabled.line));
        }
    }

    if let Some(rtc) = vhost.children.iter_mut().find(|c| c.name == "rtc") {
        if let Some(aac) = rtc.children.iter_mut().find(|c| c.name == "aac") {
            let on = aac.arg0() == Some("transcode");
            aac.name = "rtmp_to_rtc".to_string();
            aac.args = vec![if on { "on" } else { "off" }.to_string()];
        }
        if let Some(bframe) = rtc.children.iter_mut().find(|c| c.name == "bframe") {
            let on = bframe.arg0() == Some("keep");
            bframe.name = "keep_bframe".to_string();
            bframe.args = vec![if on { "on" } else { "off" }.to_string()];
        }
    }
}
