//! Serializes a directive tree back to the on-disk grammar: 4-space indent
//! per level, a leaf as `name args;`, a block as `name args {` / children /
//! `}`, no comments, no blank lines, and quoting only where an argument
//! actually needs it. `persist_to_file` writes through a temp file in the
//! same directory and renames over the target so a reader never observes a
//! partially written config.

use crate::directive::Directive;
use relaycore_error::{core_err, CoreError, ErrorKind};
use std::path::Path;

const INDENT: &str = "    ";

fn needs_quoting(arg: &str) -> bool {
    arg.is_empty() || arg.chars().any(|c| c.is_whitespace() || matches!(c, ';' | '{' | '}' | '#' | '"' | '\''))
}

/// Quotes `arg` if it needs it. The grammar recognizes no escape sequences
/// inside a quoted token, so an argument containing a `"` is wrapped in
/// `'...'` instead when possible, keeping the result re-parseable without
/// inventing an escape the parser doesn't understand.
fn quote(arg: &str) -> String {
    if !needs_quoting(arg) {
        return arg.to_string();
    }
    if arg.contains('"') && !arg.contains('\'') {
        format!("'{arg}'")
    } else {
        format!("\"{arg}\"")
    }
}

fn write_directive(out: &mut String, d: &Directive, depth: usize) {
    let indent = INDENT.repeat(depth);
    out.push_str(&indent);
    out.push_str(&d.name);
    for a in &d.args {
        out.push(' ');
        out.push_str(&quote(a));
    }
    if d.is_block {
        out.push_str(" {\n");
        for child in &d.children {
            write_directive(out, child, depth + 1);
        }
        out.push_str(&indent);
        out.push_str("}\n");
    } else {
        out.push_str(";\n");
    }
}

/// Serializes every child of `root` (the synthetic root itself emits
/// nothing) at indent depth 0.
#[must_use]
pub fn serialize(root: &Directive) -> String {
    let mut out = String::new();
    for child in &root.children {
        write_directive(&mut out, child, 0);
    }
    out
}

/// Serializes `root` and atomically replaces the file at `path` with it:
/// writes to a sibling temp file, then renames over `path`.
pub fn persist_to_file(root: &Directive, path: &Path) -> Result<(), CoreError> {
    let text = serialize(root);
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    let file_name = path.file_name().and_then(|n| n.to_str()).unwrap_or("config");
    let tmp_path = dir.join(format!(".{file_name}.tmp"));

    std::fs::write(&tmp_path, &text).map_err(|e| {
        core_err!(
            ErrorKind::SystemConfigPersistence,
            "failed writing temp config file '{}': {e}",
            tmp_path.display()
        )
    })?;

    std::fs::rename(&tmp_path, path).map_err(|e| {
        let _ = std::fs::remove_file(&tmp_path);
        core_err!(
            ErrorKind::SystemConfigPersistence,
            "failed renaming temp config file '{}' over '{}': {e}",
            tmp_path.display(),
            path.display()
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_str;

    #[test]
    fn round_trip_parse_persist_parse_is_structurally_equal() {
        let src = r#"
            listen 1935;
            max_connections 1000;
            vhost __defaultVhost__ {
                refer on;
                play {
                    gop_cache on;
                }
                empty_block {}
            }
        "#;
        let original = parse_str(src).unwrap();
        let persisted = serialize(&original);
        let reparsed = parse_str(&persisted).unwrap();
        assert_eq!(original, reparsed);
    }

    #[test]
    fn args_needing_quoting_are_quoted() {
        let root = Directive::root(vec![Directive::leaf("comment", vec!["hello world".into()], 1)]);
        let text = serialize(&root);
        assert_eq!(text, "comment \"hello world\";\n");
    }

    #[test]
    fn args_containing_a_double_quote_fall_back_to_single_quotes() {
        let root = Directive::root(vec![Directive::leaf("comment", vec!["say \"hi\"".into()], 1)]);
        let text = serialize(&root);
        assert_eq!(text, "comment 'say \"hi\"';\n");
        let reparsed = parse_str(&text).unwrap();
        assert_eq!(reparsed, root);
    }

    #[test]
    fn bare_args_are_not_quoted() {
        let root = Directive::root(vec![Directive::leaf("listen", vec!["1935".into()], 1)]);
        assert_eq!(serialize(&root), "listen 1935;\n");
    }

    #[test]
    fn persist_to_file_replaces_contents_atomically() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("relaycore.conf");
        std::fs::write(&path, "listen 1;\n").unwrap();

        let root = parse_str("listen 1935;\nmax_connections 10;\n").unwrap();
        persist_to_file(&root, &path).unwrap();

        let reparsed = crate::parser::parse_file(&path).unwrap();
        assert_eq!(reparsed, root);
        assert!(!dir.path().join(".relaycore.conf.tmp").exists());
    }
}
