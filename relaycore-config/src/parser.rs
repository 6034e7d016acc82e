//! Recursive-descent parser for the directive grammar:
//!
//! ```text
//! file      := directive*
//! directive := token (SP token)* (";" | "{" directive* "}")
//! token     := bare_word | dquoted | squoted
//! comment   := "#" ... newline
//! include   := "include" path+ ";"
//! ```
//!
//! `include` is resolved and inlined at parse time, relative to the
//! process's current working directory (not the including file's
//! location), and may itself contain nested `include` directives.

use crate::directive::Directive;
use relaycore_error::{core_err, ErrorKind};
use std::path::Path;

#[derive(Debug, Clone)]
enum Tok {
    Word(String),
    Semi,
    LBrace,
    RBrace,
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
}

impl Lexer {
    fn new(src: &str) -> Self {
        Self { chars: src.chars().collect(), pos: 0, line: 1 }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
        }
        Some(c)
    }

    fn is_ws(c: char) -> bool {
        matches!(c, ' ' | '\t' | '\r' | '\n')
    }

    fn is_terminator(c: char) -> bool {
        matches!(c, ';' | '{' | '}')
    }

    fn skip_ws_and_comments(&mut self) {
        loop {
            match self.peek() {
                Some(c) if Self::is_ws(c) => {
                    self.bump();
                }
                Some('#') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                _ => break,
            }
        }
    }

    fn next(&mut self) -> Result<Option<(Tok, usize)>, relaycore_error::CoreError> {
        self.skip_ws_and_comments();
        let line = self.line;
        match self.peek() {
            None => Ok(None),
            Some(';') => {
                self.bump();
                Ok(Some((Tok::Semi, line)))
            }
            Some('{') => {
                self.bump();
                Ok(Some((Tok::LBrace, line)))
            }
            Some('}') => {
                self.bump();
                Ok(Some((Tok::RBrace, line)))
            }
            Some(q @ ('"' | '\'')) => {
                self.bump();
                let mut s = String::new();
                loop {
                    match self.bump() {
                        None => {
                            return Err(core_err!(
                                ErrorKind::SystemConfigInvalid,
                                "unterminated quoted token starting at line {line}"
                            ))
                        }
                        Some(c) if c == q => break,
                        Some(c) => s.push(c),
                    }
                }
                match self.peek() {
                    None => {}
                    Some(c) if Self::is_ws(c) || Self::is_terminator(c) => {}
                    Some(c) => {
                        return Err(core_err!(
                            ErrorKind::SystemConfigInvalid,
                            "unexpected character '{c}' immediately after closing quote on line {line}"
                        ))
                    }
                }
                Ok(Some((Tok::Word(s), line)))
            }
            Some(_) => {
                let mut s = String::new();
                loop {
                    match self.peek() {
                        None => break,
                        Some(c) if Self::is_ws(c) || Self::is_terminator(c) || c == '#' => break,
                        Some(c) => {
                            s.push(c);
                            self.bump();
                        }
                    }
                }
                Ok(Some((Tok::Word(s), line)))
            }
        }
    }
}

enum Next {
    Directive(Directive),
    EndBlock,
    Eof,
}

fn parse_one(lexer: &mut Lexer) -> Result<Next, relaycore_error::CoreError> {
    let mut tokens: Vec<(String, usize)> = Vec::new();
    loop {
        match lexer.next()? {
            None => {
                if tokens.is_empty() {
                    return Ok(Next::Eof);
                }
                let line = tokens[0].1;
                let joined: Vec<&str> = tokens.iter().map(|(w, _)| w.as_str()).collect();
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "unexpected end of file after '{}' (directive started at line {line}), expected ';' or '{{'",
                    joined.join(" ")
                ));
            }
            Some((Tok::RBrace, line)) => {
                if tokens.is_empty() {
                    return Ok(Next::EndBlock);
                }
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "unexpected '}}' at line {line}, expected ';' or '{{'"
                ));
            }
            Some((Tok::Semi, line)) => {
                if tokens.is_empty() {
                    return Err(core_err!(
                        ErrorKind::SystemConfigInvalid,
                        "unexpected ';' with no preceding tokens at line {line}"
                    ));
                }
                let decl_line = tokens[0].1;
                let name = tokens.remove(0).0;
                let args = tokens.into_iter().map(|(w, _)| w).collect();
                return Ok(Next::Directive(Directive::leaf(name, args, decl_line)));
            }
            Some((Tok::LBrace, line)) => {
                if tokens.is_empty() {
                    return Err(core_err!(
                        ErrorKind::SystemConfigInvalid,
                        "unexpected '{{' with no preceding tokens at line {line}"
                    ));
                }
                let decl_line = tokens[0].1;
                let name = tokens.remove(0).0;
                let args = tokens.into_iter().map(|(w, _)| w).collect();
                let children = parse_body(lexer, line)?;
                return Ok(Next::Directive(Directive::block(name, args, children, decl_line)));
            }
            Some((Tok::Word(w), line)) => tokens.push((w, line)),
        }
    }
}

fn parse_body(lexer: &mut Lexer, open_line: usize) -> Result<Vec<Directive>, relaycore_error::CoreError> {
    let mut out = Vec::new();
    loop {
        match parse_one(lexer)? {
            Next::Directive(d) => expand_into(&mut out, d)?,
            Next::EndBlock => return Ok(out),
            Next::Eof => {
                // Named by the line the block was opened on, not EOF's line.
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "unterminated block: '{{' opened at line {open_line} has no matching '}}'"
                ));
            }
        }
    }
}

fn expand_into(out: &mut Vec<Directive>, d: Directive) -> Result<(), relaycore_error::CoreError> {
    if d.name != "include" {
        out.push(d);
        return Ok(());
    }
    if d.is_block {
        return Err(core_err!(
            ErrorKind::SystemConfigInvalid,
            "include directive at line {} must end with ';', not a block",
            d.line
        ));
    }
    if d.args.is_empty() {
        return Err(core_err!(
            ErrorKind::SystemConfigInvalid,
            "include directive at line {} requires at least one path argument",
            d.line
        ));
    }
    for path in &d.args {
        let text = std::fs::read_to_string(path).map_err(|e| {
            core_err!(
                ErrorKind::SystemConfigInvalid,
                "include at line {}: failed to read '{path}': {e}",
                d.line
            )
        })?;
        let included = parse_str(&text)?;
        out.extend(included.children);
    }
    Ok(())
}

/// Parses a complete file's text into a synthetic root directive holding
/// every top-level directive as a child. `include` is resolved eagerly and
/// relative to the process's current working directory.
pub fn parse_str(src: &str) -> Result<Directive, relaycore_error::CoreError> {
    let mut lexer = Lexer::new(src);
    let mut out = Vec::new();
    loop {
        match parse_one(&mut lexer)? {
            Next::Directive(d) => expand_into(&mut out, d)?,
            Next::EndBlock => {
                return Err(core_err!(
                    ErrorKind::SystemConfigInvalid,
                    "unexpected '}}' with no matching '{{'"
                ))
            }
            Next::Eof => break,
        }
    }
    Ok(Directive::root(out))
}

/// Reads and parses a file from disk.
pub fn parse_file(path: &Path) -> Result<Directive, relaycore_error::CoreError> {
    let text = std::fs::read_to_string(path).map_err(|e| {
        core_err!(
            ErrorKind::SystemConfigInvalid,
            "failed to read config file '{}': {e}",
            path.display()
        )
    })?;
    parse_str(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn parses_leaf_and_block_directives() {
        let src = "listen 1935;\nvhost __defaultVhost__ {\n  enabled on;\n}\n";
        let root = parse_str(src).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[0].name, "listen");
        assert_eq!(root.children[0].args, vec!["1935"]);
        assert!(!root.children[0].is_block);
        assert_eq!(root.children[1].name, "vhost");
        assert_eq!(root.children[1].args, vec!["__defaultVhost__"]);
        assert!(root.children[1].is_block);
        assert_eq!(root.children[1].children[0].name, "enabled");
    }

    #[test]
    fn quoted_tokens_preserve_spaces_and_reject_trailing_garbage() {
        let ok = parse_str(r#"comment "hello world";"#).unwrap();
        assert_eq!(ok.children[0].args, vec!["hello world"]);

        let bad = parse_str(r#"comment "hello"world;"#);
        assert!(bad.is_err());
    }

    #[test]
    fn comments_are_ignored() {
        let src = "# top comment\nlisten 1935; # trailing\n";
        let root = parse_str(src).unwrap();
        assert_eq!(root.children.len(), 1);
    }

    #[test]
    fn unexpected_terminator_with_no_tokens_is_an_error() {
        assert!(parse_str(";").is_err());
        assert!(parse_str("}").is_err());
    }

    #[test]
    fn unterminated_block_names_opening_brace_line_not_eof_line() {
        let src = "listen 1935;\nvhost foo {\n  enabled on;\n\n\n"; // never closed
        let err = parse_str(src).unwrap_err();
        let msg = err.summary();
        assert!(msg.contains("line 2"), "expected opening-brace line 2 in: {msg}");
    }

    #[test]
    fn include_is_resolved_and_inlined() {
        let dir = tempfile::tempdir().unwrap();
        let child_path = dir.path().join("child.conf");
        let mut child = std::fs::File::create(&child_path).unwrap();
        writeln!(child, "max_connections 1000;").unwrap();

        let src = format!("listen 1935;\ninclude {};\n", child_path.display());
        let root = parse_str(&src).unwrap();
        assert_eq!(root.children.len(), 2);
        assert_eq!(root.children[1].name, "max_connections");
        assert_eq!(root.children[1].args, vec!["1000"]);
    }

    #[test]
    fn include_with_no_paths_is_an_error() {
        assert!(parse_str("include;").is_err());
    }
}
