//! The tree's single node type: a directive has a name, an ordered list of
//! positional arguments, an ordered list of children, and the source line
//! it was declared on. There is no parent back-pointer — a walk supplies
//! its own parent context, so the tree can never contain a cycle.

use std::fmt;

/// One node of the configuration tree.
///
/// `is_block` distinguishes a leaf directive (`foo bar;`) from a block
/// directive with an empty body (`foo bar {}`) — both have zero children,
/// but they are not the same directive and must not compare equal or
/// round-trip to the same text.
///
/// `line` is deliberately excluded from `PartialEq`/`Eq`: structural
/// equality (used for reload diffing and the persistence round-trip
/// property) is defined over name, args, children and block-ness only — a
/// directive re-parsed from its own serialized form lands on a different
/// line and must still compare equal.
#[derive(Debug, Clone)]
pub struct Directive {
    pub name: String,
    pub args: Vec<String>,
    pub children: Vec<Directive>,
    pub is_block: bool,
    pub line: usize,
}

impl PartialEq for Directive {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
            && self.args == other.args
            && self.is_block == other.is_block
            && self.children == other.children
    }
}

impl Eq for Directive {}

impl Directive {
    #[must_use]
    pub fn leaf(name: impl Into<String>, args: Vec<String>, line: usize) -> Self {
        Self { name: name.into(), args, children: Vec::new(), is_block: false, line }
    }

    #[must_use]
    pub fn block(name: impl Into<String>, args: Vec<String>, children: Vec<Directive>, line: usize) -> Self {
        Self { name: name.into(), args, children, is_block: true, line }
    }

    /// The synthetic root of a parsed file: an unnamed block holding every
    /// top-level directive as a child.
    #[must_use]
    pub fn root(children: Vec<Directive>) -> Self {
        Self { name: "root".to_string(), args: Vec::new(), children, is_block: true, line: 0 }
    }

    /// First child directly named `name`, if any.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Directive> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Every child directly named `name`, in document order.
    pub fn get_all<'a>(&'a self, name: &str) -> impl Iterator<Item = &'a Directive> {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Dotted-path descent: `get_path(&["vhost", "play"])` walks through
    /// nested children by name, stopping at the first that doesn't exist.
    #[must_use]
    pub fn get_path(&self, path: &[&str]) -> Option<&Directive> {
        let mut cur = self;
        for seg in path {
            cur = cur.get(seg)?;
        }
        Some(cur)
    }

    /// First positional argument, if any — the common case for `name value;`.
    #[must_use]
    pub fn arg0(&self) -> Option<&str> {
        self.args.first().map(String::as_str)
    }

    /// Structural equality with one or more subtree names excluded from
    /// comparison entirely (a child whose name is in `except` is skipped on
    /// both sides, order-preserving for the rest) — used by reload diffing
    /// to ignore `dvr_apply` without flagging unrelated dvr changes.
    #[must_use]
    pub fn eq_except(&self, other: &Directive, except: &[&str]) -> bool {
        if self.name != other.name || self.args != other.args || self.is_block != other.is_block {
            return false;
        }
        let mine: Vec<&Directive> = self.children.iter().filter(|c| !except.contains(&c.name.as_str())).collect();
        let theirs: Vec<&Directive> = other.children.iter().filter(|c| !except.contains(&c.name.as_str())).collect();
        if mine.len() != theirs.len() {
            return false;
        }
        mine.iter().zip(theirs.iter()).all(|(a, b)| a.eq_except(b, except))
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        for a in &self.args {
            write!(f, " {a}")?;
        }
        Ok(())
    }
}
