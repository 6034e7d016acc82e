//! The hierarchical directive-tree configuration engine: parse the grammar,
//! rewrite legacy shapes into canonical form, validate the result against a
//! schema, and expose it through typed accessors. See each submodule for
//! its own scope.

pub mod accessor;
pub mod directive;
pub mod parser;
pub mod persist;
pub mod server;
pub mod transformer;
pub mod validator;

pub use directive::Directive;
pub use validator::{ValidateOptions, ValidationReport};

use relaycore_error::CoreError;
use std::path::Path;

/// Runs parse → transform → validate in one call, the pipeline every
/// config load (startup or reload) goes through.
pub fn load(path: &Path, opts: &ValidateOptions) -> Result<(Directive, ValidationReport), CoreError> {
    let parsed = parser::parse_file(path)?;
    let transformed = transformer::transform(parsed);
    let report = validator::validate(&transformed, opts)?;
    Ok((transformed, report))
}

/// Same as [`load`] but from an in-memory string, for tests and the
/// `-t` config-test CLI path that may read from stdin-adjacent sources.
pub fn load_str(src: &str, opts: &ValidateOptions) -> Result<(Directive, ValidationReport), CoreError> {
    let parsed = parser::parse_str(src)?;
    let transformed = transformer::transform(parsed);
    let report = validator::validate(&transformed, opts)?;
    Ok((transformed, report))
}
