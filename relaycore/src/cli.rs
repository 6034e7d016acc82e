//! Command-line surface. Built on `clap`'s builder API rather than derive
//! because the flag set reuses single letters in ways `clap`'s own
//! `--help`/`--version` handling doesn't: `-h` and `-?` are both help,
//! `-v`/`-V` are both version, `-g`/`-G` are both signature.

use clap::{Arg, ArgAction, Command};
use std::path::PathBuf;

pub const SIGNATURE: &str = concat!("relaycore/", env!("CARGO_PKG_VERSION"));

pub struct Cli {
    pub help: bool,
    pub version: bool,
    pub signature: bool,
    pub env_only: bool,
    pub test_config: bool,
    pub config: Option<PathBuf>,
}

fn command() -> Command {
    Command::new("relaycore")
        .disable_help_flag(true)
        .disable_version_flag(true)
        .arg(Arg::new("help").short('?').short_alias('h').long("help").action(ArgAction::SetTrue))
        .arg(Arg::new("version").short('v').short_alias('V').long("version").action(ArgAction::SetTrue))
        .arg(Arg::new("signature").short('g').short_alias('G').long("signature").action(ArgAction::SetTrue))
        .arg(Arg::new("env_only").short('e').action(ArgAction::SetTrue))
        .arg(Arg::new("test_config").short('t').action(ArgAction::SetTrue))
        .arg(Arg::new("config").short('c').value_name("FILE").action(ArgAction::Set))
}

/// Parses `args` (including argv\[0\]). Argument-less invocation and unknown
/// flags both exit the process with a non-zero status via `clap`'s own
/// error path, matching the "no args shows help and fails" contract.
pub fn parse<I, T>(args: I) -> Cli
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    let argv: Vec<std::ffi::OsString> = args.into_iter().map(Into::into).collect();
    if argv.len() <= 1 {
        print_help();
        std::process::exit(1);
    }

    let matches = match command().try_get_matches_from(argv) {
        Ok(m) => m,
        Err(e) => e.exit(),
    };

    Cli {
        help: matches.get_flag("help"),
        version: matches.get_flag("version"),
        signature: matches.get_flag("signature"),
        env_only: matches.get_flag("env_only"),
        test_config: matches.get_flag("test_config"),
        config: matches.get_one::<String>("config").map(PathBuf::from),
    }
}

pub fn print_help() {
    println!("{}", command().render_help());
}

pub fn print_version() {
    println!("{}", env!("CARGO_PKG_VERSION"));
}

pub fn print_signature() {
    println!("{SIGNATURE}");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_config_path_and_env_only() {
        let cli = parse(["relaycore", "-e", "-c", "/tmp/foo.conf"]);
        assert!(cli.env_only);
        assert_eq!(cli.config, Some(PathBuf::from("/tmp/foo.conf")));
        assert!(!cli.help);
    }

    #[test]
    fn short_and_capital_variants_are_equivalent() {
        let lower = parse(["relaycore", "-v"]);
        let upper = parse(["relaycore", "-V"]);
        assert!(lower.version);
        assert!(upper.version);
    }

    #[test]
    fn test_config_flag_is_recognized() {
        let cli = parse(["relaycore", "-t", "-c", "/tmp/foo.conf"]);
        assert!(cli.test_config);
    }
}
