//! Jsh builtins
//!
//! Commands run inside the shell process itself: the job control commands,
//! which must reach the shell's job table, and a handful of file system
//! commands.

use std::iter;

use docopt::Docopt;
use failure::Fail;
use log::debug;
use serde::de::DeserializeOwned;

use self::prelude::*;

use self::dirs::Cd;
use self::exit::Exit;
use self::files::{Ln, Rm};
use self::jobs::{Bg, Fg, Jobs};

pub mod prelude {
    pub use std::io::Write;

    pub use failure::ResultExt;

    pub use super::parse_args;
    pub use crate::errors::{Error, ErrorKind, Result};
    pub use crate::shell::shell::Shell;
}

mod dirs;
mod exit;
mod files;
mod jobs;

const BG_NAME: &str = "bg";
const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const FG_NAME: &str = "fg";
const JOBS_NAME: &str = "jobs";
const LN_NAME: &str = "ln";
const RM_NAME: &str = "rm";

const END_OF_OPTIONS: &str = "--";

/// Represents a Jsh builtin command such as cd or fg.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The docopt usage string, also shown to the user.
    const HELP: &'static str;
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [
        BG_NAME, CD_NAME, EXIT_NAME, FG_NAME, JOBS_NAME, LN_NAME, RM_NAME,
    ]
    .contains(&program.as_ref())
}

/// precondition: command is a builtin.
pub fn run<S1, S2>(shell: &mut Shell, program: S1, args: &[S2], stdout: &mut dyn Write) -> Result<()>
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    match program.as_ref() {
        BG_NAME => Bg::run(shell, args, stdout),
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        FG_NAME => Fg::run(shell, args, stdout),
        JOBS_NAME => Jobs::run(shell, args, stdout),
        LN_NAME => Ln::run(shell, args, stdout),
        RM_NAME => Rm::run(shell, args, stdout),
        _ => unreachable!(),
    }
}

/// Matches `args` against the docopt `usage` of builtin `program`. Arguments
/// that do not fit the usage are a syntax error naming the whole command.
///
/// Builtins take no options, so every argument is positional even when it
/// starts with `-`. Usages must accept `[--]` after the command name.
pub fn parse_args<D, S, T>(usage: &str, program: S, args: &[T]) -> Result<D>
where
    D: DeserializeOwned,
    S: AsRef<str>,
    T: AsRef<str>,
{
    let argv = iter::once(program.as_ref())
        .chain(iter::once(END_OF_OPTIONS))
        .chain(args.iter().map(AsRef::as_ref));
    let docopt = Docopt::new(usage)
        .map_err(|e| Error::from(e.context(ErrorKind::Docopt)))?
        .argv(argv)
        .help(false);

    docopt.deserialize().map_err(|e| {
        debug!("{} arguments rejected: {}", program.as_ref(), e);
        let command = iter::once(program.as_ref())
            .chain(args.iter().map(AsRef::as_ref))
            .collect::<Vec<_>>()
            .join(" ");
        Error::syntax(command)
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Deserialize)]
    struct TwoArgs {
        arg_source: String,
        arg_target: String,
    }

    const TWO_ARGS_USAGE: &str = "Usage: ln [--] <source> <target>";

    #[test]
    fn test_is_builtin() {
        for name in &["bg", "cd", "exit", "fg", "jobs", "ln", "rm"] {
            assert!(is_builtin(name), "{} should be a builtin", name);
        }
        assert!(!is_builtin("ls"));
        assert!(!is_builtin("/bin/cd"));
        assert!(!is_builtin(""));
    }

    #[test]
    fn test_parse_args_accepts_usage() {
        let args: TwoArgs = parse_args(TWO_ARGS_USAGE, "ln", &["a", "b"]).unwrap();
        assert_eq!(args.arg_source, "a");
        assert_eq!(args.arg_target, "b");
    }

    #[test]
    fn test_parse_args_wrong_arity_is_syntax_error() {
        let err = parse_args::<TwoArgs, _, _>(TWO_ARGS_USAGE, "ln", &["a"]).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::Syntax("ln a".to_string()));
        assert_eq!(err.to_string(), "ln a: syntax error");

        let err = parse_args::<TwoArgs, _, _>(TWO_ARGS_USAGE, "ln", &["a", "b", "c"]).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::Syntax("ln a b c".to_string()));
    }

    #[test]
    fn test_parse_args_dash_arguments_are_positional() {
        let args: TwoArgs = parse_args(TWO_ARGS_USAGE, "ln", &["-a", "--b"]).unwrap();
        assert_eq!(args.arg_source, "-a");
        assert_eq!(args.arg_target, "--b");

        let err = parse_args::<TwoArgs, _, _>(TWO_ARGS_USAGE, "ln", &["-a"]).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::Syntax("ln -a".to_string()));
    }
}
