use std::fs;

use log::debug;

use crate::shell::builtins::{self, prelude::*};

pub struct Ln;

#[derive(Debug, Deserialize)]
struct LnArgs {
    arg_source: String,
    arg_target: String,
}

impl builtins::BuiltinCommand for Ln {
    const NAME: &'static str = builtins::LN_NAME;

    const HELP: &'static str = "\
Usage: ln [--] <source> <target>

Create TARGET as a hard link to SOURCE.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let args: LnArgs = parse_args(Self::HELP, Self::NAME, args)?;
        debug!("{:?}", args);

        fs::hard_link(&args.arg_source, &args.arg_target).map_err(|e| {
            Error::builtin_command(
                format!("ln: {} -> {}: {}", args.arg_source, args.arg_target, e),
                1,
            )
        })
    }
}

pub struct Rm;

#[derive(Debug, Deserialize)]
struct RmArgs {
    arg_path: String,
}

impl builtins::BuiltinCommand for Rm {
    const NAME: &'static str = builtins::RM_NAME;

    const HELP: &'static str = "\
Usage: rm [--] <path>

Remove the directory entry PATH.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let args: RmArgs = parse_args(Self::HELP, Self::NAME, args)?;
        debug!("{:?}", args);

        fs::remove_file(&args.arg_path)
            .map_err(|e| Error::builtin_command(format!("rm: {}: {}", args.arg_path, e), 1))
    }
}
