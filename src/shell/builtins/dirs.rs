use std::env;

use log::debug;

use crate::shell::builtins::{self, prelude::*};

pub struct Cd;

#[derive(Debug, Deserialize)]
struct CdArgs {
    arg_dir: String,
}

impl builtins::BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    const HELP: &'static str = "\
Usage: cd [--] <dir>

Change the shell working directory to DIR.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let args: CdArgs = parse_args(Self::HELP, Self::NAME, args)?;
        debug!("{:?}", args);

        env::set_current_dir(&args.arg_dir)
            .map_err(|e| Error::builtin_command(format!("cd: {}: {}", args.arg_dir, e), 1))
    }
}
