use std::io;
use std::os::unix::io::AsRawFd;
use std::path::PathBuf;
use std::process;

use docopt::Docopt;
use log::{debug, error};
use nix::unistd::{self, Pid};
use serde_derive::Deserialize;

use jsh::errors::Error;
use jsh::{Shell, ShellConfig};

const COMMAND_HISTORY_CAPACITY: usize = 10;
const LOG_FILE_NAME: &str = ".jsh_log";

const USAGE: &str = "
jsh - job control shell.

Usage:
    jsh [options]
    jsh [options] -c <command>
    jsh [options] <file>
    jsh (-h | --help)
    jsh --version

Options:
    -h --help                  Show this screen.
    --version                  Show version.
    -c                         Run the single command line <command> and exit.
    --log=<path>               Append log records to <path> instead of ~/.jsh_log.
    --max-line-length=<bytes>  Reject command lines longer than <bytes>.
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    arg_file: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
    flag_max_line_length: Option<usize>,
}

fn main() {
    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    if let Err(e) = init_logger(&args.flag_log) {
        eprintln!("jsh: unable to open log file, continuing without a log: {}", e);
    }
    debug!("{:?}", args);

    if args.flag_version {
        println!("jsh version {}", env!("CARGO_PKG_VERSION"));
    } else if args.flag_c || args.arg_file.is_some() {
        execute_from_command_string_or_file(&args);
    } else {
        execute_from_stdin(&args);
    }
}

fn init_logger(path: &Option<String>) -> Result<(), fern::InitError> {
    let log_path = match path {
        Some(path) => PathBuf::from(path),
        None => default_log_path()?,
    };

    let pid = Pid::this();
    fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(fern::log_file(log_path)?)
        .apply()?;

    Ok(())
}

fn default_log_path() -> io::Result<PathBuf> {
    dirs::home_dir()
        .map(|home| home.join(LOG_FILE_NAME))
        .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "no home directory"))
}

fn execute_from_command_string_or_file(args: &Args) -> ! {
    let shell_config = with_line_limit(ShellConfig::noninteractive(), args);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));

    if let Some(ref command) = args.arg_command {
        let result = shell.execute_command_string(command);
        shell.report(result);
    } else if let Some(ref file_path) = args.arg_file {
        if let Err(e) = shell.execute_commands_from_file(file_path) {
            error!("failed to run {}: {}", file_path, e);
            eprintln!("jsh: {}: {}", file_path, e);
            shell.exit(1);
        }
    }

    shell.exit(0);
}

fn execute_from_stdin(args: &Args) -> ! {
    let shell_config = if unistd::isatty(io::stdin().as_raw_fd()).unwrap_or(false) {
        ShellConfig::interactive(COMMAND_HISTORY_CAPACITY)
    } else {
        ShellConfig::noninteractive()
    };
    let shell_config = with_line_limit(shell_config, args);
    let mut shell = Shell::new(shell_config).unwrap_or_else(|e| display_error_and_exit(&e));
    shell.execute_from_stdin()
}

fn with_line_limit(config: ShellConfig, args: &Args) -> ShellConfig {
    match args.flag_max_line_length {
        Some(max) => config.with_max_line_length(max),
        None => config,
    }
}

fn display_error_and_exit(error: &Error) -> ! {
    error!("failed to create shell: {}", error);
    eprintln!("jsh: {}", error);
    process::exit(1);
}
