//! Error module. See the [failure](https://crates.io/crates/failure) crate for details.

use std::fmt;
use std::result;

use failure::{Backtrace, Context, Fail};

use crate::core::parser::Direction;

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    /// Returns `true` if the shell cannot keep running after this error.
    pub fn is_fatal(&self) -> bool {
        self.kind().is_fatal()
    }

    pub(crate) fn syntax<T: AsRef<str>>(command: T) -> Error {
        Error::from(ErrorKind::Syntax(command.as_ref().to_string()))
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        Error::from(ErrorKind::BuiltinCommand {
            message: message.as_ref().to_string(),
            code,
        })
    }

    pub(crate) fn no_such_job<T: AsRef<str>>(job: T) -> Error {
        Error::from(ErrorKind::NoSuchJob(job.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ctx.cause() {
            Some(cause) => write!(f, "{}: {}", self.ctx, cause),
            None => fmt::Display::fmt(&self.ctx, f),
        }
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    /// A redirection operator appeared where a file name was expected. The
    /// direction is that of the offending operator.
    RedirectIsTarget(Direction),
    /// A redirection operator ended the line.
    MissingRedirect(Direction),
    /// A second redirection of the same direction.
    MultipleRedirects(Direction),
    RedirectWithoutCommand,
    LineTooLong(usize),
    /// Builtin invoked with the wrong arguments.
    Syntax(String),
    BuiltinCommand { message: String, code: i32 },
    NoSuchJob(String),
    DuplicateJob { job_id: u32, pid: i32 },
    NoSuchProcess(i32),
    Fork,
    TerminalControl,
    SignalDisposition,
    Exec(String),
    Redirect(String),
    Io,
    Nix,
    Docopt,
    Readline,
}

impl ErrorKind {
    pub fn is_fatal(&self) -> bool {
        match *self {
            ErrorKind::Fork | ErrorKind::TerminalControl | ErrorKind::SignalDisposition => true,
            _ => false,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::RedirectIsTarget(direction) => {
                write!(f, "syntax error: {} file is a redirection symbol", direction)
            }
            ErrorKind::MissingRedirect(direction) => write!(f, "syntax error: no {} file", direction),
            ErrorKind::MultipleRedirects(direction) => {
                write!(f, "syntax error: multiple {} files", direction)
            }
            ErrorKind::RedirectWithoutCommand => write!(f, "error: redirects with no command"),
            ErrorKind::LineTooLong(max) => write!(f, "syntax error: input exceeds {} bytes", max),
            ErrorKind::Syntax(ref command) => write!(f, "{}: syntax error", command),
            ErrorKind::BuiltinCommand { ref message, .. } => write!(f, "{}", message),
            ErrorKind::NoSuchJob(ref job) => write!(f, "{}: job not found", job),
            ErrorKind::DuplicateJob { job_id, pid } => {
                write!(f, "job [{}] ({}) is already in the job table", job_id, pid)
            }
            ErrorKind::NoSuchProcess(pid) => write!(f, "({}): no job with this process", pid),
            ErrorKind::Fork => write!(f, "fork failed"),
            ErrorKind::TerminalControl => write!(f, "unable to transfer terminal control"),
            ErrorKind::SignalDisposition => write!(f, "unable to set signal disposition"),
            ErrorKind::Exec(ref program) => write!(f, "{}: unable to execute", program),
            ErrorKind::Redirect(ref path) => write!(f, "{}: unable to redirect", path),
            ErrorKind::Io => write!(f, "I/O error occurred"),
            ErrorKind::Nix => write!(f, "Nix error occurred"),
            ErrorKind::Docopt => write!(f, "Docopt error occurred"),
            ErrorKind::Readline => write!(f, "Readline error occurred"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redirect_messages() {
        assert_eq!(
            ErrorKind::RedirectIsTarget(Direction::Output).to_string(),
            "syntax error: output file is a redirection symbol"
        );
        assert_eq!(
            ErrorKind::MissingRedirect(Direction::Input).to_string(),
            "syntax error: no input file"
        );
        assert_eq!(
            ErrorKind::MultipleRedirects(Direction::Output).to_string(),
            "syntax error: multiple output files"
        );
    }

    #[test]
    fn test_fatal_kinds() {
        assert!(Error::from(ErrorKind::Fork).is_fatal());
        assert!(Error::from(ErrorKind::TerminalControl).is_fatal());
        assert!(!Error::no_such_job("%1").is_fatal());
        assert!(!Error::syntax("fg").is_fatal());
    }
}
