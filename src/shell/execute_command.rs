//! Launches external commands: fork, process group setup, redirection and
//! exec. Everything after the fork in the child runs on a copy of the
//! shell's state and never returns to the caller.

use std::convert::Infallible;
use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;
use std::process;

use failure::ResultExt;
use log::debug;
use nix::fcntl::{self, OFlag};
use nix::libc;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::stat::Mode;
use nix::unistd::{self, ForkResult, Pid};

use crate::core::parser::Command;
use crate::errors::{Error, ErrorKind, Result};

/// Signals the shell ignores. Children get the default disposition back.
pub const JOB_CONTROL_SIGNALS: [Signal; 3] = [Signal::SIGINT, Signal::SIGTSTP, Signal::SIGTTOU];

const REDIRECT_FILE_MODE: libc::mode_t = 0o666;

/// Forks and execs `command` in a new process group whose id is the child's
/// pid, which is returned.
///
/// `terminal` is the shell's terminal when the command runs in the
/// foreground and the shell controls one; the child makes its own group the
/// terminal's foreground group before exec.
pub fn spawn_process(command: &Command, terminal: Option<RawFd>) -> Result<Pid> {
    let program = command
        .program()
        .ok_or_else(|| Error::syntax(&command.input))?;

    // Anything still buffered would otherwise be written twice.
    let temp_result = io::stdout().flush();
    log_if_err!(temp_result, "failed to flush stdout before fork");

    match unsafe { unistd::fork() }.context(ErrorKind::Fork)? {
        ForkResult::Child => {
            let e = match exec_child(command, terminal) {
                Ok(never) => match never {},
                Err(e) => e,
            };
            eprintln!("jsh: {}", e);
            process::exit(1);
        }
        ForkResult::Parent { child } => {
            // The child does the same; setting it from both sides means the
            // group exists before either process relies on it.
            let temp_result = unistd::setpgid(child, child);
            log_if_err!(temp_result, "failed to set pgid for pid ({})", child);
            debug!("spawned {} as ({})", program, child);
            Ok(child)
        }
    }
}

fn exec_child(command: &Command, terminal: Option<RawFd>) -> Result<Infallible> {
    let pid = unistd::getpid();
    unistd::setpgid(pid, pid).context(ErrorKind::Nix)?;

    if let Some(terminal) = terminal {
        unistd::tcsetpgrp(terminal, pid).context(ErrorKind::TerminalControl)?;
    }

    for &sig in JOB_CONTROL_SIGNALS.iter() {
        unsafe { signal::signal(sig, SigHandler::SigDfl) }.context(ErrorKind::SignalDisposition)?;
    }

    redirect(command)?;

    let program = command.program().unwrap_or_default();
    let path = CString::new(program).with_context(|_| ErrorKind::Exec(program.to_string()))?;
    let argv = command
        .argv
        .iter()
        .map(|arg| CString::new(arg.as_str()))
        .collect::<::std::result::Result<Vec<_>, _>>()
        .with_context(|_| ErrorKind::Exec(program.to_string()))?;

    debug!("execv {:?} {:?}", path, argv);
    let never = unistd::execv(&path, &argv).with_context(|_| ErrorKind::Exec(program.to_string()))?;
    Ok(never)
}

/// Points stdin and stdout at the command's redirect targets.
fn redirect(command: &Command) -> Result<()> {
    if let Some(ref path) = command.input_redirect {
        reopen(libc::STDIN_FILENO, path, OFlag::O_RDONLY)?;
    }

    if let Some(ref path) = command.output_redirect {
        reopen(
            libc::STDOUT_FILENO,
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC,
        )?;
    } else if let Some(ref path) = command.output_append {
        reopen(
            libc::STDOUT_FILENO,
            path,
            OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_APPEND,
        )?;
    }

    Ok(())
}

/// Closes `fd` and opens `path` in its place.
fn reopen(fd: RawFd, path: &str, flags: OFlag) -> Result<()> {
    unistd::close(fd).with_context(|_| ErrorKind::Redirect(path.to_string()))?;
    let new_fd = fcntl::open(path, flags, Mode::from_bits_truncate(REDIRECT_FILE_MODE))
        .with_context(|_| ErrorKind::Redirect(path.to_string()))?;

    // open(2) hands out the lowest free descriptor, which is `fd` unless a
    // lower one was already closed.
    if new_fd != fd {
        unistd::dup2(new_fd, fd).with_context(|_| ErrorKind::Redirect(path.to_string()))?;
        unistd::close(new_fd).with_context(|_| ErrorKind::Redirect(path.to_string()))?;
    }

    Ok(())
}
