use std::io;
use std::os::unix::io::{AsRawFd, RawFd};

use nix::unistd;

/// The controlling terminal the shell reads commands from.
pub fn get_terminal() -> RawFd {
    io::stdin().as_raw_fd()
}

pub fn isatty() -> bool {
    let temp_result = unistd::isatty(get_terminal());
    log_if_err!(temp_result, "unistd::isatty");
    temp_result.unwrap_or(false)
}
