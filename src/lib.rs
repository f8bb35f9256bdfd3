//! Jsh - Job Shell
//!
//! A small interactive shell that runs one command per line, with input and
//! output redirection, and job control for background and stopped commands.

#![deny(missing_debug_implementations, trivial_casts, unused_import_braces)]

#[macro_use]
extern crate serde_derive;

/// Logs `$result` at error level if it is an `Err`, leaving it untouched.
macro_rules! log_if_err {
    ($result:expr, $fmt:expr) => {{
        if let Err(ref e) = $result {
            ::log::error!(concat!($fmt, ": {}"), e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)*) => {{
        if let Err(ref e) = $result {
            ::log::error!(concat!($fmt, ": {}"), $($arg)*, e);
        }
    }};
}

pub mod core;
pub mod errors;
pub mod shell;
mod util;

pub use crate::shell::{Shell, ShellConfig};
