use std::fmt;

use failure::Fail;
use rustyline::{self, error::ReadlineError, Config};

use crate::errors::{ErrorKind, Result};

/// Reads command lines, with line editing and in-memory history when stdin
/// is a terminal.
pub struct Editor {
    internal: rustyline::Editor<()>,
    history_enabled: bool,
    /// The total number of history items ever saved
    history_count: usize,
}

impl Editor {
    pub fn with_capacity(history_capacity: usize) -> Editor {
        let config = Config::builder()
            .max_history_size(history_capacity)
            .history_ignore_space(true)
            .auto_add_history(false)
            .build();

        Editor {
            internal: rustyline::Editor::with_config(config),
            history_enabled: history_capacity > 0,
            history_count: 0,
        }
    }

    /// Reads one line. Returns `None` at end of input. An interrupted read
    /// (^C at the prompt) yields an empty line.
    pub fn readline(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.internal.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Eof) => Ok(None),
            Err(ReadlineError::Interrupted) => Ok(Some(String::new())),
            Err(e) => Err(e.context(ErrorKind::Readline).into()),
        }
    }

    pub fn add_history_entry(&mut self, line: &str) {
        if !self.history_enabled || line.trim().is_empty() {
            return;
        }

        if self.internal.add_history_entry(line) {
            self.history_count += 1;
        }
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "history count: {}", self.history_count)
    }
}
