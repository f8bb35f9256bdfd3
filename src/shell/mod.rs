pub use self::shell::Shell;

use crate::core::parser::ParserConfig;

mod builtins;
mod editor;
mod execute_command;
mod job_control;
mod shell;

const PROMPT: &str = "jsh> ";

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Determines if new command entries will be added to the editor's history.
    ///
    /// Note: This is checked before the other command history config fields.
    enable_command_history: bool,

    /// Number of entries to store in the editor's history
    command_history_capacity: usize,

    /// Determines if the shell takes control of its terminal (when stdin is
    /// a tty) and hands it to foreground jobs. Every command runs in its own
    /// process group, so without this a foreground command cannot read from
    /// the terminal or receive its keyboard signals.
    enable_terminal_control: bool,

    /// Determines if the prompt and some messages (e.g. "exit") are displayed.
    display_messages: bool,

    parser: ParserConfig,
}

impl ShellConfig {
    /// Creates an interactive shell, e.g. command history, terminal control
    ///
    /// # Complete List
    /// - Command History is enabled
    /// - Terminal control is enabled if stdin is a terminal
    /// - The prompt and some additional messages are displayed
    pub fn interactive(command_history_capacity: usize) -> Self {
        Self {
            enable_command_history: true,
            command_history_capacity,
            enable_terminal_control: true,
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell, e.g. running `-c` or a script file
    ///
    /// # Complete List
    /// - Command History is disabled.
    /// - Terminal control is still enabled: if stdin is a terminal, foreground
    ///   commands are given it.
    /// - No prompt, fewer messages are displayed
    pub fn noninteractive() -> Self {
        Default::default()
    }

    /// Sets the longest line the parser accepts.
    pub fn with_max_line_length(mut self, max_line_length: usize) -> Self {
        self.parser.max_line_length = max_line_length;
        self
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            enable_command_history: false,
            command_history_capacity: 0,
            enable_terminal_control: true,
            display_messages: false,
            parser: ParserConfig::default(),
        }
    }
}
