//! Jsh - Shell Module
//!
//! The Shell reads command lines, runs builtins itself, launches everything
//! else, and keeps the job table current after every line.

use std::fmt;
use std::fs;
use std::io;
use std::path::Path;
use std::process;

use failure::ResultExt;
use log::{debug, error, info, warn};

use crate::core::job::{Job, JobId};
use crate::core::parser::Command;
use crate::errors::{ErrorKind, Result};
use crate::shell::{
    builtins,
    editor::Editor,
    job_control::{self, JobManager, Terminal},
    ShellConfig, PROMPT,
};
use crate::util;

/// Jsh Shell
pub struct Shell {
    /// Responsible for readline and history.
    editor: Editor,
    job_manager: JobManager,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new Shell. Takes control of the terminal when the
    /// configuration allows it and stdin is a terminal.
    pub fn new(config: ShellConfig) -> Result<Shell> {
        let mut shell = Shell {
            editor: Editor::with_capacity(config.command_history_capacity),
            job_manager: JobManager::default(),
            config,
        };

        if let Err(e) = job_control::ignore_job_control_signals() {
            shell.job_manager.teardown();
            return Err(e);
        }

        if config.enable_terminal_control && util::isatty() {
            match Terminal::acquire() {
                Ok(terminal) => shell.job_manager.set_terminal(terminal),
                Err(e) => {
                    error!(
                        "failed to initialize shell for job control despite isatty: {}",
                        e
                    );
                    eprintln!("jsh: running without terminal control: {}", e);
                }
            }
        }

        info!("jsh started up");
        Ok(shell)
    }

    /// Runs one command line, then reports status changes of background
    /// jobs.
    pub fn execute_command_string(&mut self, input: &str) -> Result<()> {
        let result = self.execute_line(input);
        let notification_result = self.job_manager.do_job_notification();

        match (result, notification_result) {
            (Err(e), Err(notification_error)) => {
                error!("failed to check job status: {}", notification_error);
                Err(e)
            }
            (Err(e), Ok(())) | (Ok(()), Err(e)) => Err(e),
            (Ok(()), Ok(())) => Ok(()),
        }
    }

    fn execute_line(&mut self, input: &str) -> Result<()> {
        if self.config.enable_command_history {
            self.editor.add_history_entry(input);
        }

        let command = Command::parse_with_config(input, &self.config.parser)?;
        debug!("{:?}", command);

        let program = match command.program() {
            Some(program) => program,
            None => return Ok(()),
        };

        if builtins::is_builtin(program) {
            builtins::run(self, program, command.args(), &mut io::stdout())
        } else {
            self.job_manager.launch(&command)
        }
    }

    /// Runs each line of a file as a command line.
    pub fn execute_commands_from_file<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let buffer = fs::read_to_string(path).context(ErrorKind::Io)?;

        for line in buffer.lines() {
            let temp_result = self.execute_command_string(line);
            self.report(temp_result);
        }

        Ok(())
    }

    /// Runs command lines from stdin until EOF is received.
    pub fn execute_from_stdin(&mut self) -> ! {
        let prompt = if self.config.display_messages {
            PROMPT
        } else {
            ""
        };

        loop {
            match self.editor.readline(prompt) {
                Ok(Some(line)) => {
                    let temp_result = self.execute_command_string(&line);
                    self.report(temp_result);
                }
                Ok(None) => self.exit(0),
                Err(e) => {
                    error!("failed to read command line: {}", e);
                    eprintln!("jsh: {}", e);
                    self.exit(1);
                }
            }
        }
    }

    /// Reports a failed command line. Fatal errors end the shell; everything
    /// else only aborts the line.
    pub fn report(&mut self, result: Result<()>) {
        let e = match result {
            Ok(()) => return,
            Err(e) => e,
        };

        if e.is_fatal() {
            error!("fatal: {}", e);
            eprintln!("jsh: {}", e);
            self.exit(1);
        }

        warn!("{}", e);
        eprintln!("jsh: {}", e);
    }

    /// Returns the shell's jobs (running and stopped) in job id order.
    pub fn get_jobs(&self) -> impl Iterator<Item = &Job> {
        self.job_manager.get_jobs()
    }

    /// Continues the job in the foreground and waits for it.
    pub fn put_job_in_foreground(&mut self, job_id: JobId) -> Result<()> {
        self.job_manager.put_job_in_foreground(job_id)
    }

    /// Continues the job in the background.
    pub fn put_job_in_background(&mut self, job_id: JobId) -> Result<()> {
        self.job_manager.put_job_in_background(job_id)
    }

    /// Exit the shell with status `code` after releasing the job table.
    pub fn exit(&mut self, code: i32) -> ! {
        if self.config.display_messages {
            println!("exit");
        }

        self.job_manager.teardown();
        info!("jsh has shut down with status {}", code);
        process::exit(code);
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}\n{:?}", self.job_manager, self.editor)
    }
}
