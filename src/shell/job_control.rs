use std::fmt;
use std::os::unix::io::RawFd;

use failure::{Fail, ResultExt};
use log::{debug, error, info};
use nix::errno::Errno;
use nix::sys::signal::{self, SigHandler, Signal};
use nix::sys::wait::{self, WaitPidFlag, WaitStatus};
use nix::unistd::{self, Pid};

use crate::core::job::{Job, JobId, JobState, JobTable};
use crate::core::parser::Command;
use crate::errors::{Error, ErrorKind, Result};
use crate::shell::execute_command::{self, JOB_CONTROL_SIGNALS};
use crate::util;

/// Makes the shell immune to the keyboard signals meant for its jobs, and to
/// being stopped when it writes to or takes over the terminal.
pub fn ignore_job_control_signals() -> Result<()> {
    for &sig in JOB_CONTROL_SIGNALS.iter() {
        unsafe { signal::signal(sig, SigHandler::SigIgn) }.context(ErrorKind::SignalDisposition)?;
    }

    Ok(())
}

/// The shell's controlling terminal, owned by the shell's process group
/// whenever no foreground job is running.
#[derive(Debug)]
pub struct Terminal {
    fd: RawFd,
    shell_pgid: Pid,
}

impl Terminal {
    /// Puts the shell in its own process group in the foreground of its
    /// terminal. Job control signals must already be ignored.
    pub fn acquire() -> Result<Terminal> {
        let fd = util::get_terminal();

        // Loop until the shell is in the foreground
        loop {
            let pgid = unistd::getpgrp();
            if unistd::tcgetpgrp(fd).context(ErrorKind::Nix)? == pgid {
                break;
            }
            signal::killpg(pgid, Signal::SIGTTIN).context(ErrorKind::Nix)?;
        }

        // Put ourselves in our own process group
        let shell_pgid = Pid::this();
        if unistd::getpgrp() != shell_pgid {
            unistd::setpgid(shell_pgid, shell_pgid).context(ErrorKind::Nix)?;
        }

        let terminal = Terminal { fd, shell_pgid };
        terminal.reclaim()?;
        Ok(terminal)
    }

    pub fn fd(&self) -> RawFd {
        self.fd
    }

    pub fn give_to(&self, pgid: Pid) -> Result<()> {
        debug!("setting terminal process group to ({})", pgid);
        unistd::tcsetpgrp(self.fd, pgid).context(ErrorKind::TerminalControl)?;
        Ok(())
    }

    pub fn reclaim(&self) -> Result<()> {
        debug!("putting shell ({}) back into foreground", self.shell_pgid);
        unistd::tcsetpgrp(self.fd, self.shell_pgid).context(ErrorKind::TerminalControl)?;
        Ok(())
    }
}

/// A job status line, printed when a job is launched or changes state.
#[derive(Clone, Debug, PartialEq)]
pub enum Notification {
    Launched {
        job_id: JobId,
        pid: Pid,
    },
    Exited {
        job_id: JobId,
        pid: Pid,
        status: i32,
    },
    /// `job_id` is `None` for a foreground command, which was never a job.
    Signaled {
        job_id: Option<JobId>,
        pid: Pid,
        signal: Signal,
    },
    Suspended {
        job_id: JobId,
        pid: Pid,
        signal: Signal,
    },
    Resumed {
        job_id: JobId,
        pid: Pid,
    },
}

impl fmt::Display for Notification {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Notification::Launched { job_id, pid } => write!(f, "[{}] ({})", job_id, pid),
            Notification::Exited {
                job_id,
                pid,
                status,
            } => write!(
                f,
                "[{}] ({}) terminated with exit status {}",
                job_id, pid, status
            ),
            Notification::Signaled {
                job_id: Some(job_id),
                pid,
                signal,
            } => write!(
                f,
                "[{}] ({}) terminated by signal {}",
                job_id, pid, signal as i32
            ),
            Notification::Signaled {
                job_id: None,
                pid,
                signal,
            } => write!(f, "({}) terminated by signal {}", pid, signal as i32),
            Notification::Suspended {
                job_id,
                pid,
                signal,
            } => write!(
                f,
                "[{}] ({}) suspended by signal {}",
                job_id, pid, signal as i32
            ),
            Notification::Resumed { job_id, pid } => write!(f, "[{}] ({}) resumed", job_id, pid),
        }
    }
}

/// Owns the job table and keeps it in step with the status changes the OS
/// reports for the shell's children.
#[derive(Default)]
pub struct JobManager {
    table: JobTable,
    job_count: u32,
    terminal: Option<Terminal>,
}

impl JobManager {
    pub fn set_terminal(&mut self, terminal: Terminal) {
        self.terminal = Some(terminal);
    }

    pub fn get_jobs(&self) -> impl Iterator<Item = &Job> {
        self.table.jobs()
    }

    /// Runs an external command. Background commands become running jobs;
    /// foreground commands are waited for.
    pub fn launch(&mut self, command: &Command) -> Result<()> {
        let name = command.name().unwrap_or_default().to_string();
        let child_terminal = if command.background {
            None
        } else {
            self.terminal.as_ref().map(Terminal::fd)
        };

        let pid = execute_command::spawn_process(command, child_terminal)?;

        if command.background {
            let job_id = self.get_next_job_id();
            self.table.add(job_id, pid, JobState::Running, &name)?;
            println!("{}", Notification::Launched { job_id, pid });
            return Ok(());
        }

        if let Some(ref terminal) = self.terminal {
            if let Err(e) = terminal.give_to(pid) {
                // The child may already hold the terminal; never leave it there.
                log_if_err!(terminal.reclaim(), "failed to reclaim terminal");
                return Err(e);
            }
        }
        self.wait_for_job(pid, None, &name)
    }

    /// Continues a job in the foreground and waits for it to exit or stop.
    pub fn put_job_in_foreground(&mut self, job_id: JobId) -> Result<()> {
        let (pid, name) = match self.table.get(job_id) {
            Some(job) => (job.pid(), job.command_name().to_string()),
            None => return Err(Error::no_such_job(format!("%{}", job_id))),
        };
        debug!("putting job [{}] in foreground", job_id);

        if let Some(ref terminal) = self.terminal {
            terminal.give_to(pid)?;
        }

        let temp_result = signal::killpg(pid, Signal::SIGCONT).context(ErrorKind::Nix);
        if let Err(e) = temp_result {
            report_error(&Error::from(e));
        }

        // The job is about to be the foreground process again; it only
        // returns to the table if it stops.
        if let Err(e) = self.table.remove_by_pid(pid) {
            report_error(&e);
        }

        self.wait_for_job(pid, Some(job_id), &name)
    }

    /// Continues a stopped job without waiting for it.
    pub fn put_job_in_background(&mut self, job_id: JobId) -> Result<()> {
        let pid = self
            .table
            .pid_of(job_id)
            .ok_or_else(|| Error::no_such_job(format!("%{}", job_id)))?;
        debug!("putting job [{}] in background", job_id);

        signal::killpg(pid, Signal::SIGCONT).context(ErrorKind::Nix)?;
        self.table.update_state(job_id, JobState::Running)
    }

    /// Waits for the foreground process `pid` to exit, die or stop, then
    /// takes the terminal back. A stopped process becomes a job, keeping
    /// `job_id` if it had one.
    fn wait_for_job(&mut self, pid: Pid, job_id: Option<JobId>, name: &str) -> Result<()> {
        let wait_result = wait_for_change(pid);

        if let Some(ref terminal) = self.terminal {
            terminal.reclaim()?;
        }

        match wait_result? {
            WaitStatus::Exited(_, status) => {
                debug!("({}) exited with {}", pid, status);
            }
            WaitStatus::Signaled(_, signal, _) => {
                println!(
                    "{}",
                    Notification::Signaled {
                        job_id: None,
                        pid,
                        signal,
                    }
                );
            }
            WaitStatus::Stopped(_, signal) => {
                let job_id = match job_id {
                    Some(job_id) => job_id,
                    None => self.get_next_job_id(),
                };
                self.table.add(job_id, pid, JobState::Stopped, name)?;
                println!(
                    "{}",
                    Notification::Suspended {
                        job_id,
                        pid,
                        signal,
                    }
                );
            }
            status => debug!("ignoring wait status {:?} for ({})", status, pid),
        }

        Ok(())
    }

    /// Checks for processes that have status information available, without
    /// blocking, and reports every change to a tracked job.
    pub fn do_job_notification(&mut self) -> Result<()> {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        loop {
            match wait::waitpid(None, Some(flags)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Err(Errno::EINTR) => continue,
                Ok(status) => match self.mark_process_status(status) {
                    Ok(Some(notification)) => println!("{}", notification),
                    Ok(None) => (),
                    Err(e) => report_error(&e),
                },
                Err(e) => return Err(e.context(ErrorKind::Nix).into()),
            }
        }

        Ok(())
    }

    /// Applies one wait status to the job table. Statuses of processes the
    /// table does not track are ignored.
    fn mark_process_status(&mut self, wait_status: WaitStatus) -> Result<Option<Notification>> {
        let pid = match wait_status.pid() {
            Some(pid) => pid,
            None => return Ok(None),
        };
        let job_id = match self.table.job_id_of(pid) {
            Some(job_id) => job_id,
            None => {
                debug!("({}) is not a job, ignoring {:?}", pid, wait_status);
                return Ok(None);
            }
        };

        let notification = match wait_status {
            WaitStatus::Exited(_, status) => {
                self.table.remove_by_pid(pid)?;
                Notification::Exited {
                    job_id,
                    pid,
                    status,
                }
            }
            WaitStatus::Signaled(_, signal, _) => {
                self.table.remove_by_pid(pid)?;
                Notification::Signaled {
                    job_id: Some(job_id),
                    pid,
                    signal,
                }
            }
            WaitStatus::Stopped(_, signal) => {
                self.table.update_state(job_id, JobState::Stopped)?;
                Notification::Suspended {
                    job_id,
                    pid,
                    signal,
                }
            }
            WaitStatus::Continued(_) => {
                self.table.update_state(job_id, JobState::Running)?;
                Notification::Resumed { job_id, pid }
            }
            _ => return Ok(None),
        };

        Ok(Some(notification))
    }

    /// Releases the job table. Called once, on the way out of the shell.
    pub fn teardown(&mut self) {
        info!("tearing down {} jobs", self.table.len());
        self.table.teardown();
    }

    fn get_next_job_id(&mut self) -> JobId {
        self.job_count += 1;
        JobId(self.job_count)
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "job_count: {}\tterminal: {:?}", self.job_count, self.terminal)?;
        write!(f, "{:?}", self.table)
    }
}

/// Blocks until `pid` exits, dies or stops.
fn wait_for_change(pid: Pid) -> Result<WaitStatus> {
    loop {
        match wait::waitpid(pid, Some(WaitPidFlag::WUNTRACED)) {
            Err(Errno::EINTR) => continue,
            result => return Ok(result.context(ErrorKind::Nix)?),
        }
    }
}

fn report_error(e: &Error) {
    error!("{}", e);
    eprintln!("jsh: {}", e);
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pid(raw: i32) -> Pid {
        Pid::from_raw(raw)
    }

    fn manager_with_job(job_id: u32, raw_pid: i32, state: JobState) -> JobManager {
        let mut manager = JobManager::default();
        manager
            .table
            .add(JobId(job_id), pid(raw_pid), state, "sleep")
            .unwrap();
        manager.job_count = job_id;
        manager
    }

    #[test]
    fn test_notification_formats() {
        let pid = pid(4242);
        let job_id = JobId(2);
        assert_eq!(Notification::Launched { job_id, pid }.to_string(), "[2] (4242)");
        assert_eq!(
            Notification::Exited {
                job_id,
                pid,
                status: 7
            }
            .to_string(),
            "[2] (4242) terminated with exit status 7"
        );
        assert_eq!(
            Notification::Signaled {
                job_id: Some(job_id),
                pid,
                signal: Signal::SIGKILL
            }
            .to_string(),
            "[2] (4242) terminated by signal 9"
        );
        assert_eq!(
            Notification::Signaled {
                job_id: None,
                pid,
                signal: Signal::SIGINT
            }
            .to_string(),
            "(4242) terminated by signal 2"
        );
        assert_eq!(
            Notification::Suspended {
                job_id,
                pid,
                signal: Signal::SIGTSTP
            }
            .to_string(),
            format!("[2] (4242) suspended by signal {}", Signal::SIGTSTP as i32)
        );
        assert_eq!(Notification::Resumed { job_id, pid }.to_string(), "[2] (4242) resumed");
    }

    #[test]
    fn test_exit_removes_job() {
        let mut manager = manager_with_job(1, 100, JobState::Running);
        let notification = manager
            .mark_process_status(WaitStatus::Exited(pid(100), 3))
            .unwrap();
        assert_eq!(
            notification,
            Some(Notification::Exited {
                job_id: JobId(1),
                pid: pid(100),
                status: 3
            })
        );
        assert!(manager.table.is_empty());
    }

    #[test]
    fn test_signal_death_removes_job() {
        let mut manager = manager_with_job(1, 100, JobState::Stopped);
        let notification = manager
            .mark_process_status(WaitStatus::Signaled(pid(100), Signal::SIGTERM, false))
            .unwrap();
        assert_eq!(
            notification,
            Some(Notification::Signaled {
                job_id: Some(JobId(1)),
                pid: pid(100),
                signal: Signal::SIGTERM
            })
        );
        assert!(manager.table.is_empty());
    }

    #[test]
    fn test_stop_and_continue_update_state() {
        let mut manager = manager_with_job(4, 100, JobState::Running);

        let notification = manager
            .mark_process_status(WaitStatus::Stopped(pid(100), Signal::SIGTSTP))
            .unwrap();
        assert_eq!(
            notification,
            Some(Notification::Suspended {
                job_id: JobId(4),
                pid: pid(100),
                signal: Signal::SIGTSTP
            })
        );
        assert_eq!(
            manager.table.get(JobId(4)).unwrap().state(),
            JobState::Stopped
        );

        let notification = manager
            .mark_process_status(WaitStatus::Continued(pid(100)))
            .unwrap();
        assert_eq!(
            notification,
            Some(Notification::Resumed {
                job_id: JobId(4),
                pid: pid(100)
            })
        );
        assert_eq!(
            manager.table.get(JobId(4)).unwrap().state(),
            JobState::Running
        );
    }

    #[test]
    fn test_untracked_process_is_ignored() {
        let mut manager = manager_with_job(1, 100, JobState::Running);
        let notification = manager
            .mark_process_status(WaitStatus::Exited(pid(200), 0))
            .unwrap();
        assert_eq!(notification, None);
        assert_eq!(manager.table.pid_of(JobId(1)), Some(pid(100)));
        assert_eq!(manager.table.len(), 1);
    }

    #[test]
    fn test_still_alive_is_ignored() {
        let mut manager = manager_with_job(1, 100, JobState::Running);
        assert_eq!(manager.mark_process_status(WaitStatus::StillAlive).unwrap(), None);
        assert_eq!(manager.table.len(), 1);
    }

    #[test]
    fn test_job_ids_are_not_reused() {
        let mut manager = JobManager::default();
        assert_eq!(manager.get_next_job_id(), JobId(1));
        assert_eq!(manager.get_next_job_id(), JobId(2));
        manager
            .table
            .add(JobId(2), pid(100), JobState::Running, "sleep")
            .unwrap();
        manager
            .mark_process_status(WaitStatus::Exited(pid(100), 0))
            .unwrap();
        assert_eq!(manager.get_next_job_id(), JobId(3));
    }

    #[test]
    fn test_unknown_job_is_not_found() {
        let mut manager = manager_with_job(1, 100, JobState::Stopped);

        let err = manager.put_job_in_foreground(JobId(9)).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::NoSuchJob("%9".to_string()));
        let err = manager.put_job_in_background(JobId(9)).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::NoSuchJob("%9".to_string()));

        let job = manager.table.get(JobId(1)).unwrap();
        assert_eq!(job.state(), JobState::Stopped);
        assert_eq!(manager.table.len(), 1);
    }

    #[test]
    fn test_sweep_without_children_is_a_no_op() {
        let mut manager = manager_with_job(1, i32::max_value(), JobState::Running);
        manager.do_job_notification().unwrap();
        assert_eq!(manager.table.len(), 1);
    }
}
