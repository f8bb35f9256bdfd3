use std::collections::{BTreeMap, HashMap};
use std::fmt;

use log::{debug, info};
use nix::unistd::Pid;

use crate::errors::{Error, ErrorKind, Result};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JobId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobState {
    Running,
    Stopped,
}

/// A background or stopped process group. `pid` is the group leader, so it
/// doubles as the process group id.
#[derive(Clone, Debug, PartialEq)]
pub struct Job {
    id: JobId,
    pid: Pid,
    state: JobState,
    command_name: String,
}

impl Job {
    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    pub fn command_name(&self) -> &str {
        &self.command_name
    }
}

/// Registry of the shell's jobs, keyed by job id with a secondary index by
/// pid. Every pid maps to exactly one job and vice versa.
#[derive(Default)]
pub struct JobTable {
    jobs: BTreeMap<JobId, Job>,
    pids: HashMap<Pid, JobId>,
}

impl JobTable {
    pub fn new() -> Self {
        Default::default()
    }

    /// Inserts a job. Fails if either `job_id` or `pid` is already tracked.
    pub fn add(&mut self, job_id: JobId, pid: Pid, state: JobState, command_name: &str) -> Result<()> {
        if self.jobs.contains_key(&job_id) || self.pids.contains_key(&pid) {
            return Err(ErrorKind::DuplicateJob {
                job_id: job_id.0,
                pid: pid.as_raw(),
            }
            .into());
        }

        debug!("adding job [{}] ({}) {}", job_id, pid, state);
        self.pids.insert(pid, job_id);
        self.jobs.insert(
            job_id,
            Job {
                id: job_id,
                pid,
                state,
                command_name: command_name.to_string(),
            },
        );
        Ok(())
    }

    /// Removes and returns the job led by `pid`.
    pub fn remove_by_pid(&mut self, pid: Pid) -> Result<Job> {
        let job_id = self
            .pids
            .remove(&pid)
            .ok_or_else(|| Error::from(ErrorKind::NoSuchProcess(pid.as_raw())))?;
        debug!("removing job [{}] ({})", job_id, pid);
        self.jobs
            .remove(&job_id)
            .ok_or_else(|| Error::no_such_job(format!("%{}", job_id)))
    }

    pub fn update_state(&mut self, job_id: JobId, state: JobState) -> Result<()> {
        let job = self
            .jobs
            .get_mut(&job_id)
            .ok_or_else(|| Error::no_such_job(format!("%{}", job_id)))?;
        debug!("job [{}] {} -> {}", job_id, job.state, state);
        job.state = state;
        Ok(())
    }

    pub fn pid_of(&self, job_id: JobId) -> Option<Pid> {
        self.jobs.get(&job_id).map(Job::pid)
    }

    pub fn job_id_of(&self, pid: Pid) -> Option<JobId> {
        self.pids.get(&pid).cloned()
    }

    pub fn get(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.get(&job_id)
    }

    /// Jobs in ascending job id order.
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.jobs.values()
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Releases every job record. Jobs still tracked at this point are
    /// abandoned to the OS.
    pub fn teardown(&mut self) {
        for job in self.jobs.values() {
            info!("abandoning job [{}] ({}) {}", job.id, job.pid, job.command_name);
        }
        self.jobs.clear();
        self.pids.clear();
    }
}

impl fmt::Debug for JobTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} jobs", self.jobs.len())?;
        for job in self.jobs.values() {
            writeln!(f, "{:?}", job)?;
        }

        Ok(())
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobState::Running => write!(f, "Running"),
            JobState::Stopped => write!(f, "Stopped"),
        }
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) {}\t{}", self.id, self.pid, self.state, self.command_name)
    }
}
