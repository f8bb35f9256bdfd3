use log::debug;

use crate::core::job::JobId;
use crate::shell::builtins::{self, prelude::*};

pub struct Jobs;

#[derive(Debug, Deserialize)]
struct JobsArgs {}

impl builtins::BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
Usage: jobs [--]

Display status of jobs.

Lists the background and stopped jobs in job id order, one per line.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<()> {
        let _: JobsArgs = parse_args(Self::HELP, Self::NAME, args)?;

        for job in shell.get_jobs() {
            writeln!(stdout, "{}", job).context(ErrorKind::Io)?;
        }

        Ok(())
    }
}

#[derive(Debug, Deserialize)]
struct JobspecArgs {
    arg_jobspec: String,
}

pub struct Fg;

impl builtins::BuiltinCommand for Fg {
    const NAME: &'static str = builtins::FG_NAME;

    const HELP: &'static str = "\
Usage: fg [--] <jobspec>

Move job to the foreground.

Continues the job identified by JOBSPEC (%N) in the foreground and waits
for it to exit or stop.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let job_id = parse_jobspec_args(Self::HELP, Self::NAME, args)?;
        shell.put_job_in_foreground(job_id)
    }
}

pub struct Bg;

impl builtins::BuiltinCommand for Bg {
    const NAME: &'static str = builtins::BG_NAME;

    const HELP: &'static str = "\
Usage: bg [--] <jobspec>

Move job to the background.

Continues the stopped job identified by JOBSPEC (%N) without waiting
for it, as if it had been started with `&'.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<()> {
        let job_id = parse_jobspec_args(Self::HELP, Self::NAME, args)?;
        shell.put_job_in_background(job_id)
    }
}

fn parse_jobspec_args<T: AsRef<str>>(usage: &str, name: &str, args: &[T]) -> Result<JobId> {
    let parsed: JobspecArgs = parse_args(usage, name, args)?;
    debug!("{:?}", parsed);
    parse_jobspec(&parsed.arg_jobspec)
        .ok_or_else(|| Error::syntax(format!("{} {}", name, parsed.arg_jobspec)))
}

/// Parses a job spec of the form `%N`.
fn parse_jobspec(jobspec: &str) -> Option<JobId> {
    if !jobspec.starts_with('%') {
        return None;
    }

    jobspec[1..].parse::<u32>().ok().map(JobId)
}
