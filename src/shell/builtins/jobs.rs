use crate::core::job::JobId;
use crate::shell::builtins::{self, prelude::*};

pub struct Jobs;

impl builtins::BuiltinCommand for Jobs {
    const NAME: &'static str = builtins::JOBS_NAME;

    const HELP: &'static str = "\
jobs            - lists the job processes that are running or suspended
    Lists the active jobs in the order they were started, one per line, as
    `<id>. <pgid> <status>   <command>`.";

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<ExitStatus> {
        for job in shell.jobs() {
            writeln!(stdout, "{}", job).context(ErrorKind::Io)?;
        }
        Ok(ExitStatus::from_success())
    }
}

pub struct Fg;

impl builtins::BuiltinCommand for Fg {
    const NAME: &'static str = builtins::FG_NAME;

    const HELP: &'static str = "\
fg <jobid>      - moves a background job to the foreground
    Continue the job identified by JOBID (optionally written `%JOBID`) and
    wait for it as the foreground job.

    Exit Status:
    Status of the job if it terminates, 0 if it stops again, 1 if JOBID is
    missing or unknown.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<ExitStatus> {
        let job_id = parse_job_id(Self::NAME, args)?;
        shell
            .put_job_in_foreground(job_id)
            .map_err(|e| prefix_job_error(Self::NAME, e))
    }
}

pub struct Bg;

impl builtins::BuiltinCommand for Bg {
    const NAME: &'static str = builtins::BG_NAME;

    const HELP: &'static str = "\
bg <jobid>      - resumes a job in the background
    Continue the job identified by JOBID (optionally written `%JOBID`) without
    waiting for it.

    Exit Status:
    Returns success unless JOBID is missing or unknown.";

    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write) -> Result<ExitStatus> {
        let job_id = parse_job_id(Self::NAME, args)?;
        let job = shell
            .put_job_in_background(job_id)
            .map_err(|e| prefix_job_error(Self::NAME, e))?;
        writeln!(stdout, "\n[{}]  {} &", job.id(), job.input()).context(ErrorKind::Io)?;
        Ok(ExitStatus::from_success())
    }
}

/// Parses the job id argument of `fg` and `bg`, e.g. `2` or `%2`.
fn parse_job_id<T: AsRef<str>>(builtin: &'static str, args: &[T]) -> Result<JobId> {
    let arg = match args.first() {
        Some(arg) => arg.as_ref(),
        None => return Err(Error::from(ErrorKind::JobIdRequired(builtin))),
    };

    let digits = arg.strip_prefix('%').unwrap_or(arg);
    digits
        .parse::<u32>()
        .map(JobId)
        .map_err(|_| Error::invalid_job_id(format!("{}: {}", builtin, arg)))
}

fn prefix_job_error(builtin: &'static str, e: Error) -> Error {
    match *e.kind() {
        ErrorKind::NoSuchJob(ref job) => Error::no_such_job(format!("{}: {}", builtin, job)),
        _ => e,
    }
}
