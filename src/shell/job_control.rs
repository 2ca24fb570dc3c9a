//! The job table, the reaper, and foreground waits.

use std::fmt;

use log::{debug, error, info};
use nix::{
    errno::Errno,
    sys::{
        signal::Signal,
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use crate::{
    core::job::{Job, JobId, JobStatus, ProcessGroup, WaitOutcome},
    errors::{Error, ErrorKind, Result},
    shell::SignalRelay,
};

/// Something that happened to a tracked job, reported to the user.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobEvent {
    Stopped,
    Continued,
    Finished,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Notice {
    pub id: JobId,
    pub event: JobEvent,
    pub input: String,
}

impl Notice {
    fn new(job: &Job, event: JobEvent) -> Self {
        Self {
            id: job.id(),
            event,
            input: job.input().to_string(),
        }
    }
}

impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\n[{}]  {} {}", self.id, self.event, self.input)
    }
}

impl fmt::Display for JobEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobEvent::Stopped => write!(f, "Stopped"),
            JobEvent::Continued => write!(f, "Continued"),
            JobEvent::Finished => write!(f, "Finished"),
        }
    }
}

/// Bounded table of background and stopped jobs, in insertion order.
///
/// Job ids are handed out monotonically and never reused. A full table
/// refuses new jobs rather than evicting old ones.
pub struct JobManager {
    jobs: Vec<Job>,
    capacity: usize,
    job_count: u32,
}

impl JobManager {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            jobs: Vec::with_capacity(capacity),
            capacity,
            job_count: 0,
        }
    }

    pub fn add(&mut self, group: ProcessGroup, input: &str, status: JobStatus) -> Result<JobId> {
        if self.jobs.len() >= self.capacity {
            return Err(Error::from(ErrorKind::JobTableFull(self.capacity)));
        }
        if self.find_by_pgid(group.pgid()).is_some() {
            return Err(Error::from(ErrorKind::DuplicateProcessGroup(
                group.pgid().as_raw(),
            )));
        }

        let job_id = self.get_next_job_id();
        debug!("adding job [{}] for process group {}", job_id, group.pgid());
        self.jobs.push(Job::new(job_id, input, status, group));
        Ok(job_id)
    }

    pub fn remove_by_pgid(&mut self, pgid: Pid) -> Option<Job> {
        let index = self.jobs.iter().position(|job| job.pgid() == pgid)?;
        Some(self.jobs.remove(index))
    }

    pub fn find_by_id(&self, job_id: JobId) -> Option<&Job> {
        self.jobs.iter().find(|job| job.id() == job_id)
    }

    pub fn find_by_pgid(&self, pgid: Pid) -> Option<&Job> {
        self.jobs.iter().find(|job| job.pgid() == pgid)
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Waits on a just-launched foreground pipeline.
    ///
    /// A pipeline that stops is registered as a stopped job. The foreground
    /// marker stays set when the wait is interrupted, so the shell can still
    /// terminate the group.
    pub fn run_in_foreground(
        &mut self,
        mut group: ProcessGroup,
        input: &str,
        relay: &SignalRelay,
    ) -> Result<WaitOutcome> {
        relay.set_foreground(group.pgid());
        let outcome = wait_for_group(&mut group, relay);
        release_foreground(&outcome, relay);

        if let Ok(WaitOutcome::Stopped) = outcome {
            match self.add(group, input, JobStatus::Stopped) {
                Ok(job_id) => println!("\n[{}]  {} {}", job_id, JobEvent::Stopped, input),
                Err(e) => eprintln!("msh: {}", e),
            }
        }
        outcome
    }

    /// Continues a job and waits on it as the foreground job.
    pub fn put_job_in_foreground(
        &mut self,
        job_id: JobId,
        relay: &SignalRelay,
    ) -> Result<WaitOutcome> {
        debug!("putting job [{}] in foreground", job_id);
        let job_index = self
            .find_job(job_id)
            .ok_or_else(|| Error::no_such_job(job_id.to_string()))?;

        let outcome = {
            let job = &mut self.jobs[job_index];
            job.group().signal(Signal::SIGCONT)?;
            job.group_mut().mark_running();
            job.set_status(JobStatus::Running);

            relay.set_foreground(job.pgid());
            let outcome = wait_for_group(job.group_mut(), relay);
            release_foreground(&outcome, relay);
            outcome?
        };

        match outcome {
            WaitOutcome::Stopped => {
                let job = &mut self.jobs[job_index];
                job.set_status(JobStatus::Stopped);
                println!("{}", Notice::new(job, JobEvent::Stopped));
            }
            WaitOutcome::Completed(_) => {
                self.jobs.remove(job_index);
            }
            WaitOutcome::Interrupted => {}
        }
        Ok(outcome)
    }

    /// Continues a job without waiting for it.
    ///
    /// The members stay recorded as stopped until the reaper observes their
    /// continuation, which is what produces the resume notice.
    pub fn put_job_in_background(&mut self, job_id: JobId) -> Result<&Job> {
        debug!("putting job [{}] in background", job_id);
        let job_index = self
            .find_job(job_id)
            .ok_or_else(|| Error::no_such_job(job_id.to_string()))?;

        let job = &mut self.jobs[job_index];
        job.group().signal(Signal::SIGCONT)?;
        job.set_status(JobStatus::Running);
        Ok(job)
    }

    /// Drains every pending status change without blocking and notifies the
    /// user about the jobs they affect.
    pub fn do_job_notification(&mut self) {
        let flags = WaitPidFlag::WNOHANG | WaitPidFlag::WUNTRACED | WaitPidFlag::WCONTINUED;
        loop {
            match wait::waitpid(Pid::from_raw(-1), Some(flags)) {
                Ok(WaitStatus::StillAlive) | Err(Errno::ECHILD) => break,
                Ok(status) => {
                    if let Some(notice) = self.apply_status_change(status) {
                        println!("{}", notice);
                    }
                }
                Err(Errno::EINTR) => continue,
                Err(e) => {
                    error!("do_job_notification: {}", e);
                    break;
                }
            }
        }
    }

    /// Records one status change reported by `waitpid`.
    ///
    /// Changes of processes no job owns are discarded. A job is removed once
    /// all its processes terminated. A stop is announced once per job, when
    /// the job was not already stopped; a continuation is announced when the
    /// first member of a stopped group resumes.
    pub fn apply_status_change(&mut self, status: WaitStatus) -> Option<Notice> {
        let pid = status.pid()?;
        let pgid = match self.owning_pgid(pid) {
            Some(pgid) => pgid,
            None => {
                debug!("discarding {:?} of untracked process", status);
                return None;
            }
        };
        let job_index = self.jobs.iter().position(|job| job.pgid() == pgid)?;

        let job = &mut self.jobs[job_index];
        let group_status = job.group().status();
        job.group_mut().update(status);
        let new_status = job.group().status();

        let event = match (status, new_status) {
            (_, JobStatus::Done) => JobEvent::Finished,
            (WaitStatus::Continued(_), JobStatus::Running) if group_status != JobStatus::Running => {
                JobEvent::Continued
            }
            (_, JobStatus::Stopped) if job.status() != JobStatus::Stopped => JobEvent::Stopped,
            _ => return None,
        };

        job.set_status(new_status);
        let notice = Notice::new(job, event);
        if new_status == JobStatus::Done {
            info!("job [{}] finished", job.id());
            self.jobs.remove(job_index);
        }
        Some(notice)
    }

    /// Sends SIGTERM to every job's process group, followed by SIGCONT so
    /// that stopped jobs act on it.
    pub fn terminate_all(&mut self) {
        for job in &self.jobs {
            debug!("terminating job [{}]", job.id());
            log_if_err!(job.group().signal(Signal::SIGTERM), "terminating job [{}]", job.id());
            log_if_err!(job.group().signal(Signal::SIGCONT), "continuing job [{}]", job.id());
        }
    }

    fn owning_pgid(&self, pid: Pid) -> Option<Pid> {
        self.jobs
            .iter()
            .find(|job| job.group().contains(pid))
            .map(Job::pgid)
    }

    fn get_next_job_id(&mut self) -> JobId {
        self.job_count += 1;
        JobId(self.job_count)
    }

    fn find_job(&self, job_id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id() == job_id)
    }
}

impl fmt::Debug for JobManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}/{} jobs\tjob_count: {}",
            self.jobs.len(),
            self.capacity,
            self.job_count
        )?;
        for job in &self.jobs {
            writeln!(f, "{}", job)?;
        }

        Ok(())
    }
}

/// Waits on `group`, resuming after signals other than the interrupt.
fn wait_for_group(group: &mut ProcessGroup, relay: &SignalRelay) -> Result<WaitOutcome> {
    loop {
        if relay.interrupt_pending() {
            return Ok(WaitOutcome::Interrupted);
        }
        match group.wait() {
            Err(ref e) if *e.kind() == ErrorKind::Interrupted => continue,
            result => return result,
        }
    }
}

fn release_foreground(outcome: &Result<WaitOutcome>, relay: &SignalRelay) {
    if let Ok(WaitOutcome::Interrupted) = *outcome {
        return;
    }
    relay.clear_foreground();
}
