use std::fmt;
use std::process::ExitStatus;

use failure::{Fail, ResultExt};
use log::debug;
use nix::{
    errno::Errno,
    sys::{
        signal::{self, Signal},
        wait::{self, WaitPidFlag, WaitStatus},
    },
    unistd::Pid,
};

use crate::{
    errors::{Error, ErrorKind, Result},
    util::MshExitStatusExt,
};

#[derive(Clone, Copy, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub struct JobId(pub u32);

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum JobStatus {
    Running,
    Stopped,
    Done,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ProcessStatus {
    Running,
    Stopped,
    Completed,
}

impl Default for ProcessStatus {
    fn default() -> Self {
        ProcessStatus::Running
    }
}

/// One member process of a pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct Process {
    pid: Pid,
    status: ProcessStatus,
    /// `None` until the process terminates, and also when it was reaped by
    /// someone else before we could observe it.
    status_code: Option<ExitStatus>,
}

impl Process {
    pub fn new(pid: Pid) -> Self {
        Self {
            pid,
            status: ProcessStatus::Running,
            status_code: None,
        }
    }

    pub fn pid(&self) -> Pid {
        self.pid
    }

    pub fn status(&self) -> ProcessStatus {
        self.status
    }

    pub fn status_code(&self) -> Option<ExitStatus> {
        self.status_code
    }
}

/// What a blocking wait on a process group observed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum WaitOutcome {
    /// A member of the group stopped; the rest of the group may still be running.
    Stopped,
    /// Every member terminated. Carries the status of the pipeline.
    Completed(ExitStatus),
    /// The wait was cut short by the interrupt signal.
    Interrupted,
}

/// Waitable handle for the processes of one launched pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct ProcessGroup {
    pgid: Pid,
    processes: Vec<Process>,
    /// Status of the most recent member to terminate.
    last_status_code: Option<ExitStatus>,
}

impl ProcessGroup {
    /// `pids` are in pipeline stage order; the first one leads the group.
    pub fn new(pgid: Pid, pids: &[Pid]) -> Self {
        Self {
            pgid,
            processes: pids.iter().cloned().map(Process::new).collect(),
            last_status_code: None,
        }
    }

    pub fn pgid(&self) -> Pid {
        self.pgid
    }

    pub fn processes(&self) -> &[Process] {
        &self.processes
    }

    pub fn contains(&self, pid: Pid) -> bool {
        self.processes.iter().any(|p| p.pid == pid)
    }

    /// Status of the group as a whole: done once every member completed,
    /// stopped once every member still alive is stopped.
    pub fn status(&self) -> JobStatus {
        let mut alive = self
            .processes
            .iter()
            .filter(|p| p.status != ProcessStatus::Completed)
            .peekable();
        if alive.peek().is_none() {
            JobStatus::Done
        } else if alive.all(|p| p.status == ProcessStatus::Stopped) {
            JobStatus::Stopped
        } else {
            JobStatus::Running
        }
    }

    /// Exit status of the pipeline: the last stage's status when it was
    /// observed, otherwise that of the last member seen terminating.
    pub fn exit_status(&self) -> ExitStatus {
        self.processes
            .last()
            .and_then(Process::status_code)
            .or(self.last_status_code)
            .unwrap_or_else(ExitStatus::from_success)
    }

    /// Applies a status change reported by `waitpid`.
    ///
    /// Returns `false` if the change belongs to a process outside this group.
    pub fn update(&mut self, status: WaitStatus) -> bool {
        let (pid, new_status, status_code) = match status {
            WaitStatus::Exited(pid, code) => (
                pid,
                ProcessStatus::Completed,
                Some(ExitStatus::from_status(code)),
            ),
            WaitStatus::Signaled(pid, signal, _) => (
                pid,
                ProcessStatus::Completed,
                Some(ExitStatus::from_signal(signal)),
            ),
            WaitStatus::Stopped(pid, _) => (pid, ProcessStatus::Stopped, None),
            WaitStatus::Continued(pid) => (pid, ProcessStatus::Running, None),
            _ => return false,
        };

        let process = match self.processes.iter_mut().find(|p| p.pid == pid) {
            Some(process) => process,
            None => return false,
        };
        process.status = new_status;
        if status_code.is_some() {
            process.status_code = status_code;
            self.last_status_code = status_code;
        }

        true
    }

    /// Marks every live member running again, e.g. after a SIGCONT was sent.
    pub fn mark_running(&mut self) {
        for process in &mut self.processes {
            if process.status == ProcessStatus::Stopped {
                process.status = ProcessStatus::Running;
            }
        }
    }

    /// Sends `signal` to every member of the group.
    pub fn signal(&self, signal: Signal) -> Result<()> {
        signal::kill(Pid::from_raw(-self.pgid.as_raw()), signal).context(ErrorKind::Nix)?;
        Ok(())
    }

    /// Blocks until a member of the group stops or every member terminated.
    ///
    /// Returns an `Interrupted` error when a signal handler ran while blocked;
    /// the group's state is kept, so the wait may simply be resumed.
    pub fn wait(&mut self) -> Result<WaitOutcome> {
        let target = Pid::from_raw(-self.pgid.as_raw());
        loop {
            if self.status() == JobStatus::Done {
                return Ok(WaitOutcome::Completed(self.exit_status()));
            }

            let status = match wait::waitpid(target, Some(WaitPidFlag::WUNTRACED)) {
                Ok(status) => status,
                Err(Errno::EINTR) => return Err(Error::from(ErrorKind::Interrupted)),
                Err(Errno::ECHILD) => {
                    debug!("process group {} has no children left to wait for", self.pgid);
                    self.mark_lost();
                    continue;
                }
                Err(e) => return Err(e.context(ErrorKind::Nix).into()),
            };

            debug!("process group {}: {:?}", self.pgid, status);
            self.update(status);
            if let WaitStatus::Stopped(..) = status {
                return Ok(WaitOutcome::Stopped);
            }
        }
    }

    fn mark_lost(&mut self) {
        for process in &mut self.processes {
            process.status = ProcessStatus::Completed;
        }
    }
}

/// A pipeline tracked by the job table.
#[derive(Clone, Debug)]
pub struct Job {
    id: JobId,
    input: String,
    status: JobStatus,
    group: ProcessGroup,
}

impl Job {
    pub fn new(id: JobId, input: &str, status: JobStatus, group: ProcessGroup) -> Self {
        Self {
            id,
            input: input.to_string(),
            status,
            group,
        }
    }

    pub fn id(&self) -> JobId {
        self.id
    }

    pub fn input(&self) -> &str {
        &self.input
    }

    pub fn pgid(&self) -> Pid {
        self.group.pgid()
    }

    pub fn status(&self) -> JobStatus {
        self.status
    }

    pub fn set_status(&mut self, status: JobStatus) {
        self.status = status;
    }

    pub fn group(&self) -> &ProcessGroup {
        &self.group
    }

    pub fn group_mut(&mut self) -> &mut ProcessGroup {
        &mut self.group
    }
}

/// Formats the job the way the `jobs` builtin lists it.
impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}. {} {}   {}", self.id, self.pgid(), self.status, self.input)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            JobStatus::Running => write!(f, "Running"),
            JobStatus::Stopped => write!(f, "Stopped"),
            JobStatus::Done => write!(f, "Done"),
        }
    }
}
