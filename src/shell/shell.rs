//! Msh - Shell Module
//!
//! The Shell reads command lines, runs them segment by segment, and owns the
//! job table and the command history.

use std::fmt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::process::{self, ExitStatus};

use failure::Fail;
use log::{debug, error, info};
use nix::sys::signal::{self, Signal};
use nix::unistd::Pid;

use crate::{
    core::{
        intermediate_representation::{Command, Pipeline},
        job::{Job, JobId, JobStatus, WaitOutcome},
        parser::{self, Segment},
    },
    editor::Editor,
    errors::{ErrorKind, Result},
    history::History,
    shell::{
        builtins,
        execute_command::spawn_processes,
        job_control::JobManager,
        ShellConfig, SignalRelay,
    },
    util::MshExitStatusExt,
};

const COMMAND_NOT_FOUND_EXIT_STATUS: i32 = 127;

/// Msh Shell
pub struct Shell {
    /// Responsible for reading lines and for history.
    editor: Editor,
    job_manager: JobManager,
    relay: SignalRelay,
    /// Exit status of last command line executed.
    last_exit_status: ExitStatus,
    config: ShellConfig,
}

impl Shell {
    /// Constructs a new Shell to manage running jobs and command history.
    pub fn new(config: ShellConfig, relay: SignalRelay) -> Shell {
        info!("msh started up");
        let mut editor = Editor::new(config.max_line_len(), config.command_history_capacity());
        editor.set_interrupt_fd(relay.interrupt_fd());
        Shell {
            editor,
            job_manager: JobManager::with_capacity(config.job_capacity()),
            relay,
            last_exit_status: ExitStatus::from_success(),
            config,
        }
    }

    /// Runs command lines from stdin until end of input, then exits.
    pub fn execute_from_stdin(&mut self) -> ! {
        loop {
            self.check_interrupt();
            // Check the status of background jobs, removing exited ones.
            self.job_manager.do_job_notification();

            let prompt = if self.config.display_messages() {
                Some(self.config.prompt())
            } else {
                None
            };
            let line = match self.editor.readline(prompt) {
                Ok(Some(line)) => line,
                Ok(None) => break,
                Err(ref e) if *e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => {
                    error!("readline: {}", e);
                    break;
                }
            };

            if line.trim().is_empty() {
                continue;
            }
            if self.config.enable_command_history() {
                self.editor.add_history_entry(&line);
            }
            self.execute_command_string(&line);
        }

        if self.config.display_messages() {
            println!();
        }
        self.exit(ExitStatus::from_success())
    }

    /// Runs one command line and returns the status of its last executed
    /// segment.
    pub fn execute_command_string(&mut self, input: &str) -> ExitStatus {
        let tokens = parser::tokenize(input, self.config.max_tokens());
        debug!("tokens: {:?}", tokens);

        let status = parser::run_segments(&tokens, |segment| self.execute_segment(segment));
        self.last_exit_status = status;
        status
    }

    fn execute_segment(&mut self, segment: &Segment<'_>) -> ExitStatus {
        self.check_interrupt();

        let pipeline = match Pipeline::parse(segment) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                eprintln!("msh: {}", e);
                return ExitStatus::from_failure();
            }
        };

        if let Some(command) = pipeline.single_foreground_command() {
            if command.program().map_or(false, builtins::is_builtin) {
                return self.run_builtin(command);
            }
        }

        match self.launch(&pipeline) {
            Ok(status) => status,
            Err(e) => {
                match e.cause() {
                    Some(cause) => eprintln!("msh: {}: {}", e, cause),
                    None => eprintln!("msh: {}", e),
                }
                error!("launching `{}`: {}", pipeline.input, e);
                ExitStatus::from_failure()
            }
        }
    }

    /// Launches an external pipeline; waits on it unless it runs in the
    /// background.
    fn launch(&mut self, pipeline: &Pipeline) -> Result<ExitStatus> {
        let group = spawn_processes(pipeline)?;

        if pipeline.background {
            let pgid = group.pgid();
            match self.job_manager.add(group, &pipeline.input, JobStatus::Running) {
                Ok(job_id) => println!("[{}] {} running in background", job_id, pgid),
                Err(e) => eprintln!("msh: {}", e),
            }
            return Ok(ExitStatus::from_success());
        }

        let outcome = self
            .job_manager
            .run_in_foreground(group, &pipeline.input, &self.relay)?;
        self.foreground_status(outcome)
    }

    fn run_builtin(&mut self, command: &Command) -> ExitStatus {
        let program = match command.program() {
            Some(program) => program,
            None => return ExitStatus::from_status(COMMAND_NOT_FOUND_EXIT_STATUS),
        };

        if let Some(ref file) = command.stdin {
            if File::open(file).is_err() {
                eprintln!("msh: {}: cannot open input file", file);
                return ExitStatus::from_status(COMMAND_NOT_FOUND_EXIT_STATUS);
            }
        }

        match command.stdout {
            Some(ref file) => match open_output_file(file) {
                Ok(mut file) => builtins::run(self, program, command.args(), &mut file),
                Err(_) => {
                    eprintln!("msh: {}: cannot open output file", file);
                    ExitStatus::from_status(COMMAND_NOT_FOUND_EXIT_STATUS)
                }
            },
            None => builtins::run(self, program, command.args(), &mut io::stdout()),
        }
    }

    /// Continues a job and waits for it in the foreground.
    pub fn put_job_in_foreground(&mut self, job_id: JobId) -> Result<ExitStatus> {
        let outcome = self.job_manager.put_job_in_foreground(job_id, &self.relay)?;
        self.foreground_status(outcome)
    }

    /// Continues a job in the background.
    pub fn put_job_in_background(&mut self, job_id: JobId) -> Result<&Job> {
        self.job_manager.put_job_in_background(job_id)
    }

    fn foreground_status(&mut self, outcome: WaitOutcome) -> Result<ExitStatus> {
        match outcome {
            WaitOutcome::Completed(status) => Ok(status),
            WaitOutcome::Stopped => Ok(ExitStatus::from_success()),
            WaitOutcome::Interrupted => self.interrupt(),
        }
    }

    /// Returns the shell's jobs (running and stopped), in insertion order.
    pub fn jobs(&self) -> &[Job] {
        self.job_manager.jobs()
    }

    pub fn history(&self) -> &History {
        self.editor.history()
    }

    pub fn last_exit_status(&self) -> ExitStatus {
        self.last_exit_status
    }

    pub fn config(&self) -> &ShellConfig {
        &self.config
    }

    /// Exit the shell with `status`, terminating every job first.
    pub fn exit(&mut self, status: ExitStatus) -> ! {
        self.job_manager.terminate_all();
        log_if_err!(io::stdout().flush(), "flushing stdout");

        info!("msh has shut down");
        process::exit(status.status_code());
    }

    fn check_interrupt(&mut self) {
        if self.relay.interrupt_pending() {
            self.interrupt();
        }
    }

    /// Terminates the foreground group and every job, then the shell itself.
    fn interrupt(&mut self) -> ! {
        info!("interrupted");
        println!("\nmini-shell terminated");
        if let Some(pgid) = self.relay.foreground() {
            let group = Pid::from_raw(-pgid.as_raw());
            log_if_err!(signal::kill(group, Signal::SIGTERM), "terminating group {}", pgid);
            log_if_err!(signal::kill(group, Signal::SIGCONT), "continuing group {}", pgid);
        }
        self.exit(ExitStatus::from_success())
    }
}

impl fmt::Debug for Shell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} jobs\n{:?}", self.job_manager, self.editor)
    }
}

fn open_output_file(file: &str) -> io::Result<File> {
    OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o666)
        .open(file)
}
