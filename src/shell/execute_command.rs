//! Launches a pipeline: one pipe between each pair of adjacent stages, one
//! forked child per stage, all children in the process group of the first.

use std::ffi::CString;
use std::io::{self, Write};
use std::os::unix::io::RawFd;

use failure::Fail;
use log::{debug, info};
use nix::{
    errno::Errno,
    fcntl::{self, OFlag},
    libc,
    sys::{
        signal::{self, Signal},
        stat::Mode,
    },
    unistd::{self, ForkResult, Pid},
};

use crate::{
    core::{
        intermediate_representation::{Command, Pipeline},
        job::ProcessGroup,
    },
    errors::{Error, ErrorKind, Result},
    shell::SignalRelay,
};

const CHILD_FAILURE_EXIT_STATUS: i32 = 127;

/// `(read end, write end)` of one pipe.
type Pipe = (RawFd, RawFd);

/// What a child needs to exec one stage, converted before forking so that
/// the child does not build it.
#[derive(Debug)]
struct PreparedCommand<'a> {
    program: Option<&'a str>,
    /// `None` when an argument holds a NUL byte.
    argv: Option<Vec<CString>>,
    stdin: Option<(&'a str, Option<CString>)>,
    stdout: Option<(&'a str, Option<CString>)>,
}

impl<'a> PreparedCommand<'a> {
    fn new(command: &'a Command) -> PreparedCommand<'a> {
        let c_path = |file: &'a String| (file.as_str(), CString::new(file.as_bytes()).ok());
        PreparedCommand {
            program: command.program(),
            argv: command
                .argv
                .iter()
                .map(|arg| CString::new(arg.as_bytes()))
                .collect::<std::result::Result<_, _>>()
                .ok(),
            stdin: command.stdin.as_ref().map(c_path),
            stdout: command.stdout.as_ref().map(c_path),
        }
    }
}

/// Forks one child per stage of `pipeline` and returns their process group.
///
/// Every pipe descriptor is closed in the parent before this returns. A
/// failure to create the pipes or to fork aborts the launch; stages already
/// forked are killed.
pub fn spawn_processes(pipeline: &Pipeline) -> Result<ProcessGroup> {
    let commands: Vec<PreparedCommand<'_>> =
        pipeline.commands.iter().map(PreparedCommand::new).collect();
    let pipes = create_pipes(commands.len().saturating_sub(1))?;

    // Anything still buffered would otherwise be written by every child too.
    log_if_err!(io::stdout().flush(), "flushing stdout before fork");

    let mut pgid: Option<Pid> = None;
    let mut pids = Vec::with_capacity(commands.len());
    for (index, command) in commands.iter().enumerate() {
        match unsafe { unistd::fork() } {
            Ok(ForkResult::Child) => exec_child(index, pgid, &pipes, command),
            Ok(ForkResult::Parent { child }) => {
                let group = *pgid.get_or_insert(child);
                // The child may already have joined the group, or exec'd.
                if let Err(e) = unistd::setpgid(child, group) {
                    debug!("setpgid({}, {}) from parent: {}", child, group, e);
                }
                pids.push(child);
            }
            Err(e) => {
                close_pipes(&pipes);
                if let Some(pgid) = pgid {
                    log_if_err!(
                        signal::kill(Pid::from_raw(-pgid.as_raw()), Signal::SIGKILL),
                        "killing partially launched group {}",
                        pgid
                    );
                }
                return Err(e.context(ErrorKind::Spawn).into());
            }
        }
    }
    close_pipes(&pipes);

    let pgid = pgid.ok_or_else(|| Error::from(ErrorKind::Spawn))?;
    info!("launched `{}` as process group {}", pipeline.input, pgid);
    Ok(ProcessGroup::new(pgid, &pids))
}

fn create_pipes(count: usize) -> Result<Vec<Pipe>> {
    let mut pipes = Vec::with_capacity(count);
    for _ in 0..count {
        match unistd::pipe() {
            Ok(pipe) => pipes.push(pipe),
            Err(e) => {
                close_pipes(&pipes);
                return Err(e.context(ErrorKind::Spawn).into());
            }
        }
    }
    debug!("created {} pipes", pipes.len());
    Ok(pipes)
}

fn close_pipes(pipes: &[Pipe]) {
    for &(read_end, write_end) in pipes {
        log_if_err!(unistd::close(read_end), "closing pipe read end {}", read_end);
        log_if_err!(unistd::close(write_end), "closing pipe write end {}", write_end);
    }
}

/// Runs in the forked child for stage `index`: joins the group, wires up the
/// pipe ends and redirections, then replaces the process image.
///
/// Nothing here may log or take a lock; diagnostics go straight to the
/// standard error descriptor and every failure ends the child with status 127.
fn exec_child(index: usize, pgid: Option<Pid>, pipes: &[Pipe], command: &PreparedCommand<'_>) -> ! {
    let _ = unistd::setpgid(Pid::from_raw(0), pgid.unwrap_or_else(|| Pid::from_raw(0)));
    SignalRelay::restore_defaults();

    if index > 0 {
        let _ = unistd::dup2(pipes[index - 1].0, libc::STDIN_FILENO);
    }
    if index < pipes.len() {
        let _ = unistd::dup2(pipes[index].1, libc::STDOUT_FILENO);
    }

    if let Some((file, ref path)) = command.stdin {
        if redirect(path.as_ref(), OFlag::O_RDONLY, libc::STDIN_FILENO).is_err() {
            report(file, "cannot open input file");
            exit_child();
        }
    }
    if let Some((file, ref path)) = command.stdout {
        let flags = OFlag::O_WRONLY | OFlag::O_CREAT | OFlag::O_TRUNC;
        if redirect(path.as_ref(), flags, libc::STDOUT_FILENO).is_err() {
            report(file, "cannot open output file");
            exit_child();
        }
    }

    for &(read_end, write_end) in pipes {
        let _ = unistd::close(read_end);
        let _ = unistd::close(write_end);
    }

    let program = match command.program {
        Some(program) => program,
        None => exit_child(),
    };
    let argv = match command.argv {
        Some(ref argv) => argv,
        None => {
            report(program, "invalid argument");
            exit_child();
        }
    };

    let e = match unistd::execvp(&argv[0], argv) {
        Ok(never) => match never {},
        Err(e) => e,
    };
    match e {
        Errno::ENOENT => report(program, "command not found"),
        e => report(program, e.desc()),
    }
    exit_child()
}

/// Opens `path` and moves it onto `target`.
fn redirect(path: Option<&CString>, flags: OFlag, target: RawFd) -> nix::Result<()> {
    let path = path.ok_or(Errno::EINVAL)?;
    let mode = Mode::S_IRUSR
        | Mode::S_IWUSR
        | Mode::S_IRGRP
        | Mode::S_IWGRP
        | Mode::S_IROTH
        | Mode::S_IWOTH;
    let fd = fcntl::open(path.as_c_str(), flags, mode)?;
    if fd != target {
        unistd::dup2(fd, target)?;
        unistd::close(fd)?;
    }
    Ok(())
}

/// Writes `msh: <subject>: <message>` to the standard error descriptor.
fn report(subject: &str, message: &str) {
    let parts: [&[u8]; 5] = [
        b"msh: ",
        subject.as_bytes(),
        b": ",
        message.as_bytes(),
        b"\n",
    ];
    for part in &parts {
        let _ = unistd::write(libc::STDERR_FILENO, part);
    }
}

fn exit_child() -> ! {
    unsafe { libc::_exit(CHILD_FAILURE_EXIT_STATUS) }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::core::job::WaitOutcome;
    use crate::core::parser::{tokenize, Segment};
    use crate::MshExitStatusExt;
    use std::process::ExitStatus;

    fn run(line: &str) -> ExitStatus {
        let tokens = tokenize(line, 127);
        let segment = Segment {
            tokens: &tokens,
            background: false,
        };
        let pipeline = Pipeline::parse(&segment).unwrap();
        let mut group = spawn_processes(&pipeline).unwrap();
        assert_eq!(group.processes().len(), pipeline.commands.len());
        match group.wait().unwrap() {
            WaitOutcome::Completed(status) => status,
            outcome => panic!("unexpected outcome: {:?}", outcome),
        }
    }

    #[test]
    fn test_create_pipes_connects_ends() {
        assert!(create_pipes(0).unwrap().is_empty());

        let pipes = create_pipes(3).unwrap();
        assert_eq!(pipes.len(), 3);
        for &(read_end, write_end) in &pipes {
            assert_eq!(unistd::write(write_end, b"x").unwrap(), 1);
            let mut buf = [0u8; 1];
            assert_eq!(unistd::read(read_end, &mut buf).unwrap(), 1);
            assert_eq!(&buf, b"x");
        }
        close_pipes(&pipes);
    }

    #[test]
    fn test_pipeline_status_is_last_stage() {
        assert_eq!(run("false | true"), ExitStatus::from_success());
        assert_eq!(run("true | false").status_code(), 1);
    }

    #[test]
    fn test_missing_program_exits_127() {
        assert_eq!(run("msh-test-no-such-program").status_code(), 127);
    }

    #[test]
    fn test_prepared_command_rejects_nul_arguments() {
        let command = Command {
            argv: vec!["echo".to_string(), "a\0b".to_string()],
            stdin: Some("in.txt".to_string()),
            stdout: None,
        };
        let prepared = PreparedCommand::new(&command);
        assert_eq!(prepared.program, Some("echo"));
        assert!(prepared.argv.is_none());
        let (file, path) = prepared.stdin.unwrap();
        assert_eq!(file, "in.txt");
        assert_eq!(path.unwrap().as_bytes(), b"in.txt");
        assert!(prepared.stdout.is_none());
    }

    #[test]
    fn test_missing_input_file_exits_127() {
        assert_eq!(run("cat < /nonexistent/msh-input").status_code(), 127);
    }
}
