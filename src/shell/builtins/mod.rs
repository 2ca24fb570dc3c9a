//! Msh builtins
//!
//! Commands run inside the shell process itself. A builtin is only recognized
//! as the single command of a foreground segment.

use self::prelude::*;

use self::dirs::Cd;
use self::exit::Exit;
use self::help::Help;
use self::history::History;
use self::jobs::{Bg, Fg, Jobs};

pub mod prelude {
    pub use std::io::Write;
    pub use std::process::ExitStatus;

    pub use failure::ResultExt;

    pub use crate::errors::{Error, ErrorKind, Result};
    pub use crate::shell::Shell;
    pub use crate::util::MshExitStatusExt;
}

mod dirs;
mod exit;
mod help;
mod history;
mod jobs;

const BG_NAME: &str = "bg";
const CD_NAME: &str = "cd";
const EXIT_NAME: &str = "exit";
const FG_NAME: &str = "fg";
const HELP_NAME: &str = "help";
const HISTORY_NAME: &str = "history";
const JOBS_NAME: &str = "jobs";

/// Represents a Msh builtin command such as cd or help.
pub trait BuiltinCommand {
    /// The NAME of the command.
    const NAME: &'static str;
    /// The help string to display to the user.
    const HELP: &'static str;
    /// The usage string to display to the user.
    fn usage() -> &'static str {
        Self::HELP.lines().next().unwrap_or(Self::NAME)
    }
    /// Runs the command with the given arguments in the `shell` environment.
    fn run<T: AsRef<str>>(shell: &mut Shell, args: &[T], stdout: &mut dyn Write)
        -> Result<ExitStatus>;
}

pub fn is_builtin<T: AsRef<str>>(program: T) -> bool {
    [
        BG_NAME,
        CD_NAME,
        EXIT_NAME,
        FG_NAME,
        HELP_NAME,
        HISTORY_NAME,
        JOBS_NAME,
    ]
    .contains(&program.as_ref())
}

/// precondition: command is a builtin.
///
/// Errors are reported on stderr and turned into the returned status.
pub fn run<S1, S2>(shell: &mut Shell, program: S1, args: &[S2], stdout: &mut dyn Write) -> ExitStatus
where
    S1: AsRef<str>,
    S2: AsRef<str>,
{
    debug_assert!(is_builtin(&program));

    let result = match program.as_ref() {
        BG_NAME => Bg::run(shell, args, stdout),
        CD_NAME => Cd::run(shell, args, stdout),
        EXIT_NAME => Exit::run(shell, args, stdout),
        FG_NAME => Fg::run(shell, args, stdout),
        HELP_NAME => Help::run(shell, args, stdout),
        HISTORY_NAME => History::run(shell, args, stdout),
        JOBS_NAME => Jobs::run(shell, args, stdout),
        _ => unreachable!(),
    };

    match result {
        Ok(status) => status,
        Err(e) => {
            eprintln!("msh: {}", e);
            get_builtin_exit_status(&e)
        }
    }
}

fn get_builtin_exit_status(e: &Error) -> ExitStatus {
    match *e.kind() {
        ErrorKind::BuiltinCommand { code, .. } => ExitStatus::from_status(code),
        _ => ExitStatus::from_failure(),
    }
}
