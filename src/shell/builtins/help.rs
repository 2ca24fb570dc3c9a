use crate::shell::builtins::{self, prelude::*, BuiltinCommand};
use crate::shell::builtins::{Bg, Cd, Exit, Fg, History, Jobs};

pub struct Help;

impl builtins::BuiltinCommand for Help {
    const NAME: &'static str = builtins::HELP_NAME;

    const HELP: &'static str = "\
help            - explains how to use this mini-shell's built in functions
    Display a short usage summary of every builtin command.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<ExitStatus> {
        writeln!(stdout, "Commands in the mini-shell:").context(ErrorKind::Io)?;
        for usage in &[
            Cd::usage(),
            Exit::usage(),
            Help::usage(),
            Fg::usage(),
            Jobs::usage(),
            Bg::usage(),
            History::usage(),
        ] {
            writeln!(stdout, "{}", usage).context(ErrorKind::Io)?;
        }
        Ok(ExitStatus::from_success())
    }
}
