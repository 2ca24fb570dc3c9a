use crate::shell::builtins::{self, prelude::*};

pub struct History;

impl builtins::BuiltinCommand for History {
    const NAME: &'static str = builtins::HISTORY_NAME;

    const HELP: &'static str = "\
history         - shows command history
    Display the history list with line numbers, oldest first.";

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<ExitStatus> {
        write!(stdout, "{}", shell.history()).context(ErrorKind::Io)?;
        Ok(ExitStatus::from_success())
    }
}
