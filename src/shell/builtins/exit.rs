use crate::shell::builtins::{self, prelude::*};

pub struct Exit;

impl builtins::BuiltinCommand for Exit {
    const NAME: &'static str = builtins::EXIT_NAME;

    const HELP: &'static str = "\
exit            - terminates every job, then the shell
    Send SIGTERM to the process group of every job and exit the shell with a
    status of 0. Arguments are ignored.";

    fn run<T: AsRef<str>>(shell: &mut Shell, _args: &[T], stdout: &mut dyn Write) -> Result<ExitStatus> {
        stdout.flush().context(ErrorKind::Io)?;
        shell.exit(ExitStatus::from_success());
    }
}
