use std::env;
use std::path::PathBuf;

use crate::shell::builtins::{self, prelude::*};

pub struct Cd;

impl builtins::BuiltinCommand for Cd {
    const NAME: &'static str = builtins::CD_NAME;

    const HELP: &'static str = "\
cd [dir]        - change directory to DIR, or to $HOME when DIR is omitted
    Change the current directory to DIR. Without DIR, the variable $HOME is
    used, falling back to the root directory when it is not set. Only the
    first argument is used.";

    fn run<T: AsRef<str>>(_shell: &mut Shell, args: &[T], _stdout: &mut dyn Write) -> Result<ExitStatus> {
        let dir = match args.first() {
            Some(dir) => PathBuf::from(dir.as_ref()),
            None => env::var_os("HOME")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("/")),
        };

        env::set_current_dir(&dir).map_err(|e| {
            Error::builtin_command(format!("cd: {}: {}", dir.display(), e), 1)
        })?;
        Ok(ExitStatus::from_success())
    }
}
