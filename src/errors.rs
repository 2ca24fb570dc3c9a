//! Error module. See the [failure](https://crates.io/crates/failure) crate for details.

use std::fmt;
use std::result;

use failure::{Backtrace, Context, Fail};

pub type Result<T> = result::Result<T, Error>;

#[derive(Debug)]
pub struct Error {
    ctx: Context<ErrorKind>,
}

impl Error {
    pub fn kind(&self) -> &ErrorKind {
        self.ctx.get_context()
    }

    pub(crate) fn syntax<T: AsRef<str>>(token: T) -> Error {
        Error::from(ErrorKind::Syntax(token.as_ref().to_string()))
    }

    pub(crate) fn builtin_command<T: AsRef<str>>(message: T, code: i32) -> Error {
        Error::from(ErrorKind::BuiltinCommand {
            message: message.as_ref().to_string(),
            code,
        })
    }

    pub(crate) fn no_such_job<T: AsRef<str>>(job: T) -> Error {
        Error::from(ErrorKind::NoSuchJob(job.as_ref().to_string()))
    }

    pub(crate) fn invalid_job_id<T: AsRef<str>>(job: T) -> Error {
        Error::from(ErrorKind::InvalidJobId(job.as_ref().to_string()))
    }
}

impl Fail for Error {
    fn cause(&self) -> Option<&dyn Fail> {
        self.ctx.cause()
    }

    fn backtrace(&self) -> Option<&Backtrace> {
        self.ctx.backtrace()
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.ctx, f)
    }
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum ErrorKind {
    Syntax(String),
    BuiltinCommand { message: String, code: i32 },
    NoSuchJob(String),
    /// `fg` or `bg` invoked without a job id; carries the builtin's name.
    JobIdRequired(&'static str),
    InvalidJobId(String),
    JobTableFull(usize),
    DuplicateProcessGroup(i32),
    /// A blocking call was cut short by the interrupt signal.
    Interrupted,
    Spawn,
    Io,
    Nix,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            ErrorKind::Syntax(ref token) => write!(f, "syntax error near unexpected token `{}'", token),
            ErrorKind::BuiltinCommand { ref message, .. } => write!(f, "{}", message),
            ErrorKind::NoSuchJob(ref job) => write!(f, "{}: no such job", job),
            ErrorKind::JobIdRequired(builtin) => write!(f, "{}: job id required", builtin),
            ErrorKind::InvalidJobId(ref job) => write!(f, "{}: invalid job id", job),
            ErrorKind::JobTableFull(capacity) => write!(f, "too many jobs (capacity {})", capacity),
            ErrorKind::DuplicateProcessGroup(pgid) => {
                write!(f, "process group {} is already tracked", pgid)
            }
            ErrorKind::Interrupted => write!(f, "interrupted"),
            ErrorKind::Spawn => write!(f, "failed to launch pipeline"),
            ErrorKind::Io => write!(f, "I/O error occurred"),
            ErrorKind::Nix => write!(f, "Nix error occurred"),
        }
    }
}

impl From<ErrorKind> for Error {
    fn from(kind: ErrorKind) -> Error {
        Error::from(Context::new(kind))
    }
}

impl From<Context<ErrorKind>> for Error {
    fn from(ctx: Context<ErrorKind>) -> Error {
        Error { ctx }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_is_preserved() {
        let e = Error::no_such_job("4");
        assert_eq!(*e.kind(), ErrorKind::NoSuchJob("4".to_string()));
        assert_eq!(e.to_string(), "4: no such job");
    }

    #[test]
    fn test_builtin_command_message() {
        let e = Error::builtin_command("cd: /nowhere: No such file or directory", 1);
        assert_eq!(e.to_string(), "cd: /nowhere: No such file or directory");
    }
}
