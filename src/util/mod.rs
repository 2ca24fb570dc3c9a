use std::os::unix::process::ExitStatusExt;
use std::process::ExitStatus;

use nix::sys::signal::Signal;

/// Offset added to a signal number to form the status of a process killed by that signal.
const SIGNAL_STATUS_BASE: i32 = 128;

/// MSH Utility Extensions for `ExitStatus`
pub trait MshExitStatusExt {
    /// Create an ExitStatus to indicate *successful* program execution.
    fn from_success() -> Self;

    /// Create an ExitStatus to indicate *unsuccessful* program execution.
    fn from_failure() -> Self;

    /// Create an ExitStatus from a status code
    fn from_status(code: i32) -> Self;

    /// Create the ExitStatus reported for a process terminated by `signal` (128 + N).
    fn from_signal(signal: Signal) -> Self;

    /// The status code, treating anything without one as a failure.
    fn status_code(&self) -> i32;
}

impl MshExitStatusExt for ExitStatus {
    /// # Examples
    /// ```rust
    /// use msh_rs::MshExitStatusExt;
    /// use std::process::ExitStatus;
    /// assert!(ExitStatus::from_success().success());
    /// ```
    fn from_success() -> Self {
        ExitStatus::from_status(0)
    }

    /// # Examples
    /// ```rust
    /// use msh_rs::MshExitStatusExt;
    /// use std::process::ExitStatus;
    /// assert!(!ExitStatus::from_failure().success());
    /// ```
    fn from_failure() -> Self {
        ExitStatus::from_status(1)
    }

    fn from_status(code: i32) -> Self {
        ExitStatus::from_raw((code & 0xff) << 8)
    }

    fn from_signal(signal: Signal) -> Self {
        ExitStatus::from_status(SIGNAL_STATUS_BASE + signal as i32)
    }

    fn status_code(&self) -> i32 {
        self.code().unwrap_or(1)
    }
}
