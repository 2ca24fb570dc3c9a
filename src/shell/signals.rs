//! Relays the terminal's interrupt and stop signals.
//!
//! Handlers only touch the atomics below: the interrupt handler raises a flag
//! and writes a byte to a pipe the line reader watches, and the stop handler
//! forwards SIGTSTP to the foreground process group. Everything else happens
//! on the main loop.

use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};

use failure::ResultExt;
use log::debug;
use nix::{
    libc,
    fcntl::OFlag,
    sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal},
    unistd::{self, alarm, Pid},
};

use crate::errors::{ErrorKind, Result};

/// Process group currently waited on in the foreground, 0 when none.
static FOREGROUND_PGID: AtomicI32 = AtomicI32::new(0);
static INTERRUPT_PENDING: AtomicBool = AtomicBool::new(false);
/// Ends of the interrupt pipe, -1 until `install` created it.
static INTERRUPT_READ_FD: AtomicI32 = AtomicI32::new(-1);
static INTERRUPT_WRITE_FD: AtomicI32 = AtomicI32::new(-1);

extern "C" fn handle_interrupt(_: libc::c_int) {
    INTERRUPT_PENDING.store(true, Ordering::SeqCst);
    let fd = INTERRUPT_WRITE_FD.load(Ordering::SeqCst);
    if fd >= 0 {
        // Non-blocking: a full pipe already wakes the reader.
        let _ = unistd::write(fd, &[1]);
    }
}

extern "C" fn handle_terminal_stop(_: libc::c_int) {
    let pgid = FOREGROUND_PGID.load(Ordering::SeqCst);
    if pgid > 0 {
        let _ = signal::kill(Pid::from_raw(-pgid), Signal::SIGTSTP);
    }
}

/// Handle on the signal state shared with the handlers.
///
/// `Default` yields a handle without installing any handler, which is what
/// tests use.
#[derive(Clone, Copy, Debug, Default)]
pub struct SignalRelay {
    _private: (),
}

impl SignalRelay {
    /// Installs the interrupt and stop handlers and ignores SIGQUIT.
    ///
    /// The interrupt handler is installed without `SA_RESTART` so that a
    /// blocking read or wait returns `EINTR` and the shell can act on it. It
    /// also writes to the pipe returned by `interrupt_fd`, which covers an
    /// interrupt arriving just before a read starts.
    pub fn install() -> Result<SignalRelay> {
        let (read_fd, write_fd) =
            unistd::pipe2(OFlag::O_CLOEXEC | OFlag::O_NONBLOCK).context(ErrorKind::Nix)?;
        INTERRUPT_READ_FD.store(read_fd, Ordering::SeqCst);
        INTERRUPT_WRITE_FD.store(write_fd, Ordering::SeqCst);

        let interrupt = SigAction::new(
            SigHandler::Handler(handle_interrupt),
            SaFlags::empty(),
            SigSet::empty(),
        );
        let terminal_stop = SigAction::new(
            SigHandler::Handler(handle_terminal_stop),
            SaFlags::SA_RESTART,
            SigSet::empty(),
        );
        unsafe {
            signal::sigaction(Signal::SIGINT, &interrupt).context(ErrorKind::Nix)?;
            signal::sigaction(Signal::SIGTSTP, &terminal_stop).context(ErrorKind::Nix)?;
            signal::signal(Signal::SIGQUIT, SigHandler::SigIgn).context(ErrorKind::Nix)?;
        }

        debug!("installed signal relay");
        Ok(SignalRelay::default())
    }

    /// Arms the process-wide alarm; SIGALRM's default action ends the shell
    /// `secs` seconds from now no matter what it is doing.
    pub fn arm_alarm(secs: u32) {
        if secs > 0 {
            alarm::set(secs);
        }
    }

    /// Puts back the default dispositions in a freshly forked child, so that
    /// the signals reach the child's program instead of the relay.
    pub(crate) fn restore_defaults() {
        for &sig in &[Signal::SIGINT, Signal::SIGTSTP, Signal::SIGQUIT] {
            let _ = unsafe { signal::signal(sig, SigHandler::SigDfl) };
        }
    }

    pub fn set_foreground(&self, pgid: Pid) {
        FOREGROUND_PGID.store(pgid.as_raw(), Ordering::SeqCst);
    }

    pub fn clear_foreground(&self) {
        FOREGROUND_PGID.store(0, Ordering::SeqCst);
    }

    pub fn foreground(&self) -> Option<Pid> {
        match FOREGROUND_PGID.load(Ordering::SeqCst) {
            0 => None,
            pgid => Some(Pid::from_raw(pgid)),
        }
    }

    pub fn interrupt_pending(&self) -> bool {
        INTERRUPT_PENDING.load(Ordering::SeqCst)
    }

    /// Read end of the pipe the interrupt handler writes to, once installed.
    pub fn interrupt_fd(&self) -> Option<RawFd> {
        match INTERRUPT_READ_FD.load(Ordering::SeqCst) {
            fd if fd < 0 => None,
            fd => Some(fd),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_foreground_marker() {
        let relay = SignalRelay::default();
        relay.set_foreground(Pid::from_raw(1234));
        assert_eq!(relay.foreground(), Some(Pid::from_raw(1234)));
        relay.clear_foreground();
        assert_eq!(relay.foreground(), None);
        assert!(!relay.interrupt_pending());
        assert_eq!(relay.interrupt_fd(), None);
    }
}
