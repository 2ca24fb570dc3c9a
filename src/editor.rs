//! Reads input lines and keeps the command history.
//!
//! Lines are read straight from the standard input descriptor rather than
//! through `std::io::Stdin`, so a read blocked while the interrupt signal
//! arrives returns `EINTR` to the shell instead of being retried. The input is
//! polled together with the relay's interrupt pipe, so an interrupt that lands
//! before the read starts is not missed either.

use std::collections::VecDeque;
use std::fmt;
use std::io::{self, Write};
use std::mem;
use std::os::unix::io::RawFd;

use failure::{Fail, ResultExt};
use nix::{
    errno::Errno,
    libc,
    poll::{poll, PollFd, PollFlags},
    unistd,
};

use crate::{
    errors::{Error, ErrorKind, Result},
    history::History,
};

const READ_CHUNK_SIZE: usize = 4096;

pub struct Editor {
    fd: RawFd,
    /// Complete lines read ahead of the one being returned.
    lines: VecDeque<Vec<u8>>,
    /// The line still waiting for its newline, already bounded.
    partial: Vec<u8>,
    eof: bool,
    max_line_len: usize,
    /// Becomes readable once an interrupt was received.
    interrupt_fd: Option<RawFd>,
    history: History,
}

impl Editor {
    pub fn new(max_line_len: usize, history_capacity: usize) -> Editor {
        Editor::with_fd(libc::STDIN_FILENO, max_line_len, history_capacity)
    }

    pub fn with_fd(fd: RawFd, max_line_len: usize, history_capacity: usize) -> Editor {
        Editor {
            fd,
            lines: VecDeque::new(),
            partial: Vec::new(),
            eof: false,
            max_line_len,
            interrupt_fd: None,
            history: History::with_capacity(history_capacity),
        }
    }

    pub fn set_interrupt_fd(&mut self, fd: Option<RawFd>) {
        self.interrupt_fd = fd;
    }

    /// Prints `prompt` (if any) and reads the next line without its newline.
    ///
    /// Bytes past `max_line_len` are dropped up to the end of the line.
    /// Returns `None` at end of input and an `Interrupted` error when a signal
    /// handler ran during the read.
    pub fn readline(&mut self, prompt: Option<&str>) -> Result<Option<String>> {
        if let Some(prompt) = prompt {
            let mut stdout = io::stdout();
            write!(stdout, "{}", prompt).context(ErrorKind::Io)?;
            stdout.flush().context(ErrorKind::Io)?;
        }

        loop {
            if let Some(line) = self.lines.pop_front() {
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            if self.eof {
                if self.partial.is_empty() {
                    return Ok(None);
                }
                let line = mem::replace(&mut self.partial, Vec::new());
                return Ok(Some(String::from_utf8_lossy(&line).into_owned()));
            }
            self.fill()?;
        }
    }

    /// Blocks until input is available, failing with `Interrupted` once the
    /// interrupt pipe is readable.
    fn wait_readable(&self) -> Result<()> {
        let interrupt_fd = match self.interrupt_fd {
            Some(fd) => fd,
            None => return Ok(()),
        };
        let mut fds = [
            PollFd::new(self.fd, PollFlags::POLLIN),
            PollFd::new(interrupt_fd, PollFlags::POLLIN),
        ];
        match poll(&mut fds, -1) {
            Ok(_) => {}
            Err(Errno::EINTR) => return Err(Error::from(ErrorKind::Interrupted)),
            Err(e) => return Err(e.context(ErrorKind::Nix).into()),
        }

        let interrupted = fds[1]
            .revents()
            .map_or(false, |revents| revents.contains(PollFlags::POLLIN));
        if interrupted {
            return Err(Error::from(ErrorKind::Interrupted));
        }
        Ok(())
    }

    fn fill(&mut self) -> Result<()> {
        self.wait_readable()?;

        let mut buf = [0u8; READ_CHUNK_SIZE];
        let n = match unistd::read(self.fd, &mut buf) {
            Ok(n) => n,
            Err(Errno::EINTR) => return Err(Error::from(ErrorKind::Interrupted)),
            Err(e) => return Err(e.context(ErrorKind::Nix).into()),
        };
        if n == 0 {
            self.eof = true;
        }

        for &byte in &buf[..n] {
            if byte == b'\n' {
                let line = mem::replace(&mut self.partial, Vec::new());
                self.lines.push_back(line);
            } else if self.partial.len() < self.max_line_len {
                self.partial.push(byte);
            }
        }

        Ok(())
    }

    pub fn add_history_entry(&mut self, line: &str) {
        self.history.push(line);
    }

    pub fn history(&self) -> &History {
        &self.history
    }
}

impl fmt::Debug for Editor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "fd: {}", self.fd)?;
        writeln!(f, "buffered lines: {}", self.lines.len())?;
        writeln!(f, "max line length: {}", self.max_line_len)?;
        write!(f, "{:?}", self.history)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use std::os::unix::io::AsRawFd;
    use tempdir::TempDir;

    fn editor_over(contents: &str, max_line_len: usize) -> (Editor, File, TempDir) {
        let dir = TempDir::new("editor").expect("unable to create temp dir");
        let mut file = File::create(dir.path().join("input")).expect("unable to create input");
        file.write_all(contents.as_bytes()).unwrap();
        let file = File::open(dir.path().join("input")).unwrap();
        let editor = Editor::with_fd(file.as_raw_fd(), max_line_len, 10);
        (editor, file, dir)
    }

    #[test]
    fn test_reads_lines_until_eof() {
        let (mut editor, _file, _dir) = editor_over("echo a\n\nls | wc\ntail", 80);
        assert_eq!(editor.readline(None).unwrap(), Some("echo a".to_string()));
        assert_eq!(editor.readline(None).unwrap(), Some("".to_string()));
        assert_eq!(editor.readline(None).unwrap(), Some("ls | wc".to_string()));
        assert_eq!(editor.readline(None).unwrap(), Some("tail".to_string()));
        assert_eq!(editor.readline(None).unwrap(), None);
        assert_eq!(editor.readline(None).unwrap(), None);
    }

    #[test]
    fn test_long_lines_are_truncated() {
        let (mut editor, _file, _dir) = editor_over("abcdefgh\nxy\n", 4);
        assert_eq!(editor.readline(None).unwrap(), Some("abcd".to_string()));
        assert_eq!(editor.readline(None).unwrap(), Some("xy".to_string()));
        assert_eq!(editor.readline(None).unwrap(), None);
    }

    #[test]
    fn test_pending_interrupt_cuts_read_short() {
        let (input_read, input_write) = unistd::pipe().unwrap();
        let (interrupt_read, interrupt_write) = unistd::pipe().unwrap();
        unistd::write(interrupt_write, &[1]).unwrap();

        let mut editor = Editor::with_fd(input_read, 80, 10);
        editor.set_interrupt_fd(Some(interrupt_read));
        let err = editor.readline(None).unwrap_err();
        assert_eq!(*err.kind(), ErrorKind::Interrupted);

        for fd in &[input_read, input_write, interrupt_read, interrupt_write] {
            unistd::close(*fd).unwrap();
        }
    }

    #[test]
    fn test_history_entries_are_kept() {
        let (mut editor, _file, _dir) = editor_over("", 80);
        editor.add_history_entry("ls");
        editor.add_history_entry("jobs");
        assert_eq!(editor.history().iter().collect::<Vec<_>>(), vec!["ls", "jobs"]);
    }
}
