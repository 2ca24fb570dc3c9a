//! Bounded command history.

use std::collections::VecDeque;
use std::fmt;

/// The most recent submitted lines, oldest first.
///
/// Once `capacity` entries are stored, pushing a new line evicts the oldest.
#[derive(Clone, Debug)]
pub struct History {
    entries: VecDeque<String>,
    capacity: usize,
}

impl History {
    pub fn with_capacity(capacity: usize) -> History {
        History {
            entries: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub fn push<T: Into<String>>(&mut self, line: T) {
        if self.capacity == 0 {
            return;
        }
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(line.into());
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(String::as_str)
    }
}

/// One line per entry, numbered from 1.
impl fmt::Display for History {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, line) in self.iter().enumerate() {
            writeln!(f, "{}  {}", i + 1, line)?;
        }

        Ok(())
    }
}
