pub use self::shell::Shell;
pub use self::signals::SignalRelay;

pub mod builtins;
pub mod execute_command;
pub mod job_control;
#[allow(clippy::module_inception)]
mod shell;
mod signals;

const DEFAULT_PROMPT: &str = "mini-shell>";
const DEFAULT_MAX_LINE_LEN: usize = 80;
const DEFAULT_MAX_TOKENS: usize = 127;
const DEFAULT_JOB_CAPACITY: usize = 5;
const DEFAULT_HISTORY_CAPACITY: usize = 100;
const DEFAULT_ALARM_SECS: u32 = 120;

/// Policy object to control a Shell's behavior
#[derive(Debug, Copy, Clone)]
pub struct ShellConfig {
    /// Printed before each line is read, without a trailing newline.
    prompt: &'static str,

    /// Longest line accepted; the rest of a longer line is discarded.
    max_line_len: usize,

    /// Tokens kept per line; the rest are silently dropped.
    max_tokens: usize,

    /// Number of jobs the job table can track at once.
    job_capacity: usize,

    /// Determines if new command entries will be added to the shell's command history.
    enable_command_history: bool,

    /// Number of entries to store in the shell's command history
    command_history_capacity: usize,

    /// Seconds after which the alarm ends the shell, 0 to disable.
    alarm_secs: u32,

    /// Determines if the prompt and some messages (e.g. the newline at end of
    /// input) are displayed.
    display_messages: bool,
}

impl ShellConfig {
    /// Creates an interactive shell, e.g. prompt and command history
    ///
    /// # Complete List
    /// - The prompt is displayed
    /// - Command History is enabled
    /// - Some additional messages are displayed
    pub fn interactive() -> Self {
        Self {
            enable_command_history: true,
            display_messages: true,
            ..Default::default()
        }
    }

    /// Creates a noninteractive shell, e.g. no prompt and no command history
    ///
    /// Limits are the same as for the interactive shell.
    pub fn noninteractive() -> Self {
        Default::default()
    }

    pub fn with_prompt(mut self, prompt: &'static str) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn with_max_line_len(mut self, max_line_len: usize) -> Self {
        self.max_line_len = max_line_len;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_job_capacity(mut self, job_capacity: usize) -> Self {
        self.job_capacity = job_capacity;
        self
    }

    pub fn with_command_history_capacity(mut self, capacity: usize) -> Self {
        self.command_history_capacity = capacity;
        self
    }

    pub fn with_alarm_secs(mut self, alarm_secs: u32) -> Self {
        self.alarm_secs = alarm_secs;
        self
    }

    pub fn prompt(&self) -> &'static str {
        self.prompt
    }

    pub fn max_line_len(&self) -> usize {
        self.max_line_len
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn job_capacity(&self) -> usize {
        self.job_capacity
    }

    pub fn enable_command_history(&self) -> bool {
        self.enable_command_history
    }

    pub fn command_history_capacity(&self) -> usize {
        self.command_history_capacity
    }

    pub fn alarm_secs(&self) -> u32 {
        self.alarm_secs
    }

    pub fn display_messages(&self) -> bool {
        self.display_messages
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: DEFAULT_PROMPT,
            max_line_len: DEFAULT_MAX_LINE_LEN,
            max_tokens: DEFAULT_MAX_TOKENS,
            job_capacity: DEFAULT_JOB_CAPACITY,
            enable_command_history: false,
            command_history_capacity: DEFAULT_HISTORY_CAPACITY,
            alarm_secs: DEFAULT_ALARM_SECS,
            display_messages: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interactive_limits() {
        let config = ShellConfig::interactive();
        assert_eq!(config.prompt(), "mini-shell>");
        assert_eq!(config.max_line_len(), 80);
        assert_eq!(config.max_tokens(), 127);
        assert_eq!(config.job_capacity(), 5);
        assert_eq!(config.command_history_capacity(), 100);
        assert_eq!(config.alarm_secs(), 120);
        assert!(config.enable_command_history());
        assert!(config.display_messages());
    }

    #[test]
    fn test_noninteractive_has_no_history_or_messages() {
        let config = ShellConfig::noninteractive().with_job_capacity(2);
        assert!(!config.enable_command_history());
        assert!(!config.display_messages());
        assert_eq!(config.job_capacity(), 2);
    }
}
