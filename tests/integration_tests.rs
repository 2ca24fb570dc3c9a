//! Integration Tests

extern crate assert_cli;
#[macro_use]
extern crate lazy_static;
extern crate tempdir;


use std::collections::HashMap;
use std::fs;

use assert_cli::{Assert, Environment};

use workdir::WorkDir;

trait AssertExt {
    fn exit_status_is(self, exit_status: i32) -> Self;
}

impl AssertExt for Assert {
    fn exit_status_is(self, exit_status: i32) -> Self {
        if exit_status == 0 {
            self.succeeds()
        } else {
            self.fails_with(exit_status)
        }
    }
}

struct CommandData<'a> {
    pub stdout: &'a str,
    pub exit_status: i32,
}

lazy_static! {
    static ref COMMAND_LINES_MAP: HashMap<&'static str, CommandData<'static>> = {
        let mut map = HashMap::new();
        map.insert("echo test", CommandData { stdout: "test\n", exit_status: 0 });
        map.insert("echo a ; echo b", CommandData { stdout: "a\nb\n", exit_status: 0 });
        map.insert("echo a;echo b", CommandData { stdout: "a\nb\n", exit_status: 0 });
        map.insert("true && echo X", CommandData { stdout: "X\n", exit_status: 0 });
        map.insert("false || echo X", CommandData { stdout: "X\n", exit_status: 0 });
        map.insert("true || echo X ; echo Y", CommandData { stdout: "Y\n", exit_status: 0 });
        map.insert("false && echo X || echo Z", CommandData { stdout: "Z\n", exit_status: 0 });
        map.insert("echo needle | cat | cat", CommandData { stdout: "needle\n", exit_status: 0 });
        map.insert("echo haystack|cat", CommandData { stdout: "haystack\n", exit_status: 0 });
        map.insert("true | false", CommandData { stdout: "", exit_status: 1 });
        map.insert("false | true", CommandData { stdout: "", exit_status: 0 });
        map.insert("; ; echo empty", CommandData { stdout: "empty\n", exit_status: 0 });
        map
    };
}

fn msh(dir: &WorkDir, command: &str) -> Assert {
    Assert::cargo_binary("msh").with_args(&[dir.log_arg().as_str(), "-c", command])
}

#[test]
fn test_command_lines() {
    let dir = WorkDir::new("msh-lines");
    for (command, expected) in COMMAND_LINES_MAP.iter() {
        let assert = msh(&dir, command);
        let assert = if expected.stdout.is_empty() {
            assert.stdout().is("")
        } else {
            assert.stdout().contains(expected.stdout)
        };
        assert.exit_status_is(expected.exit_status).unwrap();
    }
}

#[test]
fn test_and_skips_after_failure() {
    let dir = WorkDir::new("msh-and");
    msh(&dir, "false && echo X")
        .stdout()
        .doesnt_contain("X")
        .exit_status_is(1)
        .unwrap();
}

#[test]
fn test_unknown_command() {
    let dir = WorkDir::new("msh-unknown");
    msh(&dir, "msh-no-such-command")
        .stderr()
        .contains("msh-no-such-command: command not found")
        .exit_status_is(127)
        .unwrap();
    msh(&dir, "msh-no-such-command || echo recovered")
        .stdout()
        .contains("recovered")
        .succeeds()
        .unwrap();
}

#[test]
fn test_redirects() {
    let dir = WorkDir::new("msh-redirects");
    let out = dir.path().join("out.txt");
    let line = format!("echo first > {0} ; echo hello > {0} ; cat < {0}", out.display());
    msh(&dir, &line)
        .stdout()
        .is("hello\n")
        .succeeds()
        .unwrap();
    assert_eq!(dir.read_file("out.txt"), "hello\n");
}

#[test]
fn test_redirect_overrides_pipe() {
    let dir = WorkDir::new("msh-override");
    let out = dir.path().join("mid.txt");
    let line = format!("echo piped > {} | cat", out.display());
    msh(&dir, &line).stdout().is("").succeeds().unwrap();
    assert_eq!(dir.read_file("mid.txt"), "piped\n");
}

#[test]
fn test_missing_input_file() {
    let dir = WorkDir::new("msh-missing");
    let missing = dir.path().join("missing.txt");
    let line = format!("cat < {}", missing.display());
    msh(&dir, &line)
        .stderr()
        .contains("missing.txt: cannot open input file")
        .exit_status_is(127)
        .unwrap();
}

#[test]
fn test_signal_death_status() {
    let dir = WorkDir::new("msh-signal");
    let script = dir.write_file("die.sh", "kill -9 $$\n");
    msh(&dir, &format!("sh {}", script.display()))
        .exit_status_is(137)
        .unwrap();
}

#[test]
fn test_syntax_error() {
    let dir = WorkDir::new("msh-syntax");
    msh(&dir, "echo a |")
        .stderr()
        .contains("syntax error")
        .exit_status_is(1)
        .unwrap();
    msh(&dir, "echo a & echo b")
        .stderr()
        .contains("syntax error near unexpected token `&'")
        .exit_status_is(1)
        .unwrap();
}

#[test]
fn test_fg_and_bg_usage_errors() {
    let dir = WorkDir::new("msh-usage");
    msh(&dir, "fg")
        .stderr()
        .contains("fg: job id required")
        .exit_status_is(1)
        .unwrap();
    msh(&dir, "bg 9")
        .stderr()
        .contains("bg: 9: no such job")
        .exit_status_is(1)
        .unwrap();
    msh(&dir, "fg x || echo handled")
        .stdout()
        .contains("handled")
        .succeeds()
        .unwrap();
}

#[test]
fn test_cd() {
    let dir = WorkDir::new("msh-cd");
    msh(&dir, "cd / ; pwd").stdout().is("/\n").succeeds().unwrap();

    let home = dir.path().canonicalize().unwrap();
    let expected = format!("{}\n", home.display());
    msh(&dir, "cd ; pwd")
        .with_env(Environment::inherit().insert("HOME", home.to_str().unwrap()))
        .stdout()
        .is(expected.as_str())
        .succeeds()
        .unwrap();

    msh(&dir, "cd /nonexistent/msh-dir")
        .stderr()
        .contains("cd: /nonexistent/msh-dir")
        .exit_status_is(1)
        .unwrap();
}

#[test]
fn test_builtin_output_redirect() {
    let dir = WorkDir::new("msh-builtin-redirect");
    let out = dir.path().join("help.txt");
    msh(&dir, &format!("help > {}", out.display()))
        .stdout()
        .is("")
        .succeeds()
        .unwrap();
    let help = fs::read_to_string(out).unwrap();
    assert!(help.starts_with("Commands in the mini-shell:\n"));
}

#[test]
fn test_exit_status_of_last_segment() {
    let dir = WorkDir::new("msh-last");
    let script = dir.write_file("three.sh", "exit 3\n");
    msh(&dir, &format!("echo start ; sh {}", script.display()))
        .stdout()
        .is("start\n")
        .exit_status_is(3)
        .unwrap();
}

#[test]
fn test_fg_returns_status_of_resumed_job() {
    let dir = WorkDir::new("msh-fg-status");
    let exits = dir.write_file("exits.sh", "kill -STOP $$\nexit 3\n");
    msh(&dir, &format!("sh {} ; fg 1", exits.display()))
        .exit_status_is(3)
        .unwrap();

    let dies = dir.write_file("dies.sh", "kill -STOP $$\nkill -9 $$\n");
    msh(&dir, &format!("sh {} ; fg %1", dies.display()))
        .exit_status_is(137)
        .unwrap();
}

#[test]
fn test_version() {
    Assert::cargo_binary("msh")
        .with_args(&["--version"])
        .stdout()
        .contains("msh version")
        .succeeds()
        .unwrap();
}
