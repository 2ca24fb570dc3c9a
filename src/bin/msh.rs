use std::path::PathBuf;
use std::process::{self, ExitStatus};

use docopt::Docopt;
use log::{debug, error};
use msh_rs::{MshExitStatusExt, Shell, ShellConfig, SignalRelay};
use nix::unistd::Pid;
use serde_derive::Deserialize;

const LOG_FILE_NAME: &str = ".msh_log";

const USAGE: &str = "
msh.

Usage:
    msh [options]
    msh [options] -c <command>
    msh (-h | --help)
    msh --version

Options:
    -h --help       Show this screen.
    --version       Show version.
    -c              If the -c option is present, then commands are read from the first non-option
                        argument command_string.
    --log=<path>    File to write log to, defaults to ~/.msh_log
";

/// Docopts input arguments.
#[derive(Debug, Deserialize)]
struct Args {
    arg_command: Option<String>,
    flag_version: bool,
    flag_c: bool,
    flag_log: Option<String>,
}

fn main() {
    // Bounds the lifetime of the shell, whatever it ends up doing.
    SignalRelay::arm_alarm(ShellConfig::default().alarm_secs());

    let args: Args = Docopt::new(USAGE)
        .and_then(|d| d.deserialize())
        .unwrap_or_else(|e| e.exit());

    init_logger(&args.flag_log);
    debug!("{:?}", args);

    if args.flag_version {
        println!("msh version {}", env!("CARGO_PKG_VERSION"));
        return;
    }

    let relay = SignalRelay::install().unwrap_or_else(|e| {
        error!("failed to install signal handlers: {}", e);
        eprintln!("msh: {}", e);
        process::exit(ExitStatus::from_failure().status_code());
    });

    match args.arg_command {
        Some(ref command) if args.flag_c => {
            let mut shell = Shell::new(ShellConfig::noninteractive(), relay);
            let status = shell.execute_command_string(command);
            shell.exit(status);
        }
        _ => {
            let mut shell = Shell::new(ShellConfig::interactive(), relay);
            shell.execute_from_stdin();
        }
    }
}

fn init_logger(path: &Option<String>) {
    let log_path = path
        .clone()
        .map(PathBuf::from)
        .unwrap_or_else(default_log_path);

    let log_file = match fern::log_file(&log_path) {
        Ok(log_file) => log_file,
        Err(e) => {
            eprintln!("msh: {}: cannot open log file: {}", log_path.display(), e);
            return;
        }
    };

    let pid = Pid::this();
    let result = fern::Dispatch::new()
        .format(move |out, message, record| {
            out.finish(format_args!(
                "{} [{}] {}: {}",
                pid,
                record.level(),
                record.target(),
                message
            ))
        })
        .level(log::LevelFilter::Trace)
        .chain(log_file)
        .apply();
    if let Err(e) = result {
        eprintln!("msh: failed to initialize logging: {}", e);
    }
}

fn default_log_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(LOG_FILE_NAME)
}
