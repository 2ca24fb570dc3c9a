//! Msh - Mini Shell
//!
//! A line-oriented command interpreter: pipelines, `<`/`>` redirections,
//! `;`/`&&`/`||` sequencing, background jobs and a small set of builtins.

#![warn(
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces
)]

macro_rules! log_if_err {
    ($result:expr, $context:expr) => {{
        if let Err(ref e) = $result {
            log::error!("{}: {}", $context, e);
        }
    }};
    ($result:expr, $fmt:expr, $($arg:tt)+) => {{
        if let Err(ref e) = $result {
            log::error!("{}: {}", format_args!($fmt, $($arg)+), e);
        }
    }};
}

pub mod core;
pub mod editor;
pub mod errors;
pub mod history;
pub mod shell;
mod util;

pub use crate::shell::{Shell, ShellConfig, SignalRelay};
pub use crate::util::MshExitStatusExt;
