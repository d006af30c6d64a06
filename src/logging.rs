// src/logging.rs

//! Logging setup for `docpipe` using `tracing` + `tracing-subscriber`.
//!
//! Priority for determining the log level:
//! 1. `--log-level` CLI flag (if provided)
//! 2. `-v` / `-q`
//! 3. `DOCPIPE_LOG` environment variable (e.g. "info", "debug")
//! 4. default to `info`
//!
//! Logs are sent to STDERR so that `--dry-run` output on stdout stays clean.

use anyhow::Result;
use tracing_subscriber::fmt;

use crate::cli::{CliArgs, LogLevel};

pub const LOG_ENV_VAR: &str = "DOCPIPE_LOG";

/// The logging-related subset of the command line.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LogSettings {
    pub level: Option<LogLevel>,
    pub verbose: u8,
    pub quiet: bool,
}

impl LogSettings {
    pub fn from_args(args: &CliArgs) -> Self {
        Self {
            level: args.log_level,
            verbose: args.verbose,
            quiet: args.quiet,
        }
    }

    /// Level from the flags alone, before the environment is consulted.
    fn flag_level(&self) -> Option<tracing::Level> {
        if let Some(lvl) = self.level {
            return Some(level_from_log_level(lvl));
        }
        match (self.quiet, self.verbose) {
            (true, _) => Some(tracing::Level::WARN),
            (false, 0) => None,
            (false, 1) => Some(tracing::Level::DEBUG),
            (false, _) => Some(tracing::Level::TRACE),
        }
    }

    pub fn resolve(&self, env_value: Option<&str>) -> tracing::Level {
        self.flag_level()
            .or_else(|| env_value.and_then(parse_level_str))
            .unwrap_or(tracing::Level::INFO)
    }
}

/// Initialise global logging subscriber.
///
/// Safe to call once at startup.
pub fn init_logging(settings: LogSettings) -> Result<()> {
    let env_value = std::env::var(LOG_ENV_VAR).ok();
    let level = settings.resolve(env_value.as_deref());

    fmt()
        .with_max_level(level)
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(false)
        .with_writer(std::io::stderr)
        .init();

    Ok(())
}

fn level_from_log_level(lvl: LogLevel) -> tracing::Level {
    match lvl {
        LogLevel::Error => tracing::Level::ERROR,
        LogLevel::Warn => tracing::Level::WARN,
        LogLevel::Info => tracing::Level::INFO,
        LogLevel::Debug => tracing::Level::DEBUG,
        LogLevel::Trace => tracing::Level::TRACE,
    }
}

fn parse_level_str(s: &str) -> Option<tracing::Level> {
    match s.trim().to_lowercase().as_str() {
        "error" => Some(tracing::Level::ERROR),
        "warn" | "warning" => Some(tracing::Level::WARN),
        "info" => Some(tracing::Level::INFO),
        "debug" => Some(tracing::Level::DEBUG),
        "trace" => Some(tracing::Level::TRACE),
        _ => None,
    }
}
