//! Logging to the terminal and the session log file.
//!
//! Lines are prefixed with the seconds elapsed since the session started and a three letter level
//! tag, for example `[  1.250000 WRN] Obstacle override: forward stopped`.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External imports
use colored::{ColoredString, Colorize};
use log::{info, Level, Record};
use thiserror::Error;

// Internal imports
use crate::session::{self, Session};

// Re-exports
pub use log::LevelFilter;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum LoggerInitError {
    #[error("The minimum log level must include INFO records, got `{0}`")]
    InvalidMinLogLevel(LevelFilter),

    #[error("Could not open the log file: {0}")]
    LogFileInitError(std::io::Error),

    #[error("A logger has already been set: {0}")]
    FernInitError(log::SetLoggerError),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Install the global logger, writing to stdout and to `session`'s log file.
///
/// `min_level` must be `Info` or more verbose. Can only succeed once per process.
pub fn logger_init(min_level: LevelFilter, session: &Session) -> Result<(), LoggerInitError> {
    if min_level < Level::Info {
        return Err(LoggerInitError::InvalidMinLogLevel(min_level));
    }

    let log_file =
        fern::log_file(&session.log_file_path).map_err(LoggerInitError::LogFileInitError)?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            let thread = std::thread::current();
            out.finish(format_args!(
                "{}",
                format_line(
                    session::try_get_elapsed_seconds().unwrap_or(0.0),
                    record,
                    thread.name().unwrap_or("?"),
                    message
                )
            ))
        })
        .level(min_level)
        .chain(std::io::stdout())
        .chain(log_file)
        .apply()
        .map_err(LoggerInitError::FernInitError)?;

    info!("Logging to {:?} at {:?}", session.log_file_path, min_level);
    info!("Session epoch: {}", session::get_epoch());

    Ok(())
}

// ---------------------------------------------------------------------------
// PRIVATE FUNCTIONS
// ---------------------------------------------------------------------------

/// Format one record. Debug and trace lines also name the module and thread they came from.
fn format_line(
    elapsed_s: f64,
    record: &Record,
    thread: &str,
    message: &std::fmt::Arguments,
) -> String {
    let tag = level_tag(record.level());

    if record.level() > Level::Info {
        format!(
            "[{:10.6} {}] {} ({}): {}",
            elapsed_s,
            tag,
            record.target(),
            thread,
            message
        )
    } else {
        format!("[{:10.6} {}] {}", elapsed_s, tag, message)
    }
}

fn level_tag(level: Level) -> ColoredString {
    match level {
        Level::Trace => "TRC".dimmed().italic(),
        Level::Debug => "DBG".dimmed(),
        Level::Info => "INF".normal(),
        Level::Warn => "WRN".yellow(),
        Level::Error => "ERR".red().bold(),
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn line(level: Level, msg: &str) -> String {
        colored::control::set_override(false);

        format_line(
            1.25,
            &Record::builder()
                .level(level)
                .target("drive_lib::obstacle_monitor")
                .build(),
            "obstacle-monitor",
            &format_args!("{}", msg),
        )
    }

    #[test]
    fn test_format_line() {
        assert_eq!(
            line(Level::Warn, "forward stopped"),
            "[  1.250000 WRN] forward stopped"
        );
        assert_eq!(
            line(Level::Debug, "clear"),
            "[  1.250000 DBG] drive_lib::obstacle_monitor (obstacle-monitor): clear"
        );
    }
}
