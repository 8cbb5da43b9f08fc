//! Dual console and file logger.
//!
//! This module implements the [`log`] crate's logging facade, writing each
//! record to stdout and to a log file (`log.txt` by default, on the V5 this
//! is the SD card root).
//!
//! # Usage
//!
//! Initialize the logger once at the start of your program:
//!
//! ```ignore
//! use headway::fs::logger;
//! use log::{info, LevelFilter};
//!
//! logger::init(LevelFilter::Debug).expect("Logger init failed");
//! info!("Program started");
//! ```
//!
//! # Log Output
//!
//! Each line carries the level, the uptime, the target and the message:
//!
//! ```text
//! INFO [2m 5s 123ms] headway::robot - Entering autonomous phase
//! INFO [2m 9s 960ms] headway::motion::turn - Turn complete, stopping at heading = 80.41
//! ```

use std::{
    fs::{File, OpenOptions},
    io::{BufWriter, Write},
    path::Path,
    sync::{Mutex, OnceLock},
    time::Duration,
};

use humantime::{FormattedDuration, format_duration};
use log::{LevelFilter, Metadata, Record, SetLoggerError};

use crate::{config::LoggingConfig, error::Result};

/// Default log file, relative to the working directory.
pub const LOG_FILE: &str = "log.txt";

/// A logger that writes to the console and a file.
///
/// The file is created or truncated when the logger is built.
pub struct HeadwayLogger {
    /// `None` if the file could not be opened (e.g. no SD card present).
    file_writer: Mutex<Option<BufWriter<File>>>,
}

impl HeadwayLogger {
    fn new(path: &Path) -> Self {
        let file_writer = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)
            .ok()
            .map(BufWriter::new);

        Self {
            file_writer: Mutex::new(file_writer),
        }
    }

    /// Whether records also reach a file.
    pub fn has_file(&self) -> bool { self.file_writer.lock().map(|w| w.is_some()).unwrap_or(false) }
}

impl log::Log for HeadwayLogger {
    fn enabled(&self, metadata: &Metadata) -> bool { metadata.level() <= log::max_level() }

    fn log(&self, record: &Record) {
        if self.enabled(record.metadata()) {
            let log_line = format!(
                "{} [{}] {} - {}\n",
                record.level(),
                get_time(),
                record.target(),
                record.args()
            );

            print!("{}", log_line);

            if let Ok(mut writer_guard) = self.file_writer.lock() {
                if let Some(ref mut writer) = *writer_guard {
                    let _ = writer.write_all(log_line.as_bytes());
                }
            }
        }
    }

    fn flush(&self) {
        if let Ok(mut writer_guard) = self.file_writer.lock() {
            if let Some(ref mut writer) = *writer_guard {
                let _ = writer.flush();
            }
        }
    }
}

static LOGGER: OnceLock<HeadwayLogger> = OnceLock::new();

/// Installs the logger, writing to [`LOG_FILE`].
///
/// # Errors
///
/// Returns [`SetLoggerError`] if a logger has already been set.
pub fn init(level: LevelFilter) -> std::result::Result<(), SetLoggerError> {
    init_with_path(level, LOG_FILE)
}

/// Installs the logger, writing to `path`.
///
/// If the file cannot be opened the logger still writes to the console.
pub fn init_with_path<P: AsRef<Path>>(
    level: LevelFilter,
    path: P,
) -> std::result::Result<(), SetLoggerError> {
    let logger = LOGGER.get_or_init(|| HeadwayLogger::new(path.as_ref()));
    log::set_logger(logger).map(|()| log::set_max_level(level))
}

/// Installs the logger at the level named in the tuning file.
pub fn init_from_config(config: &LoggingConfig) -> Result<()> {
    init(config.level_filter()?)?;
    Ok(())
}

/// Uptime at millisecond precision, formatted for humans.
fn get_time() -> FormattedDuration {
    let uptime = crate::uptime();
    format_duration(Duration::from_millis(uptime.as_millis() as u64))
}
