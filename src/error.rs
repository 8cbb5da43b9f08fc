//! Error types for Headway.

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// Headway error types
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The heading sensor failed bring-up or is missing
    #[error("Heading sensor unavailable")]
    HeadingUnavailable,

    /// A sensor read failed during a tick
    #[error("{sensor} read failed: {reason}")]
    SensorRead {
        /// Which sensor failed
        sensor: &'static str,
        /// Backend-specific failure description
        reason: String,
    },

    /// A tuning value is out of its accepted range
    #[error("Invalid tuning: {0}")]
    InvalidTuning(String),

    /// Tuning file could not be parsed
    #[error("Config parse error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A global logger was already installed
    #[error("Logger error: {0}")]
    Logger(#[from] log::SetLoggerError),
}

impl Error {
    /// Shorthand for a failed sensor read.
    pub fn sensor_read(sensor: &'static str, reason: impl ToString) -> Self {
        Error::SensorRead {
            sensor,
            reason: reason.to_string(),
        }
    }
}
