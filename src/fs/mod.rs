//! Filesystem utilities.
//!
//! # Logging
//!
//! The `logger` submodule provides a logger that writes to the console and
//! to `log.txt`, so a run on the robot can be read back afterwards.
//!
//! # Example
//!
//! ```ignore
//! use headway::fs::logger;
//! use log::{info, LevelFilter};
//!
//! logger::init(LevelFilter::Debug).expect("Failed to initialize logger");
//! info!("Robot initialized successfully");
//! ```

/// Console and file logging.
pub mod logger;
