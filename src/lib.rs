//! # Headway
//!
//! Headway is the control core of a two-motor differential-drive robot,
//! run once per tick by a fixed-rate robot runtime. It provides:
//!
//! - **Heading Turn**: a closed-loop autonomous turn to a fixed heading with a
//!   proportional rate, a torque floor, and drift compensation.
//! - **Drive Ramp**: a driver-control filter that ramps stick demand up
//!   linearly and decays it when the battery starts to brown out.
//! - **Phase Lifecycle**: a [`Robot`](robot::Robot) that owns the per-phase
//!   controller state and is driven through enter/tick hooks.
//! - **Drive Output**: arcade mixing and a motor-safety watchdog.
//! - **Logging**: a console and file logger for telemetry.
//!
//! Hardware is reached only through the traits in [`peripherals`] and
//! [`drivetrain::DriveSink`]. The `vexide` feature supplies VEX V5 backends.
//!
//! ## Quick Start
//!
//! ```
//! use std::time::Duration;
//!
//! use headway::config::{LOOP_PERIOD, Tuning};
//! use headway::drivetrain::{DriveSink, WheelSpeeds};
//! use headway::error::Result;
//! use headway::peripherals::{DriverInput, HeadingSensor, VoltageSensor};
//! use headway::robot::{Phase, Robot};
//!
//! struct Motors;
//! impl DriveSink for Motors {
//!     fn set_wheels(&mut self, _speeds: WheelSpeeds) {}
//! }
//!
//! struct Gyro(f64);
//! impl HeadingSensor for Gyro {
//!     fn heading(&mut self) -> Result<f64> { Ok(self.0) }
//!     fn zero_heading(&mut self) -> Result<()> { self.0 = 0.0; Ok(()) }
//! }
//!
//! struct Supply;
//! impl VoltageSensor for Supply {
//!     fn supply_voltage(&mut self) -> Result<f64> { Ok(12.6) }
//! }
//!
//! struct Sticks;
//! impl DriverInput for Sticks {
//!     fn forward_axis(&mut self) -> Result<f64> { Ok(0.8) }
//!     fn rotation_axis(&mut self) -> Result<f64> { Ok(0.0) }
//! }
//!
//! let mut robot = Robot::new(Motors, Some(Gyro(0.0)), Supply, Sticks, &Tuning::default())?;
//! robot.enter(Phase::Teleop, Duration::ZERO)?;
//! let command = robot.tick(LOOP_PERIOD);
//! assert!(command.is_some());
//! # Ok::<(), headway::error::Error>(())
//! ```

use std::time::Duration;

/// Tuning constants and their TOML loader.
pub mod config;

/// Differential drive output.
///
/// Provides [`DriveCommand`](drivetrain::DriveCommand), arcade mixing with
/// forward input-squaring, the [`DriveSink`](drivetrain::DriveSink) trait,
/// and the [`SafeDrive`](drivetrain::SafeDrive) watchdog wrapper.
pub mod drivetrain;

/// Error type and `Result` alias.
pub mod error;

/// Filesystem utilities including logging.
pub mod fs;

/// Autonomous motion control: the heading turn.
pub mod motion;

/// Operator control: the drive ramp.
pub mod opcontrol;

/// Sensor and operator boundary traits and the fault log.
pub mod peripherals;

/// Phase lifecycle and the control loop.
pub mod robot;

/// VEX competition driver for [`Robot`](robot::Robot).
#[cfg(feature = "vexide")]
pub mod competition;

/// Sign of `x` with zero as its own sign, so `signum(0.0) == 0.0`.
///
/// [`f64::signum`] returns `1.0` for `+0.0`, which would hide a stick
/// released to center.
pub fn signum(x: f64) -> f64 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Time since the program started.
#[cfg(feature = "vexide")]
pub fn uptime() -> Duration { vexide::time::user_uptime() }

/// Time since the program started (first call on hosts without a runtime clock).
#[cfg(not(feature = "vexide"))]
pub fn uptime() -> Duration {
    static START: std::sync::OnceLock<std::time::Instant> = std::sync::OnceLock::new();
    START.get_or_init(std::time::Instant::now).elapsed()
}
