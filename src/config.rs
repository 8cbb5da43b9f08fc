//! Tuning table for the turn and ramp controllers.
//!
//! Every constant the controllers read lives here, with its units, so a
//! robot can be re-tuned from a TOML file without touching control logic.
//! Missing keys fall back to the values of the reference robot.
//!
//! ```toml
//! [turn]
//! target_angle_deg = -45.0
//! drift_deg = 6.0
//!
//! [ramp]
//! voltage_trigger = 7.0
//! carryover = "carry"
//!
//! [logging]
//! level = "debug"
//! ```

use std::{fs, path::Path, time::Duration};

use log::LevelFilter;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Period of the host's fixed-rate tick.
pub const LOOP_PERIOD: Duration = Duration::from_millis(20);

/// Top-level tuning table.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Tuning {
    pub turn:    TurnTuning,
    pub ramp:    RampTuning,
    pub drive:   DriveTuning,
    pub logging: LoggingConfig,
}

/// Constants for the autonomous heading turn.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TurnTuning {
    /// Heading error (degrees) accepted as "arrived".
    pub tolerance_deg:       f64,
    /// Heading to turn to, relative to the heading at phase entry (degrees).
    pub target_angle_deg:    f64,
    /// Rotation command ceiling, in drive units `[0, 1]`.
    pub max_rotation:        f64,
    /// Rotation floor added to the proportional term so the robot never stalls short.
    pub min_rotation:        f64,
    /// Heading error (degrees) below which the rotation starts to fall off the ceiling.
    pub slow_down_angle_deg: f64,
    /// Degrees the robot keeps turning after power is cut. The turn stops this far early.
    pub drift_deg:           f64,
}

impl Default for TurnTuning {
    fn default() -> Self {
        Self {
            tolerance_deg:       2.0,
            target_angle_deg:    90.0,
            max_rotation:        0.3,
            min_rotation:        0.01,
            slow_down_angle_deg: 45.0,
            drift_deg:           10.0,
        }
    }
}

/// Constants for the teleoperated acceleration ramp.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct RampTuning {
    /// Largest per-tick increase of a ramped axis, in drive units.
    pub accel_increment:  f64,
    /// Per-tick factor applied to both axes while the supply is sagging.
    pub decel_multiplier: f64,
    /// Supply voltage (volts) below which the ramp decays instead of accelerating.
    pub voltage_trigger:  f64,
    /// Stick magnitude below which demand is read as zero.
    pub dead_zone:        f64,
    /// Factor applied to the ramped rotation before it is sent.
    pub rotation_scale:   f64,
    /// What teleop entry does with the previous teleop ramp state.
    pub carryover:        RampCarryover,
}

impl Default for RampTuning {
    fn default() -> Self {
        Self {
            accel_increment:  0.02,
            decel_multiplier: 0.98,
            voltage_trigger:  7.3,
            dead_zone:        0.02,
            rotation_scale:   -0.5,
            carryover:        RampCarryover::Reset,
        }
    }
}

/// Ramp handling when the teleop phase is entered again.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RampCarryover {
    /// Start every teleop phase from rest.
    #[default]
    Reset,
    /// Resume from the ramp values the last teleop phase ended with.
    Carry,
}

/// Drive sink settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct DriveTuning {
    /// Time without a fresh command after which the motors are stopped (milliseconds).
    pub safety_expiration_ms: u64,
}

impl Default for DriveTuning {
    fn default() -> Self {
        Self {
            safety_expiration_ms: 100,
        }
    }
}

impl DriveTuning {
    pub fn safety_expiration(&self) -> Duration { Duration::from_millis(self.safety_expiration_ms) }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (off, error, warn, info, debug, trace)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// Parses the configured level.
    pub fn level_filter(&self) -> Result<LevelFilter> {
        self.level
            .parse()
            .map_err(|_| Error::InvalidTuning(format!("unknown log level `{}`", self.level)))
    }
}

impl Tuning {
    /// Parses and validates a tuning table from TOML text.
    pub fn from_toml_str(contents: &str) -> Result<Self> {
        let tuning: Tuning = toml::from_str(contents)?;
        tuning.validate()?;
        Ok(tuning)
    }

    /// Loads and validates a tuning table from a TOML file.
    ///
    /// # Example
    /// ```no_run
    /// use headway::config::Tuning;
    ///
    /// let tuning = Tuning::load("tuning.toml")?;
    /// # Ok::<(), headway::error::Error>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Checks every constant against the range the controllers assume.
    pub fn validate(&self) -> Result<()> {
        let t = &self.turn;
        let r = &self.ramp;
        let values = [
            ("turn.tolerance_deg", t.tolerance_deg),
            ("turn.target_angle_deg", t.target_angle_deg),
            ("turn.max_rotation", t.max_rotation),
            ("turn.min_rotation", t.min_rotation),
            ("turn.slow_down_angle_deg", t.slow_down_angle_deg),
            ("turn.drift_deg", t.drift_deg),
            ("ramp.accel_increment", r.accel_increment),
            ("ramp.decel_multiplier", r.decel_multiplier),
            ("ramp.voltage_trigger", r.voltage_trigger),
            ("ramp.dead_zone", r.dead_zone),
            ("ramp.rotation_scale", r.rotation_scale),
        ];
        if let Some((name, _)) = values.iter().find(|(_, v)| !v.is_finite()) {
            return Err(invalid(format!("{name} must be finite")));
        }

        if t.tolerance_deg <= 0.0 {
            return Err(invalid("turn.tolerance_deg must be positive"));
        }
        if t.min_rotation < 0.0 || t.min_rotation > t.max_rotation {
            return Err(invalid("turn.min_rotation must lie in [0, max_rotation]"));
        }
        if t.max_rotation > 1.0 {
            return Err(invalid("turn.max_rotation must not exceed 1"));
        }
        if t.slow_down_angle_deg <= 0.0 {
            return Err(invalid("turn.slow_down_angle_deg must be positive"));
        }
        if r.accel_increment <= 0.0 {
            return Err(invalid("ramp.accel_increment must be positive"));
        }
        if !(0.0..1.0).contains(&r.decel_multiplier) {
            return Err(invalid("ramp.decel_multiplier must lie in [0, 1)"));
        }
        if r.dead_zone < 0.0 {
            return Err(invalid("ramp.dead_zone must not be negative"));
        }
        if self.drive.safety_expiration_ms == 0 {
            return Err(invalid("drive.safety_expiration_ms must be positive"));
        }
        self.logging.level_filter()?;
        Ok(())
    }
}

fn invalid(msg: impl Into<String>) -> Error { Error::InvalidTuning(msg.into()) }

/// Turn constants derived once from [`TurnTuning`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnProfile {
    /// Error tolerance in degrees.
    pub tolerance:    f64,
    /// Rotation gained per degree of error.
    pub slope:        f64,
    pub min_rotation: f64,
    pub max_rotation: f64,
    /// `-signum(target)`: the direction the rotation command pushes.
    pub sign:         f64,
    /// Heading at which power is cut, `target - drift`.
    ///
    /// The drift is subtracted whatever the target's sign, so it stops short
    /// only for positive targets. A negative target stops past it (-45 with
    /// 5 of drift cuts power at -50); give such turns a negative drift.
    pub stop_angle:   f64,
}

impl From<&TurnTuning> for TurnProfile {
    fn from(t: &TurnTuning) -> Self {
        Self {
            tolerance:    t.tolerance_deg,
            slope:        (t.max_rotation - t.min_rotation) / t.slow_down_angle_deg,
            min_rotation: t.min_rotation,
            max_rotation: t.max_rotation,
            sign:         -crate::signum(t.target_angle_deg),
            stop_angle:   t.target_angle_deg - t.drift_deg,
        }
    }
}
