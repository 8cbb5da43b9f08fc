//! Sensor and operator boundary.
//!
//! The controllers never talk to hardware. They read through these traits,
//! which a backend implements for its devices (see the `vexide` feature) and
//! tests implement with plain structs.
//!
//! All reads are expected to be non-blocking. A read that fails returns an
//! [`Error`](crate::error::Error); the control loop decides what the safe
//! fallback is for that tick.

use log::warn;

use crate::error::{Error, Result};

/// Operator-facing fault reports.
pub mod faults;

#[cfg(feature = "vexide")]
pub mod v5;

pub use faults::{Fault, FaultKind, FaultLog};

/// A yaw sensor.
pub trait HeadingSensor {
    /// Signed heading in degrees, relative to the last [`zero_heading`](Self::zero_heading).
    fn heading(&mut self) -> Result<f64>;

    /// Makes the current heading the zero reference.
    fn zero_heading(&mut self) -> Result<()>;
}

/// A supply (battery) voltage sensor.
pub trait VoltageSensor {
    /// Supply voltage in volts.
    fn supply_voltage(&mut self) -> Result<f64>;
}

/// The driver's joystick.
pub trait DriverInput {
    /// Forward demand in `[-1.0, 1.0]`, positive ahead.
    fn forward_axis(&mut self) -> Result<f64>;

    /// Rotation demand in `[-1.0, 1.0]`.
    fn rotation_axis(&mut self) -> Result<f64>;
}

impl<H: HeadingSensor + ?Sized> HeadingSensor for Box<H> {
    fn heading(&mut self) -> Result<f64> { (**self).heading() }

    fn zero_heading(&mut self) -> Result<()> { (**self).zero_heading() }
}

impl<V: VoltageSensor + ?Sized> VoltageSensor for Box<V> {
    fn supply_voltage(&mut self) -> Result<f64> { (**self).supply_voltage() }
}

impl<D: DriverInput + ?Sized> DriverInput for Box<D> {
    fn forward_axis(&mut self) -> Result<f64> { (**self).forward_axis() }

    fn rotation_axis(&mut self) -> Result<f64> { (**self).rotation_axis() }
}

/// Rejects NaN and infinite readings.
pub fn finite(sensor: &'static str, value: f64) -> Result<f64> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Error::sensor_read(sensor, format!("non-finite reading {value}")))
    }
}

/// Unwraps a tick's reading, logging the failure and substituting `fallback`.
pub fn or_fallback(reading: Result<f64>, fallback: f64) -> f64 {
    reading.unwrap_or_else(|e| {
        warn!("{}, using {} for this tick", e, fallback);
        fallback
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_finite_readings_are_errors() {
        assert_eq!(finite("voltage", 12.1).unwrap(), 12.1);
        assert!(matches!(
            finite("voltage", f64::NAN),
            Err(Error::SensorRead {
                sensor: "voltage",
                ..
            })
        ));
        assert!(finite("heading", f64::INFINITY).is_err());
    }

    #[test]
    fn failed_reads_fall_back() {
        assert_eq!(or_fallback(Ok(0.4), 0.0), 0.4);
        assert_eq!(or_fallback(Err(Error::sensor_read("joystick", "unplugged")), 0.0), 0.0);
    }
}
