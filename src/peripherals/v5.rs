//! VEX V5 implementations of the boundary traits.

use vexide::{
    controller::ControllerState,
    prelude::Controller,
    smart::imu::InertialSensor,
};

use super::{DriverInput, HeadingSensor, VoltageSensor, finite};
use crate::error::{Error, Result};

/// Heading from a V5 inertial sensor.
///
/// The sensor's own heading is never reset; zeroing records an offset.
pub struct ImuHeading {
    imu:    InertialSensor,
    offset: f64,
}

impl ImuHeading {
    pub fn new(imu: InertialSensor) -> Self { Self { imu, offset: 0.0 } }

    fn raw_heading(&self) -> Result<f64> {
        let is_calibrating = self
            .imu
            .is_calibrating()
            .map_err(|e| Error::sensor_read("imu", e))?;
        if is_calibrating {
            return Err(Error::sensor_read("imu", "calibrating"));
        }
        let angle = self
            .imu
            .euler()
            .map_err(|e| Error::sensor_read("imu", e))?
            .b
            .as_degrees();
        finite("imu", angle)
    }
}

/// Wraps an angle in degrees to `(-180, 180]`.
fn wrap_degrees(angle: f64) -> f64 {
    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 { wrapped - 360.0 } else { wrapped }
}

impl HeadingSensor for ImuHeading {
    fn heading(&mut self) -> Result<f64> { Ok(wrap_degrees(self.raw_heading()? - self.offset)) }

    fn zero_heading(&mut self) -> Result<()> {
        self.offset = self.raw_heading()?;
        Ok(())
    }
}

/// The V5 battery.
pub struct Battery;

impl VoltageSensor for Battery {
    fn supply_voltage(&mut self) -> Result<f64> { finite("battery", vexide::battery::voltage()) }
}

/// Arcade axes of a V5 controller: left stick Y forward, right stick X rotation.
pub struct ArcadeSticks {
    controller: Controller,
}

impl ArcadeSticks {
    pub fn new(controller: Controller) -> Self { Self { controller } }

    fn state(&self) -> Result<ControllerState> {
        self.controller
            .state()
            .map_err(|e| Error::sensor_read("controller", e))
    }
}

impl DriverInput for ArcadeSticks {
    fn forward_axis(&mut self) -> Result<f64> { finite("controller", self.state()?.left_stick.y()) }

    fn rotation_axis(&mut self) -> Result<f64> {
        finite("controller", self.state()?.right_stick.x())
    }
}
