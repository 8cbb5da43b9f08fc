//! Brownout-aware acceleration ramp for driver control.
//!
//! Stick demand is not sent to the motors directly. Each axis keeps a ramped
//! value that chases the demand, so hard stick slams do not draw the current
//! spikes that sag the battery. Per tick and per axis:
//!
//! 1. Demand inside the dead zone is read as zero.
//! 2. If demand and ramp point different ways (or one of them is zero), the
//!    ramp restarts from zero.
//! 3. Easing off is never limited: a ramp larger than demand snaps to it.
//! 4. With a healthy supply the ramp steps toward demand by at most one
//!    acceleration increment. Below the voltage trigger it instead decays
//!    geometrically, whatever the demand.
//!
//! Forward is sent as ramped. Rotation is scaled (by default halved and
//! sign-flipped) so turning is gentler than driving.

use log::{debug, info};

use crate::{config::RampTuning, drivetrain::DriveCommand, signum};

/// Ramp memory carried from tick to tick within a teleop phase.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RampState {
    /// Ramped forward value in `[-1.0, 1.0]`.
    pub forward:  f64,
    /// Ramped rotation value in `[-1.0, 1.0]`, before scaling.
    pub rotation: f64,
    /// Whether the previous tick was below the voltage trigger.
    pub brownout: bool,
}

/// One tick's driver inputs.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RampInputs {
    /// Raw forward stick, `[-1.0, 1.0]`.
    pub forward:  f64,
    /// Raw rotation stick, `[-1.0, 1.0]`.
    pub rotation: f64,
    /// Supply voltage, `None` if it could not be read.
    pub voltage:  Option<f64>,
}

/// The drive ramp controller.
#[derive(Debug, Clone)]
pub struct DriveRamp {
    tuning: RampTuning,
}

impl DriveRamp {
    pub fn new(tuning: &RampTuning) -> Self {
        Self {
            tuning: tuning.clone(),
        }
    }

    pub fn tuning(&self) -> &RampTuning { &self.tuning }

    /// Clamps a stick reading and zeroes it inside the dead zone.
    pub fn filter_demand(&self, demand: f64) -> f64 {
        let demand = crate::drivetrain::clamp_unit(demand);
        if demand.abs() < self.tuning.dead_zone { 0.0 } else { demand }
    }

    pub fn is_brownout(&self, voltage: f64) -> bool { voltage < self.tuning.voltage_trigger }

    /// Advances one axis by one tick. `demand` must already be filtered.
    pub fn step_axis(&self, current: f64, demand: f64, brownout: bool) -> f64 {
        let mut current = current;
        if signum(demand) != signum(current) {
            current = 0.0;
        }
        if current.abs() > demand.abs() {
            current = demand;
        }

        if brownout {
            return current * self.tuning.decel_multiplier;
        }

        let step = self.tuning.accel_increment;
        if demand > current {
            (current + step).min(demand)
        } else if demand < current {
            (current - step).max(demand)
        } else {
            current
        }
    }

    /// Runs one tick.
    ///
    /// A missing or non-finite voltage reading is treated as zero demand for
    /// the tick, which drops both axes to rest.
    pub fn step(&self, state: RampState, inputs: RampInputs) -> (RampState, DriveCommand) {
        let (demand_fwd, demand_rot, brownout) = match inputs.voltage.filter(|v| v.is_finite()) {
            Some(volts) => (
                self.filter_demand(inputs.forward),
                self.filter_demand(inputs.rotation),
                self.is_brownout(volts),
            ),
            None => (0.0, 0.0, false),
        };

        if brownout != state.brownout {
            if brownout {
                info!("Supply at {:?} V, decaying drive output", inputs.voltage);
            } else {
                info!("Supply recovered, ramping resumed");
            }
        }

        let next = RampState {
            forward: self.step_axis(state.forward, demand_fwd, brownout),
            rotation: self.step_axis(state.rotation, demand_rot, brownout),
            brownout,
        };

        debug!(
            "V = {:?} dY = {:.3} cY = {:.3} dRot = {:.3} cRot = {:.3}",
            inputs.voltage, demand_fwd, next.forward, demand_rot, next.rotation
        );

        let command = DriveCommand::new(next.forward, self.tuning.rotation_scale * next.rotation);
        (next, command)
    }
}
