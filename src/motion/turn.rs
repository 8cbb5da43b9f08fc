//! Closed-loop turn to a fixed heading.
//!
//! The turn runs once per autonomous phase. Each tick the controller measures
//! how far the robot still is from the stop angle and rotates in place at
//!
//! ```text
//! rate = min(max_rotation, slope * error + min_rotation)
//! ```
//!
//! The floor keeps enough torque near the target that the robot never stalls
//! short of it. The stop angle sits `drift` degrees before the real target
//! because the robot keeps turning after power is cut.
//!
//! Once the error is within tolerance the controller latches into
//! [`TurnMode::Stopped`] and only sends zero commands for the rest of the
//! phase, even if the robot is pushed off the heading afterwards.

use log::{debug, info, trace};

use crate::{
    config::{TurnProfile, TurnTuning},
    drivetrain::DriveCommand,
};

/// Where a turn is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnMode {
    Turning,
    /// Terminal for the phase.
    Stopped,
}

/// Per-phase turn state, created by [`HeadingTurn::enter`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TurnState {
    /// Heading being turned to, in degrees from the heading at phase entry.
    pub target_angle: f64,
    pub stopped:      bool,
}

impl TurnState {
    pub fn mode(&self) -> TurnMode {
        if self.stopped { TurnMode::Stopped } else { TurnMode::Turning }
    }
}

/// The heading turn controller.
///
/// Holds only the derived constants; all mutable state is in [`TurnState`].
#[derive(Debug, Clone)]
pub struct HeadingTurn {
    profile:      TurnProfile,
    target_angle: f64,
}

impl HeadingTurn {
    pub fn new(tuning: &TurnTuning) -> Self {
        Self {
            profile:      TurnProfile::from(tuning),
            target_angle: tuning.target_angle_deg,
        }
    }

    pub fn profile(&self) -> &TurnProfile { &self.profile }

    /// Fresh state for a new autonomous phase.
    pub fn enter(&self) -> TurnState {
        TurnState {
            target_angle: self.target_angle,
            stopped:      false,
        }
    }

    /// Distance from the stop angle, in degrees.
    pub fn error(&self, heading: f64) -> f64 { (heading - self.profile.stop_angle).abs() }

    /// Unsigned rotation rate for a given error.
    pub fn rate(&self, error: f64) -> f64 {
        let rate = self.profile.slope * error + self.profile.min_rotation;
        rate.min(self.profile.max_rotation)
    }

    /// Runs one tick.
    ///
    /// `heading` is `None` when the sensor read failed this tick; the
    /// controller then holds still for the tick without changing state. A
    /// non-finite heading is handled the same way.
    pub fn step(&self, state: TurnState, heading: Option<f64>) -> (TurnState, DriveCommand) {
        if state.stopped {
            trace!("stopped - heading = {:?}", heading);
            return (state, DriveCommand::STOP);
        }

        let Some(heading) = heading.filter(|h| h.is_finite()) else {
            return (state, DriveCommand::STOP);
        };

        let error = self.error(heading);
        if error <= self.profile.tolerance {
            info!("Turn complete, stopping at heading = {:.2}", heading);
            return (
                TurnState {
                    stopped: true,
                    ..state
                },
                DriveCommand::STOP,
            );
        }

        let rate = self.rate(error);
        debug!("turning heading = {:.2} rate = {:.4}", heading, rate);
        (state, DriveCommand::rotate(self.profile.sign * rate))
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_relative_eq;

    use super::*;

    fn controller() -> HeadingTurn { HeadingTurn::new(&TurnTuning::default()) }

    #[test]
    fn enter_resets_to_turning() {
        let turn = controller();
        let state = turn.enter();
        assert_eq!(state.mode(), TurnMode::Turning);
        assert_eq!(state.target_angle, 90.0);
    }

    #[test]
    fn non_finite_heading_holds_still() {
        let turn = controller();
        for heading in [f64::NAN, f64::INFINITY, f64::NEG_INFINITY] {
            let (state, cmd) = turn.step(turn.enter(), Some(heading));
            assert!(!state.stopped);
            assert!(cmd.is_stop());
        }
    }

    #[test]
    fn stops_within_tolerance() {
        let turn = controller();
        for heading in [78.0, 79.0, 80.0, 81.5, 82.0] {
            let (state, cmd) = turn.step(turn.enter(), Some(heading));
            assert!(state.stopped, "heading {heading} should stop");
            assert!(cmd.is_stop());
        }
    }

    #[test]
    fn rotation_follows_proportional_law_with_floor() {
        let turn = controller();
        let slope = (0.3 - 0.01) / 45.0;
        for heading in [-40.0, 0.0, 40.0, 60.0, 75.0, 77.9, 82.1, 100.0] {
            let error = (heading - 80.0_f64).abs();
            let (state, cmd) = turn.step(turn.enter(), Some(heading));
            assert!(!state.stopped);
            assert_eq!(cmd.forward, 0.0);
            assert!(cmd.rotation < 0.0, "positive target turns with negative rotation");
            assert_relative_eq!(cmd.rotation.abs(), (slope * error + 0.01).min(0.3));
        }
    }

    #[test]
    fn rate_is_capped_far_from_target() {
        let turn = controller();
        assert_relative_eq!(turn.rate(45.0), 0.3);
        assert_relative_eq!(turn.rate(300.0), 0.3);
        assert_relative_eq!(turn.rate(0.0), 0.01);
    }

    #[test]
    fn negative_target_turns_positive() {
        let turn = HeadingTurn::new(&TurnTuning {
            target_angle_deg: -90.0,
            ..TurnTuning::default()
        });
        let (_, cmd) = turn.step(turn.enter(), Some(0.0));
        assert!(cmd.rotation > 0.0);
        let (state, _) = turn.step(turn.enter(), Some(-100.0));
        assert!(state.stopped);
    }

    #[test]
    fn stopped_is_terminal() {
        let turn = controller();
        let (mut state, _) = turn.step(turn.enter(), Some(80.0));
        for heading in [0.0, 45.0, 150.0, -170.0] {
            let (next, cmd) = turn.step(state, Some(heading));
            assert!(next.stopped);
            assert!(cmd.is_stop());
            state = next;
        }
        let (next, cmd) = turn.step(state, None);
        assert!(next.stopped);
        assert!(cmd.is_stop());
    }

    #[test]
    fn missing_reading_holds_still_without_latching() {
        let turn = controller();
        let (state, cmd) = turn.step(turn.enter(), None);
        assert!(!state.stopped);
        assert!(cmd.is_stop());
        let (_, cmd) = turn.step(state, Some(0.0));
        assert_relative_eq!(cmd.rotation, -0.3);
    }
}
