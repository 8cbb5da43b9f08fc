//! Differential drivetrain output.
//!
//! Both controllers speak in [`DriveCommand`]s: a forward value and a
//! rotation value, each in `[-1.0, 1.0]`. This module turns a command into
//! left/right wheel speeds and hands them to a [`DriveSink`].
//!
//! # Arcade Mixing
//!
//! The forward value is squared (keeping its sign) for finer control at low
//! speed. The rotation value is sent as-is. The two are then mixed so the
//! faster side always receives the larger input magnitude:
//!
//! | forward | rotation | left              | right             |
//! |---------|----------|-------------------|-------------------|
//! | `>= 0`  | `>= 0`   | `max`             | `fwd - rot`       |
//! | `>= 0`  | `< 0`    | `fwd + rot`       | `max`             |
//! | `< 0`   | `>= 0`   | `fwd + rot`       | `max`             |
//! | `< 0`   | `< 0`    | `max`             | `fwd - rot`       |
//!
//! where `max` is the larger magnitude of the two inputs, signed like forward.
//!
//! # Motor Safety
//!
//! The sink must be re-asserted every tick. [`SafeDrive`] wraps a sink with a
//! [`MotorSafety`] watchdog that stops the motors once commands stop arriving.

use std::time::Duration;

use log::{debug, warn};

/// One tick's drive demand.
///
/// Positive forward drives ahead, positive rotation turns clockwise.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DriveCommand {
    pub forward:  f64,
    pub rotation: f64,
}

impl DriveCommand {
    /// The all-zero command.
    pub const STOP: DriveCommand = DriveCommand {
        forward:  0.0,
        rotation: 0.0,
    };

    /// Creates a command with both fields clamped to `[-1.0, 1.0]`.
    pub fn new(forward: f64, rotation: f64) -> Self {
        Self {
            forward:  clamp_unit(forward),
            rotation: clamp_unit(rotation),
        }
    }

    /// Pure rotation in place.
    pub fn rotate(rotation: f64) -> Self { Self::new(0.0, rotation) }

    /// Returns the command with both fields clamped to `[-1.0, 1.0]`.
    pub fn clamped(self) -> Self { Self::new(self.forward, self.rotation) }

    pub fn is_stop(&self) -> bool { self.forward == 0.0 && self.rotation == 0.0 }
}

/// Normalized left/right outputs, each in `[-1.0, 1.0]`.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WheelSpeeds {
    pub left:  f64,
    pub right: f64,
}

/// Clamps to `[-1.0, 1.0]`. NaN maps to zero so a bad reading never reaches a motor.
pub fn clamp_unit(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(-1.0, 1.0)
    }
}

/// Squares the input while keeping its sign.
pub fn square_input(value: f64) -> f64 { value.abs() * value }

/// Mixes a drive command into wheel speeds.
///
/// Forward is squared, rotation is not. See the module docs for the mix.
pub fn arcade_mix(command: DriveCommand) -> WheelSpeeds {
    let command = command.clamped();
    let fwd = square_input(command.forward);
    let rot = command.rotation;

    let max_input = fwd.abs().max(rot.abs()).copysign(fwd);

    let (left, right) = if fwd >= 0.0 {
        if rot >= 0.0 { (max_input, fwd - rot) } else { (fwd + rot, max_input) }
    } else if rot >= 0.0 {
        (fwd + rot, max_input)
    } else {
        (max_input, fwd - rot)
    };

    WheelSpeeds {
        left:  clamp_unit(left),
        right: clamp_unit(right),
    }
}

/// Anything that accepts left/right wheel outputs.
///
/// Writes are fire-and-forget: a backend logs its own failures and the next
/// tick's write is the retry.
pub trait DriveSink {
    /// Applies normalized wheel outputs.
    fn set_wheels(&mut self, speeds: WheelSpeeds);

    /// Mixes and applies a drive command.
    fn drive(&mut self, command: DriveCommand) { self.set_wheels(arcade_mix(command)); }

    /// Zeroes both sides.
    fn stop(&mut self) { self.set_wheels(WheelSpeeds::default()); }
}

impl<S: DriveSink + ?Sized> DriveSink for &mut S {
    fn set_wheels(&mut self, speeds: WheelSpeeds) { (**self).set_wheels(speeds) }
}

/// Watchdog over the drive output.
///
/// Times are durations since an arbitrary fixed origin (usually program
/// start), supplied by the caller.
#[derive(Debug, Clone)]
pub struct MotorSafety {
    expiration: Duration,
    last_feed:  Option<Duration>,
    tripped:    bool,
}

impl MotorSafety {
    pub fn new(expiration: Duration) -> Self {
        Self {
            expiration,
            last_feed: None,
            tripped: false,
        }
    }

    /// Records that the output was asserted at `now`.
    pub fn feed(&mut self, now: Duration) {
        self.last_feed = Some(now);
        self.tripped = false;
    }

    /// Returns `true` if the output has gone stale at `now`.
    ///
    /// A watchdog that was never fed has nothing to guard and never expires.
    pub fn is_expired(&self, now: Duration) -> bool {
        match self.last_feed {
            Some(fed) => now.saturating_sub(fed) > self.expiration,
            None => false,
        }
    }

    pub fn is_tripped(&self) -> bool { self.tripped }

    pub fn expiration(&self) -> Duration { self.expiration }
}

/// A [`DriveSink`] guarded by a [`MotorSafety`] watchdog.
pub struct SafeDrive<S> {
    sink:   S,
    safety: MotorSafety,
}

impl<S: DriveSink> SafeDrive<S> {
    pub fn new(sink: S, expiration: Duration) -> Self {
        Self {
            sink,
            safety: MotorSafety::new(expiration),
        }
    }

    /// Sends a command and feeds the watchdog.
    pub fn drive(&mut self, command: DriveCommand, now: Duration) {
        self.sink.drive(command);
        self.safety.feed(now);
    }

    /// Stops the motors and feeds the watchdog.
    pub fn stop(&mut self, now: Duration) {
        self.sink.stop();
        self.safety.feed(now);
    }

    /// Stops the motors if the watchdog expired.
    ///
    /// Returns `true` only on the check that trips it; the motors then stay
    /// stopped until the next command.
    pub fn check(&mut self, now: Duration) -> bool {
        if self.safety.tripped || !self.safety.is_expired(now) {
            return false;
        }
        warn!(
            "Drive output not refreshed within {:?}, stopping motors",
            self.safety.expiration
        );
        self.sink.stop();
        self.safety.tripped = true;
        true
    }

    pub fn safety(&self) -> &MotorSafety { &self.safety }

    pub fn sink(&self) -> &S { &self.sink }

}

#[cfg(feature = "vexide")]
pub use self::v5::Differential;

#[cfg(feature = "vexide")]
mod v5 {
    use std::{cell::RefCell, rc::Rc};

    use log::warn;
    use vexide::prelude::Motor;

    use super::{DriveSink, WheelSpeeds};

    /// A VEX V5 differential drivetrain.
    ///
    /// The motors are stored in reference-counted cells so other systems can
    /// share them. Configure motor directions so that positive voltage on
    /// both sides drives the robot forward.
    ///
    /// # Example
    ///
    /// ```ignore
    /// let drivetrain = Differential::new(
    ///     [
    ///         Motor::new(peripherals.port_1, Gearset::Green, Direction::Forward),
    ///         Motor::new(peripherals.port_2, Gearset::Green, Direction::Forward),
    ///     ],
    ///     [
    ///         Motor::new(peripherals.port_3, Gearset::Green, Direction::Reverse),
    ///         Motor::new(peripherals.port_4, Gearset::Green, Direction::Reverse),
    ///     ],
    /// );
    /// ```
    #[derive(Clone)]
    pub struct Differential {
        /// The left motor group.
        pub left:  Rc<RefCell<dyn AsMut<[Motor]>>>,
        /// The right motor group.
        pub right: Rc<RefCell<dyn AsMut<[Motor]>>>,
    }

    impl Differential {
        pub fn new<L: AsMut<[Motor]> + 'static, R: AsMut<[Motor]> + 'static>(
            left: L,
            right: R,
        ) -> Self {
            Self {
                left:  Rc::new(RefCell::new(left)),
                right: Rc::new(RefCell::new(right)),
            }
        }
    }

    fn set_group(group: &Rc<RefCell<dyn AsMut<[Motor]>>>, voltage: f64) {
        if let Ok(mut motors) = group.try_borrow_mut() {
            for motor in motors.as_mut() {
                if let Err(e) = motor.set_voltage(voltage) {
                    warn!("Motor Set Voltage Error: {}", e);
                }
            }
        } else {
            warn!("Error Borrowing Motor Group");
        }
    }

    impl DriveSink for Differential {
        fn set_wheels(&mut self, speeds: WheelSpeeds) {
            set_group(&self.left, speeds.left * Motor::V5_MAX_VOLTAGE);
            set_group(&self.right, speeds.right * Motor::V5_MAX_VOLTAGE);
        }
    }
}

pub(crate) fn log_command(phase: impl std::fmt::Display, command: DriveCommand) {
    debug!(
        "{} drive fwd = {:.3} rot = {:.3}",
        phase, command.forward, command.rotation
    );
}
