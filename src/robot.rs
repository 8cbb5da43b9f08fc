//! Phase lifecycle.
//!
//! The host runtime owns the clock and the scheduler. It tells the [`Robot`]
//! when a phase begins ([`Robot::enter`]) and then calls [`Robot::tick`] once
//! per [`LOOP_PERIOD`](crate::config::LOOP_PERIOD) until it switches to
//! another phase. Entering a phase is the only point where that phase's
//! controller state is (re)built; ticks thread the state forward.
//!
//! | Phase        | enter                                  | tick                         |
//! |--------------|----------------------------------------|------------------------------|
//! | `Autonomous` | zero heading, fresh [`TurnState`]      | heading turn                 |
//! | `Teleop`     | [`RampState`] reset or carried over    | drive ramp                   |
//! | `Disabled`   | stop motors                            | nothing                      |
//! | `Test`       | nothing                                | nothing                      |
//!
//! # Example
//!
//! ```ignore
//! let mut robot = Robot::new(drive, Some(imu), battery, sticks, &tuning)?;
//! robot.enter(Phase::Autonomous, uptime())?;
//! loop {
//!     robot.tick(uptime());
//!     robot.check_safety(uptime());
//!     sleep(LOOP_PERIOD);
//! }
//! ```

use std::{fmt, time::Duration};

use log::{info, warn};

use crate::{
    config::{RampCarryover, Tuning},
    drivetrain::{DriveCommand, DriveSink, SafeDrive, log_command},
    error::{Error, Result},
    motion::turn::{HeadingTurn, TurnState},
    opcontrol::ramp::{DriveRamp, RampInputs, RampState},
    peripherals::{DriverInput, FaultKind, FaultLog, HeadingSensor, VoltageSensor, finite, or_fallback},
};

/// Mutually exclusive operating modes selected by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Autonomous,
    Teleop,
    Disabled,
    Test,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Autonomous => "autonomous",
            Phase::Teleop => "teleop",
            Phase::Disabled => "disabled",
            Phase::Test => "test",
        };
        f.write_str(name)
    }
}

/// The active phase together with the state its controller owns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhaseState {
    /// `None` when the heading sensor could not be used at phase entry.
    Autonomous(Option<TurnState>),
    Teleop(RampState),
    Disabled,
    Test,
}

impl Phase {
    /// Whether the phase sends a drive command every tick.
    pub fn drives(self) -> bool { matches!(self, Phase::Autonomous | Phase::Teleop) }
}

impl PhaseState {
    pub fn phase(&self) -> Phase {
        match self {
            PhaseState::Autonomous(_) => Phase::Autonomous,
            PhaseState::Teleop(_) => Phase::Teleop,
            PhaseState::Disabled => Phase::Disabled,
            PhaseState::Test => Phase::Test,
        }
    }
}

/// The control loop: boundary devices, both controllers, and the phase state.
pub struct Robot<D, H, V, J> {
    drive:     SafeDrive<D>,
    heading:   Option<H>,
    voltage:   V,
    joystick:  J,
    turn:      HeadingTurn,
    ramp:      DriveRamp,
    carryover: RampCarryover,
    state:     PhaseState,
    last_ramp: RampState,
    faults:    FaultLog,
}

impl<D, H, V, J> Robot<D, H, V, J>
where
    D: DriveSink,
    H: HeadingSensor,
    V: VoltageSensor,
    J: DriverInput,
{
    /// Builds the control loop in the `Disabled` phase.
    ///
    /// `heading` is `None` when the heading sensor failed bring-up; this is
    /// reported as a fault and every autonomous phase will refuse to turn.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidTuning`] if `tuning` fails validation.
    pub fn new(
        drive: D,
        heading: Option<H>,
        voltage: V,
        joystick: J,
        tuning: &Tuning,
    ) -> Result<Self> {
        tuning.validate()?;

        let mut faults = FaultLog::new();
        if heading.is_none() {
            faults.report(FaultKind::BringUp("heading sensor"), Duration::ZERO);
        }

        Ok(Self {
            drive: SafeDrive::new(drive, tuning.drive.safety_expiration()),
            heading,
            voltage,
            joystick,
            turn: HeadingTurn::new(&tuning.turn),
            ramp: DriveRamp::new(&tuning.ramp),
            carryover: tuning.ramp.carryover,
            state: PhaseState::Disabled,
            last_ramp: RampState::default(),
            faults,
        })
    }

    /// Begins `phase`, rebuilding its controller state.
    ///
    /// # Errors
    ///
    /// Returns [`Error::HeadingUnavailable`] when entering `Autonomous`
    /// without a usable heading sensor. The phase is still entered, but its
    /// ticks only send stop commands.
    pub fn enter(&mut self, phase: Phase, now: Duration) -> Result<()> {
        info!("Entering {} phase", phase);
        let (state, result) = match phase {
            Phase::Autonomous => match self.zero_heading() {
                Ok(()) => (PhaseState::Autonomous(Some(self.turn.enter())), Ok(())),
                Err(e) => {
                    warn!("Autonomous turn disabled: {}", e);
                    self.faults.report(FaultKind::HeadingUnavailable, now);
                    (PhaseState::Autonomous(None), Err(Error::HeadingUnavailable))
                }
            },
            Phase::Teleop => {
                let ramp = match self.carryover {
                    RampCarryover::Reset => RampState::default(),
                    RampCarryover::Carry => self.last_ramp,
                };
                (PhaseState::Teleop(ramp), Ok(()))
            }
            Phase::Disabled => {
                self.drive.stop(now);
                (PhaseState::Disabled, Ok(()))
            }
            Phase::Test => (PhaseState::Test, Ok(())),
        };
        self.state = state;
        result
    }

    fn zero_heading(&mut self) -> Result<()> {
        match self.heading.as_mut() {
            Some(sensor) => sensor.zero_heading(),
            None => Err(Error::HeadingUnavailable),
        }
    }

    /// Runs one tick of the active phase.
    ///
    /// Returns the command sent to the drive, if the phase drives.
    pub fn tick(&mut self, now: Duration) -> Option<DriveCommand> {
        let current = self.state;
        let (state, command) = match current {
            PhaseState::Autonomous(Some(turn)) => {
                let heading = self.heading.as_mut().and_then(|sensor| {
                    sensor
                        .heading()
                        .and_then(|h| finite("heading", h))
                        .map_err(|e| warn!("{}, holding still this tick", e))
                        .ok()
                });
                let (turn, command) = self.turn.step(turn, heading);
                (PhaseState::Autonomous(Some(turn)), Some(command))
            }
            PhaseState::Autonomous(None) => (current, Some(DriveCommand::STOP)),
            PhaseState::Teleop(ramp) => {
                let inputs = RampInputs {
                    forward:  or_fallback(
                        self.joystick.forward_axis().and_then(|f| finite("joystick", f)),
                        0.0,
                    ),
                    rotation: or_fallback(
                        self.joystick.rotation_axis().and_then(|r| finite("joystick", r)),
                        0.0,
                    ),
                    voltage:  self
                        .voltage
                        .supply_voltage()
                        .and_then(|v| finite("voltage", v))
                        .map_err(|e| warn!("{}, dropping demand this tick", e))
                        .ok(),
                };
                let (ramp, command) = self.ramp.step(ramp, inputs);
                self.last_ramp = ramp;
                (PhaseState::Teleop(ramp), Some(command))
            }
            PhaseState::Disabled | PhaseState::Test => (current, None),
        };

        self.state = state;
        if let Some(command) = command {
            log_command(state.phase(), command);
            self.drive.drive(command, now);
        }
        command
    }

    /// Stops the motors if the drive output went stale, recording a fault.
    ///
    /// Only Autonomous and Teleop assert the output every tick, so the
    /// watchdog is not checked in the idle phases.
    ///
    /// Returns `true` when the watchdog tripped on this check.
    pub fn check_safety(&mut self, now: Duration) -> bool {
        if !self.phase().drives() {
            return false;
        }
        let tripped = self.drive.check(now);
        if tripped {
            self.faults.report(FaultKind::DriveWatchdog, now);
        }
        tripped
    }

    pub fn phase(&self) -> Phase { self.state.phase() }

    pub fn state(&self) -> &PhaseState { &self.state }

    pub fn faults(&self) -> &FaultLog { &self.faults }

    pub fn faults_mut(&mut self) -> &mut FaultLog { &mut self.faults }

    pub fn drive(&self) -> &SafeDrive<D> { &self.drive }

    pub fn heading_sensor_mut(&mut self) -> Option<&mut H> { self.heading.as_mut() }

    pub fn voltage_sensor_mut(&mut self) -> &mut V { &mut self.voltage }

    pub fn driver_input_mut(&mut self) -> &mut J { &mut self.joystick }
}

#[cfg(test)]
mod tests {
    use std::{cell::RefCell, rc::Rc};

    use approx::assert_relative_eq;

    use super::*;
    use crate::drivetrain::WheelSpeeds;

    #[derive(Clone, Default)]
    struct Wheels(Rc<RefCell<Vec<WheelSpeeds>>>);

    impl DriveSink for Wheels {
        fn set_wheels(&mut self, speeds: WheelSpeeds) { self.0.borrow_mut().push(speeds); }
    }

    struct Imu {
        raw:    f64,
        offset: f64,
        broken: bool,
    }

    impl HeadingSensor for Imu {
        fn heading(&mut self) -> Result<f64> {
            if self.broken {
                Err(Error::sensor_read("imu", "disconnected"))
            } else {
                Ok(self.raw - self.offset)
            }
        }

        fn zero_heading(&mut self) -> Result<()> {
            self.heading()?;
            self.offset = self.raw;
            Ok(())
        }
    }

    struct Battery(Option<f64>);

    impl VoltageSensor for Battery {
        fn supply_voltage(&mut self) -> Result<f64> {
            self.0.ok_or_else(|| Error::sensor_read("battery", "no reading"))
        }
    }

    struct Sticks(Option<(f64, f64)>);

    impl DriverInput for Sticks {
        fn forward_axis(&mut self) -> Result<f64> {
            self.0
                .map(|(f, _)| f)
                .ok_or_else(|| Error::sensor_read("joystick", "unplugged"))
        }

        fn rotation_axis(&mut self) -> Result<f64> {
            self.0
                .map(|(_, r)| r)
                .ok_or_else(|| Error::sensor_read("joystick", "unplugged"))
        }
    }

    type TestRobot = Robot<Wheels, Imu, Battery, Sticks>;

    fn robot(tuning: &Tuning) -> TestRobot {
        let imu = Imu {
            raw:    0.0,
            offset: 0.0,
            broken: false,
        };
        Robot::new(
            Wheels::default(),
            Some(imu),
            Battery(Some(12.0)),
            Sticks(Some((0.0, 0.0))),
            tuning,
        )
        .unwrap()
    }

    fn ms(v: u64) -> Duration { Duration::from_millis(v) }

    #[test]
    fn starts_disabled_and_idle() {
        let mut robot = robot(&Tuning::default());
        assert_eq!(robot.phase(), Phase::Disabled);
        assert_eq!(robot.tick(ms(0)), None);
        assert!(robot.faults().is_empty());
    }

    #[test]
    fn autonomous_entry_zeroes_heading() {
        let mut robot = robot(&Tuning::default());
        robot.heading_sensor_mut().unwrap().raw = 45.0;
        robot.enter(Phase::Autonomous, ms(0)).unwrap();
        let cmd = robot.tick(ms(20)).unwrap();
        assert_relative_eq!(cmd.rotation, -0.3);

        robot.heading_sensor_mut().unwrap().raw = 125.0;
        assert!(robot.tick(ms(40)).unwrap().is_stop());
        assert!(matches!(
            robot.state(),
            PhaseState::Autonomous(Some(TurnState { stopped: true, .. }))
        ));
    }

    #[test]
    fn reentering_autonomous_turns_again() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Autonomous, ms(0)).unwrap();
        robot.heading_sensor_mut().unwrap().raw = 80.0;
        assert!(robot.tick(ms(20)).unwrap().is_stop());

        robot.enter(Phase::Autonomous, ms(40)).unwrap();
        robot.heading_sensor_mut().unwrap().raw = 100.0;
        assert!(!robot.tick(ms(60)).unwrap().is_stop());
    }

    #[test]
    fn autonomous_without_heading_sensor_refuses_to_turn() {
        let mut robot: TestRobot = Robot::new(
            Wheels::default(),
            None,
            Battery(Some(12.0)),
            Sticks(None),
            &Tuning::default(),
        )
        .unwrap();
        assert!(robot.faults().contains(FaultKind::BringUp("heading sensor")));

        let err = robot.enter(Phase::Autonomous, ms(0)).unwrap_err();
        assert!(matches!(err, Error::HeadingUnavailable));
        assert!(robot.faults().contains(FaultKind::HeadingUnavailable));
        for t in 1..5 {
            assert_eq!(robot.tick(ms(t * 20)), Some(DriveCommand::STOP));
        }
    }

    #[test]
    fn transient_heading_failure_holds_for_one_tick() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Autonomous, ms(0)).unwrap();
        robot.heading_sensor_mut().unwrap().broken = true;
        assert!(robot.tick(ms(20)).unwrap().is_stop());
        robot.heading_sensor_mut().unwrap().broken = false;
        assert!(!robot.tick(ms(40)).unwrap().is_stop());
    }

    #[test]
    fn teleop_ramps_and_falls_back_on_lost_sticks() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        *robot.driver_input_mut() = Sticks(Some((1.0, 0.0)));
        for t in 1..=10 {
            robot.tick(ms(t * 20));
        }
        let PhaseState::Teleop(ramp) = *robot.state() else {
            panic!("expected teleop");
        };
        assert_relative_eq!(ramp.forward, 0.2, epsilon = 1e-9);

        *robot.driver_input_mut() = Sticks(None);
        let cmd = robot.tick(ms(220)).unwrap();
        assert!(cmd.is_stop());
    }

    #[test]
    fn teleop_ramp_resets_on_entry_by_default() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        *robot.driver_input_mut() = Sticks(Some((1.0, 0.0)));
        for t in 1..=10 {
            robot.tick(ms(t * 20));
        }
        robot.enter(Phase::Disabled, ms(220)).unwrap();
        robot.enter(Phase::Teleop, ms(240)).unwrap();
        assert_eq!(*robot.state(), PhaseState::Teleop(RampState::default()));
    }

    #[test]
    fn teleop_ramp_carries_over_when_configured() {
        let mut tuning = Tuning::default();
        tuning.ramp.carryover = RampCarryover::Carry;
        let mut robot = robot(&tuning);
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        *robot.driver_input_mut() = Sticks(Some((1.0, 0.0)));
        for t in 1..=10 {
            robot.tick(ms(t * 20));
        }
        robot.enter(Phase::Disabled, ms(220)).unwrap();
        robot.enter(Phase::Teleop, ms(240)).unwrap();
        let PhaseState::Teleop(ramp) = *robot.state() else {
            panic!("expected teleop");
        };
        assert_relative_eq!(ramp.forward, 0.2, epsilon = 1e-9);
    }

    #[test]
    fn disabled_entry_stops_motors() {
        let wheels = Wheels::default();
        let mut robot: TestRobot = Robot::new(
            wheels.clone(),
            None,
            Battery(Some(12.0)),
            Sticks(Some((1.0, 1.0))),
            &Tuning::default(),
        )
        .unwrap();
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        robot.tick(ms(20));
        robot.enter(Phase::Disabled, ms(40)).unwrap();
        assert_eq!(wheels.0.borrow().last(), Some(&WheelSpeeds::default()));
        robot.enter(Phase::Test, ms(60)).unwrap();
        assert_eq!(robot.tick(ms(80)), None);
    }

    #[test]
    fn missed_ticks_trip_the_watchdog() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        robot.tick(ms(20));
        assert!(!robot.check_safety(ms(100)));
        assert!(robot.check_safety(ms(200)));
        assert!(robot.faults().contains(FaultKind::DriveWatchdog));
        assert!(!robot.check_safety(ms(220)));

        robot.tick(ms(240));
        assert!(!robot.drive().safety().is_tripped());
    }

    #[test]
    fn idle_phases_never_trip_the_watchdog() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        robot.tick(ms(20));
        robot.enter(Phase::Disabled, ms(40)).unwrap();
        for t in 3..53 {
            assert_eq!(robot.tick(ms(t * 20)), None);
            assert!(!robot.check_safety(ms(t * 20)));
        }
        robot.enter(Phase::Test, ms(1060)).unwrap();
        for t in 54..103 {
            assert_eq!(robot.tick(ms(t * 20)), None);
            assert!(!robot.check_safety(ms(t * 20)));
        }
        assert!(!robot.faults().contains(FaultKind::DriveWatchdog));

        // Back in a driving phase, a missed tick is caught again.
        robot.enter(Phase::Teleop, ms(2100)).unwrap();
        robot.tick(ms(2120));
        assert!(robot.check_safety(ms(2300)));
        assert!(robot.faults().contains(FaultKind::DriveWatchdog));
    }

    #[test]
    fn non_finite_heading_holds_still() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Autonomous, ms(0)).unwrap();
        robot.heading_sensor_mut().unwrap().raw = f64::NAN;
        let cmd = robot.tick(ms(20)).unwrap();
        assert!(cmd.is_stop());
        assert!(matches!(
            robot.state(),
            PhaseState::Autonomous(Some(TurnState { stopped: false, .. }))
        ));

        robot.heading_sensor_mut().unwrap().raw = 0.0;
        assert!(!robot.tick(ms(40)).unwrap().is_stop());
    }

    #[test]
    fn non_finite_voltage_drops_demand() {
        let mut robot = robot(&Tuning::default());
        robot.enter(Phase::Teleop, ms(0)).unwrap();
        *robot.driver_input_mut() = Sticks(Some((1.0, 0.0)));
        for t in 1..=5 {
            robot.tick(ms(t * 20));
        }
        *robot.voltage_sensor_mut() = Battery(Some(f64::NAN));
        assert!(robot.tick(ms(120)).unwrap().is_stop());

        *robot.voltage_sensor_mut() = Battery(Some(12.0));
        *robot.driver_input_mut() = Sticks(Some((f64::INFINITY, 0.0)));
        assert!(robot.tick(ms(140)).unwrap().is_stop());
    }

    #[test]
    fn rejects_invalid_tuning() {
        let mut tuning = Tuning::default();
        tuning.ramp.accel_increment = 0.0;
        let result: Result<TestRobot> = Robot::new(
            Wheels::default(),
            None,
            Battery(None),
            Sticks(None),
            &tuning,
        );
        assert!(matches!(result, Err(Error::InvalidTuning(_))));
    }
}
