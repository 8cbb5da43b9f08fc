//! Runs a [`Robot`] under the VEX competition lifecycle.
//!
//! VEXos drives the phases: each competition state change cancels the
//! running phase future and starts the next one, which is exactly the
//! enter-then-tick contract of [`Robot`].
//!
//! ```ignore
//! use headway::{competition::Competition, config::Tuning, drivetrain::Differential, robot::Robot};
//! use headway::peripherals::v5::{ArcadeSticks, Battery, ImuHeading};
//! use vexide::prelude::*;
//!
//! #[vexide::main]
//! async fn main(peripherals: Peripherals) {
//!     let drive = Differential::new(
//!         [Motor::new(peripherals.port_1, Gearset::Green, Direction::Forward)],
//!         [Motor::new(peripherals.port_2, Gearset::Green, Direction::Reverse)],
//!     );
//!     let imu = ImuHeading::new(InertialSensor::new(peripherals.port_10));
//!     let sticks = ArcadeSticks::new(peripherals.primary_controller);
//!     let robot = Robot::new(drive, Some(imu), Battery, sticks, &Tuning::default()).unwrap();
//!     Competition::new(robot).compete().await;
//! }
//! ```

use log::warn;
use vexide::{competition::Compete, time::sleep};

use crate::{
    config::LOOP_PERIOD,
    drivetrain::DriveSink,
    peripherals::{DriverInput, HeadingSensor, VoltageSensor},
    robot::{Phase, Robot},
    uptime,
};

/// Adapts a [`Robot`] to vexide's [`Compete`] trait.
pub struct Competition<D, H, V, J> {
    robot: Robot<D, H, V, J>,
}

impl<D, H, V, J> Competition<D, H, V, J>
where
    D: DriveSink,
    H: HeadingSensor,
    V: VoltageSensor,
    J: DriverInput,
{
    pub fn new(robot: Robot<D, H, V, J>) -> Self { Self { robot } }

    pub fn robot(&self) -> &Robot<D, H, V, J> { &self.robot }

    /// Enters `phase` and ticks it until the runtime cancels this future.
    async fn run(&mut self, phase: Phase) {
        if let Err(e) = self.robot.enter(phase, uptime()) {
            warn!("{} phase entered degraded: {}", phase, e);
        }
        loop {
            self.robot.tick(uptime());
            self.robot.check_safety(uptime());
            sleep(LOOP_PERIOD).await;
        }
    }
}

impl<D, H, V, J> Compete for Competition<D, H, V, J>
where
    D: DriveSink,
    H: HeadingSensor,
    V: VoltageSensor,
    J: DriverInput,
{
    async fn autonomous(&mut self) { self.run(Phase::Autonomous).await; }

    async fn driver(&mut self) { self.run(Phase::Teleop).await; }

    async fn disabled(&mut self) { self.run(Phase::Disabled).await; }
}
