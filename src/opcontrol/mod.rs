//! Operator control utilities for driver control periods.
//!
//! # Example
//!
//! ```
//! use headway::config::RampTuning;
//! use headway::opcontrol::ramp::{DriveRamp, RampInputs, RampState};
//!
//! let ramp = DriveRamp::new(&RampTuning::default());
//! let inputs = RampInputs { forward: 1.0, rotation: 0.0, voltage: Some(12.4) };
//! let (state, command) = ramp.step(RampState::default(), inputs);
//! assert!(state.forward > 0.0 && state.forward < 0.05);
//! assert_eq!(command.forward, state.forward);
//! ```

/// Stick-to-drive acceleration ramp with brownout protection.
///
/// Provides [`DriveRamp`](ramp::DriveRamp) and its per-phase
/// [`RampState`](ramp::RampState).
pub mod ramp;
