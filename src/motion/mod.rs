//! Autonomous motion control.
//!
//! # Example
//!
//! ```
//! use headway::config::TurnTuning;
//! use headway::motion::turn::HeadingTurn;
//!
//! let turn = HeadingTurn::new(&TurnTuning::default());
//! let mut state = turn.enter();
//! for heading in [0.0, 35.0, 70.0, 79.5] {
//!     let (next, command) = turn.step(state, Some(heading));
//!     state = next;
//!     assert_eq!(command.forward, 0.0);
//! }
//! assert!(state.stopped);
//! ```

/// Proportional-with-floor turn to a fixed heading.
///
/// Provides [`HeadingTurn`](turn::HeadingTurn) and its per-phase
/// [`TurnState`](turn::TurnState).
pub mod turn;
