//! Bounded fault log for the operator.
//!
//! Faults are the problems a driver needs to see: devices missing at
//! bring-up, a phase that could not start, a stalled drive output. Each report
//! is logged at `error` level and kept in a fixed-size buffer the host can
//! show on its display. When the buffer is full the oldest fault is dropped.

use std::{fmt, time::Duration};

use heapless::Vec;
use log::error;

/// How many faults the log retains.
pub const FAULT_CAPACITY: usize = 8;

/// What went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultKind {
    /// The heading sensor is missing or could not be zeroed.
    HeadingUnavailable,
    /// The drive output went stale and the watchdog stopped the motors.
    DriveWatchdog,
    /// A device failed to come up.
    BringUp(&'static str),
}

impl fmt::Display for FaultKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FaultKind::HeadingUnavailable => write!(f, "heading sensor unavailable"),
            FaultKind::DriveWatchdog => write!(f, "drive output timed out"),
            FaultKind::BringUp(device) => write!(f, "{device} failed to initialize"),
        }
    }
}

/// A reported fault and when it happened.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fault {
    pub kind: FaultKind,
    /// Time since program start.
    pub at:   Duration,
}

/// The most recent [`FAULT_CAPACITY`] faults, oldest first.
#[derive(Debug, Default)]
pub struct FaultLog {
    faults: Vec<Fault, FAULT_CAPACITY>,
    total:  u32,
}

impl FaultLog {
    pub fn new() -> Self { Self::default() }

    /// Logs and records a fault.
    pub fn report(&mut self, kind: FaultKind, at: Duration) {
        error!("Fault: {}", kind);
        if self.faults.is_full() {
            self.faults.remove(0);
        }
        // Cannot fail: a slot was just freed.
        let _ = self.faults.push(Fault { kind, at });
        self.total = self.total.saturating_add(1);
    }

    /// Retained faults, oldest first.
    pub fn faults(&self) -> &[Fault] { &self.faults }

    pub fn latest(&self) -> Option<&Fault> { self.faults.last() }

    pub fn contains(&self, kind: FaultKind) -> bool { self.faults.iter().any(|f| f.kind == kind) }

    /// Faults reported since creation, including dropped ones.
    pub fn total(&self) -> u32 { self.total }

    pub fn is_empty(&self) -> bool { self.faults.is_empty() }

    /// Acknowledges the retained faults. [`total`](Self::total) is kept.
    pub fn clear(&mut self) { self.faults.clear(); }
}
