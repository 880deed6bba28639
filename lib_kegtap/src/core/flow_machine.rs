//! # Flow State Machine
//!
//! Decides when a pour starts and stops and measures how long it lasted.
//!
//! ## States:
//! - **`Idle`**: waiting for the pulse counter to cross the detection threshold.
//! - **`Active`**: a pour is in progress. Every window the accumulated pulses are
//!   drained; a window with fewer pulses than the threshold ends the pour.
//!
//! The machine never reads the clock itself. Callers pass `now` into every
//! transition, which keeps the logic deterministic and lets the runtime decide
//! where time comes from.
//!
//! While idle, each window tick discards whatever sub-threshold noise accumulated,
//! so scattered pulses never add up to a false start.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, trace};

use super::pulse_counter::PulseCounter;

/// Default length of one detection window.
pub const FLOW_TIMEOUT: Duration = Duration::from_millis(2000);

/// Coarse state of the detector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlowState {
    /// No pour in progress.
    Idle,
    /// A pour is in progress.
    Active,
}

/// Transitions emitted by the state machine.
#[derive(Debug, Clone, PartialEq)]
pub enum FlowEvent {
    /// Flow crossed the detection threshold.
    Started,
    /// A window elapsed with too few pulses; the pour is over.
    Stopped {
        /// Seconds between the start transition and the window that ended the pour.
        duration_secs: f64,
    },
}

/// One in-progress dispense. Lives only while the machine is `Active`.
#[derive(Debug, Clone, Copy)]
struct PourSession {
    started_at: Instant,
    /// Busy windows seen so far, for diagnostics.
    windows: u32,
}

/// The pour detector. Owned by exactly one task.
#[derive(Debug)]
pub struct FlowStateMachine {
    counter: Arc<PulseCounter>,
    window: Duration,
    session: Option<PourSession>,
}

impl FlowStateMachine {
    /// Creates an idle machine draining `counter` once per `window`.
    pub fn new(counter: Arc<PulseCounter>, window: Duration) -> Self {
        Self {
            counter,
            window,
            session: None,
        }
    }

    /// The counter shared with the edge handler.
    pub fn counter(&self) -> &Arc<PulseCounter> {
        &self.counter
    }

    /// Length of one detection window.
    pub fn window(&self) -> Duration {
        self.window
    }

    /// Current state.
    pub fn state(&self) -> FlowState {
        if self.session.is_some() {
            FlowState::Active
        } else {
            FlowState::Idle
        }
    }

    /// When the current pour started, if one is in progress.
    pub fn started_at(&self) -> Option<Instant> {
        self.session.map(|s| s.started_at)
    }

    /// Handles a threshold crossing reported by the pulse counter.
    ///
    /// `Idle -> Active`: records the start time and emits `Started`. Ignored while
    /// already active.
    pub fn on_threshold(&mut self, now: Instant) -> Option<FlowEvent> {
        if self.session.is_some() {
            return None;
        }
        debug!(pulses = self.counter.count(), "Flow detected");
        self.session = Some(PourSession {
            started_at: now,
            windows: 0,
        });
        Some(FlowEvent::Started)
    }

    /// Handles the periodic window check.
    ///
    /// - `Active` with at least `threshold` pulses: stays active, tally reset.
    /// - `Active` with fewer: back to `Idle`, emits `Stopped` with the elapsed seconds
    ///   and re-arms the counter.
    /// - `Idle`: drops sub-threshold noise, unless a start has already been claimed
    ///   and is still on its way to this machine.
    pub fn on_window_elapsed(&mut self, now: Instant) -> Option<FlowEvent> {
        let Some(session) = self.session.as_mut() else {
            if self.counter.is_armed() {
                let noise = self.counter.take();
                if noise > 0 {
                    trace!(noise, "Discarding sub-threshold pulses");
                }
            }
            return None;
        };

        let pulses = self.counter.take();
        if pulses >= self.counter.threshold() {
            session.windows += 1;
            trace!(pulses, windows = session.windows, "Flow continues");
            return None;
        }

        let duration_secs = now.saturating_duration_since(session.started_at).as_secs_f64();
        debug!(
            pulses,
            windows = session.windows,
            duration_secs,
            "Flow stopped"
        );
        self.session = None;
        self.counter.rearm();
        Some(FlowEvent::Stopped { duration_secs })
    }
}
