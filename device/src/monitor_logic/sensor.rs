//! # Pulse Sources
//!
//! The edge handler plays the role of the flow sensor's interrupt service routine:
//! it bumps the shared [`PulseCounter`] and, only when the counter reports a
//! threshold crossing, posts a timestamp to the flow task through an unbounded
//! channel. Nothing in it blocks or allocates beyond that send.
//!
//! On a host there is no GPIO edge, so a scripted simulator drives the handler.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use lib_kegtap::core::PulseCounter;
use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::{debug, info};

/// Current time on the runtime clock, as a std `Instant`.
///
/// Under a paused test runtime this follows the mocked clock.
pub fn now() -> Instant {
    time::Instant::now().into_std()
}

/// The interrupt-side entry point for sensor edges.
#[derive(Debug, Clone)]
pub struct EdgeHandler {
    counter: Arc<PulseCounter>,
    thresholds: mpsc::UnboundedSender<Instant>,
}

impl EdgeHandler {
    pub fn new(counter: Arc<PulseCounter>, thresholds: mpsc::UnboundedSender<Instant>) -> Self {
        Self {
            counter,
            thresholds,
        }
    }

    /// Handles one sensor edge.
    pub fn on_edge(&self) {
        if self.counter.on_pulse() {
            // The flow task may already be gone during shutdown.
            let _ = self.thresholds.send(now());
        }
    }
}

/// One step of a simulated pulse stream.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Phase {
    /// Emit edges at `hz` for `secs`.
    Pour { secs: f64, hz: f64 },
    /// No edges for `secs`.
    Idle { secs: f64 },
}

/// A sequence of phases, written as `pour:<secs>@<hz>` and `idle:<secs>`
/// separated by commas.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseScript {
    pub phases: Vec<Phase>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError(String);

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid pulse script step: {}", self.0)
    }
}

impl std::error::Error for ScriptError {}

fn positive(raw: &str, step: &str) -> Result<f64, ScriptError> {
    match raw.trim().parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(ScriptError(step.to_string())),
    }
}

impl FromStr for PulseScript {
    type Err = ScriptError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let phases = s
            .split(',')
            .map(str::trim)
            .filter(|step| !step.is_empty())
            .map(|step| {
                let (kind, args) = step
                    .split_once(':')
                    .ok_or_else(|| ScriptError(step.to_string()))?;
                match kind.trim() {
                    "pour" => {
                        let (secs, hz) = args
                            .split_once('@')
                            .ok_or_else(|| ScriptError(step.to_string()))?;
                        let hz = positive(hz, step)?;
                        if hz == 0.0 {
                            return Err(ScriptError(step.to_string()));
                        }
                        Ok(Phase::Pour {
                            secs: positive(secs, step)?,
                            hz,
                        })
                    }
                    "idle" => Ok(Phase::Idle {
                        secs: positive(args, step)?,
                    }),
                    _ => Err(ScriptError(step.to_string())),
                }
            })
            .collect::<Result<Vec<_>, _>>()?;

        if phases.is_empty() {
            return Err(ScriptError(s.to_string()));
        }
        Ok(Self { phases })
    }
}

/// Plays `script` into `edges`, stopping early on shutdown. Returns the number of
/// edges emitted.
pub async fn simulate(
    script: PulseScript,
    edges: EdgeHandler,
    mut shutdown: broadcast::Receiver<()>,
) -> u64 {
    let mut emitted = 0u64;
    info!(phases = script.phases.len(), "Pulse simulator started");

    for phase in script.phases {
        match phase {
            Phase::Idle { secs } => {
                tokio::select! {
                    _ = shutdown.recv() => return emitted,
                    _ = time::sleep(Duration::from_secs_f64(secs)) => {}
                }
            }
            Phase::Pour { secs, hz } => {
                let pulses = (secs * hz).round() as u64;
                let period = Duration::from_secs_f64(1.0 / hz);
                debug!(pulses, hz, "Simulating pour");
                for _ in 0..pulses {
                    edges.on_edge();
                    emitted += 1;
                    tokio::select! {
                        _ = shutdown.recv() => return emitted,
                        _ = time::sleep(period) => {}
                    }
                }
            }
        }
    }

    info!(emitted, "Pulse simulator finished");
    emitted
}
