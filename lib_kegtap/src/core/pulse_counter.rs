//! # Pulse Counter
//!
//! Converts a raw edge-triggered sensor stream into a debounced pulse tally.
//!
//! The counter is shared (behind an `Arc`) between the edge handler, which runs in
//! interrupt-like context and must do nothing but bump a number, and the task that
//! owns the [`FlowStateMachine`](super::FlowStateMachine), which drains the tally once
//! per window.
//!
//! ## Threshold Signalling
//! `on_pulse` returns `true` for exactly one pulse per idle period: the first one that
//! brings the tally to the threshold while the counter is armed. Claiming the
//! transition is a single compare-exchange, so concurrent edges cannot both win. The
//! state machine re-arms the counter when the pour ends.

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};

/// Minimum pulses within one window for the signal to count as genuine flow.
pub const FLOW_DETECTION_THRESHOLD: u32 = 5;

/// A lock-free pulse tally.
#[derive(Debug)]
pub struct PulseCounter {
    /// Pulses seen since the last window drain.
    pulses: AtomicU32,
    /// `true` while idle and waiting for the threshold to be crossed.
    armed: AtomicBool,
    /// Pulses per window required to detect flow.
    threshold: u32,
}

impl Default for PulseCounter {
    fn default() -> Self {
        Self::new(FLOW_DETECTION_THRESHOLD)
    }
}

impl PulseCounter {
    /// Creates an armed counter. A threshold of zero is treated as one.
    pub fn new(threshold: u32) -> Self {
        Self {
            pulses: AtomicU32::new(0),
            armed: AtomicBool::new(true),
            threshold: threshold.max(1),
        }
    }

    /// Records one sensor edge.
    ///
    /// Returns `true` if this pulse crossed the threshold while idle, i.e. the caller
    /// should signal "flow started". Never blocks, never fails.
    pub fn on_pulse(&self) -> bool {
        // Relaxed is enough for the tally: it is only read back by `take`, and the
        // handoff to the owning task happens through the armed flag below.
        let count = self.pulses.fetch_add(1, Ordering::Relaxed).saturating_add(1);
        count >= self.threshold
            && self
                .armed
                .compare_exchange(true, false, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
    }

    /// Drains the tally, returning the pulses accumulated since the previous drain.
    pub fn take(&self) -> u32 {
        self.pulses.swap(0, Ordering::Relaxed)
    }

    /// Current tally without draining it.
    pub fn count(&self) -> u32 {
        self.pulses.load(Ordering::Relaxed)
    }

    /// Re-arms threshold detection after a pour ends.
    pub fn rearm(&self) {
        self.armed.store(true, Ordering::Release);
    }

    /// `true` while no flow start has been claimed since the last re-arm.
    pub fn is_armed(&self) -> bool {
        self.armed.load(Ordering::Acquire)
    }

    /// Pulses per window required to detect flow.
    pub fn threshold(&self) -> u32 {
        self.threshold
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_below_threshold_never_signals() {
        let counter = PulseCounter::default();
        for _ in 0..4 {
            assert!(!counter.on_pulse());
        }
        assert_eq!(counter.count(), 4);
        assert!(counter.is_armed());
    }

    #[test]
    fn test_signals_exactly_once_above_threshold() {
        let counter = PulseCounter::default();
        let signals = (0..50).filter(|_| counter.on_pulse()).count();
        assert_eq!(signals, 1);
        assert_eq!(counter.count(), 50);
        assert!(!counter.is_armed());
    }

    #[test]
    fn test_fifth_pulse_is_the_trigger() {
        let counter = PulseCounter::default();
        let fired: Vec<bool> = (0..6).map(|_| counter.on_pulse()).collect();
        assert_eq!(fired, vec![false, false, false, false, true, false]);
    }

    #[test]
    fn test_rearm_allows_next_transition() {
        let counter = PulseCounter::new(3);
        assert_eq!((0..3).filter(|_| counter.on_pulse()).count(), 1);
        assert_eq!(counter.take(), 3);
        counter.rearm();
        assert_eq!((0..3).filter(|_| counter.on_pulse()).count(), 1);
    }

    #[test]
    fn test_stale_tally_signals_on_first_pulse_after_rearm() {
        // A busy window that is not drained still counts toward the next detection.
        let counter = PulseCounter::new(2);
        assert!(!counter.on_pulse());
        assert!(counter.on_pulse());
        counter.rearm();
        assert!(counter.on_pulse());
    }

    #[test]
    fn test_zero_threshold_is_clamped() {
        let counter = PulseCounter::new(0);
        assert_eq!(counter.threshold(), 1);
        assert!(counter.on_pulse());
    }

    #[test]
    fn test_concurrent_edges_claim_once() {
        let counter = Arc::new(PulseCounter::default());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let c = Arc::clone(&counter);
                thread::spawn(move || (0..1_000).filter(|_| c.on_pulse()).count())
            })
            .collect();
        let total: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(total, 1);
        assert_eq!(counter.take(), 8_000);
        assert_eq!(counter.count(), 0);
    }
}
