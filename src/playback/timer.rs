//! Single-slot, cancellable advance timer.
//!
//! The scheduler never holds more than one pending advance. Arming replaces
//! whatever was pending, and every cancel bumps a generation counter so a
//! handle taken before the cancel can be recognised as stale.

use std::time::Instant;

/// Identifies one arming of the timer slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerHandle {
    generation: u64,
    deadline: Instant,
}

impl TimerHandle {
    /// When this timer was due to fire.
    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// Holds at most one pending deadline.
#[derive(Debug, Default)]
pub struct TimerSlot {
    pending: Option<TimerHandle>,
    generation: u64,
}

impl TimerSlot {
    /// Creates an empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Arms the slot for `deadline`, cancelling anything already pending.
    pub fn arm(&mut self, deadline: Instant) -> TimerHandle {
        self.cancel();
        let handle = TimerHandle {
            generation: self.generation,
            deadline,
        };
        self.pending = Some(handle);
        handle
    }

    /// Clears the pending timer, if any. Outstanding handles become stale.
    pub fn cancel(&mut self) {
        self.pending = None;
        self.generation = self.generation.wrapping_add(1);
    }

    /// Returns true if a timer is pending.
    pub fn is_armed(&self) -> bool {
        self.pending.is_some()
    }

    /// Deadline of the pending timer.
    pub fn deadline(&self) -> Option<Instant> {
        self.pending.map(|h| h.deadline)
    }

    /// Takes the pending timer if it is due at `now`.
    ///
    /// The slot is empty afterwards, so a timer fires at most once.
    pub fn take_due(&mut self, now: Instant) -> Option<TimerHandle> {
        match self.pending {
            Some(handle) if handle.deadline <= now => {
                self.pending = None;
                Some(handle)
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn test_fires_once_when_due() {
        let t0 = Instant::now();
        let mut slot = TimerSlot::new();
        let handle = slot.arm(t0 + Duration::from_millis(500));

        assert!(slot.take_due(t0 + Duration::from_millis(499)).is_none());
        assert_eq!(slot.take_due(t0 + Duration::from_millis(500)), Some(handle));
        assert!(slot.take_due(t0 + Duration::from_secs(5)).is_none());
        assert!(!slot.is_armed());
    }

    #[test]
    fn test_rearm_replaces_pending() {
        let t0 = Instant::now();
        let mut slot = TimerSlot::new();
        let first = slot.arm(t0 + Duration::from_millis(100));
        let second = slot.arm(t0 + Duration::from_millis(300));

        assert_ne!(first, second);
        // The earlier deadline no longer fires
        assert!(slot.take_due(t0 + Duration::from_millis(200)).is_none());
        assert_eq!(slot.deadline(), Some(t0 + Duration::from_millis(300)));
    }

    #[test]
    fn test_cancel_makes_handle_stale() {
        let t0 = Instant::now();
        let mut slot = TimerSlot::new();
        let handle = slot.arm(t0);
        slot.cancel();

        assert!(!slot.is_armed());
        assert!(slot.take_due(t0 + Duration::from_secs(10)).is_none());

        // Re-arming at the same deadline still yields a distinct handle
        let again = slot.arm(t0);
        assert_ne!(again, handle);
    }
}
