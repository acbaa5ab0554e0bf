//! One-shot, cancellable, restartable timer (spec §5), generalizing the
//! teacher's deadline-polling pattern (`tcb.rs`'s `timeout`/`on_tick`, which
//! recomputes `Instant::now() >= deadline` on every tick) into a reusable
//! type, since the entity needs three independent instances (poll-retransmit,
//! reassembly, status-prohibit).
//!
//! A generation counter distinguishes a stale expiry (from a timer that was
//! cancelled and restarted before the original deadline fired) from a live
//! one, since this crate polls deadlines rather than scheduling OS-level
//! callbacks.

use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerId(u64);

pub struct Timer {
    duration: Duration,
    deadline: Option<Instant>,
    generation: u64,
}

impl Timer {
    pub fn new(duration_ms: u64) -> Self {
        Timer {
            duration: Duration::from_millis(duration_ms),
            deadline: None,
            generation: 0,
        }
    }

    pub fn is_running(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn set_duration_ms(&mut self, duration_ms: u64) {
        self.duration = Duration::from_millis(duration_ms);
    }

    /// A duration of zero disables the timer entirely (spec §6).
    pub fn is_disabled(&self) -> bool {
        self.duration.is_zero()
    }

    /// Starts (or restarts) the timer. Returns the `TimerId` that a later
    /// `poll` call must be given to recognize this particular firing.
    pub fn start(&mut self, now: Instant) -> Option<TimerId> {
        if self.is_disabled() {
            return None;
        }
        self.generation += 1;
        self.deadline = Some(now + self.duration);
        Some(TimerId(self.generation))
    }

    pub fn stop(&mut self) {
        self.deadline = None;
    }

    /// Returns `Some(id)` if the timer is running and has elapsed as of
    /// `now`; the caller is responsible for invoking its expiry handler and
    /// then calling `stop` (a one-shot timer does not restart itself).
    pub fn poll(&self, now: Instant) -> Option<TimerId> {
        match self.deadline {
            Some(d) if now >= d => Some(TimerId(self.generation)),
            _ => None,
        }
    }

    pub fn current_id(&self) -> Option<TimerId> {
        if self.is_running() {
            Some(TimerId(self.generation))
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_and_expires() {
        let mut t = Timer::new(10);
        let now = Instant::now();
        t.start(now);
        assert!(t.poll(now).is_none());
        assert!(t.poll(now + Duration::from_millis(11)).is_some());
    }

    #[test]
    fn zero_duration_disables() {
        let mut t = Timer::new(0);
        assert!(t.start(Instant::now()).is_none());
        assert!(!t.is_running());
    }

    #[test]
    fn restart_changes_generation() {
        let mut t = Timer::new(10);
        let now = Instant::now();
        let id1 = t.start(now).unwrap();
        let id2 = t.start(now).unwrap();
        assert_ne!(id1, id2);
    }
}
