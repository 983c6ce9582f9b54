//! Edit coalescing for the compile trigger.
//!
//! Rapid edits collapse into one compile after a quiet period; only the most
//! recent submission survives, so compiles are never queued.

use std::time::{Duration, Instant};

#[derive(Debug)]
pub struct Debouncer<T> {
    quiet: Duration,
    pending: Option<Pending<T>>,
}

#[derive(Debug)]
struct Pending<T> {
    value: T,
    deadline: Instant,
}

impl<T> Debouncer<T> {
    pub fn new(quiet: Duration) -> Self {
        Self {
            quiet,
            pending: None,
        }
    }

    /// Replaces any pending value and pushes the deadline out.
    pub fn submit(&mut self, value: T, now: Instant) {
        self.pending = Some(Pending {
            value,
            deadline: now + self.quiet,
        });
    }

    /// Returns the pending value once its quiet period has elapsed.
    pub fn poll(&mut self, now: Instant) -> Option<T> {
        if self
            .pending
            .as_ref()
            .is_some_and(|pending| now >= pending.deadline)
        {
            self.pending.take().map(|pending| pending.value)
        } else {
            None
        }
    }

    /// Deadline of the pending value, for event-loop wakeup scheduling.
    pub fn next_deadline(&self) -> Option<Instant> {
        self.pending.as_ref().map(|pending| pending.deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fires_only_after_quiet_period() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.submit("a", start);
        assert_eq!(debouncer.poll(start + Duration::from_millis(499)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(500)),
            Some("a")
        );
        assert_eq!(debouncer.poll(start + Duration::from_secs(10)), None);
    }

    #[test]
    fn rapid_submissions_coalesce_to_the_latest() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(500));
        debouncer.submit("first", start);
        debouncer.submit("second", start + Duration::from_millis(200));
        debouncer.submit("third", start + Duration::from_millis(400));

        // The first deadline has passed but later edits pushed it out.
        assert_eq!(debouncer.poll(start + Duration::from_millis(600)), None);
        assert_eq!(
            debouncer.poll(start + Duration::from_millis(900)),
            Some("third")
        );
    }

    #[test]
    fn deadline_tracks_last_submission() {
        let start = Instant::now();
        let mut debouncer = Debouncer::new(Duration::from_millis(100));
        assert!(debouncer.next_deadline().is_none());
        debouncer.submit((), start);
        assert_eq!(
            debouncer.next_deadline(),
            Some(start + Duration::from_millis(100))
        );
    }
}
