//! Poll timing state machine.
//!
//! The scheduler never sleeps or spawns anything: the runner feeds it the
//! current time and asks what to do next, which keeps every transition
//! testable without a clock.

use std::time::Duration;

use serde::Serialize;
use tokio::time::Instant;

/// Observable state of the scheduler.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    /// Waiting for the next deadline.
    Idle,
    /// A fetch is outstanding.
    Fetching,
    /// Auto reload is off; only forced refreshes fetch.
    Suspended,
}

/// What a timer fire resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Start a fetch now.
    Fetch,
    /// A fetch is already in flight; the tick was discarded.
    Dropped,
    /// No deadline was due.
    Ignored,
}

/// What a forced refresh resulted in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ForceOutcome {
    Fetch,
    /// Will run once the outstanding fetch completes.
    Queued,
}

/// What to do after a fetch completed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextStep {
    /// A forced refresh arrived meanwhile; fetch again immediately.
    Fetch,
    WaitUntil(Instant),
    Suspended,
}

/// Counters for logging and the health endpoint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct SchedulerStats {
    pub fetches_started: u64,
    pub ticks_dropped: u64,
    pub forced: u64,
    pub failures: u64,
}

/// Drives periodic fetches with at most one in flight.
#[derive(Debug, Clone)]
pub struct PollScheduler {
    interval: Duration,
    auto_reload: bool,
    in_flight: bool,
    pending_force: bool,
    deadline: Option<Instant>,
    stats: SchedulerStats,
}

impl PollScheduler {
    pub fn new(interval: Duration, auto_reload: bool) -> Self {
        Self {
            interval,
            auto_reload,
            in_flight: false,
            pending_force: false,
            deadline: None,
            stats: SchedulerStats::default(),
        }
    }

    pub fn state(&self) -> SchedulerState {
        if self.in_flight {
            SchedulerState::Fetching
        } else if !self.auto_reload {
            SchedulerState::Suspended
        } else {
            SchedulerState::Idle
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn auto_reload(&self) -> bool {
        self.auto_reload
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Pending timer deadline, if any.
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn stats(&self) -> SchedulerStats {
        self.stats
    }

    /// Arm the first deadline.
    pub fn start(&mut self, now: Instant) {
        if self.auto_reload && !self.in_flight {
            self.deadline = Some(now + self.interval);
        }
    }

    /// Timer fired at `now`.
    pub fn on_timer(&mut self, now: Instant) -> TickOutcome {
        if self.in_flight {
            self.stats.ticks_dropped += 1;
            return TickOutcome::Dropped;
        }
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.begin_fetch();
                TickOutcome::Fetch
            }
            _ => TickOutcome::Ignored,
        }
    }

    /// Out-of-band refresh, e.g. after the session's counts changed.
    ///
    /// Cancels the pending deadline. While a fetch is outstanding, any number
    /// of forces collapse into a single follow-up fetch.
    pub fn force(&mut self, _now: Instant) -> ForceOutcome {
        self.stats.forced += 1;
        if self.in_flight {
            self.pending_force = true;
            return ForceOutcome::Queued;
        }
        self.begin_fetch();
        ForceOutcome::Fetch
    }

    /// The outstanding fetch finished, successfully or not.
    pub fn complete(&mut self, now: Instant, succeeded: bool) -> NextStep {
        self.in_flight = false;
        if !succeeded {
            self.stats.failures += 1;
        }

        if self.pending_force {
            self.pending_force = false;
            self.begin_fetch();
            return NextStep::Fetch;
        }

        if self.auto_reload {
            let at = now + self.interval;
            self.deadline = Some(at);
            NextStep::WaitUntil(at)
        } else {
            self.deadline = None;
            NextStep::Suspended
        }
    }

    /// Stop timed reloads. An outstanding fetch still completes.
    pub fn suspend(&mut self) {
        self.auto_reload = false;
        self.deadline = None;
    }

    /// Turn timed reloads back on.
    pub fn resume(&mut self, now: Instant) {
        self.auto_reload = true;
        if !self.in_flight && self.deadline.is_none() {
            self.deadline = Some(now + self.interval);
        }
    }

    fn begin_fetch(&mut self) {
        self.in_flight = true;
        self.deadline = None;
        self.stats.fetches_started += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const T: Duration = Duration::from_millis(5000);

    #[test]
    fn test_timer_fetches_at_deadline() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);

        assert_eq!(scheduler.deadline(), Some(t0 + T));
        assert_eq!(scheduler.on_timer(t0 + Duration::from_millis(10)), TickOutcome::Ignored);
        assert_eq!(scheduler.on_timer(t0 + T), TickOutcome::Fetch);
        assert_eq!(scheduler.state(), SchedulerState::Fetching);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn test_tick_while_fetching_is_dropped() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);
        scheduler.on_timer(t0 + T);

        assert_eq!(scheduler.on_timer(t0 + T * 2), TickOutcome::Dropped);
        assert_eq!(scheduler.stats().ticks_dropped, 1);
        assert_eq!(scheduler.stats().fetches_started, 1);

        // re-armed relative to completion, not to the dropped tick
        let done = t0 + T * 3;
        assert_eq!(scheduler.complete(done, true), NextStep::WaitUntil(done + T));
    }

    #[test]
    fn test_force_preempts_pending_timer() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);

        let t1 = t0 + Duration::from_millis(1200);
        assert_eq!(scheduler.force(t1), ForceOutcome::Fetch);
        assert!(scheduler.is_in_flight());
        assert_eq!(scheduler.deadline(), None);
        assert_eq!(scheduler.complete(t1, true), NextStep::WaitUntil(t1 + T));
    }

    #[test]
    fn test_forces_during_fetch_coalesce() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.force(t0);

        assert_eq!(scheduler.force(t0), ForceOutcome::Queued);
        assert_eq!(scheduler.force(t0), ForceOutcome::Queued);
        assert_eq!(scheduler.complete(t0, true), NextStep::Fetch);
        assert!(scheduler.is_in_flight());
        assert_eq!(scheduler.complete(t0, true), NextStep::WaitUntil(t0 + T));
        assert_eq!(scheduler.stats().fetches_started, 2);
        assert_eq!(scheduler.stats().forced, 3);
    }

    #[test]
    fn test_failure_still_rearms() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);
        scheduler.on_timer(t0 + T);

        assert_eq!(scheduler.complete(t0 + T, false), NextStep::WaitUntil(t0 + T * 2));
        assert_eq!(scheduler.state(), SchedulerState::Idle);
        assert_eq!(scheduler.stats().failures, 1);
    }

    #[test]
    fn test_suspend_and_resume() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);

        scheduler.suspend();
        assert_eq!(scheduler.state(), SchedulerState::Suspended);
        assert_eq!(scheduler.deadline(), None);
        assert_eq!(scheduler.on_timer(t0 + T), TickOutcome::Ignored);

        // manual refresh still works while suspended
        assert_eq!(scheduler.force(t0 + T), ForceOutcome::Fetch);
        assert_eq!(scheduler.complete(t0 + T, true), NextStep::Suspended);

        let t2 = t0 + T * 2;
        scheduler.resume(t2);
        assert_eq!(scheduler.deadline(), Some(t2 + T));
    }

    #[test]
    fn test_start_without_auto_reload_is_suspended() {
        let mut scheduler = PollScheduler::new(T, false);
        scheduler.start(Instant::now());
        assert_eq!(scheduler.state(), SchedulerState::Suspended);
        assert_eq!(scheduler.deadline(), None);
    }

    #[test]
    fn test_never_two_fetches_in_flight() {
        let t0 = Instant::now();
        let mut scheduler = PollScheduler::new(T, true);
        scheduler.start(t0);

        let mut outstanding = 0u32;
        let mut now = t0;
        // deterministic mix of ticks, forces and completions
        for step in 0..300u32 {
            now += Duration::from_millis(700);
            let started = match step % 7 {
                0 | 3 => scheduler.on_timer(now) == TickOutcome::Fetch,
                1 | 5 => scheduler.force(now) == ForceOutcome::Fetch,
                _ if outstanding > 0 => {
                    outstanding -= 1;
                    scheduler.complete(now, step % 2 == 0) == NextStep::Fetch
                }
                _ => false,
            };
            if started {
                outstanding += 1;
            }
            assert!(outstanding <= 1, "two fetches in flight at step {}", step);
            assert_eq!(scheduler.is_in_flight(), outstanding == 1);
        }
    }
}
