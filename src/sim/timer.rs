//! Pausable one-shot countdown timers
//!
//! Every time-limited effect in the simulation (buffs, spawn periods, drop
//! lifetimes, the level countdown) is one of these, polled once per frame
//! against the level's logical clock. There is no wall-clock access anywhere:
//! `now` is always the level clock in milliseconds, so identical tick
//! sequences replay identically.

/// A one-shot countdown with optional pause.
///
/// Invariants (violations are programmer errors and assert):
/// - a timer is never both paused and inactive
/// - `pause` requires prior activation; `un_pause` requires a prior `pause`
///
/// Completion is reported synchronously from [`Timer::update`], which returns
/// `true` exactly once on the frame the countdown elapses; the owner
/// dispatches the completion effect at the call site.
#[derive(Debug, Clone)]
pub struct Timer {
    duration: f32,
    active: bool,
    start_time: f32,
    paused_time: Option<f32>,
}

impl Timer {
    pub fn new(duration_ms: f32) -> Self {
        Self {
            duration: duration_ms,
            active: false,
            start_time: 0.0,
            paused_time: None,
        }
    }

    /// Create and immediately start the countdown.
    pub fn started(duration_ms: f32, now: f32) -> Self {
        let mut timer = Self::new(duration_ms);
        timer.activate(now);
        timer
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.active
    }

    #[inline]
    pub fn is_paused(&self) -> bool {
        self.paused_time.is_some()
    }

    #[inline]
    pub fn duration(&self) -> f32 {
        self.duration
    }

    /// Retune the countdown length. Takes effect against the existing start
    /// timestamp, so retuning an active timer moves its deadline.
    pub fn set_duration(&mut self, duration_ms: f32) {
        self.duration = duration_ms;
    }

    /// Start the countdown from `now`.
    pub fn activate(&mut self, now: f32) {
        assert!(self.paused_time.is_none(), "activate() on a paused timer");
        self.active = true;
        self.start_time = now;
    }

    /// Stop the countdown without completing it.
    pub fn deactivate(&mut self) {
        assert!(self.paused_time.is_none(), "deactivate() on a paused timer");
        self.active = false;
        self.start_time = 0.0;
    }

    /// Suspend an active countdown.
    pub fn pause(&mut self, now: f32) {
        assert!(self.active, "pause() on an inactive timer");
        assert!(self.paused_time.is_none(), "pause() on a paused timer");
        self.paused_time = Some(now);
    }

    /// Resume a paused countdown, preserving the remaining time exactly: the
    /// deadline advances by however long the pause lasted.
    pub fn un_pause(&mut self, now: f32) {
        assert!(self.active, "un_pause() on an inactive timer");
        let paused_at = self.paused_time.take().expect("un_pause() without a pause");
        self.extend(now, now - paused_at);
    }

    /// Give the countdown more time.
    ///
    /// Active: the deadline moves out by `extension_ms`, capped at a full
    /// top-up (whichever is the smaller move). Inactive: the timer activates
    /// with only `extension_ms` remaining.
    pub fn extend(&mut self, now: f32, extension_ms: f32) {
        assert!(self.paused_time.is_none(), "extend() on a paused timer");
        if self.active {
            self.start_time += extension_ms.min(now - self.start_time);
        } else {
            self.active = true;
            self.start_time = now - self.duration + extension_ms;
        }
    }

    /// Fraction of the countdown still to run, in `[0, 1]`; 0 when inactive
    /// or overdue. While paused, measured against the pause timestamp.
    pub fn percent_remaining(&self, now: f32) -> f32 {
        if !self.active {
            return 0.0;
        }
        let current = self.paused_time.unwrap_or(now);
        (1.0 - (current - self.start_time) / self.duration).clamp(0.0, 1.0)
    }

    /// Advance the timer. Returns `true` exactly once, on the frame the
    /// countdown elapses; the timer is inactive by the time this returns.
    #[must_use = "completion must be dispatched by the owner"]
    pub fn update(&mut self, now: f32) -> bool {
        if self.active && self.paused_time.is_none() && now - self.start_time >= self.duration {
            self.deactivate();
            return true;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_activate_then_full_percent() {
        let mut timer = Timer::new(1000.0);
        timer.activate(0.0);
        assert!((timer.percent_remaining(0.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_completes_exactly_once() {
        let mut timer = Timer::started(1000.0, 0.0);
        assert!(!timer.update(999.0));
        assert!(timer.update(1000.0));
        assert!(!timer.is_active());
        assert!(!timer.update(1001.0));
        assert!(!timer.update(2000.0));
    }

    #[test]
    fn test_percent_clamps_at_zero_when_overdue() {
        let timer = {
            let mut t = Timer::new(100.0);
            t.activate(0.0);
            t
        };
        // Not yet updated this frame, but past the deadline
        assert_eq!(timer.percent_remaining(250.0), 0.0);
    }

    #[test]
    fn test_pause_resume_preserves_remaining() {
        let mut timer = Timer::started(1000.0, 0.0);
        timer.pause(400.0);
        // Arbitrary time passes while paused
        assert!(!timer.update(5000.0));
        assert!((timer.percent_remaining(5000.0) - 0.6).abs() < 1e-6);
        timer.un_pause(5000.0);
        // 600 ms left: not done at 5599, done at 5600
        assert!(!timer.update(5599.0));
        assert!(timer.update(5600.0));
    }

    #[test]
    fn test_extend_active_tops_up_or_advances() {
        // 300 elapsed of 1000: a 200 extension advances the deadline by 200
        let mut timer = Timer::started(1000.0, 0.0);
        timer.extend(300.0, 200.0);
        assert!(!timer.update(1199.0));
        assert!(timer.update(1200.0));

        // 300 elapsed of 1000: a 900 extension only tops back up to full
        let mut timer = Timer::started(1000.0, 0.0);
        timer.extend(300.0, 900.0);
        assert!((timer.percent_remaining(300.0) - 1.0).abs() < 1e-6);
        assert!(timer.update(1300.0));
    }

    #[test]
    fn test_extend_inactive_activates_with_extension_only() {
        let mut timer = Timer::new(1000.0);
        timer.extend(500.0, 250.0);
        assert!(timer.is_active());
        assert!((timer.percent_remaining(500.0) - 0.25).abs() < 1e-6);
        assert!(timer.update(750.0));
    }

    #[test]
    #[should_panic]
    fn test_pause_requires_active() {
        let mut timer = Timer::new(100.0);
        timer.pause(0.0);
    }

    #[test]
    #[should_panic]
    fn test_activate_while_paused_panics() {
        let mut timer = Timer::started(100.0, 0.0);
        timer.pause(50.0);
        timer.activate(60.0);
    }

    #[test]
    #[should_panic]
    fn test_un_pause_requires_pause() {
        let mut timer = Timer::started(100.0, 0.0);
        timer.un_pause(50.0);
    }

    proptest! {
        /// Pausing after p ms and resuming after an arbitrary wall time
        /// always leaves exactly duration - p ms of countdown.
        #[test]
        fn prop_pause_roundtrip_is_exact(
            duration in 10.0f32..60_000.0,
            elapsed_frac in 0.0f32..0.99,
            pause_len in 0.0f32..1_000_000.0,
        ) {
            let p = duration * elapsed_frac;
            let mut timer = Timer::started(duration, 0.0);
            timer.pause(p);
            timer.un_pause(p + pause_len);

            let resume = p + pause_len;
            let remaining = duration - p;
            // Just before the new deadline: still running
            prop_assert!(!timer.update(resume + remaining - 0.5));
            // At/after the new deadline: completes
            prop_assert!(timer.update(resume + remaining + 0.5));
        }
    }
}
