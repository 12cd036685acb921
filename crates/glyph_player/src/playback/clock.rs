use std::time::{Duration, Instant};

/// Presentation time of one track measured against the wall clock.
///
/// Elapsed time is kept as the total of finished running segments plus the
/// current one, so pausing freezes it and resuming continues from the same
/// value without moving an `Instant` backwards.
#[derive(Clone, Copy, Debug)]
pub struct PlaybackClock {
    total: Duration,
    accumulated: Duration,
    segment_start: Instant,
    paused: bool,
}

impl PlaybackClock {
    pub fn start(total: Duration, now: Instant) -> Self {
        Self { total, accumulated: Duration::ZERO, segment_start: now, paused: false }
    }

    /// Total duration derived from container metadata.
    pub fn from_frames(frame_count: u64, frame_rate: f64, now: Instant) -> Option<Self> {
        if !frame_rate.is_finite() || frame_rate <= 0.0 {
            return None;
        }

        let seconds = frame_count as f64 / frame_rate;
        let total = Duration::try_from_secs_f64(seconds).ok()?;
        Some(Self::start(total, now))
    }

    pub fn total(&self) -> Duration {
        self.total
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn elapsed(&self, now: Instant) -> Duration {
        if self.paused {
            return self.accumulated;
        }

        self.accumulated + now.saturating_duration_since(self.segment_start)
    }

    pub fn pause(&mut self, now: Instant) {
        if self.paused {
            return;
        }

        self.accumulated = self.elapsed(now);
        self.paused = true;
    }

    pub fn resume(&mut self, now: Instant) {
        if !self.paused {
            return;
        }

        self.segment_start = now;
        self.paused = false;
    }

    pub fn is_finished(&self, now: Instant) -> bool {
        !self.paused && self.elapsed(now) >= self.total
    }

    pub fn progress_fraction(&self, now: Instant) -> f64 {
        if self.total.is_zero() {
            return 1.0;
        }

        (self.elapsed(now).as_secs_f64() / self.total.as_secs_f64()).min(1.0)
    }
}

/// Caps the tick rate to a fixed number of ticks per second.
#[derive(Clone, Copy, Debug)]
pub struct FramePacer {
    interval: Duration,
    last_tick: Option<Instant>,
}

impl FramePacer {
    pub fn new(interval: Duration) -> Self {
        Self { interval, last_tick: None }
    }

    pub fn from_rate(rate: f64) -> Option<Self> {
        if !rate.is_finite() || rate <= 0.0 {
            return None;
        }

        Duration::try_from_secs_f64(rate.recip()).ok().map(Self::new)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn set_interval(&mut self, interval: Duration) {
        self.interval = interval;
    }

    /// Time left before the next tick may run.
    pub fn remaining(&self, now: Instant) -> Duration {
        match self.last_tick {
            Some(last) => self.interval.saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    /// Records a tick if one is due, returning whether it was.
    pub fn try_tick(&mut self, now: Instant) -> bool {
        if !self.remaining(now).is_zero() {
            return false;
        }

        self.last_tick = Some(now);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MS: Duration = Duration::from_millis(1);

    #[test]
    fn elapsed_tracks_wall_clock() {
        let base = Instant::now();
        let clock = PlaybackClock::start(Duration::from_secs(2), base);
        assert_eq!(clock.elapsed(base), Duration::ZERO);
        assert_eq!(clock.elapsed(base + 500 * MS), 500 * MS);
        assert!(!clock.is_finished(base + 1999 * MS));
        assert!(clock.is_finished(base + 2000 * MS));
    }

    #[test]
    fn pause_freezes_and_resume_continues() {
        let base = Instant::now();
        let mut clock = PlaybackClock::start(Duration::from_secs(10), base);
        clock.pause(base + 300 * MS);
        assert_eq!(clock.elapsed(base + 5000 * MS), 300 * MS);

        clock.resume(base + 5000 * MS);
        assert_eq!(clock.elapsed(base + 5100 * MS), 400 * MS);
    }

    #[test]
    fn paused_clock_is_never_finished() {
        let base = Instant::now();
        let mut clock = PlaybackClock::start(Duration::from_secs(1), base);
        clock.pause(base + 2000 * MS);
        assert!(!clock.is_finished(base + 3000 * MS));
        clock.resume(base + 3000 * MS);
        assert!(clock.is_finished(base + 3000 * MS));
    }

    #[test]
    fn repeated_toggling_does_not_drift() {
        let base = Instant::now();
        let mut clock = PlaybackClock::start(Duration::from_secs(60), base);
        let mut now = base;
        for _ in 0..1000 {
            now += 10 * MS;
            clock.pause(now);
            now += 25 * MS;
            clock.resume(now);
        }
        // Only the running segments count.
        assert_eq!(clock.elapsed(now), 1000 * 10 * MS);
    }

    #[test]
    fn redundant_pause_and_resume_are_ignored() {
        let base = Instant::now();
        let mut clock = PlaybackClock::start(Duration::from_secs(5), base);
        clock.pause(base + 100 * MS);
        clock.pause(base + 900 * MS);
        assert_eq!(clock.elapsed(base + 900 * MS), 100 * MS);
        clock.resume(base + 1000 * MS);
        clock.resume(base + 1500 * MS);
        assert_eq!(clock.elapsed(base + 1500 * MS), 600 * MS);
    }

    #[test]
    fn elapsed_never_precedes_start() {
        let base = Instant::now() + Duration::from_secs(1);
        let clock = PlaybackClock::start(Duration::from_secs(5), base);
        assert_eq!(clock.elapsed(base - 500 * MS), Duration::ZERO);
    }

    #[test]
    fn progress_is_clamped() {
        let base = Instant::now();
        let clock = PlaybackClock::from_frames(100, 25.0, base).unwrap();
        assert_eq!(clock.total(), Duration::from_secs(4));
        assert_eq!(clock.progress_fraction(base + 1000 * MS), 0.25);
        assert_eq!(clock.progress_fraction(base + 9000 * MS), 1.0);
        assert_eq!(PlaybackClock::start(Duration::ZERO, base).progress_fraction(base), 1.0);
    }

    #[test]
    fn invalid_rates_are_rejected() {
        let base = Instant::now();
        assert!(PlaybackClock::from_frames(10, 0.0, base).is_none());
        assert!(PlaybackClock::from_frames(10, f64::NAN, base).is_none());
        assert!(FramePacer::from_rate(-1.0).is_none());
    }

    #[test]
    fn pacer_caps_tick_rate() {
        let base = Instant::now();
        let mut pacer = FramePacer::new(40 * MS);
        assert!(pacer.try_tick(base));
        assert!(!pacer.try_tick(base + 39 * MS));
        assert_eq!(pacer.remaining(base + 10 * MS), 30 * MS);
        assert!(pacer.try_tick(base + 40 * MS));
    }
}
