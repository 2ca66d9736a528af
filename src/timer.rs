use std::{
    thread,
    time::{Duration, Instant},
};

/// Monotonic stopwatch used for the FPS readouts and load-time measurement.
///
/// Backed by [Instant], so elapsed time is unaffected by wall-clock changes.
/// `pause`/`unpause` are no-ops when the timer is not in a state where they
/// apply.
#[derive(Clone, Debug, Default)]
pub struct Timer {
    started_at: Option<Instant>,
    paused_elapsed: Duration,
    started: bool,
    paused: bool,
}

impl Timer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reset to zero and begin counting.
    pub fn start(&mut self) {
        self.started = true;
        self.paused = false;
        self.started_at = Some(Instant::now());
        self.paused_elapsed = Duration::ZERO;
    }

    /// Reset to zero, unstarted.
    pub fn stop(&mut self) {
        self.started = false;
        self.paused = false;
        self.started_at = None;
        self.paused_elapsed = Duration::ZERO;
    }

    /// Freeze elapsed-time accumulation at the current value.
    pub fn pause(&mut self) {
        if self.started && !self.paused {
            self.paused = true;
            self.paused_elapsed = self
                .started_at
                .map(|at| at.elapsed())
                .unwrap_or(Duration::ZERO);
            self.started_at = None;
        }
    }

    /// Resume counting from the value frozen by [Timer::pause].
    pub fn unpause(&mut self) {
        if self.started && self.paused {
            self.paused = false;
            // Rebase the start instant so elapsed() continues seamlessly.
            self.started_at = Some(Instant::now() - self.paused_elapsed);
            self.paused_elapsed = Duration::ZERO;
        }
    }

    pub fn elapsed(&self) -> Duration {
        if !self.started {
            Duration::ZERO
        } else if self.paused {
            self.paused_elapsed
        } else {
            self.started_at
                .map(|at| at.elapsed())
                .unwrap_or(Duration::ZERO)
        }
    }

    pub fn seconds(&self) -> f64 {
        self.elapsed().as_secs_f64()
    }

    pub fn milliseconds(&self) -> f64 {
        self.seconds() * 1000.0
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn is_paused(&self) -> bool {
        self.started && self.paused
    }
}

/// Fixed-rate frame cap: sleeps out the remainder of each frame budget and
/// tracks the actual frame time for the current-frame FPS readout.
#[derive(Clone, Debug)]
pub struct FrameLimiter {
    target_fps: u32,
    last_time: Instant,
    frame_time: f64,
}

impl FrameLimiter {
    /// `target_fps == 0` disables the cap; frame times are still tracked.
    pub fn new(target_fps: u32) -> Self {
        Self {
            target_fps,
            last_time: Instant::now(),
            frame_time: 0.0,
        }
    }

    pub fn set_target_fps(&mut self, fps: u32) {
        self.target_fps = fps;
    }

    pub fn target_fps(&self) -> u32 {
        self.target_fps
    }

    /// Seconds the previous frame actually took, sleep included.
    pub fn frame_time(&self) -> f64 {
        self.frame_time
    }

    /// Call once per frame after presenting: sleeps until the frame budget
    /// is used up, then samples the frame time.
    pub fn wait(&mut self) {
        if self.target_fps > 0 {
            let budget = 1.0 / self.target_fps as f64;
            let spent = self.last_time.elapsed().as_secs_f64();
            if spent < budget {
                thread::sleep(Duration::from_secs_f64(budget - spent));
            }
        }

        self.frame_time = self.last_time.elapsed().as_secs_f64();
        self.last_time = Instant::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unstarted_reads_zero() {
        let timer = Timer::new();
        assert!(!timer.is_started());
        assert!(!timer.is_paused());
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn elapsed_is_monotonic_and_non_negative() {
        let mut timer = Timer::new();
        timer.start();
        let first = timer.elapsed();
        thread::sleep(Duration::from_millis(10));
        let second = timer.elapsed();
        assert!(second >= first);
        assert!(second >= Duration::from_millis(10));
    }

    #[test]
    fn pause_freezes_and_unpause_resumes_from_paused_value() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(10));
        timer.pause();

        let at_pause = timer.elapsed();
        thread::sleep(Duration::from_millis(20));
        assert_eq!(timer.elapsed(), at_pause);

        timer.unpause();
        let after_unpause = timer.elapsed();
        assert!(after_unpause >= at_pause);
        // Resumed near the paused value, not near the wall time spent paused.
        assert!(after_unpause < at_pause + Duration::from_millis(15));
    }

    #[test]
    fn stop_resets() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(5));
        timer.stop();
        assert!(!timer.is_started());
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn pause_without_start_is_a_no_op() {
        let mut timer = Timer::new();
        timer.pause();
        assert!(!timer.is_paused());
        timer.unpause();
        assert_eq!(timer.elapsed(), Duration::ZERO);
    }

    #[test]
    fn double_pause_keeps_first_frozen_value() {
        let mut timer = Timer::new();
        timer.start();
        thread::sleep(Duration::from_millis(5));
        timer.pause();
        let frozen = timer.elapsed();
        timer.pause();
        assert_eq!(timer.elapsed(), frozen);
    }

    #[test]
    fn limiter_enforces_budget() {
        let mut limiter = FrameLimiter::new(100);
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() >= Duration::from_millis(9));
        assert!(limiter.frame_time() > 0.0);
    }

    #[test]
    fn limiter_uncapped_does_not_sleep_long() {
        let mut limiter = FrameLimiter::new(0);
        let start = Instant::now();
        limiter.wait();
        assert!(start.elapsed() < Duration::from_millis(5));
    }
}
