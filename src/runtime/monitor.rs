use std::time::Duration;

use tokio::time::Instant;

/// Rolling failure counter for one execution attempt of a bot.
///
/// Created fresh each time a bot is (re)started; counts errors that
/// land within `cooldown` of each other and forgets the streak once a
/// quiet gap longer than the cooldown passes. The pump uses the count
/// to decide between an instant listener restart and a throttle pause,
/// and [`ErrorRateMonitor::since_start`] to tell startup crashes from
/// mid-flight ones.
#[derive(Debug)]
pub struct ErrorRateMonitor {
    started_at: Instant,
    cooldown: Duration,
    error_count: u32,
    last_error: Option<Instant>,
}

impl ErrorRateMonitor {
    pub fn new(cooldown: Duration) -> Self {
        Self {
            started_at: Instant::now(),
            cooldown,
            error_count: 0,
            last_error: None,
        }
    }

    /// Records one error and returns the size of the current streak.
    ///
    /// A gap longer than the cooldown since the previous error starts
    /// a new streak at 1.
    pub fn evoke(&mut self) -> u32 {
        let now = Instant::now();
        self.error_count += 1;
        match self.last_error {
            Some(prev) if now.duration_since(prev) <= self.cooldown => {}
            _ => self.error_count = 1,
        }
        self.last_error = Some(now);
        self.error_count
    }

    /// Age of this execution attempt.
    pub fn since_start(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Current streak size without recording anything.
    #[inline]
    pub fn count(&self) -> u32 {
        self.error_count
    }

    /// Seeds the streak counter, used when resuming after a pause.
    pub fn set_count(&mut self, count: u32) {
        self.error_count = count;
    }
}
