//! # Global runtime configuration.
//!
//! Provides [`Config`] centralized settings for the bot runtime, and
//! [`ThrottlePolicy`] the error-rate thresholds applied to failing listeners.
//!
//! Config is used in two ways:
//! 1. **Application assembly**: `BotApp::with_config(config)`
//! 2. **Actor construction**: each bot execution reads `queue_capacity`
//!    and `throttle`; the scheduler reads `tick`.
//!
//! ## Sentinel values
//! - `queue_capacity = 0` → clamped to 32 (a bounded channel needs room)
//! - `tick = 0s` → clamped to the 1s default
//! - `grace = 0s` → clamped to the 30s default

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Global configuration for the bot runtime.
///
/// Defines:
/// - **Event delivery**: per-bot payload queue depth
/// - **Scheduling**: periodic-task tick interval
/// - **Failure handling**: listener throttle thresholds
///
/// ## Field semantics
/// - `queue_capacity`: bound of the listener→pump payload channel (min 1)
/// - `tick`: scheduler wake-up interval; due-checks happen once per tick
/// - `throttle`: see [`ThrottlePolicy`]
///
/// All fields are public. Prefer the clamping accessors over reading the raw
/// fields where sentinel values are possible. Serde-enabled so deployments
/// can keep it in a config file; missing fields fall back to defaults.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Capacity of each bot's payload channel.
    ///
    /// A listener that outruns its handler by more than this many payloads
    /// suspends on `send` until the pump catches up (natural backpressure,
    /// payload order preserved).
    pub queue_capacity: usize,

    /// Scheduler tick interval.
    ///
    /// Tasks become due with tick granularity; a shorter tick trades CPU
    /// wake-ups for punctuality.
    pub tick: Duration,

    /// Maximum time to wait for bots to wind down on shutdown before
    /// aborting them.
    pub grace: Duration,

    /// Error-rate thresholds for failing listeners.
    pub throttle: ThrottlePolicy,
}

impl Config {
    /// Queue depth used when `queue_capacity` is left at 0.
    pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

    /// Tick used when `tick` is left at zero.
    pub const DEFAULT_TICK: Duration = Duration::from_secs(1);

    /// Shutdown grace used when `grace` is left at zero.
    pub const DEFAULT_GRACE: Duration = Duration::from_secs(30);

    /// Returns the payload-queue capacity clamped to a minimum of 1.
    #[inline]
    pub fn queue_capacity_clamped(&self) -> usize {
        if self.queue_capacity == 0 {
            Config::DEFAULT_QUEUE_CAPACITY
        } else {
            self.queue_capacity
        }
    }

    /// Returns the scheduler tick, defaulted when left at zero.
    #[inline]
    pub fn tick_clamped(&self) -> Duration {
        if self.tick.is_zero() {
            Config::DEFAULT_TICK
        } else {
            self.tick
        }
    }

    /// Returns the shutdown grace, defaulted when left at zero.
    #[inline]
    pub fn grace_clamped(&self) -> Duration {
        if self.grace.is_zero() {
            Config::DEFAULT_GRACE
        } else {
            self.grace
        }
    }
}

/// Error-rate thresholds for a bot whose listener keeps failing.
///
/// One [`ErrorRateMonitor`](crate::runtime::ErrorRateMonitor) is created per
/// execution attempt; the pump consults this policy after every listener
/// failure:
///
/// 1. Failure within `startup_grace` of the attempt start → the bot never
///    worked; exit it instead of retrying.
/// 2. More than `max_rate` failures inside one `cooldown` window → pause the
///    bot for `pause`, then resume with the counter wound back to
///    `resume_count` (repeat offenders re-trip the threshold quickly).
/// 3. Otherwise → start a fresh listener immediately.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ThrottlePolicy {
    /// A quiet gap longer than this resets the error counter.
    pub cooldown: Duration,

    /// Failures earlier than this after attempt start are treated as fatal.
    pub startup_grace: Duration,

    /// Failures per cooldown window tolerated before pausing.
    pub max_rate: u32,

    /// How long a tripped bot sleeps before resuming.
    pub pause: Duration,

    /// Counter value after a pause (not zero: repeat offenders trip sooner).
    pub resume_count: u32,
}

impl Default for ThrottlePolicy {
    /// Default thresholds:
    ///
    /// - `cooldown = 60s`
    /// - `startup_grace = 3s`
    /// - `max_rate = 5`
    /// - `pause = 30s`
    /// - `resume_count = 3`
    fn default() -> Self {
        Self {
            cooldown: Duration::from_secs(60),
            startup_grace: Duration::from_secs(3),
            max_rate: 5,
            pause: Duration::from_secs(30),
            resume_count: 3,
        }
    }
}
