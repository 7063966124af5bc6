use std::sync::Arc;
use std::time::Duration;

use crate::error::BuildError;

/// Shared reference to a trigger.
pub type TriggerRef = Arc<dyn Trigger>;

/// Describes when a scheduled task should fire.
///
/// The built-in [`TickScheduler`](super::TickScheduler) only
/// understands periodic triggers; other trigger families can exist for
/// custom [`Scheduler`](super::Scheduler) implementations.
pub trait Trigger: Send + Sync + 'static {
    /// Trigger family label used in errors and logs.
    fn kind(&self) -> &'static str;

    /// Fixed repeat interval, if this trigger is periodic.
    fn as_period(&self) -> Option<Duration> {
        None
    }
}

/// Fires once every fixed interval.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodTrigger {
    period: Duration,
}

impl PeriodTrigger {
    pub fn new(period: Duration) -> Self {
        Self { period }
    }

    pub fn secs(secs: u64) -> Self {
        Self::new(Duration::from_secs(secs))
    }

    pub fn minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes * 60))
    }

    pub fn hours(hours: u64) -> Self {
        Self::new(Duration::from_secs(hours * 3600))
    }

    /// Builds a period from a mixed time expression.
    ///
    /// Rejects negative, NaN and overflowing values.
    ///
    /// ```rust
    /// use botvisor::PeriodTrigger;
    ///
    /// let every_90_minutes = PeriodTrigger::of(1.0, 30.0, 0.0).unwrap();
    /// assert_eq!(every_90_minutes, PeriodTrigger::minutes(90));
    /// assert!(PeriodTrigger::of(0.0, 0.0, -1.0).is_err());
    /// ```
    pub fn of(hours: f64, minutes: f64, seconds: f64) -> Result<Self, BuildError> {
        let total = hours * 3600.0 + minutes * 60.0 + seconds;
        let period = Duration::try_from_secs_f64(total).map_err(|e| BuildError::InvalidTrigger {
            message: format!("bad period ({hours}h {minutes}m {seconds}s): {e}"),
        })?;
        Ok(Self::new(period))
    }

    #[inline]
    pub fn period(&self) -> Duration {
        self.period
    }
}

impl Trigger for PeriodTrigger {
    fn kind(&self) -> &'static str {
        "period"
    }

    fn as_period(&self) -> Option<Duration> {
        Some(self.period)
    }
}
