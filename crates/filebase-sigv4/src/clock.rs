//! Time source for signing.
//!
//! Every signature embeds the instant it was produced at. Signers read that
//! instant from a [`Clock`] instead of the system time directly.

use std::fmt;

use chrono::{DateTime, Utc};

/// A source of the current UTC instant.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Return the current instant.
    fn now(&self) -> DateTime<Utc>;
}

/// The system wall clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
///
/// # Examples
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use filebase_sigv4::{Clock, FixedClock};
///
/// let instant = Utc.with_ymd_and_hms(2013, 5, 24, 0, 0, 0).unwrap();
/// assert_eq!(FixedClock::new(instant).now(), instant);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FixedClock(DateTime<Utc>);

impl FixedClock {
    /// Freeze the clock at `instant`.
    #[must_use]
    pub fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
