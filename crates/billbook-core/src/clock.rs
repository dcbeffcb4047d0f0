//! # Clock
//!
//! The one source of "now" for everything that depends on the date.
//!
//! Payment status, numbering and backup timestamps all take a `now` value.
//! Services hold a [`Clock`] so tests can pin time with [`FixedClock`].

use chrono::{DateTime, Utc};

/// Supplies the current instant.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock frozen at a single instant.
///
/// ## Example
/// ```rust
/// use billbook_core::clock::{Clock, FixedClock};
/// use chrono::{TimeZone, Utc};
///
/// let t = Utc.with_ymd_and_hms(2025, 1, 15, 9, 0, 0).unwrap();
/// assert_eq!(FixedClock(t).now(), t);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub DateTime<Utc>);

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.0
    }
}
