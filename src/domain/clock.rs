/// Clock abstraction for deciding "today"
///
/// All dates are UTC calendar dates. The progression rules take the date as
/// a parameter; only the server asks a clock for it.

use chrono::{NaiveDate, Utc};

pub trait Clock: Send + Sync {
    /// The current UTC calendar date
    fn today(&self) -> NaiveDate;
}

/// Reads the system clock
#[derive(Debug, Default, Clone, Copy)]
pub struct UtcClock;

impl Clock for UtcClock {
    fn today(&self) -> NaiveDate {
        Utc::now().date_naive()
    }
}

/// Always returns the same date
#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}
