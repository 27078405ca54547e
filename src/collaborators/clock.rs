use chrono::{DateTime, Local, NaiveDate, NaiveTime, Utc};

/// Source of wall-clock time, replaceable in tests.
pub trait Clock: Send + Sync {
    fn now_utc(&self) -> DateTime<Utc>;

    /// Local wall-clock time used for working hours.
    fn local_time(&self) -> NaiveTime;

    /// Local calendar day used for the daily counter.
    fn local_date(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_utc(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_time(&self) -> NaiveTime {
        Local::now().time()
    }

    fn local_date(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
