//! Clock capability
//!
//! "Today" is always derived through this module rather than read from
//! global time inside the engines, so tests can supply deterministic dates.
//! `start_of_day` truncates to local midnight (hours/minutes/seconds/millis
//! all zero), matching how check-in dates are stored and compared.

use bson::DateTime as BsonDateTime;
use chrono::{DateTime, Local, LocalResult, NaiveTime, TimeZone, Utc};

/// Source of the current wall-clock time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
}

/// Production clock backed by the system time
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }
}

/// Truncate a moment to the start of its local calendar day
pub fn start_of_day(moment: DateTime<Local>) -> BsonDateTime {
    let midnight = moment.date_naive().and_time(NaiveTime::MIN);
    let local = match midnight.and_local_timezone(Local) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // midnight skipped by a DST jump; anchor on the naive instant
        LocalResult::None => Local.from_utc_datetime(&midnight),
    };
    BsonDateTime::from_chrono(local.with_timezone(&Utc))
}

/// Start of the current local calendar day
pub fn today(clock: &dyn Clock) -> BsonDateTime {
    start_of_day(clock.now())
}

#[cfg(test)]
pub mod fixed {
    use super::*;

    /// Test clock pinned to one instant
    pub struct FixedClock(pub DateTime<Local>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Local> {
            self.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fixed::FixedClock;
    use super::*;
    use chrono::Duration;

    fn local(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> DateTime<Local> {
        Local
            .with_ymd_and_hms(y, mo, d, h, mi, s)
            .single()
            .expect("test instant is unambiguous")
    }

    #[test]
    fn test_start_of_day_truncates_time() {
        let afternoon = local(2025, 3, 14, 15, 9, 26);
        let start = start_of_day(afternoon).to_chrono().with_timezone(&Local);

        assert_eq!(start.date_naive(), afternoon.date_naive());
        assert_eq!(start.time(), NaiveTime::MIN);
    }

    #[test]
    fn test_same_day_instants_share_start() {
        let morning = local(2025, 3, 14, 0, 0, 1);
        let night = local(2025, 3, 14, 23, 59, 59);
        assert_eq!(start_of_day(morning), start_of_day(night));
    }

    #[test]
    fn test_different_days_differ() {
        let today = local(2025, 3, 14, 12, 0, 0);
        let tomorrow = today + Duration::days(1);
        assert_ne!(start_of_day(today), start_of_day(tomorrow));
    }

    #[test]
    fn test_fixed_clock_drives_today() {
        let pinned = local(2024, 12, 31, 18, 45, 0);
        let clock = FixedClock(pinned);
        assert_eq!(today(&clock), start_of_day(pinned));
    }
}
