//! Calendar-day arithmetic for retention cutoffs
//!
//! Day offsets are counted in calendar days, never in 24-hour spans, so a
//! cutoff stays on a local midnight when the range crosses a DST change.
//! Results outside chrono's representable range come back as `None`.

use chrono::{DateTime, Days, Duration, LocalResult, NaiveDate, NaiveTime, Offset, TimeZone};

/// First instant of `date` in `tz`
///
/// An ambiguous midnight (clock moved back) resolves to the earliest instant.
/// A skipped midnight (clock moved forward) resolves to the end of the gap.
pub fn midnight_on<Tz: TimeZone>(tz: &Tz, date: NaiveDate) -> Option<DateTime<Tz>> {
    let midnight = date.and_time(NaiveTime::MIN);

    match tz.from_local_datetime(&midnight) {
        LocalResult::Single(dt) => Some(dt),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            // The offset in force the day before places midnight at the gap's end
            let offset_before = midnight
                .checked_sub_signed(Duration::days(1))
                .and_then(|day_before| tz.offset_from_local_datetime(&day_before).earliest())
                .map(|offset| offset.fix().local_minus_utc())
                .unwrap_or(0);
            let utc = midnight.checked_sub_signed(Duration::seconds(i64::from(offset_before)))?;
            Some(tz.from_utc_datetime(&utc))
        }
    }
}

/// Midnight at the start of `now`'s calendar day, in `now`'s time zone
pub fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
    midnight_on(&now.timezone(), now.date_naive())
}

/// Midnight `days` calendar days before `now`'s day
pub fn days_before_start_of_day<Tz: TimeZone>(
    now: &DateTime<Tz>,
    days: u32,
) -> Option<DateTime<Tz>> {
    let date = now.date_naive().checked_sub_days(Days::new(u64::from(days)))?;
    midnight_on(&now.timezone(), date)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, NaiveDateTime, Utc};

    /// UTC+0 until 2024-03-10 00:00 UTC, UTC+1 afterwards
    ///
    /// Local clocks jump from 23:59:59 on the 9th to 01:00 on the 10th, so
    /// midnight of 2024-03-10 does not exist.
    #[derive(Debug, Clone, Copy)]
    struct SpringForward;

    fn switch_utc() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 10)
            .unwrap()
            .and_time(NaiveTime::MIN)
    }

    fn hours(h: i32) -> FixedOffset {
        FixedOffset::east_opt(h * 3600).unwrap()
    }

    impl TimeZone for SpringForward {
        type Offset = FixedOffset;

        fn from_offset(_offset: &FixedOffset) -> Self {
            SpringForward
        }

        fn offset_from_local_date(&self, local: &NaiveDate) -> LocalResult<FixedOffset> {
            self.offset_from_local_datetime(&local.and_time(NaiveTime::MIN))
        }

        fn offset_from_local_datetime(&self, local: &NaiveDateTime) -> LocalResult<FixedOffset> {
            let switch = switch_utc();
            if *local < switch {
                LocalResult::Single(hours(0))
            } else if *local < switch + Duration::hours(1) {
                LocalResult::None
            } else {
                LocalResult::Single(hours(1))
            }
        }

        fn offset_from_utc_date(&self, utc: &NaiveDate) -> FixedOffset {
            self.offset_from_utc_datetime(&utc.and_time(NaiveTime::MIN))
        }

        fn offset_from_utc_datetime(&self, utc: &NaiveDateTime) -> FixedOffset {
            if *utc < switch_utc() {
                hours(0)
            } else {
                hours(1)
            }
        }
    }

    #[test]
    fn test_start_of_day_utc() {
        let t = Utc.with_ymd_and_hms(2024, 3, 15, 17, 42, 9).unwrap();
        let start = start_of_day(&t).unwrap();
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_start_of_day_keeps_zone() {
        let tz = FixedOffset::west_opt(5 * 3600).unwrap();
        // 01:30 local on the 15th is 06:30 UTC
        let t = tz.with_ymd_and_hms(2024, 3, 15, 1, 30, 0).unwrap();
        let start = start_of_day(&t).unwrap();

        assert_eq!(start, tz.with_ymd_and_hms(2024, 3, 15, 0, 0, 0).unwrap());
        assert_eq!(start.naive_utc().to_string(), "2024-03-15 05:00:00");
    }

    #[test]
    fn test_start_of_day_at_midnight_is_identity() {
        let t = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(start_of_day(&t), Some(t));
    }

    #[test]
    fn test_days_before_start_of_day() {
        let t = Utc.with_ymd_and_hms(2024, 3, 31, 23, 59, 59).unwrap();
        let cutoff = days_before_start_of_day(&t, 30).unwrap();
        assert_eq!(cutoff, Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap());
    }

    #[test]
    fn test_days_before_start_of_day_zero() {
        let t = Utc.with_ymd_and_hms(2024, 3, 31, 12, 0, 0).unwrap();
        assert_eq!(days_before_start_of_day(&t, 0), start_of_day(&t));
    }

    #[test]
    fn test_days_before_out_of_range_is_none() {
        let t = Utc.with_ymd_and_hms(2024, 6, 15, 12, 0, 0).unwrap();
        assert_eq!(days_before_start_of_day(&t, 100_000_000), None);
        assert_eq!(days_before_start_of_day(&t, u32::MAX), None);
    }

    #[test]
    fn test_days_before_across_dst_change_lands_on_midnight() {
        // 2024-03-20 12:00 local is after the switch (UTC+1); 30 days back is before it
        let now = SpringForward.with_ymd_and_hms(2024, 3, 20, 12, 0, 0).unwrap();
        let cutoff = days_before_start_of_day(&now, 30).unwrap();

        assert_eq!(cutoff.naive_local().to_string(), "2024-02-19 00:00:00");
        assert_eq!(cutoff.naive_utc().to_string(), "2024-02-19 00:00:00");
    }

    #[test]
    fn test_skipped_midnight_resolves_to_end_of_gap() {
        let now = SpringForward.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let start = start_of_day(&now).unwrap();

        assert_eq!(start.naive_utc(), switch_utc());
        assert_eq!(start.naive_local().to_string(), "2024-03-10 01:00:00");
    }
}
