use chrono::{DateTime, Datelike, Duration, NaiveTime, TimeZone, Weekday};

/// This is the standard way of converting a date to a string in worktick. Matches the `date`
/// column of the session table.
pub fn date_string(date: chrono::NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Formats a running timer as zero-padded "HH:MM:SS".
pub fn format_clock(seconds: i64) -> String {
    let seconds = seconds.max(0);
    format!(
        "{:02}:{:02}:{:02}",
        seconds / 3600,
        (seconds % 3600) / 60,
        seconds % 60
    )
}

/// Formats an elapsed duration as "3h 20m", "3h" or "20m". Used for day totals and for reminder
/// titles, where second precision would only be noise.
pub fn format_elapsed(seconds: i64) -> String {
    let seconds = seconds.max(0);
    let hours = seconds / 3600;
    let minutes = (seconds % 3600) / 60;
    if hours > 0 && minutes > 0 {
        format!("{hours}h {minutes}m")
    } else if hours > 0 {
        format!("{hours}h")
    } else {
        format!("{minutes}m")
    }
}

/// First strictly future moment matching `weekday` at `hour`:`minute` in the timezone of `now`.
/// Returns None for an out-of-range hour/minute.
pub fn next_weekly_occurrence<Tz: TimeZone>(
    now: DateTime<Tz>,
    weekday: Weekday,
    hour: u32,
    minute: u32,
) -> Option<DateTime<Tz>> {
    let time = NaiveTime::from_hms_opt(hour, minute, 0)?;
    let days_ahead =
        (7 + weekday.num_days_from_monday() - now.weekday().num_days_from_monday()) % 7;
    let date = now.date_naive() + Duration::days(days_ahead as i64);
    let candidate = now
        .timezone()
        .from_local_datetime(&date.and_time(time))
        .earliest()?;
    if candidate > now {
        Some(candidate)
    } else {
        Some(candidate + Duration::weeks(1))
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Weekday};

    use super::{date_string, format_clock, format_elapsed, next_weekly_occurrence};

    #[test]
    fn date_string_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        assert_eq!(date_string(date), "2024-04-05");
    }

    #[test]
    fn format_clock_pads_every_field() {
        assert_eq!(format_clock(0), "00:00:00");
        assert_eq!(format_clock(61), "00:01:01");
        assert_eq!(format_clock(3661), "01:01:01");
        assert_eq!(format_clock(10 * 3600 + 59 * 60 + 59), "10:59:59");
    }

    #[test]
    fn format_elapsed_bands() {
        assert_eq!(format_elapsed(0), "0m");
        assert_eq!(format_elapsed(59), "0m");
        assert_eq!(format_elapsed(45 * 60), "45m");
        assert_eq!(format_elapsed(3 * 3600), "3h");
        assert_eq!(format_elapsed(3 * 3600 + 20 * 60), "3h 20m");
    }

    fn kst() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn weekly_occurrence_later_today() {
        // 2024-04-05 is a Friday.
        let now = kst().with_ymd_and_hms(2024, 4, 5, 8, 30, 0).unwrap();
        let next = next_weekly_occurrence(now, Weekday::Fri, 9, 0).unwrap();
        assert_eq!(next, kst().with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_occurrence_exact_minute_rolls_a_week() {
        let now = kst().with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();
        let next = next_weekly_occurrence(now, Weekday::Fri, 9, 0).unwrap();
        assert_eq!(next, kst().with_ymd_and_hms(2024, 4, 12, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_occurrence_crosses_into_next_week() {
        let now = kst().with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap();
        let next = next_weekly_occurrence(now, Weekday::Mon, 9, 0).unwrap();
        assert_eq!(next, kst().with_ymd_and_hms(2024, 4, 8, 9, 0, 0).unwrap());
    }

    #[test]
    fn weekly_occurrence_rejects_invalid_time() {
        let now = kst().with_ymd_and_hms(2024, 4, 5, 10, 0, 0).unwrap();
        assert!(next_weekly_occurrence(now, Weekday::Mon, 24, 0).is_none());
    }
}
