//! Contains the reminder side of the tracker: durable reminder settings, the pure planning of
//! which notifications should exist, and the [scheduler::ReminderScheduler] that reconciles the
//! platform's scheduled set against that plan.

pub mod config;
pub mod plan;
pub mod scheduler;

use chrono::Weekday;

/// Minute values the in-session reminder interval may take, 10 minutes up to 20 hours.
pub const INTERVAL_OPTIONS: [u32; 14] = [
    10, 15, 20, 30, 45, 60, 90, 120, 180, 240, 360, 480, 720, 1200,
];

pub fn is_valid_interval(minutes: u32) -> bool {
    INTERVAL_OPTIONS.contains(&minutes)
}

/// Weekly "time to start working" notification settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReminderSettings {
    pub enabled: bool,
    pub hour: u32,
    pub minute: u32,
    /// Days the reminder fires on, kept sorted Sunday-first and free of duplicates.
    pub days: Vec<Weekday>,
}

impl Default for ReminderSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            hour: 9,
            minute: 0,
            days: vec![
                Weekday::Mon,
                Weekday::Tue,
                Weekday::Wed,
                Weekday::Thu,
                Weekday::Fri,
            ],
        }
    }
}

impl ReminderSettings {
    /// Sorts the day set Sunday-first and drops duplicates.
    pub fn normalize(&mut self) {
        self.days.sort_by_key(|day| day.num_days_from_sunday());
        self.days.dedup();
    }
}

/// "Still working" reminder settings for an active session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalSettings {
    pub enabled: bool,
    pub interval_minutes: u32,
}

impl Default for IntervalSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_minutes: 60,
        }
    }
}

/// Day number with Sunday as 0, the encoding reminder days are persisted in.
pub fn sunday_index(day: Weekday) -> u8 {
    day.num_days_from_sunday() as u8
}

pub fn weekday_from_sunday_index(index: u8) -> Option<Weekday> {
    Some(match index {
        0 => Weekday::Sun,
        1 => Weekday::Mon,
        2 => Weekday::Tue,
        3 => Weekday::Wed,
        4 => Weekday::Thu,
        5 => Weekday::Fri,
        6 => Weekday::Sat,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use chrono::Weekday;

    use super::{is_valid_interval, sunday_index, weekday_from_sunday_index, ReminderSettings};

    #[test]
    fn sunday_index_round_trips_every_day() {
        for index in 0..7u8 {
            let day = weekday_from_sunday_index(index).unwrap();
            assert_eq!(sunday_index(day), index);
        }
        assert_eq!(weekday_from_sunday_index(7), None);
    }

    #[test]
    fn interval_options_are_the_fixed_table() {
        assert!(is_valid_interval(10));
        assert!(is_valid_interval(60));
        assert!(is_valid_interval(1200));
        assert!(!is_valid_interval(0));
        assert!(!is_valid_interval(57));
        assert!(!is_valid_interval(61));
    }

    #[test]
    fn normalize_sorts_sunday_first_and_dedupes() {
        let mut settings = ReminderSettings {
            days: vec![Weekday::Fri, Weekday::Sun, Weekday::Mon, Weekday::Mon],
            ..ReminderSettings::default()
        };
        settings.normalize();
        assert_eq!(
            settings.days,
            vec![Weekday::Sun, Weekday::Mon, Weekday::Fri]
        );
    }
}
