//! Pure planning of reminder notifications. Everything here is arithmetic over elapsed seconds,
//! the scheduler issues the resulting plan against the notification platform.

use chrono::Weekday;

use super::{sunday_index, ReminderSettings};
use crate::notify::{NotificationContent, Trigger};
use crate::utils::time::format_elapsed;

/// Upper bound on simultaneously scheduled interval reminders. Mobile notification services cap
/// the pending queue around this size, and a hundred boundaries is already a 20 hour day at the
/// shortest interval anyone reasonably uses.
pub const MAX_SCHEDULED: usize = 100;

/// Sessions longer than this stop producing reminders.
pub const MAX_SESSION_SECS: i64 = 20 * 60 * 60;

pub const INTERVAL_IDENTIFIER_PREFIX: &str = "interval-work-";

const GENERIC_MESSAGES: [&str; 7] = [
    "Nice pace, keep it up!",
    "How about a quick stretch?",
    "Deep in focus, well done!",
    "Could be time for a short break?",
    "Still on the clock, right?",
    "You are putting in real work today!",
    "Did you mean to leave the timer running?",
];

/// One interval reminder that should be scheduled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IntervalSlot {
    /// 1-based boundary number counted from session start.
    pub index: i64,
    /// Seconds from now until the boundary.
    pub delay_secs: i64,
    /// Total session seconds once the boundary fires.
    pub elapsed_at_fire: i64,
}

impl IntervalSlot {
    pub fn identifier(&self) -> String {
        format!("{INTERVAL_IDENTIFIER_PREFIX}{}", self.index)
    }

    pub fn content(&self) -> NotificationContent {
        NotificationContent::new(
            format!("Working for {}", format_elapsed(self.elapsed_at_fire)),
            interval_body(self.index, self.elapsed_at_fire),
        )
    }
}

/// Computes the interval reminders for a session that has already run `elapsed_secs`. The first
/// boundary is the next multiple of the interval after the elapsed time; planning stops at the
/// session ceiling or at [MAX_SCHEDULED] entries, whichever comes first. A boundary that is not
/// strictly in the future is skipped without using up a slot.
pub fn interval_slots(elapsed_secs: i64, interval_minutes: u32) -> Vec<IntervalSlot> {
    let interval_secs = i64::from(interval_minutes) * 60;
    if interval_secs <= 0 {
        return Vec::new();
    }
    let elapsed_secs = elapsed_secs.max(0);

    let mut index = elapsed_secs / interval_secs + 1;
    let mut slots = Vec::new();
    while slots.len() < MAX_SCHEDULED {
        let elapsed_at_fire = index * interval_secs;
        if elapsed_at_fire > MAX_SESSION_SECS {
            break;
        }
        let delay_secs = elapsed_at_fire - elapsed_secs;
        if delay_secs <= 0 {
            index += 1;
            continue;
        }
        slots.push(IntervalSlot {
            index,
            delay_secs,
            elapsed_at_fire,
        });
        index += 1;
    }
    slots
}

/// Body text for an interval reminder. Long sessions get pointed copy, shorter ones rotate
/// through the generic pool by boundary index so reruns of the same plan produce the same
/// notifications.
fn interval_body(index: i64, elapsed_at_fire: i64) -> String {
    let text = if elapsed_at_fire >= 8 * 3600 {
        "A full day of work done. Time to rest!"
    } else if elapsed_at_fire >= 6 * 3600 {
        "Overtime territory. Hang in there!"
    } else if elapsed_at_fire >= 4 * 3600 {
        "Check on your timer!"
    } else {
        GENERIC_MESSAGES[(index - 1).max(0) as usize % GENERIC_MESSAGES.len()]
    };
    text.to_string()
}

/// One weekly reminder that should be scheduled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeeklySlot {
    pub day: Weekday,
    pub hour: u32,
    pub minute: u32,
}

impl WeeklySlot {
    pub fn identifier(&self) -> String {
        weekly_identifier(self.day)
    }

    pub fn trigger(&self) -> Trigger {
        Trigger::Weekly {
            weekday: self.day,
            hour: self.hour,
            minute: self.minute,
        }
    }
}

/// Weekly reminders called for by `settings`, one per configured day. Empty when the reminder
/// is off.
pub fn weekly_slots(settings: &ReminderSettings) -> Vec<WeeklySlot> {
    if !settings.enabled {
        return Vec::new();
    }
    settings
        .days
        .iter()
        .map(|&day| WeeklySlot {
            day,
            hour: settings.hour,
            minute: settings.minute,
        })
        .collect()
}

pub fn weekly_identifier(day: Weekday) -> String {
    format!("weekly-start-{}", sunday_index(day))
}

pub fn weekly_content() -> NotificationContent {
    NotificationContent::new("Time to start working!", "Go start your timer. You got this!")
}

pub fn test_content() -> NotificationContent {
    NotificationContent::new("Test notification", "Notifications are working!")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hour_interval_ladders_to_twenty_hours() {
        let slots = interval_slots(0, 60);

        assert_eq!(slots.len(), 20);
        assert_eq!(slots[0].index, 1);
        assert_eq!(slots[0].delay_secs, 3600);
        assert_eq!(slots[0].identifier(), "interval-work-1");
        assert_eq!(slots[19].index, 20);
        // The boundary landing exactly on the ceiling is still included.
        assert_eq!(slots[19].elapsed_at_fire, MAX_SESSION_SECS);
        assert_eq!(slots[19].delay_secs, 72_000);
    }

    #[test]
    fn resume_mid_interval_targets_the_next_boundary() {
        // An hour and a half into hourly reminders: the 1h boundary is gone,
        // the 2h one is half an hour away.
        let slots = interval_slots(5400, 60);

        assert_eq!(slots[0].index, 2);
        assert_eq!(slots[0].delay_secs, 1800);
        assert_eq!(slots[0].elapsed_at_fire, 7200);
        assert_eq!(slots.len(), 19);
    }

    #[test]
    fn short_interval_hits_the_count_cap() {
        let slots = interval_slots(0, 10);

        assert_eq!(slots.len(), MAX_SCHEDULED);
        assert_eq!(slots.last().unwrap().elapsed_at_fire, 100 * 600);
    }

    #[test]
    fn longest_interval_yields_a_single_slot() {
        let slots = interval_slots(0, 1200);

        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].elapsed_at_fire, MAX_SESSION_SECS);
    }

    #[test]
    fn session_past_the_ceiling_plans_nothing() {
        assert!(interval_slots(MAX_SESSION_SECS, 60).is_empty());
        assert!(interval_slots(MAX_SESSION_SECS + 8000, 60).is_empty());
    }

    #[test]
    fn delays_are_strictly_positive_and_increasing() {
        for elapsed in [0, 59, 3599, 3600, 5400, 71_999] {
            let slots = interval_slots(elapsed, 60);
            let mut previous = 0;
            for slot in &slots {
                assert!(slot.delay_secs > 0, "elapsed {elapsed} slot {slot:?}");
                assert!(slot.delay_secs > previous);
                previous = slot.delay_secs;
            }
        }
    }

    #[test]
    fn negative_elapsed_is_treated_as_zero() {
        assert_eq!(interval_slots(-100, 60), interval_slots(0, 60));
    }

    #[test]
    fn body_copy_escalates_with_session_length() {
        assert!(interval_body(1, 8 * 3600).contains("full day"));
        assert!(interval_body(1, 6 * 3600).contains("Overtime"));
        assert!(interval_body(1, 4 * 3600).contains("Check"));
    }

    #[test]
    fn generic_copy_rotates_deterministically() {
        let first = interval_body(1, 3600);
        let again = interval_body(1, 3600);
        assert_eq!(first, again);
        // The pool has seven entries, so index 8 wraps back to the first.
        assert_eq!(interval_body(8, 3600), first);
        assert_ne!(interval_body(2, 3600), first);
    }

    #[test]
    fn titles_carry_the_elapsed_time() {
        let slot = IntervalSlot {
            index: 4,
            delay_secs: 1800,
            elapsed_at_fire: 2 * 3600,
        };
        assert_eq!(slot.content().title, "Working for 2h");
    }

    #[test]
    fn weekly_plan_holds_one_slot_per_configured_day() {
        let settings = ReminderSettings {
            enabled: true,
            hour: 8,
            minute: 30,
            days: vec![Weekday::Mon, Weekday::Fri],
        };

        let slots = weekly_slots(&settings);

        assert_eq!(slots.len(), 2);
        assert_eq!(slots[0].identifier(), "weekly-start-1");
        assert_eq!(slots[1].identifier(), "weekly-start-5");
        assert_eq!(
            slots[0].trigger(),
            Trigger::Weekly {
                weekday: Weekday::Mon,
                hour: 8,
                minute: 30,
            }
        );
    }

    #[test]
    fn disabled_weekly_plan_is_empty() {
        let settings = ReminderSettings {
            enabled: false,
            ..ReminderSettings::default()
        };
        assert!(weekly_slots(&settings).is_empty());
    }
}
