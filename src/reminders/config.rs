//! Load/save of reminder settings over the [SettingsStore] collaborator. Each setting lives
//! under its own key; values that fail to decode fall back to the default for that field so a
//! damaged settings file never takes the reminder feature down with it.

use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{is_valid_interval, sunday_index, weekday_from_sunday_index};
use super::{IntervalSettings, ReminderSettings};
use crate::settings::SettingsStore;

const REMINDER_ENABLED: &str = "workReminderEnabled";
const REMINDER_TIME: &str = "workReminderTime";
const REMINDER_DAYS: &str = "workReminderDays";
const INTERVAL_ENABLED: &str = "workIntervalNotificationEnabled";
const INTERVAL_MINUTES: &str = "workIntervalMinutes";

#[derive(Debug, Serialize, Deserialize)]
struct TimeOfDay {
    hour: u32,
    minute: u32,
}

pub async fn load_reminder(settings: &dyn SettingsStore) -> Result<ReminderSettings> {
    let defaults = ReminderSettings::default();
    let enabled = match settings.get(REMINDER_ENABLED).await? {
        Some(value) => value == "true",
        None => defaults.enabled,
    };
    let (hour, minute) = match settings.get(REMINDER_TIME).await? {
        Some(value) => decode_time(&value).unwrap_or((defaults.hour, defaults.minute)),
        None => (defaults.hour, defaults.minute),
    };
    let days = match settings.get(REMINDER_DAYS).await? {
        Some(value) => decode_days(&value).unwrap_or_else(|| defaults.days.clone()),
        None => defaults.days.clone(),
    };
    let mut loaded = ReminderSettings {
        enabled,
        hour,
        minute,
        days,
    };
    loaded.normalize();
    Ok(loaded)
}

pub async fn save_reminder(settings: &dyn SettingsStore, value: &ReminderSettings) -> Result<()> {
    if value.hour > 23 || value.minute > 59 {
        bail!(
            "Reminder time {:02}:{:02} is out of range",
            value.hour,
            value.minute
        );
    }
    let mut value = value.clone();
    value.normalize();

    settings
        .set(REMINDER_ENABLED, bool_string(value.enabled))
        .await?;
    let time = TimeOfDay {
        hour: value.hour,
        minute: value.minute,
    };
    settings
        .set(REMINDER_TIME, &serde_json::to_string(&time)?)
        .await?;
    let days: Vec<u8> = value.days.iter().map(|day| sunday_index(*day)).collect();
    settings
        .set(REMINDER_DAYS, &serde_json::to_string(&days)?)
        .await?;
    Ok(())
}

pub async fn load_interval(settings: &dyn SettingsStore) -> Result<IntervalSettings> {
    let defaults = IntervalSettings::default();
    let enabled = match settings.get(INTERVAL_ENABLED).await? {
        Some(value) => value == "true",
        None => defaults.enabled,
    };
    let interval_minutes = match settings.get(INTERVAL_MINUTES).await? {
        Some(value) => match value.parse::<u32>().ok().filter(|m| is_valid_interval(*m)) {
            Some(minutes) => minutes,
            None => {
                warn!("Stored interval {value:?} is not a valid option, using the default");
                defaults.interval_minutes
            }
        },
        None => defaults.interval_minutes,
    };
    Ok(IntervalSettings {
        enabled,
        interval_minutes,
    })
}

pub async fn save_interval(settings: &dyn SettingsStore, value: &IntervalSettings) -> Result<()> {
    if !is_valid_interval(value.interval_minutes) {
        bail!(
            "{} minutes is not one of the supported reminder intervals",
            value.interval_minutes
        );
    }
    settings
        .set(INTERVAL_ENABLED, bool_string(value.enabled))
        .await?;
    settings
        .set(INTERVAL_MINUTES, &value.interval_minutes.to_string())
        .await?;
    Ok(())
}

fn bool_string(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

fn decode_time(value: &str) -> Option<(u32, u32)> {
    match serde_json::from_str::<TimeOfDay>(value) {
        Ok(time) if time.hour <= 23 && time.minute <= 59 => Some((time.hour, time.minute)),
        _ => {
            warn!("Stored reminder time {value:?} did not decode, using the default");
            None
        }
    }
}

fn decode_days(value: &str) -> Option<Vec<chrono::Weekday>> {
    let indices: Vec<u8> = match serde_json::from_str(value) {
        Ok(indices) => indices,
        Err(_) => {
            warn!("Stored reminder days {value:?} did not decode, using the default");
            return None;
        }
    };
    let days: Option<Vec<_>> = indices
        .into_iter()
        .map(weekday_from_sunday_index)
        .collect();
    if days.is_none() {
        warn!("Stored reminder days {value:?} contain an invalid day, using the default");
    }
    days
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::Weekday;

    use super::*;
    use crate::settings::file::FileSettings;

    fn temp_settings() -> Result<(tempfile::TempDir, FileSettings)> {
        let dir = tempfile::tempdir()?;
        let store = FileSettings::new(dir.path().join("settings.json"));
        Ok((dir, store))
    }

    #[tokio::test]
    async fn empty_store_yields_defaults() -> Result<()> {
        let (_dir, store) = temp_settings()?;

        let reminder = load_reminder(&store).await?;
        assert_eq!(reminder, ReminderSettings::default());
        assert!(!reminder.enabled);
        assert_eq!((reminder.hour, reminder.minute), (9, 0));

        let interval = load_interval(&store).await?;
        assert_eq!(interval, IntervalSettings::default());
        assert!(interval.enabled);
        assert_eq!(interval.interval_minutes, 60);
        Ok(())
    }

    #[tokio::test]
    async fn reminder_settings_round_trip() -> Result<()> {
        let (_dir, store) = temp_settings()?;
        let saved = ReminderSettings {
            enabled: true,
            hour: 8,
            minute: 30,
            days: vec![Weekday::Tue, Weekday::Thu, Weekday::Sun],
        };

        save_reminder(&store, &saved).await?;
        let loaded = load_reminder(&store).await?;

        assert!(loaded.enabled);
        assert_eq!((loaded.hour, loaded.minute), (8, 30));
        assert_eq!(
            loaded.days,
            vec![Weekday::Sun, Weekday::Tue, Weekday::Thu]
        );
        Ok(())
    }

    #[tokio::test]
    async fn interval_settings_round_trip() -> Result<()> {
        let (_dir, store) = temp_settings()?;
        let saved = IntervalSettings {
            enabled: false,
            interval_minutes: 90,
        };

        save_interval(&store, &saved).await?;
        assert_eq!(load_interval(&store).await?, saved);
        Ok(())
    }

    #[tokio::test]
    async fn damaged_values_fall_back_per_field() -> Result<()> {
        let (_dir, store) = temp_settings()?;
        store.set(REMINDER_ENABLED, "true").await?;
        store.set(REMINDER_TIME, "not json").await?;
        store.set(REMINDER_DAYS, "[1,9]").await?;
        store.set(INTERVAL_MINUTES, "57").await?;

        let reminder = load_reminder(&store).await?;
        // The readable flag survives while the broken fields reset.
        assert!(reminder.enabled);
        assert_eq!((reminder.hour, reminder.minute), (9, 0));
        assert_eq!(reminder.days, ReminderSettings::default().days);

        let interval = load_interval(&store).await?;
        assert_eq!(interval.interval_minutes, 60);
        Ok(())
    }

    #[tokio::test]
    async fn out_of_range_values_are_rejected_on_save() -> Result<()> {
        let (_dir, store) = temp_settings()?;

        let bad_time = ReminderSettings {
            hour: 24,
            ..ReminderSettings::default()
        };
        assert!(save_reminder(&store, &bad_time).await.is_err());

        let bad_interval = IntervalSettings {
            enabled: true,
            interval_minutes: 57,
        };
        assert!(save_interval(&store, &bad_interval).await.is_err());
        Ok(())
    }
}
