//! Issues reminder plans against the notification platform. Every schedule operation first
//! cancels the notifications of its own category, so repeating an operation converges on the
//! same scheduled set instead of piling up duplicates.

use std::{sync::Arc, time::Duration};

use anyhow::Result;
use tracing::{debug, info, warn};

use super::plan::{interval_slots, test_content, weekly_content, weekly_slots};
use super::{IntervalSettings, ReminderSettings};
use crate::notify::{NotificationCategory, NotificationPlatform, Trigger};

const TEST_IDENTIFIER: &str = "test-notification";
const TEST_DELAY: Duration = Duration::from_secs(2);

#[derive(Clone)]
pub struct ReminderScheduler {
    platform: Arc<dyn NotificationPlatform>,
}

impl ReminderScheduler {
    pub fn new(platform: Arc<dyn NotificationPlatform>) -> Self {
        Self { platform }
    }

    /// Aligns the scheduled weekly reminders with `settings`. Disabled settings or an empty day
    /// set leave nothing scheduled.
    pub async fn schedule_weekly(&self, settings: &ReminderSettings) -> Result<()> {
        self.cancel_category(NotificationCategory::WeeklyStart)
            .await?;
        let slots = weekly_slots(settings);
        if slots.is_empty() {
            debug!("Weekly start reminder is off");
            return Ok(());
        }
        if !self.permission_granted().await? {
            return Ok(());
        }
        let count = slots.len();
        for slot in slots {
            self.platform
                .schedule(
                    &slot.identifier(),
                    NotificationCategory::WeeklyStart,
                    weekly_content(),
                    slot.trigger(),
                )
                .await?;
        }
        info!(
            "Scheduled the weekly start reminder for {:02}:{:02} on {count} day(s)",
            settings.hour, settings.minute
        );
        Ok(())
    }

    /// Replaces the in-session reminders with a plan continuing from `elapsed_secs` into the
    /// session. Used both at session start (elapsed 0) and when resuming a session that was
    /// already running.
    pub async fn schedule_interval(
        &self,
        elapsed_secs: i64,
        settings: &IntervalSettings,
    ) -> Result<()> {
        self.cancel_interval().await?;
        if !settings.enabled {
            return Ok(());
        }
        if !self.permission_granted().await? {
            return Ok(());
        }
        let slots = interval_slots(elapsed_secs, settings.interval_minutes);
        let count = slots.len();
        for slot in slots {
            self.platform
                .schedule(
                    &slot.identifier(),
                    NotificationCategory::IntervalWork,
                    slot.content(),
                    Trigger::After(Duration::from_secs(slot.delay_secs as u64)),
                )
                .await?;
        }
        debug!(
            "Scheduled {count} interval reminders, every {} minutes from {elapsed_secs}s elapsed",
            settings.interval_minutes
        );
        Ok(())
    }

    pub async fn cancel_interval(&self) -> Result<()> {
        self.cancel_category(NotificationCategory::IntervalWork)
            .await
    }

    /// Schedules a near-immediate notification so the user can verify delivery works.
    pub async fn send_test(&self) -> Result<()> {
        if !self.permission_granted().await? {
            return Ok(());
        }
        self.platform
            .schedule(
                TEST_IDENTIFIER,
                NotificationCategory::Test,
                test_content(),
                Trigger::After(TEST_DELAY),
            )
            .await
    }

    async fn permission_granted(&self) -> Result<bool> {
        if self.platform.request_permission().await? {
            Ok(true)
        } else {
            debug!("Notification permission denied, leaving reminders unscheduled");
            Ok(false)
        }
    }

    /// Cancels every scheduled notification of one category. A single failed cancel is logged
    /// and skipped rather than failing the batch.
    async fn cancel_category(&self, category: NotificationCategory) -> Result<()> {
        for handle in self.platform.scheduled().await? {
            if handle.category != category {
                continue;
            }
            if let Err(e) = self.platform.cancel(&handle.identifier).await {
                warn!("Failed to cancel notification {}: {e:?}", handle.identifier);
            }
        }
        Ok(())
    }
}
