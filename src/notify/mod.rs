//! Contains logic for scheduling and delivering user-facing notifications.
//! [desktop::DesktopPlatform] is the main artifact of this module; it pairs with a
//! [desktop::DeliveryModule] event loop that posts notifications when they come due.

pub mod desktop;

use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use chrono::Weekday;

/// Families of notifications. Bulk operations (cancel everything of one kind) filter on this
/// instead of parsing identifier strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationCategory {
    /// Recurring "time to start working" reminder.
    WeeklyStart,
    /// "Still working" reminders during an active session.
    IntervalWork,
    /// One-shot notification used to verify delivery works.
    Test,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationContent {
    pub title: String,
    pub body: String,
}

impl NotificationContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }
}

/// When a scheduled notification should fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    /// Once, this long from now.
    After(Duration),
    /// Every week at the given local weekday and time.
    Weekly {
        weekday: Weekday,
        hour: u32,
        minute: u32,
    },
}

/// Identifier plus category of a currently scheduled notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduledHandle {
    pub identifier: String,
    pub category: NotificationCategory,
}

/// Contract for the notification side of the host platform. Everything here is best-effort:
/// callers treat failures as "the reminder just doesn't happen".
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NotificationPlatform: Send + Sync + 'static {
    /// Whether notifications may be shown. Must be checked before scheduling.
    async fn request_permission(&self) -> Result<bool>;

    /// Schedules a notification, replacing any previous one with the same identifier.
    async fn schedule(
        &self,
        identifier: &str,
        category: NotificationCategory,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<()>;

    /// Removes a scheduled notification. Unknown identifiers are a no-op, since the
    /// notification may simply have fired already.
    async fn cancel(&self, identifier: &str) -> Result<()>;

    /// Currently scheduled notifications.
    async fn scheduled(&self) -> Result<Vec<ScheduledHandle>>;
}
