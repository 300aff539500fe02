//! Desktop implementation of [NotificationPlatform]. Desktop environments can show a
//! notification now but have no service for delivering one at a future time, so scheduling is
//! handled in-process: [DesktopPlatform] records what should fire and when, and a spawned
//! [DeliveryModule] sleeps until the earliest deadline and posts through a [NotificationSink].

use std::{collections::HashMap, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, Notify};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::{
    NotificationCategory, NotificationContent, NotificationPlatform, ScheduledHandle, Trigger,
};
use crate::utils::{clock::Clock, time::next_weekly_occurrence};

/// How long the delivery loop sleeps when nothing is scheduled. A wakeup cuts this short, the
/// constant only bounds how long a missed wakeup could ever matter.
const IDLE_WAIT: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
struct Pending {
    category: NotificationCategory,
    content: NotificationContent,
    trigger: Trigger,
    fire_at: DateTime<Utc>,
}

type PendingMap = Arc<Mutex<HashMap<String, Pending>>>;

/// Scheduling half of the desktop notification pair. Cheap to clone, all clones share one
/// pending set.
#[derive(Clone)]
pub struct DesktopPlatform {
    clock: Arc<dyn Clock>,
    pending: PendingMap,
    wake: Arc<Notify>,
}

/// Delivery half. Owns the sink and runs until its cancellation token fires.
pub struct DeliveryModule<S> {
    clock: Arc<dyn Clock>,
    pending: PendingMap,
    wake: Arc<Notify>,
    sink: S,
    shutdown: CancellationToken,
}

impl DesktopPlatform {
    /// Creates the platform handle together with the delivery loop serving it. The loop has to
    /// be spawned for notifications to ever fire.
    pub fn with_delivery<S: NotificationSink>(
        clock: Arc<dyn Clock>,
        sink: S,
        shutdown: CancellationToken,
    ) -> (Self, DeliveryModule<S>) {
        let pending: PendingMap = Arc::default();
        let wake = Arc::new(Notify::new());
        let platform = Self {
            clock: clock.clone(),
            pending: pending.clone(),
            wake: wake.clone(),
        };
        let delivery = DeliveryModule {
            clock,
            pending,
            wake,
            sink,
            shutdown,
        };
        (platform, delivery)
    }

    fn fire_time(&self, trigger: Trigger) -> Result<DateTime<Utc>> {
        match trigger {
            Trigger::After(delay) => Ok(self.clock.time() + delay),
            Trigger::Weekly {
                weekday,
                hour,
                minute,
            } => {
                let next = next_weekly_occurrence(self.clock.local_time(), weekday, hour, minute)
                    .with_context(|| {
                    format!("Invalid weekly trigger time {hour:02}:{minute:02}")
                })?;
                Ok(next.with_timezone(&Utc))
            }
        }
    }
}

#[async_trait]
impl NotificationPlatform for DesktopPlatform {
    async fn request_permission(&self) -> Result<bool> {
        // Desktop notification daemons accept posts without a runtime prompt.
        Ok(true)
    }

    async fn schedule(
        &self,
        identifier: &str,
        category: NotificationCategory,
        content: NotificationContent,
        trigger: Trigger,
    ) -> Result<()> {
        let fire_at = self.fire_time(trigger)?;
        debug!("Scheduling {category:?} notification {identifier} for {fire_at}");
        self.pending.lock().await.insert(
            identifier.to_string(),
            Pending {
                category,
                content,
                trigger,
                fire_at,
            },
        );
        self.wake.notify_one();
        Ok(())
    }

    async fn cancel(&self, identifier: &str) -> Result<()> {
        if self.pending.lock().await.remove(identifier).is_some() {
            debug!("Cancelled scheduled notification {identifier}");
            self.wake.notify_one();
        }
        Ok(())
    }

    async fn scheduled(&self) -> Result<Vec<ScheduledHandle>> {
        let pending = self.pending.lock().await;
        Ok(pending
            .iter()
            .map(|(identifier, entry)| ScheduledHandle {
                identifier: identifier.clone(),
                category: entry.category,
            })
            .collect())
    }
}

impl<S: NotificationSink> DeliveryModule<S> {
    pub async fn run(self) -> Result<()> {
        loop {
            let wait = self.time_to_next().await.unwrap_or(IDLE_WAIT);
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Shutting down notification delivery");
                    return Ok(());
                }
                _ = self.wake.notified() => {}
                _ = self.clock.sleep(wait) => {
                    self.deliver_due().await;
                }
            }
        }
    }

    async fn time_to_next(&self) -> Option<Duration> {
        let pending = self.pending.lock().await;
        let earliest = pending.values().map(|entry| entry.fire_at).min()?;
        Some(
            (earliest - self.clock.time())
                .to_std()
                .unwrap_or(Duration::ZERO),
        )
    }

    async fn deliver_due(&self) {
        let now = self.clock.time();
        let mut due = Vec::new();
        {
            let mut pending = self.pending.lock().await;
            let ready: Vec<String> = pending
                .iter()
                .filter(|(_, entry)| entry.fire_at <= now)
                .map(|(identifier, _)| identifier.clone())
                .collect();
            for identifier in ready {
                let Some(trigger) = pending.get(&identifier).map(|entry| entry.trigger) else {
                    continue;
                };
                let rearm_at = match trigger {
                    Trigger::After(_) => None,
                    Trigger::Weekly {
                        weekday,
                        hour,
                        minute,
                    } => next_weekly_occurrence(self.clock.local_time(), weekday, hour, minute)
                        .map(|next| next.with_timezone(&Utc)),
                };
                match rearm_at {
                    Some(fire_at) => {
                        if let Some(entry) = pending.get_mut(&identifier) {
                            due.push(entry.content.clone());
                            entry.fire_at = fire_at;
                        }
                    }
                    None => {
                        if let Some(entry) = pending.remove(&identifier) {
                            due.push(entry.content);
                        }
                    }
                }
            }
        }
        for content in due {
            if let Err(e) = self.sink.post(&content) {
                warn!("Failed to deliver notification: {e:?}");
            }
        }
    }
}

/// Final hop between the delivery loop and the user's screen.
pub trait NotificationSink: Send + Sync + 'static {
    fn post(&self, content: &NotificationContent) -> Result<()>;
}

/// Posts through the desktop notification daemon.
pub struct NotifyRustSink;

impl NotificationSink for NotifyRustSink {
    fn post(&self, content: &NotificationContent) -> Result<()> {
        notify_rust::Notification::new()
            .appname("worktick")
            .summary(&content.title)
            .body(&content.body)
            .icon("appointment-soon")
            .show()
            .context("Failed to show desktop notification")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex as StdMutex;

    use anyhow::Result;
    use chrono::{TimeZone, Utc, Weekday};

    use super::*;
    use crate::utils::clock::test_support::TestClock;

    #[derive(Clone, Default)]
    struct RecordingSink {
        posts: Arc<StdMutex<Vec<NotificationContent>>>,
    }

    impl RecordingSink {
        fn count(&self) -> usize {
            self.posts.lock().unwrap().len()
        }
    }

    impl NotificationSink for RecordingSink {
        fn post(&self, content: &NotificationContent) -> Result<()> {
            self.posts.lock().unwrap().push(content.clone());
            Ok(())
        }
    }

    fn ping() -> NotificationContent {
        NotificationContent::new("Ping", "Pong")
    }

    #[tokio::test(start_paused = true)]
    async fn one_shot_fires_once_and_clears() -> Result<()> {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::default());
        let sink = RecordingSink::default();
        let shutdown = CancellationToken::new();
        let (platform, delivery) =
            DesktopPlatform::with_delivery(clock, sink.clone(), shutdown.clone());
        let task = tokio::spawn(delivery.run());

        platform
            .schedule(
                "test",
                NotificationCategory::Test,
                ping(),
                Trigger::After(Duration::from_secs(2)),
            )
            .await?;
        tokio::time::sleep(Duration::from_secs(3)).await;
        assert_eq!(sink.count(), 1);
        assert!(platform.scheduled().await?.is_empty());

        tokio::time::sleep(Duration::from_secs(300)).await;
        assert_eq!(sink.count(), 1);

        shutdown.cancel();
        task.await??;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn cancelled_notification_never_fires() -> Result<()> {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::default());
        let sink = RecordingSink::default();
        let shutdown = CancellationToken::new();
        let (platform, delivery) =
            DesktopPlatform::with_delivery(clock, sink.clone(), shutdown.clone());
        let task = tokio::spawn(delivery.run());

        platform
            .schedule(
                "interval-work-1",
                NotificationCategory::IntervalWork,
                ping(),
                Trigger::After(Duration::from_secs(5)),
            )
            .await?;
        platform.cancel("interval-work-1").await?;
        // Cancelling something that was never scheduled is fine too.
        platform.cancel("interval-work-7").await?;

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sink.count(), 0);

        shutdown.cancel();
        task.await??;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn weekly_notification_rearms_after_firing() -> Result<()> {
        // 23:30 UTC Thursday is 08:30 Friday in the test clock's UTC+9.
        let clock: Arc<dyn Clock> = Arc::new(TestClock::starting_at(
            Utc.with_ymd_and_hms(2024, 4, 4, 23, 30, 0).unwrap(),
        ));
        let sink = RecordingSink::default();
        let shutdown = CancellationToken::new();
        let (platform, delivery) =
            DesktopPlatform::with_delivery(clock, sink.clone(), shutdown.clone());
        let task = tokio::spawn(delivery.run());

        platform
            .schedule(
                "weekly-reminder",
                NotificationCategory::WeeklyStart,
                ping(),
                Trigger::Weekly {
                    weekday: Weekday::Fri,
                    hour: 9,
                    minute: 0,
                },
            )
            .await?;

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;
        assert_eq!(sink.count(), 1);
        let handles = platform.scheduled().await?;
        assert_eq!(handles.len(), 1);
        assert_eq!(handles[0].category, NotificationCategory::WeeklyStart);

        tokio::time::sleep(Duration::from_secs(7 * 24 * 3600)).await;
        assert_eq!(sink.count(), 2);

        shutdown.cancel();
        task.await??;
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn rescheduling_replaces_previous_entry() -> Result<()> {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::default());
        let sink = RecordingSink::default();
        let shutdown = CancellationToken::new();
        let (platform, delivery) =
            DesktopPlatform::with_delivery(clock, sink.clone(), shutdown.clone());
        let task = tokio::spawn(delivery.run());

        platform
            .schedule(
                "test",
                NotificationCategory::Test,
                ping(),
                Trigger::After(Duration::from_secs(60)),
            )
            .await?;
        platform
            .schedule(
                "test",
                NotificationCategory::Test,
                ping(),
                Trigger::After(Duration::from_secs(2)),
            )
            .await?;

        tokio::time::sleep(Duration::from_secs(120)).await;
        assert_eq!(sink.count(), 1);

        shutdown.cancel();
        task.await??;
        Ok(())
    }

    #[tokio::test]
    async fn invalid_weekly_time_is_rejected() {
        let clock: Arc<dyn Clock> = Arc::new(TestClock::default());
        let (platform, _delivery) = DesktopPlatform::with_delivery(
            clock,
            RecordingSink::default(),
            CancellationToken::new(),
        );

        let result = platform
            .schedule(
                "weekly-reminder",
                NotificationCategory::WeeklyStart,
                ping(),
                Trigger::Weekly {
                    weekday: Weekday::Mon,
                    hour: 24,
                    minute: 0,
                },
            )
            .await;
        assert!(result.is_err());
    }
}
