use std::sync::Arc;

use anyhow::Result;
use tokio::{select, sync::broadcast};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::reminders::{config, scheduler::ReminderScheduler};
use crate::settings::SettingsStore;
use crate::timer::SessionEvent;

/// Keeps the in-session reminders aligned with what the timer is doing: a fresh plan when a
/// session starts or turns out to be already running, cancellation when it ends. Reminder
/// failures are logged and swallowed so the timer itself never depends on notifications.
pub struct ReminderListener {
    events: broadcast::Receiver<SessionEvent>,
    scheduler: ReminderScheduler,
    settings: Arc<dyn SettingsStore>,
}

impl ReminderListener {
    pub fn new(
        events: broadcast::Receiver<SessionEvent>,
        scheduler: ReminderScheduler,
        settings: Arc<dyn SettingsStore>,
    ) -> Self {
        Self {
            events,
            scheduler,
            settings,
        }
    }

    pub async fn run(mut self, shutdown: CancellationToken) -> Result<()> {
        loop {
            select! {
                _ = shutdown.cancelled() => {
                    debug!("Shutting down reminder listener");
                    return Ok(());
                }
                event = self.events.recv() => match event {
                    Ok(event) => self.handle(event).await,
                    Err(broadcast::error::RecvError::Lagged(missed)) => {
                        // The next event carries enough to realign, nothing to replay.
                        warn!("Reminder listener fell {missed} events behind");
                    }
                    Err(broadcast::error::RecvError::Closed) => return Ok(()),
                },
            }
        }
    }

    async fn handle(&self, event: SessionEvent) {
        let result = match event {
            SessionEvent::Started => self.reschedule(0).await,
            SessionEvent::Resumed { elapsed } => self.reschedule(elapsed).await,
            SessionEvent::Stopped { .. } | SessionEvent::Idle => {
                self.scheduler.cancel_interval().await
            }
        };
        if let Err(e) = result {
            warn!("Failed to realign interval reminders after {event:?}: {e:?}");
        }
    }

    async fn reschedule(&self, elapsed: i64) -> Result<()> {
        let settings = config::load_interval(self.settings.as_ref()).await?;
        self.scheduler.schedule_interval(elapsed, &settings).await
    }
}
