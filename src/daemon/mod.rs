use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};

use anyhow::Result;
use listener::ReminderListener;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::{
    notify::desktop::{DesktopPlatform, NotifyRustSink},
    reminders::{config, scheduler::ReminderScheduler},
    settings::{file::FileSettings, SettingsStore, SETTINGS_FILE_NAME},
    store::{PgSessionStore, SessionStore},
    timer::SessionTimerController,
    utils::clock::{Clock, DefaultClock},
};

pub mod listener;
pub mod shutdown;

const TICK_INTERVAL: Duration = Duration::from_secs(1);
/// How often local state is rebuilt from the store. Bounds how long an externally started or
/// stopped session can go unnoticed.
const RECONCILE_INTERVAL: Duration = Duration::from_secs(30);
const SETTINGS_POLL_INTERVAL: Duration = Duration::from_secs(5);

/// Represents the starting point for the daemon
pub async fn start_daemon(dir: PathBuf, database_url: &str) -> Result<()> {
    std::env::set_current_dir("/")?;

    let store = PgSessionStore::connect(database_url).await?;
    store.ensure_schema().await?;
    let store: Arc<dyn SessionStore> = Arc::new(store);
    let clock: Arc<dyn Clock> = Arc::new(DefaultClock);
    let settings_path = dir.join(SETTINGS_FILE_NAME);

    let shutdown_token = CancellationToken::new();
    let (platform, delivery) =
        DesktopPlatform::with_delivery(clock.clone(), NotifyRustSink, shutdown_token.clone());
    let scheduler = ReminderScheduler::new(Arc::new(platform));
    let settings: Arc<dyn SettingsStore> = Arc::new(FileSettings::new(settings_path.clone()));
    let controller = SessionTimerController::new(store, clock.clone());
    let reminder_listener =
        ReminderListener::new(controller.subscribe(), scheduler.clone(), settings.clone());

    info!("Daemon started");
    let (_, delivery_result, listener_result, loop_result) = tokio::join!(
        shutdown::detect_shutdown(shutdown_token.clone()),
        delivery.run(),
        reminder_listener.run(shutdown_token.clone()),
        daemon_loop(
            controller,
            scheduler,
            settings,
            settings_path,
            shutdown_token.clone(),
        ),
    );

    if let Err(e) = delivery_result {
        error!("Notification delivery got an error {e:?}");
    }
    if let Err(e) = listener_result {
        error!("Reminder listener got an error {e:?}");
    }
    if let Err(e) = loop_result {
        error!("Timer loop got an error {e:?}");
    }

    Ok(())
}

/// Owns the timer controller: ticks it, reconciles it against the store, and re-asserts
/// reminders when the settings file changes underneath the daemon. Store outages are logged and
/// retried on the next cadence instead of taking the daemon down.
async fn daemon_loop(
    mut controller: SessionTimerController,
    scheduler: ReminderScheduler,
    settings: Arc<dyn SettingsStore>,
    settings_path: PathBuf,
    shutdown: CancellationToken,
) -> Result<()> {
    assert_weekly(&scheduler, settings.as_ref()).await;
    if let Err(e) = controller.reconcile().await {
        warn!("Initial reconciliation failed: {e:?}");
    }

    let mut tick = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
    tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut reconcile = interval_at(Instant::now() + RECONCILE_INTERVAL, RECONCILE_INTERVAL);
    let mut settings_poll = interval_at(
        Instant::now() + SETTINGS_POLL_INTERVAL,
        SETTINGS_POLL_INTERVAL,
    );
    let mut settings_stamp = settings_mtime(&settings_path);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                debug!("Shutting down the timer loop");
                return Ok(());
            }
            _ = tick.tick() => controller.tick(),
            _ = reconcile.tick() => {
                if let Err(e) = controller.reconcile().await {
                    warn!("Reconciliation failed: {e:?}");
                }
            }
            _ = settings_poll.tick() => {
                let stamp = settings_mtime(&settings_path);
                if stamp != settings_stamp {
                    settings_stamp = stamp;
                    info!("Settings changed, re-asserting reminders");
                    assert_weekly(&scheduler, settings.as_ref()).await;
                    realign_interval(&controller, &scheduler, settings.as_ref()).await;
                }
            }
        }
    }
}

async fn assert_weekly(scheduler: &ReminderScheduler, settings: &dyn SettingsStore) {
    match config::load_reminder(settings).await {
        Ok(reminder) => {
            if let Err(e) = scheduler.schedule_weekly(&reminder).await {
                warn!("Failed to schedule the weekly reminder: {e:?}");
            }
        }
        Err(e) => warn!("Failed to load reminder settings: {e:?}"),
    }
}

async fn realign_interval(
    controller: &SessionTimerController,
    scheduler: &ReminderScheduler,
    settings: &dyn SettingsStore,
) {
    let result = match config::load_interval(settings).await {
        Ok(interval) if controller.state().is_running() => {
            scheduler
                .schedule_interval(controller.state().elapsed(), &interval)
                .await
        }
        Ok(_) => scheduler.cancel_interval().await,
        Err(e) => Err(e),
    };
    if let Err(e) = result {
        warn!("Failed to realign interval reminders: {e:?}");
    }
}

fn settings_mtime(path: &Path) -> Option<std::time::SystemTime> {
    std::fs::metadata(path).and_then(|meta| meta.modified()).ok()
}
