use std::sync::Arc;

use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use tokio::sync::broadcast;
use tracing::{debug, info};

use super::SessionEvent;
use crate::store::{NewSession, SessionStore, WorkSession};
use crate::utils::clock::Clock;

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimerState {
    Idle,
    Running { session: WorkSession, elapsed: i64 },
}

impl TimerState {
    pub fn is_running(&self) -> bool {
        matches!(self, TimerState::Running { .. })
    }

    pub fn elapsed(&self) -> i64 {
        match self {
            TimerState::Idle => 0,
            TimerState::Running { elapsed, .. } => *elapsed,
        }
    }
}

/// What a reconciliation pass concluded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReconcileOutcome {
    Running { elapsed: i64 },
    Idle,
    /// A start or stop landed while the store was being queried, so the response no longer
    /// describes the current state and was dropped.
    Discarded,
}

/// Owns the timer state machine. The store is the source of truth: every transition happens
/// remotely first and mutates local state only once the store call has succeeded, and
/// [SessionTimerController::reconcile] rebuilds local state from the store whenever the two may
/// have drifted apart (process restart, another client starting or stopping sessions).
pub struct SessionTimerController {
    store: Arc<dyn SessionStore>,
    clock: Arc<dyn Clock>,
    events: broadcast::Sender<SessionEvent>,
    state: TimerState,
    // Bumped by every local transition. Reconciliation captures it before calling the store and
    // discards the response if it changed underneath.
    generation: u64,
    today_total: i64,
}

impl SessionTimerController {
    pub fn new(store: Arc<dyn SessionStore>, clock: Arc<dyn Clock>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            store,
            clock,
            events,
            state: TimerState::Idle,
            generation: 0,
            today_total: 0,
        }
    }

    pub fn state(&self) -> &TimerState {
        &self.state
    }

    /// Completed seconds recorded for the current local day, not counting a running session.
    pub fn today_total(&self) -> i64 {
        self.today_total
    }

    /// Completed seconds plus whatever the running session has accumulated.
    pub fn today_including_current(&self) -> i64 {
        self.today_total + self.state.elapsed()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Starts a new session on the current local day. The row is created remotely before any
    /// local state changes, so a store failure leaves the timer idle.
    pub async fn start(&mut self) -> Result<WorkSession> {
        if self.state.is_running() {
            bail!("A session is already running");
        }
        let now = self.clock.time();
        let session = self
            .store
            .insert_session(NewSession::starting_at(now, self.clock.today()))
            .await?;
        self.generation += 1;
        self.state = TimerState::Running {
            session: session.clone(),
            elapsed: 0,
        };
        let _ = self.events.send(SessionEvent::Started);
        info!("Started session {}", session.id);
        Ok(session)
    }

    /// Completes the running session. The final duration is recomputed from the stored start
    /// time rather than taken from the tick counter, so a drifted or suspended process still
    /// records the wall-clock length. A store failure leaves the session running locally.
    pub async fn stop(&mut self) -> Result<WorkSession> {
        let (id, start_time) = match &self.state {
            TimerState::Running { session, .. } => (session.id, session.start_time),
            TimerState::Idle => bail!("No session is running"),
        };
        let now = self.clock.time();
        let duration = (now - start_time).num_seconds().max(0);
        let completed = self.store.end_session(id, now, duration).await?;
        self.generation += 1;
        self.today_total += completed.duration;
        self.state = TimerState::Idle;
        let _ = self.events.send(SessionEvent::Stopped {
            elapsed: completed.duration,
        });
        info!("Stopped session {} after {}s", completed.id, completed.duration);
        Ok(completed)
    }

    /// Advances the display counter by one second. Purely cosmetic between reconciliations.
    pub fn tick(&mut self) {
        if let TimerState::Running { elapsed, .. } = &mut self.state {
            *elapsed += 1;
        }
    }

    /// Re-derives local state from the store: the ongoing session for the local day (with its
    /// elapsed time reconstructed from the stored start moment) and the completed total for
    /// that day.
    pub async fn reconcile(&mut self) -> Result<ReconcileOutcome> {
        let generation = self.generation;
        let today = self.clock.today();
        let ongoing = self.store.ongoing_session(today).await?;
        let today_total = self.store.day_total(today).await?;
        Ok(self.apply_reconcile(generation, self.clock.time(), ongoing, today_total))
    }

    /// Pure application step of [SessionTimerController::reconcile], separated so the staleness
    /// handling is testable without racing real tasks.
    fn apply_reconcile(
        &mut self,
        generation: u64,
        now: DateTime<Utc>,
        ongoing: Option<WorkSession>,
        today_total: i64,
    ) -> ReconcileOutcome {
        if generation != self.generation {
            debug!("Discarding stale reconciliation response");
            return ReconcileOutcome::Discarded;
        }
        self.today_total = today_total;
        match ongoing {
            Some(session) => {
                let elapsed = (now - session.start_time).num_seconds().max(0);
                let newly_observed = match &self.state {
                    TimerState::Running { session: current, .. } => current.id != session.id,
                    TimerState::Idle => true,
                };
                self.state = TimerState::Running { session, elapsed };
                if newly_observed {
                    info!("Resumed a session with {elapsed}s already elapsed");
                    let _ = self.events.send(SessionEvent::Resumed { elapsed });
                }
                ReconcileOutcome::Running { elapsed }
            }
            None => {
                let was_running = self.state.is_running();
                self.state = TimerState::Idle;
                if was_running {
                    info!("Tracked session is gone from the store, back to idle");
                    let _ = self.events.send(SessionEvent::Idle);
                }
                ReconcileOutcome::Idle
            }
        }
    }
}
