//! Durable session records. The timer treats the store as the source of truth: on resume the
//! elapsed time is always rebuilt from the stored `start_time`, never from an in-process counter.
//! [postgres::PgSessionStore] is the production realization, [memory::MemorySessionStore] backs
//! tests.

pub mod memory;
pub mod postgres;

pub use memory::MemorySessionStore;
pub use postgres::PgSessionStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// One work session row.
///
/// `end_time` is None exactly while the session is ongoing; `duration` stays 0 until the session
/// is ended, at which point it becomes `end_time - start_time` in whole seconds. `date` is the
/// local calendar day the session belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct WorkSession {
    pub id: i64,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: i64,
    pub date: NaiveDate,
}

impl WorkSession {
    pub fn is_ongoing(&self) -> bool {
        self.end_time.is_none()
    }
}

/// Insert shape for a new session. Only a start moment and a day are free; a fresh session is
/// always ongoing with zero duration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewSession {
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub duration: i64,
    pub date: NaiveDate,
}

impl NewSession {
    pub fn starting_at(start_time: DateTime<Utc>, date: NaiveDate) -> Self {
        Self {
            start_time,
            end_time: None,
            duration: 0,
            date,
        }
    }
}

/// Per-day aggregation used by history views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct DaySummary {
    pub date: NaiveDate,
    pub duration: i64,
}

/// Contract for the remote session table.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SessionStore: Send + Sync + 'static {
    async fn insert_session(&self, session: NewSession) -> Result<WorkSession>;

    /// Completes a session, setting its end moment and final duration in seconds.
    async fn end_session(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        duration: i64,
    ) -> Result<WorkSession>;

    /// The most recently started session of `date` that has no end time, if any.
    async fn ongoing_session(&self, date: NaiveDate) -> Result<Option<WorkSession>>;

    /// Sum of completed durations for a day, in seconds.
    async fn day_total(&self, date: NaiveDate) -> Result<i64>;

    /// Completed-duration sums per day over an inclusive date range.
    async fn day_summaries(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DaySummary>>;
}
