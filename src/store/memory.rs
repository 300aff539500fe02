use std::collections::BTreeMap;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use tokio::sync::Mutex;

use super::{DaySummary, NewSession, SessionStore, WorkSession};

/// In-memory [SessionStore]. Exists for tests; behaves like the Postgres realization down to
/// the completed-only aggregation rules.
#[derive(Default)]
pub struct MemorySessionStore {
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    next_id: i64,
    rows: Vec<WorkSession>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sessions(&self) -> Vec<WorkSession> {
        self.inner.lock().await.rows.clone()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert_session(&self, session: NewSession) -> Result<WorkSession> {
        let mut inner = self.inner.lock().await;
        inner.next_id += 1;
        let row = WorkSession {
            id: inner.next_id,
            start_time: session.start_time,
            end_time: session.end_time,
            duration: session.duration,
            date: session.date,
        };
        inner.rows.push(row.clone());
        Ok(row)
    }

    async fn end_session(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        duration: i64,
    ) -> Result<WorkSession> {
        let mut inner = self.inner.lock().await;
        let Some(row) = inner.rows.iter_mut().find(|r| r.id == id) else {
            bail!("no session with id {id}");
        };
        row.end_time = Some(end_time);
        row.duration = duration;
        Ok(row.clone())
    }

    async fn ongoing_session(&self, date: NaiveDate) -> Result<Option<WorkSession>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.date == date && r.is_ongoing())
            .max_by_key(|r| r.id)
            .cloned())
    }

    async fn day_total(&self, date: NaiveDate) -> Result<i64> {
        let inner = self.inner.lock().await;
        Ok(inner
            .rows
            .iter()
            .filter(|r| r.date == date && !r.is_ongoing())
            .map(|r| r.duration)
            .sum())
    }

    async fn day_summaries(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DaySummary>> {
        let inner = self.inner.lock().await;
        let mut by_day = BTreeMap::<NaiveDate, i64>::new();
        for row in inner
            .rows
            .iter()
            .filter(|r| r.date >= start && r.date <= end && !r.is_ongoing())
        {
            *by_day.entry(row.date).or_default() += row.duration;
        }
        Ok(by_day
            .into_iter()
            .map(|(date, duration)| DaySummary { date, duration })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use anyhow::Result;
    use chrono::{Duration, NaiveDate, TimeZone, Utc};

    use crate::store::{memory::MemorySessionStore, NewSession, SessionStore};

    #[tokio::test]
    async fn ongoing_picks_latest_open_session() -> Result<()> {
        let store = MemorySessionStore::new();
        let date = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();

        let first = store
            .insert_session(NewSession::starting_at(start, date))
            .await?;
        store
            .end_session(first.id, start + Duration::seconds(30), 30)
            .await?;
        let second = store
            .insert_session(NewSession::starting_at(start + Duration::hours(1), date))
            .await?;

        let ongoing = store.ongoing_session(date).await?;
        assert_eq!(ongoing.map(|s| s.id), Some(second.id));
        Ok(())
    }

    #[tokio::test]
    async fn summaries_group_completed_durations_by_day() -> Result<()> {
        let store = MemorySessionStore::new();
        let day_a = NaiveDate::from_ymd_opt(2024, 4, 5).unwrap();
        let day_b = NaiveDate::from_ymd_opt(2024, 4, 6).unwrap();
        let start = Utc.with_ymd_and_hms(2024, 4, 5, 9, 0, 0).unwrap();

        for (date, duration) in [(day_a, 60), (day_a, 30), (day_b, 10)] {
            let session = store
                .insert_session(NewSession::starting_at(start, date))
                .await?;
            store
                .end_session(session.id, start + Duration::seconds(duration), duration)
                .await?;
        }
        // Ongoing sessions are invisible to history.
        store
            .insert_session(NewSession::starting_at(start, day_b))
            .await?;

        let summaries = store.day_summaries(day_a, day_b).await?;
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].duration, 90);
        assert_eq!(summaries[1].duration, 10);
        Ok(())
    }
}
