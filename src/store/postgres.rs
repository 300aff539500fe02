use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::PgPool;

use super::{DaySummary, NewSession, SessionStore, WorkSession};

/// The main realization of [SessionStore], backed by a Postgres table.
pub struct PgSessionStore {
    pool: PgPool,
}

impl PgSessionStore {
    pub async fn connect(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS work_sessions (
                id BIGSERIAL PRIMARY KEY,
                start_time TIMESTAMP WITH TIME ZONE NOT NULL,
                end_time TIMESTAMP WITH TIME ZONE,
                duration BIGINT NOT NULL DEFAULT 0,
                date DATE NOT NULL
            )
            "#,
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            r#"
            CREATE INDEX IF NOT EXISTS work_sessions_date_idx ON work_sessions (date)
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert_session(&self, session: NewSession) -> Result<WorkSession> {
        let inserted = sqlx::query_as::<_, WorkSession>(
            "INSERT INTO work_sessions (start_time, end_time, duration, date) \
             VALUES ($1, $2, $3, $4) \
             RETURNING id, start_time, end_time, duration, date",
        )
        .bind(session.start_time)
        .bind(session.end_time)
        .bind(session.duration)
        .bind(session.date)
        .fetch_one(&self.pool)
        .await?;
        Ok(inserted)
    }

    async fn end_session(
        &self,
        id: i64,
        end_time: DateTime<Utc>,
        duration: i64,
    ) -> Result<WorkSession> {
        let updated = sqlx::query_as::<_, WorkSession>(
            "UPDATE work_sessions SET end_time = $1, duration = $2 WHERE id = $3 \
             RETURNING id, start_time, end_time, duration, date",
        )
        .bind(end_time)
        .bind(duration)
        .bind(id)
        .fetch_one(&self.pool)
        .await?;
        Ok(updated)
    }

    async fn ongoing_session(&self, date: NaiveDate) -> Result<Option<WorkSession>> {
        let session = sqlx::query_as::<_, WorkSession>(
            "SELECT id, start_time, end_time, duration, date FROM work_sessions \
             WHERE date = $1 AND end_time IS NULL \
             ORDER BY id DESC LIMIT 1",
        )
        .bind(date)
        .fetch_optional(&self.pool)
        .await?;
        Ok(session)
    }

    async fn day_total(&self, date: NaiveDate) -> Result<i64> {
        let total: i64 = sqlx::query_scalar(
            "SELECT COALESCE(SUM(duration), 0)::BIGINT FROM work_sessions \
             WHERE date = $1 AND end_time IS NOT NULL",
        )
        .bind(date)
        .fetch_one(&self.pool)
        .await?;
        Ok(total)
    }

    async fn day_summaries(&self, start: NaiveDate, end: NaiveDate) -> Result<Vec<DaySummary>> {
        let summaries = sqlx::query_as::<_, DaySummary>(
            "SELECT date, COALESCE(SUM(duration), 0)::BIGINT AS duration FROM work_sessions \
             WHERE date >= $1 AND date <= $2 AND end_time IS NOT NULL \
             GROUP BY date ORDER BY date",
        )
        .bind(start)
        .bind(end)
        .fetch_all(&self.pool)
        .await?;
        Ok(summaries)
    }
}
