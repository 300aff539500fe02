use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Local, NaiveDate, Offset, Utc};
use tokio::time::Instant;

/// Represents an entity responsible for providing dates across application. This can allow it to
/// be used for testing
#[async_trait]
pub trait Clock: Sync + Send + 'static {
    fn time(&self) -> DateTime<Utc>;

    /// Offset of the local timezone. Kept separate from [Clock::time] so that day bucketing can be
    /// checked against timezones far ahead of UTC.
    fn local_offset(&self) -> FixedOffset;

    fn instant(&self) -> Instant;

    async fn sleep(&self, duration: Duration);

    async fn sleep_until(&self, instant: tokio::time::Instant);

    /// Current moment expressed in the local timezone.
    fn local_time(&self) -> DateTime<FixedOffset> {
        self.time().with_timezone(&self.local_offset())
    }

    /// The local calendar day. Sessions are bucketed by this, never by the UTC date, so a session
    /// started at 00:30 in UTC+9 lands on the local day instead of the previous one.
    fn today(&self) -> NaiveDate {
        self.local_time().date_naive()
    }
}

pub struct DefaultClock;

#[async_trait]
impl Clock for DefaultClock {
    fn time(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn local_offset(&self) -> FixedOffset {
        Local::now().offset().fix()
    }

    fn instant(&self) -> Instant {
        Instant::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }

    async fn sleep_until(&self, instant: tokio::time::Instant) {
        tokio::time::sleep_until(instant).await;
    }
}

#[cfg(test)]
pub mod test_support {
    use std::time::Duration;

    use async_trait::async_trait;
    use chrono::{DateTime, FixedOffset, TimeZone, Utc};
    use tokio::time::Instant;

    use super::Clock;

    /// Clock with a fixed starting point that advances with tokio's (possibly paused) runtime
    /// time. The offset defaults to UTC+9 to keep day-boundary mistakes visible in tests.
    #[derive(Clone)]
    pub struct TestClock {
        start_time: DateTime<Utc>,
        reference: Instant,
        offset: FixedOffset,
    }

    impl TestClock {
        pub fn starting_at(start_time: DateTime<Utc>) -> Self {
            Self {
                start_time,
                reference: Instant::now(),
                offset: FixedOffset::east_opt(9 * 3600).unwrap(),
            }
        }

        pub fn with_offset(mut self, offset: FixedOffset) -> Self {
            self.offset = offset;
            self
        }
    }

    impl Default for TestClock {
        fn default() -> Self {
            Self::starting_at(Utc.with_ymd_and_hms(2024, 4, 5, 12, 0, 0).unwrap())
        }
    }

    #[async_trait]
    impl Clock for TestClock {
        fn time(&self) -> DateTime<Utc> {
            self.start_time + self.reference.elapsed()
        }

        fn local_offset(&self) -> FixedOffset {
            self.offset
        }

        fn instant(&self) -> Instant {
            Instant::now()
        }

        async fn sleep(&self, duration: Duration) {
            tokio::time::sleep(duration).await;
        }

        async fn sleep_until(&self, instant: tokio::time::Instant) {
            tokio::time::sleep_until(instant).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{FixedOffset, NaiveDate, TimeZone, Utc};

    use super::{test_support::TestClock, Clock};

    #[tokio::test]
    async fn today_uses_local_day_not_utc_day() {
        // 15:30 UTC is already 00:30 of the next day in UTC+9.
        let clock = TestClock::starting_at(Utc.with_ymd_and_hms(2024, 4, 5, 15, 30, 0).unwrap());

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 4, 6).unwrap());
        assert_eq!(
            clock.time().date_naive(),
            NaiveDate::from_ymd_opt(2024, 4, 5).unwrap()
        );
    }

    #[tokio::test]
    async fn today_matches_utc_when_offset_is_zero() {
        let clock = TestClock::starting_at(Utc.with_ymd_and_hms(2024, 4, 5, 15, 30, 0).unwrap())
            .with_offset(FixedOffset::east_opt(0).unwrap());

        assert_eq!(clock.today(), NaiveDate::from_ymd_opt(2024, 4, 5).unwrap());
    }
}
