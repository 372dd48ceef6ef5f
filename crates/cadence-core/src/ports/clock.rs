//! Clock port - time and timers.
//!
//! Scheduled-time gating, retry delays, timeouts and the loop's idle waits all
//! go through this trait, so tests can drive time by hand with [`FixedClock`].

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::watch;

#[async_trait]
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;

    /// Resolve once `duration` has elapsed on this clock.
    async fn sleep(&self, duration: Duration);
}

/// `instant + duration`, saturating at the end of representable time.
pub fn add_duration(instant: DateTime<Utc>, duration: Duration) -> DateTime<Utc> {
    chrono::Duration::from_std(duration)
        .ok()
        .and_then(|d| instant.checked_add_signed(d))
        .unwrap_or(DateTime::<Utc>::MAX_UTC)
}

/// Time from `now` until `instant`, zero if it has passed.
pub fn until(now: DateTime<Utc>, instant: DateTime<Utc>) -> Duration {
    (instant - now).to_std().unwrap_or(Duration::ZERO)
}

/// Wall clock backed by the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

#[async_trait]
impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Manually driven clock.
///
/// `now()` only moves when [`FixedClock::advance`] or [`FixedClock::set`] is
/// called; pending sleepers wake as soon as their deadline is reached.
pub struct FixedClock {
    now: Mutex<DateTime<Utc>>,
    tick: watch::Sender<DateTime<Utc>>,
}

impl FixedClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        let (tick, _) = watch::channel(start);
        Self {
            now: Mutex::new(start),
            tick,
        }
    }

    pub fn set(&self, instant: DateTime<Utc>) {
        let mut now = self.now.lock().unwrap_or_else(|e| e.into_inner());
        *now = instant;
        self.tick.send_replace(instant);
    }

    pub fn advance(&self, duration: Duration) {
        let next = add_duration(self.now(), duration);
        self.set(next);
    }
}

#[async_trait]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn sleep(&self, duration: Duration) {
        let mut rx = self.tick.subscribe();
        let deadline = add_duration(*rx.borrow_and_update(), duration);
        loop {
            if *rx.borrow_and_update() >= deadline {
                return;
            }
            // The sender lives as long as the clock, so this only errors
            // if the clock is being torn down.
            if rx.changed().await.is_err() {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::sync::Arc;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    #[test]
    fn fixed_clock_only_moves_when_advanced() {
        let clock = FixedClock::new(epoch());
        assert_eq!(clock.now(), epoch());
        clock.advance(Duration::from_secs(90));
        assert_eq!(clock.now(), epoch() + chrono::Duration::seconds(90));
    }

    #[tokio::test]
    async fn fixed_clock_sleep_wakes_on_advance() {
        let clock = Arc::new(FixedClock::new(epoch()));
        let sleeper = tokio::spawn({
            let clock = Arc::clone(&clock);
            async move { clock.sleep(Duration::from_secs(10)).await }
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        clock.advance(Duration::from_secs(5));
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!sleeper.is_finished());

        clock.advance(Duration::from_secs(5));
        tokio::time::timeout(Duration::from_secs(1), sleeper)
            .await
            .expect("sleeper should wake")
            .unwrap();
    }

    #[tokio::test]
    async fn zero_sleep_returns_immediately() {
        let clock = FixedClock::new(epoch());
        tokio::time::timeout(Duration::from_millis(100), clock.sleep(Duration::ZERO))
            .await
            .expect("zero sleep must not wait");
    }

    #[test]
    fn until_is_zero_for_past_instants() {
        let now = epoch();
        assert_eq!(until(now, now - chrono::Duration::seconds(1)), Duration::ZERO);
        assert_eq!(
            until(now, add_duration(now, Duration::from_millis(300))),
            Duration::from_millis(300)
        );
    }
}
