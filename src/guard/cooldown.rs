//! Per-user-per-command cooldown tracking.

use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
    time::Duration,
};

use log::{debug, info};
use tokio::time::{self, Instant};

type CooldownKey = (String, String);

/// Outcome of a failed [`CooldownTracker::acquire`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcquireError<E> {
    /// The caller used the command too recently.
    OnCooldown(Duration),
    /// The cooldown was clear but the follow-up check rejected the call.
    Rejected(E),
}

/// Concurrency-safe map from `(caller, command)` to the instant of the last
/// successful pass.
///
/// Clones share the same underlying map.
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    records: Arc<Mutex<HashMap<CooldownKey, Instant>>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Atomically checks the cooldown, runs `check`, and records `now` on success.
    ///
    /// The lock is held across the cooldown read, the call to `check` and the
    /// write, so `check` must be cheap and must not block. Nothing is written when
    /// either the cooldown or `check` rejects.
    ///
    /// # Errors
    ///
    /// * [`AcquireError::OnCooldown`] with the exact remaining duration
    /// * [`AcquireError::Rejected`] with the error returned by `check`
    pub fn acquire<E>(
        &self,
        caller_id: &str,
        command: &str,
        window: Duration,
        now: Instant,
        check: impl FnOnce() -> Result<(), E>,
    ) -> Result<(), AcquireError<E>> {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(remaining) = Self::remaining_in(&records, caller_id, command, window, now) {
            debug!(
                "{} is on cooldown for {} ({}ms left)",
                caller_id,
                command,
                remaining.as_millis()
            );
            return Err(AcquireError::OnCooldown(remaining));
        }

        check().map_err(AcquireError::Rejected)?;

        records.insert((caller_id.to_owned(), command.to_owned()), now);
        Ok(())
    }

    /// Removes records whose last pass is older than `max_age`.
    ///
    /// Returns the number of evicted records.
    pub fn evict_older_than(&self, max_age: Duration, now: Instant) -> usize {
        let mut records = self.records.lock().unwrap_or_else(PoisonError::into_inner);
        let before = records.len();
        records.retain(|_, last| now.saturating_duration_since(*last) < max_age);
        before - records.len()
    }

    /// Number of tracked `(caller, command)` pairs.
    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Spawns a background task evicting stale records every `period`.
    ///
    /// The task runs until the process ends.
    pub fn start_eviction_task(&self, max_age: Duration, period: Duration) {
        let tracker = self.clone();

        tokio::spawn(async move {
            let mut interval = time::interval(period);
            loop {
                interval.tick().await;
                let evicted = tracker.evict_older_than(max_age, Instant::now());
                if evicted > 0 {
                    info!("evicted {} stale cooldown records", evicted);
                }
            }
        });
    }

    fn remaining_in(
        records: &HashMap<CooldownKey, Instant>,
        caller_id: &str,
        command: &str,
        window: Duration,
        now: Instant,
    ) -> Option<Duration> {
        let last = records.get(&(caller_id.to_owned(), command.to_owned()))?;
        let elapsed = now.saturating_duration_since(*last);
        (elapsed < window).then(|| window - elapsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WINDOW: Duration = Duration::from_secs(5);

    fn pass() -> Result<(), ()> {
        Ok(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_acquire_passes_and_records() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();

        assert!(tracker.acquire("u1", "ping", WINDOW, now, pass).is_ok());
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_acquire_within_window_reports_exact_remaining() {
        let tracker = CooldownTracker::new();
        let start = Instant::now();
        tracker.acquire("u1", "ping", WINDOW, start, pass).unwrap();

        let later = start + Duration::from_millis(1200);
        let result = tracker.acquire("u1", "ping", WINDOW, later, pass);

        assert_eq!(
            result,
            Err(AcquireError::OnCooldown(Duration::from_millis(3800)))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_acquire_after_window_passes() {
        let tracker = CooldownTracker::new();
        let start = Instant::now();
        tracker.acquire("u1", "ping", WINDOW, start, pass).unwrap();

        assert!(tracker.acquire("u1", "ping", WINDOW, start + WINDOW, pass).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cooldowns_are_per_user_and_per_command() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();
        tracker.acquire("u1", "ping", WINDOW, now, pass).unwrap();

        assert!(tracker.acquire("u2", "ping", WINDOW, now, pass).is_ok());
        assert!(tracker.acquire("u1", "help", WINDOW, now, pass).is_ok());
        assert_eq!(tracker.len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_check_does_not_record() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();

        let result = tracker.acquire("u1", "ban", WINDOW, now, || Err("denied"));

        assert_eq!(result, Err(AcquireError::Rejected("denied")));
        assert_eq!(tracker.len(), 0);
        assert!(tracker.acquire("u1", "ban", WINDOW, now, pass).is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_older_than() {
        let tracker = CooldownTracker::new();
        let start = Instant::now();
        tracker.acquire("old", "ping", WINDOW, start, pass).unwrap();
        tracker
            .acquire("recent", "ping", WINDOW, start + Duration::from_secs(3000), pass)
            .unwrap();

        let evicted =
            tracker.evict_older_than(Duration::from_secs(3600), start + Duration::from_secs(4000));

        assert_eq!(evicted, 1);
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_with_unbounded_age_keeps_everything() {
        let tracker = CooldownTracker::new();
        let start = Instant::now();
        tracker.acquire("u1", "ping", WINDOW, start, pass).unwrap();

        let evicted = tracker.evict_older_than(Duration::MAX, start + Duration::from_secs(86_400));

        assert_eq!(evicted, 0);
        assert_eq!(tracker.len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_eviction_task_runs_periodically() {
        let tracker = CooldownTracker::new();
        tracker
            .acquire("u1", "ping", WINDOW, Instant::now(), pass)
            .unwrap();

        tracker.start_eviction_task(Duration::from_secs(60), Duration::from_secs(30));
        time::sleep(Duration::from_secs(95)).await;

        assert_eq!(tracker.len(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_acquire_lets_exactly_one_pass() {
        let tracker = CooldownTracker::new();
        let now = Instant::now();

        let handles: Vec<_> = (0..16)
            .map(|_| {
                let tracker = tracker.clone();
                tokio::spawn(async move { tracker.acquire("u1", "daily", WINDOW, now, pass).is_ok() })
            })
            .collect();

        let mut passed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                passed += 1;
            }
        }

        assert_eq!(passed, 1);
    }
}
