// Jaskier Shared Pattern -- circuit breaker
// Per-provider failure tracking with cooldown. In-process, atomics-only
// fast path; a short critical section only while actually flipping state.

use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct CircuitBreaker {
    threshold: u32,
    cooldown: Duration,
    consecutive_failures: AtomicU32,
    /// `None` = closed. `Some(instant)` = open, tripped at this instant.
    tripped_at: RwLock<Option<Instant>>,
}

impl CircuitBreaker {
    pub fn new(threshold: u32, cooldown: Duration) -> Self {
        Self {
            threshold,
            cooldown,
            consecutive_failures: AtomicU32::new(0),
            tripped_at: RwLock::new(None),
        }
    }

    /// May this provider be called now? In OPEN, returns true once the
    /// cooldown has elapsed — that first admitted call is the probe; its
    /// outcome (via `on_success`/`on_failure`) decides whether the circuit
    /// closes or stays open with a refreshed trip time.
    pub async fn allow(&self) -> bool {
        let guard = self.tripped_at.read().await;
        match *guard {
            None => true,
            Some(tripped) => tripped.elapsed() > self.cooldown,
        }
    }

    pub async fn on_success(&self) {
        self.consecutive_failures.store(0, Ordering::Relaxed);
        let mut guard = self.tripped_at.write().await;
        if guard.is_some() {
            tracing::info!("circuit_breaker: probe succeeded, closing circuit");
        }
        *guard = None;
    }

    pub async fn on_failure(&self) {
        let count = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if count >= self.threshold {
            let mut guard = self.tripped_at.write().await;
            tracing::warn!(failures = count, "circuit_breaker: tripped, entering cooldown");
            *guard = Some(Instant::now());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn closed_by_default_allows_requests() {
        let breaker = CircuitBreaker::new(3, Duration::from_millis(50));
        assert!(breaker.allow().await);
    }

    #[tokio::test]
    async fn trips_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        breaker.on_failure().await;
        breaker.on_failure().await;
        assert!(breaker.allow().await, "not tripped yet");
        breaker.on_failure().await;
        assert!(!breaker.allow().await, "should be open after threshold");
    }

    #[tokio::test]
    async fn success_resets_the_circuit() {
        let breaker = CircuitBreaker::new(2, Duration::from_secs(60));
        breaker.on_failure().await;
        breaker.on_success().await;
        breaker.on_failure().await;
        assert!(breaker.allow().await, "single failure after reset shouldn't trip");
    }

    #[tokio::test]
    async fn probe_is_allowed_after_cooldown_and_closes_on_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.on_failure().await;
        assert!(!breaker.allow().await);
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow().await, "probe should be admitted after cooldown");
        breaker.on_success().await;
        assert!(breaker.allow().await);
    }

    #[tokio::test]
    async fn probe_failure_keeps_circuit_open_with_refreshed_cooldown() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(20));
        breaker.on_failure().await;
        tokio::time::sleep(Duration::from_millis(30)).await;
        assert!(breaker.allow().await);
        breaker.on_failure().await;
        assert!(!breaker.allow().await, "failed probe should re-trip the breaker");
    }
}
