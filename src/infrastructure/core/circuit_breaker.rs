use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{error, info, warn};

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,   // Upstream healthy - calls go through
    Open,     // Upstream considered down - callers serve fallback data
    HalfOpen, // Cooldown elapsed - a probe call decides
}

/// Tracks upstream availability across scan units.
///
/// Only unavailability (timeouts, transport errors, 5xx) counts as a failure;
/// rate limiting and bad symbols say nothing about reachability.
pub struct CircuitBreaker {
    state: RwLock<BreakerState>,
    failure_threshold: usize,
    success_threshold: usize,
    cooldown: Duration,
    name: String,
}

struct BreakerState {
    state: CircuitState,
    consecutive_failures: usize,
    probe_successes: usize,
    opened_at: Option<Instant>,
}

impl CircuitBreaker {
    /// * `failure_threshold` - consecutive failures before opening
    /// * `success_threshold` - successful probes in HalfOpen before closing
    /// * `cooldown` - time spent Open before probing again
    pub fn new(
        name: impl Into<String>,
        failure_threshold: usize,
        success_threshold: usize,
        cooldown: Duration,
    ) -> Self {
        Self {
            state: RwLock::new(BreakerState {
                state: CircuitState::Closed,
                consecutive_failures: 0,
                probe_successes: 0,
                opened_at: None,
            }),
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            cooldown,
            name: name.into(),
        }
    }

    /// Whether an upstream call may be made now. Moves Open -> HalfOpen once
    /// the cooldown has elapsed.
    pub async fn allow_request(&self) -> bool {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open => {
                let cooled = state
                    .opened_at
                    .is_none_or(|opened| opened.elapsed() >= self.cooldown);
                if cooled {
                    info!(
                        "CircuitBreaker [{}]: Transitioning Open -> HalfOpen (cooldown elapsed)",
                        self.name
                    );
                    state.state = CircuitState::HalfOpen;
                    state.probe_successes = 0;
                }
                cooled
            }
        }
    }

    pub async fn record_success(&self) {
        let mut state = self.state.write().await;
        match state.state {
            CircuitState::HalfOpen => {
                state.probe_successes += 1;
                if state.probe_successes >= self.success_threshold {
                    info!(
                        "CircuitBreaker [{}]: Transitioning HalfOpen -> Closed ({} probes ok)",
                        self.name, state.probe_successes
                    );
                    state.state = CircuitState::Closed;
                    state.consecutive_failures = 0;
                    state.probe_successes = 0;
                    state.opened_at = None;
                }
            }
            CircuitState::Closed => state.consecutive_failures = 0,
            // A call admitted before the breaker opened finished late
            CircuitState::Open => {}
        }
    }

    pub async fn record_failure(&self) {
        let mut state = self.state.write().await;
        state.consecutive_failures += 1;

        match state.state {
            CircuitState::Closed if state.consecutive_failures >= self.failure_threshold => {
                error!(
                    "CircuitBreaker [{}]: Transitioning Closed -> Open ({} consecutive failures)",
                    self.name, state.consecutive_failures
                );
                state.state = CircuitState::Open;
                state.opened_at = Some(Instant::now());
            }
            CircuitState::HalfOpen => {
                warn!(
                    "CircuitBreaker [{}]: Transitioning HalfOpen -> Open (probe failed)",
                    self.name
                );
                state.state = CircuitState::Open;
                state.probe_successes = 0;
                state.opened_at = Some(Instant::now());
            }
            _ => {}
        }
    }

    /// Get current circuit state
    pub async fn state(&self) -> CircuitState {
        self.state.read().await.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_circuit_opens_after_failures() {
        let cb = CircuitBreaker::new("test", 3, 1, Duration::from_secs(60));

        for _ in 0..3 {
            assert!(cb.allow_request().await);
            cb.record_failure().await;
        }

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
    }

    #[tokio::test]
    async fn test_success_resets_failure_streak() {
        let cb = CircuitBreaker::new("test", 2, 1, Duration::from_secs(60));
        cb.record_failure().await;
        cb.record_success().await;
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_circuit_recovers_after_cooldown() {
        let cb = CircuitBreaker::new("test", 2, 2, Duration::from_millis(50));
        cb.record_failure().await;
        cb.record_failure().await;
        assert_eq!(cb.state().await, CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.allow_request().await);
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::HalfOpen);
        cb.record_success().await;
        assert_eq!(cb.state().await, CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_halfopen_reopens_on_failure() {
        let cb = CircuitBreaker::new("test", 1, 1, Duration::from_millis(50));
        cb.record_failure().await;
        tokio::time::sleep(Duration::from_millis(80)).await;

        assert!(cb.allow_request().await);
        cb.record_failure().await;

        assert_eq!(cb.state().await, CircuitState::Open);
        assert!(!cb.allow_request().await);
    }
}
