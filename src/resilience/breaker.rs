//! Circuit breaker guarding a single provider.

use std::time::Duration;

use parking_lot::Mutex;
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

/// Breaker thresholds. Defaults trip for 30s after 5 consecutive failures.
#[derive(Clone, Copy, Debug)]
pub struct BreakerConfig {
    /// Consecutive wrapped-call failures before the circuit opens.
    pub failure_threshold: u32,
    /// How long the circuit stays open before admitting a probe.
    pub cooldown: Duration,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            cooldown: Duration::from_secs(30),
        }
    }
}

/// Observable breaker status.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CircuitStatus {
    Closed,
    Open,
    HalfOpen,
}

/// Admission outcome for a wrapped call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Admission {
    /// Normal admission while the circuit is closed.
    Admitted,
    /// Admitted as the single half-open probe.
    Probe,
}

/// Rejection returned while the circuit is open (or the probe slot is taken).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Error)]
#[error("circuit breaker is open")]
pub struct CircuitOpenRejection;

#[derive(Debug)]
struct CircuitState {
    status: CircuitStatus,
    consecutive_failures: u32,
    opened_at: Option<Instant>,
    probe_in_flight: bool,
}

/// Stateful guard shared by every call to one provider.
///
/// State machine: `Closed` → `Open` after `failure_threshold` consecutive
/// failures; `Open` → `HalfOpen` once the cooldown elapses, admitting exactly
/// one probe; a successful probe closes the circuit, a failed one re-opens it
/// and restarts the cooldown. While open, [`try_acquire`] rejects without the
/// caller touching the provider.
///
/// Transitions happen under one mutex, so concurrent callers observe a single
/// total order of states. The lock is never held across an `.await`.
///
/// [`try_acquire`]: CircuitBreaker::try_acquire
#[derive(Debug)]
pub struct CircuitBreaker {
    config: BreakerConfig,
    state: Mutex<CircuitState>,
}

impl CircuitBreaker {
    pub fn new(config: BreakerConfig) -> Self {
        Self {
            config,
            state: Mutex::new(CircuitState {
                status: CircuitStatus::Closed,
                consecutive_failures: 0,
                opened_at: None,
                probe_in_flight: false,
            }),
        }
    }

    pub fn status(&self) -> CircuitStatus {
        self.state.lock().status
    }

    /// Ask to perform one wrapped call. A rejection means the circuit is
    /// open (or the half-open probe slot is taken) and the call must fail
    /// without invoking the provider.
    pub fn try_acquire(&self) -> Result<Admission, CircuitOpenRejection> {
        let mut state = self.state.lock();
        match state.status {
            CircuitStatus::Closed => Ok(Admission::Admitted),
            CircuitStatus::Open => {
                let elapsed = state
                    .opened_at
                    .map(|at| at.elapsed())
                    .unwrap_or(Duration::ZERO);
                if elapsed < self.config.cooldown {
                    return Err(CircuitOpenRejection);
                }
                info!("circuit half-open, admitting probe");
                state.status = CircuitStatus::HalfOpen;
                state.probe_in_flight = true;
                Ok(Admission::Probe)
            }
            CircuitStatus::HalfOpen => {
                if state.probe_in_flight {
                    Err(CircuitOpenRejection)
                } else {
                    state.probe_in_flight = true;
                    Ok(Admission::Probe)
                }
            }
        }
    }

    /// Record a successful wrapped call.
    pub fn record_success(&self) {
        let mut state = self.state.lock();
        if state.status != CircuitStatus::Closed {
            info!("circuit closed");
        }
        state.status = CircuitStatus::Closed;
        state.consecutive_failures = 0;
        state.opened_at = None;
        state.probe_in_flight = false;
    }

    /// Record a failed wrapped call. Retries inside one wrapped call have
    /// already been exhausted by the time this is reported, so one call
    /// counts as one failure.
    pub fn record_failure(&self) {
        let mut state = self.state.lock();
        match state.status {
            CircuitStatus::HalfOpen => {
                warn!(cooldown = ?self.config.cooldown, "probe failed, circuit re-opened");
                state.status = CircuitStatus::Open;
                state.opened_at = Some(Instant::now());
                state.probe_in_flight = false;
            }
            CircuitStatus::Closed => {
                state.consecutive_failures += 1;
                if state.consecutive_failures >= self.config.failure_threshold {
                    warn!(
                        failures = state.consecutive_failures,
                        cooldown = ?self.config.cooldown,
                        "circuit open"
                    );
                    state.status = CircuitStatus::Open;
                    state.opened_at = Some(Instant::now());
                }
            }
            // A call admitted before the trip finished late; the circuit is
            // already open, nothing more to count.
            CircuitStatus::Open => {}
        }
    }

    /// Release an admitted probe without a verdict (the probe was cancelled
    /// before the provider answered). Leaves the circuit half-open so the
    /// next caller can probe instead.
    pub fn release_probe(&self) {
        let mut state = self.state.lock();
        if state.status == CircuitStatus::HalfOpen {
            state.probe_in_flight = false;
        }
    }
}
