//! Error-count circuit breaker backing [`DegradeRule`].
//!
//! States:
//! - Closed: requests pass, errors are counted
//! - Open: requests are blocked until the recovery timeout elapses
//! - Half-Open: a single probe passes; its outcome closes or reopens

use std::sync::Mutex;

use tracing::{info, warn};

use super::rule::DegradeRule;
use super::window::{MetricEvent, SlidingWindow};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug)]
struct BreakerState {
    state: CircuitState,
    opened_at: u64,
    probe_in_flight: bool,
}

#[derive(Debug)]
pub struct CircuitBreaker {
    rule: DegradeRule,
    errors: SlidingWindow,
    inner: Mutex<BreakerState>,
}

impl CircuitBreaker {
    pub fn new(rule: DegradeRule, bucket_count: u32) -> Self {
        let errors = SlidingWindow::new(rule.stat_interval_ms, bucket_count);
        Self {
            rule,
            errors,
            inner: Mutex::new(BreakerState {
                state: CircuitState::Closed,
                opened_at: 0,
                probe_in_flight: false,
            }),
        }
    }

    pub fn rule(&self) -> &DegradeRule {
        &self.rule
    }

    pub fn state(&self) -> CircuitState {
        self.inner.lock().unwrap_or_else(|p| p.into_inner()).state
    }

    /// Whether a request may pass at `now`. Grants the half-open probe.
    pub fn try_pass(&self, now: u64) -> bool {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match inner.state {
            CircuitState::Closed => true,
            CircuitState::Open => {
                if now >= inner.opened_at + self.rule.recovery_timeout_ms {
                    info!(resource = %self.rule.resource, "circuit breaker half-open, probing");
                    inner.state = CircuitState::HalfOpen;
                    inner.probe_in_flight = true;
                    true
                } else {
                    false
                }
            }
            CircuitState::HalfOpen => {
                if inner.probe_in_flight {
                    false
                } else {
                    inner.probe_in_flight = true;
                    true
                }
            }
        }
    }

    /// Give back a probe that was granted but never used.
    pub fn release_probe(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        if inner.state == CircuitState::HalfOpen {
            inner.probe_in_flight = false;
        }
    }

    /// Record the outcome of a request that passed.
    pub fn on_complete(&self, now: u64, failed: bool) {
        let mut inner = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        match inner.state {
            CircuitState::Closed => {
                if failed {
                    self.errors.add(MetricEvent::Error, now, 1);
                    let errors = self.errors.sum(MetricEvent::Error, now);
                    if errors >= self.rule.error_count {
                        warn!(
                            resource = %self.rule.resource,
                            errors,
                            "circuit breaker opening"
                        );
                        inner.state = CircuitState::Open;
                        inner.opened_at = now;
                    }
                }
            }
            CircuitState::HalfOpen => {
                inner.probe_in_flight = false;
                if failed {
                    warn!(resource = %self.rule.resource, "probe failed, circuit breaker reopening");
                    inner.state = CircuitState::Open;
                    inner.opened_at = now;
                } else {
                    info!(resource = %self.rule.resource, "probe succeeded, circuit breaker closing");
                    inner.state = CircuitState::Closed;
                    self.errors.reset();
                }
            }
            CircuitState::Open => {}
        }
    }
}
