// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Three-state circuit breaker.
//!
//! Closed counts consecutive failures and trips open at the threshold.
//! Open rejects until the open timeout passes, then admits probes
//! half-open. Half-open closes after enough consecutive successes and
//! re-opens on any failure. The optional `is_failure` classifier keeps
//! expected errors (a 404, say) out of the failure counts.

use hearth_core::{Clock, DomainError, SystemClock};
use parking_lot::Mutex;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl fmt::Display for BreakerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half-open",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum BreakerError {
    /// Rejected without running: the circuit is open.
    #[error("circuit open")]
    Open,

    /// Rejected without running: half-open probe slots are taken.
    #[error("too many requests while half-open")]
    TooManyProbes,

    /// The call ran and failed.
    #[error(transparent)]
    Inner(DomainError),
}

impl BreakerError {
    /// Whether the breaker itself rejected the call.
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::Open | Self::TooManyProbes)
    }

    /// Fold breaker rejections into the shared error kinds.
    pub fn into_domain(self) -> DomainError {
        match self {
            Self::Open | Self::TooManyProbes => DomainError::Unavailable(self.to_string()),
            Self::Inner(err) => err,
        }
    }
}

type FailureClassifier = Arc<dyn Fn(&DomainError) -> bool + Send + Sync>;
type StateChangeHook = Arc<dyn Fn(BreakerState, BreakerState) + Send + Sync>;

#[derive(Clone)]
pub struct BreakerConfig {
    /// Consecutive failures in closed state before tripping open.
    pub failure_threshold: u32,
    /// Consecutive half-open successes before closing.
    pub success_threshold: u32,
    /// How long open rejects before admitting probes.
    pub open_timeout: Duration,
    /// Concurrent probes admitted while half-open.
    pub max_half_open: u32,
    /// Returns false for errors that must not count as failures.
    pub is_failure: Option<FailureClassifier>,
    pub on_state_change: Option<StateChangeHook>,
}

impl BreakerConfig {
    pub fn new(
        failure_threshold: u32,
        success_threshold: u32,
        open_timeout: Duration,
        max_half_open: u32,
    ) -> Self {
        Self {
            failure_threshold: failure_threshold.max(1),
            success_threshold: success_threshold.max(1),
            open_timeout,
            max_half_open: max_half_open.max(1),
            is_failure: None,
            on_state_change: None,
        }
    }

    /// Profile for the learning-platform API.
    pub fn platform_api() -> Self {
        Self::new(3, 2, Duration::from_secs(60), 1)
    }

    /// Profile for the chat API.
    pub fn chat_api() -> Self {
        Self::new(5, 1, Duration::from_secs(30), 2)
    }

    /// Profile for database probes.
    pub fn database() -> Self {
        Self::new(3, 1, Duration::from_secs(10), 1)
    }

    pub fn with_classifier(
        mut self,
        is_failure: impl Fn(&DomainError) -> bool + Send + Sync + 'static,
    ) -> Self {
        self.is_failure = Some(Arc::new(is_failure));
        self
    }

    pub fn with_state_hook(
        mut self,
        hook: impl Fn(BreakerState, BreakerState) + Send + Sync + 'static,
    ) -> Self {
        self.on_state_change = Some(Arc::new(hook));
        self
    }
}

struct BreakerInner {
    state: BreakerState,
    consecutive_failures: u32,
    consecutive_successes: u32,
    last_failure: Option<Instant>,
    probes_in_flight: u32,
}

enum Admission {
    Closed,
    Probe,
}

/// Circuit breaker around one outbound dependency.
pub struct CircuitBreaker<C: Clock = SystemClock> {
    name: String,
    config: BreakerConfig,
    inner: Mutex<BreakerInner>,
    clock: C,
}

impl CircuitBreaker<SystemClock> {
    pub fn new(name: impl Into<String>, config: BreakerConfig) -> Self {
        Self::with_clock(name, config, SystemClock)
    }
}

impl<C: Clock> CircuitBreaker<C> {
    pub fn with_clock(name: impl Into<String>, config: BreakerConfig, clock: C) -> Self {
        Self {
            name: name.into(),
            config,
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                consecutive_failures: 0,
                consecutive_successes: 0,
                last_failure: None,
                probes_in_flight: 0,
            }),
            clock,
        }
    }

    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }

    fn transition(&self, inner: &mut BreakerInner, to: BreakerState) {
        let from = inner.state;
        if from == to {
            return;
        }
        match to {
            BreakerState::Open => warn!(breaker = %self.name, %from, "circuit opened"),
            BreakerState::HalfOpen => info!(breaker = %self.name, "circuit half-open"),
            BreakerState::Closed => info!(breaker = %self.name, "circuit closed"),
        }
        inner.state = to;
        inner.consecutive_failures = 0;
        inner.consecutive_successes = 0;
        inner.probes_in_flight = 0;
        if let Some(hook) = &self.config.on_state_change {
            hook(from, to);
        }
    }

    fn admit(&self) -> Result<Admission, BreakerError> {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => Ok(Admission::Closed),
            BreakerState::Open => {
                let elapsed = inner
                    .last_failure
                    .map(|at| self.clock.now().saturating_duration_since(at))
                    .unwrap_or(self.config.open_timeout);
                if elapsed >= self.config.open_timeout {
                    self.transition(&mut inner, BreakerState::HalfOpen);
                    inner.probes_in_flight = 1;
                    Ok(Admission::Probe)
                } else {
                    Err(BreakerError::Open)
                }
            }
            BreakerState::HalfOpen => {
                if inner.probes_in_flight < self.config.max_half_open {
                    inner.probes_in_flight += 1;
                    Ok(Admission::Probe)
                } else {
                    Err(BreakerError::TooManyProbes)
                }
            }
        }
    }

    fn settle(&self, admission: Admission, failed: bool) {
        let mut inner = self.inner.lock();
        if matches!(admission, Admission::Probe) {
            inner.probes_in_flight = inner.probes_in_flight.saturating_sub(1);
        }
        match (inner.state, failed) {
            (BreakerState::Closed, false) => {
                inner.consecutive_failures = 0;
            }
            (BreakerState::Closed, true) => {
                inner.consecutive_failures += 1;
                if inner.consecutive_failures >= self.config.failure_threshold {
                    inner.last_failure = Some(self.clock.now());
                    self.transition(&mut inner, BreakerState::Open);
                } else {
                    inner.last_failure = Some(self.clock.now());
                }
            }
            (BreakerState::HalfOpen, false) => {
                inner.consecutive_successes += 1;
                if inner.consecutive_successes >= self.config.success_threshold {
                    self.transition(&mut inner, BreakerState::Closed);
                }
            }
            (BreakerState::HalfOpen, true) => {
                inner.last_failure = Some(self.clock.now());
                self.transition(&mut inner, BreakerState::Open);
            }
            (BreakerState::Open, _) => {
                // A call admitted before the trip finished after it; the
                // open state already owns the counters.
            }
        }
    }

    /// Gate, run, classify, update counters.
    pub async fn execute<T, F, Fut>(&self, f: F) -> Result<T, BreakerError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
    {
        let admission = self.admit()?;
        match f().await {
            Ok(value) => {
                self.settle(admission, false);
                Ok(value)
            }
            Err(err) => {
                let counts = self
                    .config
                    .is_failure
                    .as_ref()
                    .map(|classify| classify(&err))
                    .unwrap_or(true);
                if !counts {
                    debug!(breaker = %self.name, error = %err, "error excluded from counts");
                }
                self.settle(admission, counts);
                Err(BreakerError::Inner(err))
            }
        }
    }

    /// Like [`CircuitBreaker::execute`], but breaker rejections route to
    /// `fallback`; errors from the call itself propagate unchanged.
    pub async fn execute_with_fallback<T, F, Fut, FB, FutB>(
        &self,
        f: F,
        fallback: FB,
    ) -> Result<T, DomainError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, DomainError>>,
        FB: FnOnce() -> FutB,
        FutB: Future<Output = Result<T, DomainError>>,
    {
        match self.execute(f).await {
            Ok(value) => Ok(value),
            Err(err) if err.is_rejection() => {
                debug!(breaker = %self.name, "using fallback");
                fallback().await
            }
            Err(BreakerError::Inner(err)) => Err(err),
            Err(err) => Err(err.into_domain()),
        }
    }
}

#[cfg(test)]
#[path = "breaker_tests.rs"]
mod tests;
