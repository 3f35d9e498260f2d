//! # Circuit Breaker Module
//!
//! This module implements the circuit breaker pattern for inference calls.
//! When the provider fails repeatedly (rate limits, outages), further calls
//! fail fast instead of making every user wait for another timeout.

use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use crate::config::RecoveryConfig;

#[derive(Debug, Default)]
struct BreakerState {
    failure_count: u32,
    last_failure_time: Option<Instant>,
}

/// Circuit breaker for inference operations
///
/// # State Machine
///
/// - **Closed**: Normal operation, requests pass through
/// - **Open**: Failure threshold exceeded, requests fail fast
/// - Once the reset timeout has elapsed the breaker closes again with a
///   cleared failure count, so it takes a full `threshold` of new failures
///   to reopen
///
/// # Configuration
///
/// Uses `RecoveryConfig` for:
/// - `circuit_breaker_threshold`: Failures before opening (default: 5)
/// - `circuit_breaker_reset_secs`: Time before attempting reset (default: 60s)
#[derive(Debug)]
pub struct CircuitBreaker {
    state: Mutex<BreakerState>,
    config: RecoveryConfig,
}

impl CircuitBreaker {
    /// Create a new circuit breaker with the given configuration
    ///
    /// # Examples
    ///
    /// ```rust
    /// use readnova::config::RecoveryConfig;
    /// use readnova::circuit_breaker::CircuitBreaker;
    ///
    /// let circuit_breaker = CircuitBreaker::new(RecoveryConfig::default());
    /// assert!(!circuit_breaker.is_open());
    /// ```
    pub fn new(config: RecoveryConfig) -> Self {
        Self {
            state: Mutex::new(BreakerState::default()),
            config,
        }
    }

    fn lock(&self) -> MutexGuard<'_, BreakerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check if circuit breaker is open (blocking requests)
    ///
    /// Automatically resets to closed once the reset timeout has elapsed.
    pub fn is_open(&self) -> bool {
        let mut state = self.lock();

        if state.failure_count >= self.config.circuit_breaker_threshold {
            if let Some(last_time) = state.last_failure_time {
                if last_time.elapsed() < Duration::from_secs(self.config.circuit_breaker_reset_secs) {
                    return true;
                }
                *state = BreakerState::default();
            }
        }
        false
    }

    /// Record a failed call
    pub fn record_failure(&self) {
        let mut state = self.lock();
        state.failure_count += 1;
        state.last_failure_time = Some(Instant::now());
    }

    /// Record a successful call, closing the circuit
    pub fn record_success(&self) {
        *self.lock() = BreakerState::default();
    }

    /// Number of consecutive failures recorded
    pub fn failure_count(&self) -> u32 {
        self.lock().failure_count
    }
}
