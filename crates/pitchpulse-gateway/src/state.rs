//! Attempt state machine for one `generate` call.
//!
//! ```text
//! Idle -> Attempting(1) -> Conformant
//!                       -> Attempting(2) -> ... -> Attempting(max) -> Fallback
//! ```
//!
//! `Conformant` and `Fallback` are terminal; transitions requested from a
//! terminal state leave it unchanged. No I/O happens here, so attempt
//! counting can be tested without a model or a clock.

use pitchpulse_core::schema::render_violations;
use pitchpulse_core::{FailureReason, GatewayError, SchemaViolation};
use std::fmt;
use std::time::{Duration, Instant};

/// Why one attempt failed
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptFailure {
    /// The attempt exceeded its timeout
    Timeout,
    /// The upstream call errored
    Call(String),
    /// The payload was not JSON
    MalformedPayload(String),
    /// The payload broke the schema
    SchemaValidation(Vec<SchemaViolation>),
}

impl AttemptFailure {
    /// Classify an upstream error
    #[must_use]
    pub fn from_call_error(error: &GatewayError) -> Self {
        match error {
            GatewayError::Timeout { .. } => Self::Timeout,
            other => Self::Call(other.to_string()),
        }
    }

    /// Category reported to callers
    #[must_use]
    pub fn reason(&self) -> FailureReason {
        match self {
            Self::Timeout => FailureReason::Timeout,
            Self::Call(_) => FailureReason::CallError,
            Self::MalformedPayload(_) => FailureReason::MalformedPayload,
            Self::SchemaValidation(_) => FailureReason::SchemaValidation,
        }
    }
}

impl fmt::Display for AttemptFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => f.write_str("attempt timed out"),
            Self::Call(message) => write!(f, "call failed: {message}"),
            Self::MalformedPayload(message) => write!(f, "malformed payload: {message}"),
            Self::SchemaValidation(violations) => {
                write!(f, "schema violations: {}", render_violations(violations))
            }
        }
    }
}

/// State of one `generate` call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttemptState {
    /// Nothing attempted yet
    Idle,
    /// Attempt `n` (1-based) is in flight
    Attempting(u32),
    /// A conformant value was produced
    Conformant,
    /// The budget is spent
    Fallback(FailureReason),
}

impl AttemptState {
    /// Whether the state is final
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Conformant | Self::Fallback(_))
    }
}

/// What follows a failed attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Run attempt `n`
    Retry(u32),
    /// No attempts left
    Exhausted(FailureReason),
}

/// Bookkeeping for one `generate` call; dropped when the call completes
#[derive(Debug)]
pub struct RetryState {
    state: AttemptState,
    max_attempts: u32,
    attempts: u32,
    last_failure: Option<AttemptFailure>,
    started: Instant,
}

impl RetryState {
    /// Start in `Idle` with the given budget (at least one attempt)
    #[must_use]
    pub fn new(max_attempts: u32) -> Self {
        Self {
            state: AttemptState::Idle,
            max_attempts: max_attempts.max(1),
            attempts: 0,
            last_failure: None,
            started: Instant::now(),
        }
    }

    /// `Idle -> Attempting(1)`; returns the current attempt number
    pub fn begin(&mut self) -> u32 {
        if self.state == AttemptState::Idle {
            self.state = AttemptState::Attempting(1);
            self.attempts = 1;
        }
        self.attempts
    }

    /// `Attempting(n) -> Conformant`
    pub fn succeed(&mut self) {
        if let AttemptState::Attempting(_) = self.state {
            self.state = AttemptState::Conformant;
        }
    }

    /// `Attempting(n) -> Attempting(n + 1)` or `Fallback(reason)`
    pub fn fail(&mut self, failure: AttemptFailure) -> Transition {
        let AttemptState::Attempting(n) = self.state else {
            return match self.state {
                AttemptState::Fallback(reason) => Transition::Exhausted(reason),
                _ => Transition::Exhausted(failure.reason()),
            };
        };

        let reason = failure.reason();
        self.last_failure = Some(failure);

        if n < self.max_attempts {
            self.state = AttemptState::Attempting(n + 1);
            self.attempts = n + 1;
            Transition::Retry(n + 1)
        } else {
            self.state = AttemptState::Fallback(reason);
            Transition::Exhausted(reason)
        }
    }

    /// Current state
    #[must_use]
    pub fn state(&self) -> AttemptState {
        self.state
    }

    /// Current (or last) attempt number; 0 while idle
    #[must_use]
    pub fn attempt(&self) -> u32 {
        self.attempts
    }

    /// Budget
    #[must_use]
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Most recent failure
    #[must_use]
    pub fn last_failure(&self) -> Option<&AttemptFailure> {
        self.last_failure.as_ref()
    }

    /// Time since the state was created
    #[must_use]
    pub fn elapsed(&self) -> Duration {
        self.started.elapsed()
    }
}
