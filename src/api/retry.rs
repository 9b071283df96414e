//! Retry policy for stats API requests.
//!
//! 429 responses back off for `base_delay * 2^attempt`. Server errors and
//! transport failures back off for the same amount plus up to one
//! `base_delay` of random jitter. Every other non-200 status is fatal.

use std::fmt;
use std::time::Duration;

use reqwest::StatusCode;

/// Default number of attempts per request (including the first).
pub const DEFAULT_MAX_RETRIES: u32 = 6;

/// Default backoff unit. With one second, the wait before retry `n` is `2^n` seconds.
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_secs(1);

// 2^16 base delays is already over 18 hours at the default base.
const MAX_BACKOFF_EXPONENT: u32 = 16;

/// Why an attempt failed in a way that is worth retrying.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RetryReason {
    /// HTTP 429
    RateLimited,
    /// HTTP 5xx
    ServerError { status: u16, body: String },
    /// Connection, timeout, or request-level failure before a status was received
    Transport(String),
}

impl RetryReason {
    pub fn status(&self) -> Option<u16> {
        match self {
            RetryReason::RateLimited => Some(StatusCode::TOO_MANY_REQUESTS.as_u16()),
            RetryReason::ServerError { status, .. } => Some(*status),
            RetryReason::Transport(_) => None,
        }
    }

    fn jittered(&self) -> bool {
        !matches!(self, RetryReason::RateLimited)
    }
}

impl fmt::Display for RetryReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RetryReason::RateLimited => write!(f, "rate limited (429)"),
            RetryReason::ServerError { status, .. } => write!(f, "server error {}", status),
            RetryReason::Transport(msg) => write!(f, "transport failure: {}", msg),
        }
    }
}

/// How a response status is handled by the retry loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    /// 200, the only success path
    Success,
    /// 429
    RateLimited,
    /// 5xx
    ServerError,
    /// Anything else, surfaced immediately
    Fatal,
}

impl StatusClass {
    pub fn of(status: StatusCode) -> Self {
        if status == StatusCode::OK {
            StatusClass::Success
        } else if status == StatusCode::TOO_MANY_REQUESTS {
            StatusClass::RateLimited
        } else if status.is_server_error() {
            StatusClass::ServerError
        } else {
            StatusClass::Fatal
        }
    }
}

/// Retry configuration for the API client.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Total attempts per request, including the first one. Must be at least 1.
    pub max_retries: u32,
    /// Backoff unit multiplied by `2^attempt`.
    pub base_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            base_delay: DEFAULT_BASE_DELAY,
        }
    }
}

impl RetryConfig {
    /// Create a new retry config with the given attempt budget.
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// Set the backoff unit.
    pub fn with_base_delay(mut self, base_delay: Duration) -> Self {
        self.base_delay = base_delay;
        self
    }

    /// Deterministic part of the wait after a failed attempt (0-indexed).
    pub fn backoff_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 1u32 << attempt.min(MAX_BACKOFF_EXPONENT);
        self.base_delay.saturating_mul(factor)
    }

    /// Full wait after a failed attempt, including jitter where the reason calls for it.
    pub fn delay_for(&self, attempt: u32, reason: &RetryReason) -> Duration {
        let backoff = self.backoff_for_attempt(attempt);
        if reason.jittered() {
            backoff + self.base_delay.mul_f64(rand::random::<f64>())
        } else {
            backoff
        }
    }
}
