//! Retry classification and state machine
//!
//! ```text
//! Attempting ──▶ Success | FatalFailure | RetriesExhausted
//!     ▲    │
//!     │    ▼
//!     └── Backoff(delay)
//! ```
//!
//! Classification ([`Outcome`]) and the transition function
//! ([`RetryPolicy::next_state`]) are pure, so the loop in
//! [`ResilientTransport`](super::ResilientTransport) only sleeps and calls.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::config::RetryConfig;
use crate::error::BoxError;
use crate::transport::request::{HttpResponse, RequestDescriptor};

/// Absolute reset time, in Unix seconds
pub const RATE_LIMIT_RESET_HEADER: &str = "x-ratelimit-reset";
/// Relative delay, in seconds
pub const RETRY_AFTER_HEADER: &str = "retry-after";

/// Classified result of one attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    RetryableNetwork,
    /// 429; `wait_hint` comes from the response headers when present
    RetryableRateLimited { wait_hint: Option<Duration> },
    RetryableServerError,
    Fatal,
}

impl Outcome {
    pub fn classify(result: &Result<HttpResponse, BoxError>) -> Self {
        Self::classify_at(result, SystemTime::now())
    }

    /// Classify relative to `now`, which anchors absolute reset hints
    pub fn classify_at(result: &Result<HttpResponse, BoxError>, now: SystemTime) -> Self {
        let response = match result {
            Ok(response) => response,
            Err(_) => return Outcome::RetryableNetwork,
        };

        let status = response.status.as_u16();
        match status {
            429 => Outcome::RetryableRateLimited {
                wait_hint: rate_limit_wait(response, now),
            },
            500.. => Outcome::RetryableServerError,
            200..=299 => Outcome::Success,
            _ => Outcome::Fatal,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Outcome::RetryableNetwork
                | Outcome::RetryableRateLimited { .. }
                | Outcome::RetryableServerError
        )
    }
}

/// How long a 429 response asks us to wait.
///
/// An absolute reset time (integer or fractional Unix seconds) wins over a
/// relative `Retry-After`. A reset time in the past means no wait; one that
/// is negative or beyond the representable clock range is ignored.
pub fn rate_limit_wait(response: &HttpResponse, now: SystemTime) -> Option<Duration> {
    let reset_at = response
        .header(RATE_LIMIT_RESET_HEADER)
        .and_then(|v| v.trim().parse::<f64>().ok())
        .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
        .and_then(|since_epoch| UNIX_EPOCH.checked_add(since_epoch));

    if let Some(reset_at) = reset_at {
        return Some(reset_at.duration_since(now).unwrap_or(Duration::ZERO));
    }

    response
        .header(RETRY_AFTER_HEADER)
        .and_then(|v| v.trim().parse::<u64>().ok())
        .map(Duration::from_secs)
}

/// Per-call bookkeeping, discarded once the call reaches a terminal state
#[derive(Debug, Clone)]
pub struct RetryAttemptContext {
    pub method: String,
    pub target: String,
    /// Attempts made so far
    pub attempt: u32,
    pub elapsed: Duration,
    pub last_outcome: Option<Outcome>,
}

impl RetryAttemptContext {
    pub fn new(request: &RequestDescriptor) -> Self {
        Self {
            method: request.method.to_string(),
            target: request.url.clone(),
            attempt: 0,
            elapsed: Duration::ZERO,
            last_outcome: None,
        }
    }

    pub fn record(&mut self, outcome: Outcome, elapsed: Duration) {
        self.attempt += 1;
        self.elapsed = elapsed;
        self.last_outcome = Some(outcome);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryState {
    Attempting,
    Backoff(Duration),
    Success,
    FatalFailure,
    RetriesExhausted,
}

impl RetryState {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RetryState::Success | RetryState::FatalFailure | RetryState::RetriesExhausted
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    max_attempts: u32,
    min_wait: Duration,
    max_wait: Duration,
}

impl RetryPolicy {
    /// `max_attempts` counts the initial attempt and is at least 1
    pub fn new(max_attempts: u32, min_wait: Duration, max_wait: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            min_wait: min_wait.min(max_wait),
            max_wait,
        }
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Exponential backoff after the `attempt`-th failed attempt:
    /// `min_wait * 2^(attempt - 1)`, capped at `max_wait`
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        self.min_wait.saturating_mul(factor).min(self.max_wait)
    }

    pub fn next_state(&self, context: &RetryAttemptContext) -> RetryState {
        let Some(outcome) = &context.last_outcome else {
            return RetryState::Attempting;
        };

        match outcome {
            Outcome::Success => RetryState::Success,
            Outcome::Fatal => RetryState::FatalFailure,
            _ if context.attempt >= self.max_attempts => RetryState::RetriesExhausted,
            Outcome::RetryableRateLimited {
                wait_hint: Some(wait),
            } => RetryState::Backoff(*wait),
            _ => RetryState::Backoff(self.backoff(context.attempt)),
        }
    }
}

impl From<&RetryConfig> for RetryPolicy {
    fn from(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.min_wait_ms),
            Duration::from_millis(config.max_wait_ms),
        )
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from(&RetryConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::StatusCode;
    use reqwest::header::HeaderValue;
    use rstest::rstest;

    fn response(status: u16) -> Result<HttpResponse, BoxError> {
        Ok(HttpResponse::new(
            StatusCode::from_u16(status).unwrap(),
            "",
        ))
    }

    fn context_after(attempt: u32, outcome: Outcome) -> RetryAttemptContext {
        let mut context = RetryAttemptContext::new(&RequestDescriptor::get("http://registry/v1"));
        context.attempt = attempt - 1;
        context.record(outcome, Duration::ZERO);
        context
    }

    #[rstest]
    #[case(200, Outcome::Success)]
    #[case(204, Outcome::Success)]
    #[case(400, Outcome::Fatal)]
    #[case(401, Outcome::Fatal)]
    #[case(403, Outcome::Fatal)]
    #[case(404, Outcome::Fatal)]
    #[case(429, Outcome::RetryableRateLimited { wait_hint: None })]
    #[case(500, Outcome::RetryableServerError)]
    #[case(502, Outcome::RetryableServerError)]
    #[case(503, Outcome::RetryableServerError)]
    #[case(304, Outcome::Fatal)]
    fn classify_maps_statuses(#[case] status: u16, #[case] expected: Outcome) {
        assert_eq!(Outcome::classify(&response(status)), expected);
    }

    #[test]
    fn classify_treats_network_errors_as_retryable() {
        let result: Result<HttpResponse, BoxError> = Err("connection refused".into());
        assert_eq!(Outcome::classify(&result), Outcome::RetryableNetwork);
    }

    #[test]
    fn rate_limit_wait_uses_absolute_reset_time() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("1700000005"));

        assert_eq!(
            rate_limit_wait(&response, now),
            Some(Duration::from_secs(5))
        );
    }

    #[test]
    fn rate_limit_wait_accepts_fractional_reset_time() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("1700000001.5"));

        assert_eq!(
            rate_limit_wait(&response, now),
            Some(Duration::from_millis(1500))
        );
    }

    #[test]
    fn rate_limit_wait_is_zero_for_reset_in_the_past() {
        let now = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("1600000000"));

        assert_eq!(rate_limit_wait(&response, now), Some(Duration::ZERO));
    }

    #[test]
    fn rate_limit_wait_falls_back_to_retry_after() {
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RETRY_AFTER_HEADER, HeaderValue::from_static("7"));

        assert_eq!(
            rate_limit_wait(&response, SystemTime::now()),
            Some(Duration::from_secs(7))
        );
    }

    #[rstest]
    #[case("1e20")]
    #[case("10000000000000000000")]
    #[case("-5")]
    #[case("NaN")]
    #[case("inf")]
    fn rate_limit_wait_ignores_unrepresentable_reset_times(#[case] reset: &'static str) {
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static(reset));

        assert_eq!(rate_limit_wait(&response, SystemTime::now()), None);
        assert_eq!(
            Outcome::classify(&Ok(response)),
            Outcome::RetryableRateLimited { wait_hint: None }
        );
    }

    #[test]
    fn rate_limit_wait_falls_back_to_retry_after_when_reset_overflows() {
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("1e20"))
            .with_header(RETRY_AFTER_HEADER, HeaderValue::from_static("3"));

        assert_eq!(
            rate_limit_wait(&response, SystemTime::now()),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn rate_limit_wait_ignores_garbage_hints() {
        let response = HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "")
            .with_header(RATE_LIMIT_RESET_HEADER, HeaderValue::from_static("soon"));

        assert_eq!(rate_limit_wait(&response, SystemTime::now()), None);
    }

    #[rstest]
    #[case(1, Duration::from_secs(1))]
    #[case(2, Duration::from_secs(2))]
    #[case(3, Duration::from_secs(4))]
    #[case(5, Duration::from_secs(16))]
    #[case(6, Duration::from_secs(30))]
    #[case(40, Duration::from_secs(30))]
    fn backoff_grows_exponentially_up_to_max(#[case] attempt: u32, #[case] expected: Duration) {
        let policy = RetryPolicy::new(50, Duration::from_secs(1), Duration::from_secs(30));
        assert_eq!(policy.backoff(attempt), expected);
    }

    #[test]
    fn next_state_before_any_attempt_is_attempting() {
        let policy = RetryPolicy::default();
        let context = RetryAttemptContext::new(&RequestDescriptor::get("http://registry/v1"));
        assert_eq!(policy.next_state(&context), RetryState::Attempting);
    }

    #[rstest]
    #[case(1, Outcome::Success, RetryState::Success)]
    #[case(1, Outcome::Fatal, RetryState::FatalFailure)]
    #[case(1, Outcome::RetryableServerError, RetryState::Backoff(Duration::from_millis(100)))]
    #[case(2, Outcome::RetryableNetwork, RetryState::Backoff(Duration::from_millis(200)))]
    #[case(
        1,
        Outcome::RetryableRateLimited { wait_hint: Some(Duration::from_secs(2)) },
        RetryState::Backoff(Duration::from_secs(2))
    )]
    #[case(
        2,
        Outcome::RetryableRateLimited { wait_hint: None },
        RetryState::Backoff(Duration::from_millis(200))
    )]
    #[case(3, Outcome::RetryableServerError, RetryState::RetriesExhausted)]
    #[case(
        3,
        Outcome::RetryableRateLimited { wait_hint: Some(Duration::from_secs(2)) },
        RetryState::RetriesExhausted
    )]
    #[case(3, Outcome::Success, RetryState::Success)]
    fn next_state_transitions(
        #[case] attempt: u32,
        #[case] outcome: Outcome,
        #[case] expected: RetryState,
    ) {
        let policy = RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1));
        assert_eq!(policy.next_state(&context_after(attempt, outcome)), expected);
    }

    #[test]
    fn terminal_states_are_flagged() {
        assert!(RetryState::Success.is_terminal());
        assert!(RetryState::FatalFailure.is_terminal());
        assert!(RetryState::RetriesExhausted.is_terminal());
        assert!(!RetryState::Attempting.is_terminal());
        assert!(!RetryState::Backoff(Duration::ZERO).is_terminal());
    }
}
