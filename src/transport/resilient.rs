//! Rate-limited, retrying request execution

use std::sync::Arc;

use tokio::time::{Instant, sleep};
use tracing::{debug, warn};

use crate::error::{BoxError, RegistryError};
use crate::transport::cancel::CancellationToken;
use crate::transport::limiter::RateLimiter;
use crate::transport::request::{HttpAttempt, HttpResponse, RequestDescriptor};
use crate::transport::retry::{Outcome, RetryAttemptContext, RetryPolicy, RetryState};

/// Wraps a single-attempt executor with admission control and retries.
///
/// Holds only immutable configuration; the limiter is shared.
#[derive(Clone)]
pub struct ResilientTransport {
    attempt: Arc<dyn HttpAttempt>,
    limiter: Arc<RateLimiter>,
    policy: RetryPolicy,
}

impl ResilientTransport {
    pub fn new(attempt: Arc<dyn HttpAttempt>, limiter: Arc<RateLimiter>, policy: RetryPolicy) -> Self {
        Self {
            attempt,
            limiter,
            policy,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Execute `request` until it succeeds, fails fatally, runs out of
    /// attempts, or `cancel` fires.
    ///
    /// A token is taken from the limiter before every attempt, retries
    /// included. A 2xx response is returned as `Ok`; everything else surfaces
    /// as a typed [`RegistryError`].
    pub async fn execute(
        &self,
        request: &RequestDescriptor,
        cancel: &CancellationToken,
    ) -> Result<HttpResponse, RegistryError> {
        let started = Instant::now();
        let mut context = RetryAttemptContext::new(request);

        loop {
            self.limiter.wait(cancel).await?;

            debug!(
                method = %context.method,
                target = %context.target,
                attempt = context.attempt + 1,
                "Sending request"
            );
            let result = self.attempt.attempt(request).await;
            context.record(Outcome::classify(&result), started.elapsed());

            match self.policy.next_state(&context) {
                RetryState::Success => {
                    debug!(attempts = context.attempt, elapsed = ?context.elapsed, "Request succeeded");
                    return result.map_err(RegistryError::Network);
                }
                RetryState::FatalFailure => return Err(failure(result)),
                RetryState::RetriesExhausted => {
                    let error = failure(result);
                    warn!(
                        "{} {} failed after {} attempts ({:?}): {}",
                        context.method, context.target, context.attempt, context.elapsed, error
                    );
                    return Err(RegistryError::RetriesExhausted {
                        attempts: context.attempt,
                        source: Box::new(error),
                    });
                }
                RetryState::Backoff(delay) => {
                    warn!(
                        "{} {} attempt {} failed ({:?}), retrying in {:?}",
                        context.method,
                        context.target,
                        context.attempt,
                        context.last_outcome,
                        delay
                    );
                    tokio::select! {
                        _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                        _ = sleep(delay) => {}
                    }
                }
                RetryState::Attempting => {}
            }
        }
    }
}

fn failure(result: Result<HttpResponse, BoxError>) -> RegistryError {
    match result {
        Ok(response) => RegistryError::from_status(response.status.as_u16(), response.error_message()),
        Err(error) => RegistryError::Network(error),
    }
}
