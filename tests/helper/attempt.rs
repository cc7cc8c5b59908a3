//! Single-attempt executor stubs

use std::collections::VecDeque;
use std::io;
use std::sync::{Arc, Mutex};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use reqwest::StatusCode;
use reqwest::header::HeaderValue;
use tokio::time::Instant;

use registry_client::error::BoxError;
use registry_client::transport::{
    HttpAttempt, HttpResponse, RateLimiter, RequestDescriptor, ResilientTransport, RetryPolicy,
};

/// What the stub answers on one attempt
#[derive(Debug, Clone)]
pub enum StubReply {
    Status(u16),
    /// 429 whose `x-ratelimit-reset` lies this far after the moment of the attempt
    RateLimitedFor(Duration),
    NetworkError,
}

/// Replays a script of replies, repeating the last one once the script runs
/// out, and records when each attempt happened.
pub struct ScriptedAttempt {
    script: Mutex<VecDeque<StubReply>>,
    last: StubReply,
    attempts: Mutex<Vec<Instant>>,
}

impl ScriptedAttempt {
    pub fn new(script: Vec<StubReply>) -> Arc<Self> {
        let last = script.last().cloned().unwrap_or(StubReply::Status(200));
        Arc::new(Self {
            script: Mutex::new(script.into()),
            last,
            attempts: Mutex::new(Vec::new()),
        })
    }

    pub fn always(reply: StubReply) -> Arc<Self> {
        Self::new(vec![reply])
    }

    pub fn attempt_count(&self) -> usize {
        self.attempts.lock().unwrap().len()
    }

    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempts.lock().unwrap().clone()
    }
}

#[async_trait]
impl HttpAttempt for ScriptedAttempt {
    async fn attempt(&self, _request: &RequestDescriptor) -> Result<HttpResponse, BoxError> {
        self.attempts.lock().unwrap().push(Instant::now());
        let reply = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.last.clone());

        match reply {
            StubReply::Status(status) => Ok(HttpResponse::new(
                StatusCode::from_u16(status).unwrap(),
                r#"{"modules":[]}"#,
            )),
            StubReply::RateLimitedFor(wait) => {
                let reset = SystemTime::now().duration_since(UNIX_EPOCH).unwrap() + wait;
                let header = HeaderValue::from_str(&format!("{:.3}", reset.as_secs_f64())).unwrap();
                Ok(HttpResponse::new(StatusCode::TOO_MANY_REQUESTS, "slow down")
                    .with_header("x-ratelimit-reset", header))
            }
            StubReply::NetworkError => Err(Box::new(io::Error::new(
                io::ErrorKind::ConnectionRefused,
                "connection refused",
            ))),
        }
    }
}

/// Transport over `attempt` with a generous rate budget
pub fn transport_with(attempt: Arc<ScriptedAttempt>, policy: RetryPolicy) -> ResilientTransport {
    let limiter = Arc::new(RateLimiter::new(1000, Duration::from_secs(1)));
    ResilientTransport::new(attempt, limiter, policy)
}
