//! Outbound request plumbing
//!
//! ```text
//! caller ──▶ ResilientTransport ──▶ RateLimiter::wait ──▶ HttpAttempt::attempt
//!                 ▲       │
//!                 └───────┘ RetryPolicy (classify, back off, give up)
//! ```
//!
//! - [`cancel`]: caller-owned cancellation signal
//! - [`limiter`]: token-bucket admission control shared by all callers of a client
//! - [`request`]: request/response values and the single-attempt trait
//! - [`retry`]: outcome classification and the retry state machine
//! - [`resilient`]: the retry loop gluing the pieces together

pub mod cancel;
pub mod limiter;
pub mod request;
pub mod resilient;
pub mod retry;

pub use cancel::CancellationToken;
pub use limiter::RateLimiter;
pub use request::{HttpAttempt, HttpResponse, RequestDescriptor, ReqwestAttempt};
pub use resilient::ResilientTransport;
pub use retry::{Outcome, RetryAttemptContext, RetryPolicy, RetryState};
