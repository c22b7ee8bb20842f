//! web-core: shared HTTP plumbing for the invoice web app.
pub mod middleware;
pub mod observability;
pub mod retry;

pub use retry::{retry_with_backoff, RetryPolicy, Retryable};
