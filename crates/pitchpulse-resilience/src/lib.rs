//! # PitchPulse Resilience
//!
//! Resilience primitives for upstream generation calls:
//! - Retry policy: a small attempt budget, a hard per-attempt timeout and a
//!   fixed jitter between attempts
//! - Bulkhead: a bounded pool of concurrent upstream calls

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod bulkhead;
pub mod retry;

// Re-export main types
pub use bulkhead::{Bulkhead, BulkheadConfig, BulkheadPermit, BulkheadStats};
pub use retry::{RetryConfig, RetryPolicy, RetryPolicyBuilder};
