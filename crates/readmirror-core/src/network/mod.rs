//! Network utilities shared by the collaborator clients.
//!
//! This module provides:
//! - HTTP client with rate limiting awareness and JSON helpers
//! - Bounded retry with fixed or exponential backoff

mod client;
mod retry;

pub use client::{extract_domain, HttpClient, RateLimitState};
pub use retry::{retry_async, retry_call, RetryConfig, RetryStats};
