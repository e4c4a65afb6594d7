//! Proxy Tester - Concurrent Proxy Validation
//!
//! Validates a list of proxies by sending a real HTTP request through each
//! one and classifying the outcome. Proxies are checked by a fixed-size
//! worker pool; results come back in completion order.

pub mod proxy;
pub mod report;

pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
