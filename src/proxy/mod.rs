//! Proxy module for loading and testing proxies
//!
//! This module provides functionality for:
//! - Loading proxy lists from files or any reader, normalizing the scheme
//! - Probing a single proxy against an IP echo endpoint
//! - Testing many proxies concurrently with a bounded worker pool

pub mod error;
pub mod models;
pub mod parser;
pub mod pool;
pub mod probe;

pub use error::{PoolError, ProbeError, ProbeErrorKind};
pub use models::{ProbeResult, ProbeStatus, ProxyAddress, ProxyScheme};
pub use parser::ProxyListParser;
pub use pool::{PoolConfig, ProxyPool};
pub use probe::{HttpProbe, Probe, ProbeSettings};
