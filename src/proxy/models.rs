//! Proxy data models

use crate::proxy::error::ProbeError;
use serde::{Serialize, Serializer};
use std::fmt;
use std::time::Duration;

/// Proxy scheme recognised in a proxy address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyScheme {
    #[default]
    Http,
    Https,
    Socks5,
}

impl ProxyScheme {
    const ALL: [ProxyScheme; 3] = [ProxyScheme::Http, ProxyScheme::Https, ProxyScheme::Socks5];

    /// URL prefix including the `://` separator
    pub fn prefix(&self) -> &'static str {
        match self {
            ProxyScheme::Http => "http://",
            ProxyScheme::Https => "https://",
            ProxyScheme::Socks5 => "socks5://",
        }
    }

    /// Detect the scheme of a raw address. Matching is case-sensitive.
    pub fn detect(raw: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|scheme| raw.starts_with(scheme.prefix()))
    }
}

impl fmt::Display for ProxyScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProxyScheme::Http => write!(f, "http"),
            ProxyScheme::Https => write!(f, "https"),
            ProxyScheme::Socks5 => write!(f, "socks5"),
        }
    }
}

/// Address of a single proxy, always carrying a recognised scheme.
///
/// The string is not validated beyond the scheme prefix; a malformed URL is
/// reported by the probe as [`ProbeError::InvalidAddress`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct ProxyAddress(String);

impl ProxyAddress {
    /// Build an address from a raw line, defaulting to `http://` when the
    /// line has no recognised scheme.
    pub fn normalize(raw: impl AsRef<str>) -> Self {
        let raw = raw.as_ref().trim();
        match ProxyScheme::detect(raw) {
            Some(_) => Self(raw.to_string()),
            None => Self(format!("{}{}", ProxyScheme::Http.prefix(), raw)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn scheme(&self) -> ProxyScheme {
        ProxyScheme::detect(&self.0).unwrap_or_default()
    }
}

impl fmt::Display for ProxyAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for ProxyAddress {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Outcome of probing one proxy
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum ProbeStatus {
    Working { ip: String },
    Failed { error: ProbeError },
}

/// Result of probing a single proxy
#[derive(Debug, Clone, Serialize)]
pub struct ProbeResult {
    pub proxy: ProxyAddress,
    #[serde(flatten)]
    pub status: ProbeStatus,
    #[serde(rename = "elapsed_ms", serialize_with = "serialize_millis")]
    pub elapsed: Duration,
}

impl ProbeResult {
    pub fn working(proxy: ProxyAddress, ip: String, elapsed: Duration) -> Self {
        Self {
            proxy,
            status: ProbeStatus::Working { ip },
            elapsed,
        }
    }

    pub fn failed(proxy: ProxyAddress, error: ProbeError, elapsed: Duration) -> Self {
        Self {
            proxy,
            status: ProbeStatus::Failed { error },
            elapsed,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, ProbeStatus::Working { .. })
    }

    /// External IP seen by the endpoint, only for working proxies
    pub fn ip(&self) -> Option<&str> {
        match &self.status {
            ProbeStatus::Working { ip } => Some(ip),
            ProbeStatus::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.status {
            ProbeStatus::Working { .. } => None,
            ProbeStatus::Failed { error } => Some(error),
        }
    }
}

fn serialize_millis<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_u64(elapsed.as_millis() as u64)
}
