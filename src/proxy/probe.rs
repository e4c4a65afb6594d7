//! Single-proxy probe against an IP echo endpoint

use crate::proxy::error::ProbeError;
use crate::proxy::models::{ProbeResult, ProxyAddress};
use async_trait::async_trait;
use log::debug;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode, Url};
use std::error::Error as StdError;
use std::net::IpAddr;
use std::time::{Duration, Instant};

/// Default endpoint that answers with the caller's IP as plain text
pub const DEFAULT_TARGET_URL: &str = "http://ifconfig.co/ip";

/// Default overall timeout for one probe in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 15;

const DEFAULT_USER_AGENT: &str = concat!("proxy-tester/", env!("CARGO_PKG_VERSION"));

const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_TLS_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);
const DEFAULT_RESPONSE_HEADER_TIMEOUT: Duration = Duration::from_secs(10);

/// Client settings shared by every probe.
///
/// These are fixed per run; the overall per-probe timeout is passed to
/// [`Probe::probe`] and wins whenever it is shorter than a sub-timeout.
#[derive(Debug, Clone)]
pub struct ProbeSettings {
    /// URL requested through the proxy
    pub target_url: String,
    /// User-Agent header sent with every request
    pub user_agent: String,
    /// Limit for establishing the connection, including the proxy handshake
    pub connect_timeout: Duration,
    /// Limit for the TLS handshake, added to the connect budget
    pub tls_handshake_timeout: Duration,
    /// Limit for receiving response headers after the connect budget
    pub response_header_timeout: Duration,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tls_handshake_timeout: DEFAULT_TLS_HANDSHAKE_TIMEOUT,
            response_header_timeout: DEFAULT_RESPONSE_HEADER_TIMEOUT,
        }
    }
}

impl ProbeSettings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_target_url(mut self, url: impl Into<String>) -> Self {
        self.target_url = url.into();
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_tls_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.tls_handshake_timeout = timeout;
        self
    }

    pub fn with_response_header_timeout(mut self, timeout: Duration) -> Self {
        self.response_header_timeout = timeout;
        self
    }

    /// Time allowed for connecting through the proxy.
    ///
    /// reqwest's connect phase covers the TCP connect, the proxy handshake
    /// and TLS together, so both limits are spent from one budget.
    pub fn connect_budget(&self) -> Duration {
        self.connect_timeout + self.tls_handshake_timeout
    }
}

/// Something that can check one proxy.
///
/// Implementations must turn every failure into a [`ProbeResult`]; a probe
/// never errors out to its caller.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, address: &ProxyAddress, timeout: Duration) -> ProbeResult;
}

/// Probe that fetches the target URL through the proxy over HTTP
#[derive(Debug, Clone, Default)]
pub struct HttpProbe {
    settings: ProbeSettings,
}

impl HttpProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_settings(settings: ProbeSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ProbeSettings {
        &self.settings
    }

    async fn attempt(&self, address: &ProxyAddress, timeout: Duration) -> Result<String, ProbeError> {
        let proxy_url = Url::parse(address.as_str())
            .map_err(|e| ProbeError::InvalidAddress(e.to_string()))?;
        let client = self.create_client(proxy_url, timeout)?;

        match tokio::time::timeout(timeout, self.fetch_ip(&client)).await {
            Ok(outcome) => outcome,
            Err(_) => Err(ProbeError::Transport(format!(
                "timed out after {:.2}s",
                timeout.as_secs_f64()
            ))),
        }
    }

    async fn fetch_ip(&self, client: &Client) -> Result<String, ProbeError> {
        // send() resolves once headers arrive, so it gets the connect budget
        // plus the header wait. The client's connect_timeout caps the first part.
        let header_deadline = self.settings.connect_budget() + self.settings.response_header_timeout;
        let request = client.get(&self.settings.target_url).send();
        let response = tokio::time::timeout(header_deadline, request)
            .await
            .map_err(|_| {
                ProbeError::Transport(format!(
                    "no response headers within {:.2}s",
                    header_deadline.as_secs_f64()
                ))
            })?
            .map_err(|e| ProbeError::Transport(describe(&e)))?;

        if response.status() != StatusCode::OK {
            return Err(ProbeError::UnexpectedStatus(response.status().as_u16()));
        }

        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                ProbeError::Transport(describe(&e))
            } else {
                ProbeError::BodyRead(describe(&e))
            }
        })?;

        parse_ip(&body)
    }

    /// Create a reqwest client routed through the proxy
    fn create_client(&self, proxy_url: Url, timeout: Duration) -> Result<Client, ProbeError> {
        let proxy = ReqwestProxy::all(proxy_url)
            .map_err(|e| ProbeError::InvalidAddress(describe(&e)))?;

        Client::builder()
            .proxy(proxy)
            .user_agent(self.settings.user_agent.as_str())
            .connect_timeout(self.settings.connect_budget())
            .timeout(timeout)
            .build()
            .map_err(|e| ProbeError::Transport(describe(&e)))
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, address: &ProxyAddress, timeout: Duration) -> ProbeResult {
        let start = Instant::now();
        let outcome = self.attempt(address, timeout).await;
        let elapsed = start.elapsed();

        match outcome {
            Ok(ip) => {
                debug!("{} working via {} in {:?}", address, ip, elapsed);
                ProbeResult::working(address.clone(), ip, elapsed)
            }
            Err(error) => {
                debug!("{} failed in {:?}: {}", address, elapsed, error);
                ProbeResult::failed(address.clone(), error, elapsed)
            }
        }
    }
}

/// Validate an IP echo body, returning the trimmed literal
fn parse_ip(body: &str) -> Result<String, ProbeError> {
    let candidate = body.trim();
    candidate
        .parse::<IpAddr>()
        .map(|_| candidate.to_string())
        .map_err(|_| ProbeError::InvalidPayload)
}

/// Flatten an error and its sources into one line
fn describe(error: &dyn StdError) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_settings_default() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.target_url, DEFAULT_TARGET_URL);
        assert_eq!(settings.connect_timeout, Duration::from_secs(10));
        assert_eq!(settings.tls_handshake_timeout, Duration::from_secs(10));
        assert_eq!(settings.response_header_timeout, Duration::from_secs(10));
        assert!(settings.user_agent.starts_with("proxy-tester/"));
    }

    #[test]
    fn test_probe_settings_builder() {
        let settings = ProbeSettings::new()
            .with_target_url("http://ip.example.test/")
            .with_user_agent("fixture/1.0")
            .with_response_header_timeout(Duration::from_millis(250));

        assert_eq!(settings.target_url, "http://ip.example.test/");
        assert_eq!(settings.user_agent, "fixture/1.0");
        assert_eq!(settings.response_header_timeout, Duration::from_millis(250));
    }

    #[test]
    fn test_connect_budget_covers_connect_and_tls() {
        let settings = ProbeSettings::new()
            .with_connect_timeout(Duration::from_secs(3))
            .with_tls_handshake_timeout(Duration::from_secs(2));
        assert_eq!(settings.connect_budget(), Duration::from_secs(5));
        assert_eq!(ProbeSettings::default().connect_budget(), Duration::from_secs(20));
    }

    #[test]
    fn test_parse_ip_accepts_v4_and_v6() {
        assert_eq!(parse_ip("203.0.113.9\n").unwrap(), "203.0.113.9");
        assert_eq!(parse_ip("  2001:db8::1  ").unwrap(), "2001:db8::1");
    }

    #[test]
    fn test_parse_ip_rejects_garbage() {
        assert_eq!(parse_ip("hello"), Err(ProbeError::InvalidPayload));
        assert_eq!(parse_ip(""), Err(ProbeError::InvalidPayload));
        assert_eq!(parse_ip("<html>203.0.113.9</html>"), Err(ProbeError::InvalidPayload));
    }

    #[tokio::test]
    async fn test_invalid_address_is_classified() {
        let probe = HttpProbe::new();
        let address = ProxyAddress::normalize("http://%zz");

        let result = probe.probe(&address, Duration::from_secs(1)).await;

        assert!(!result.is_working());
        assert_eq!(
            result.error().map(ProbeError::kind),
            Some(crate::ProbeErrorKind::InvalidAddress)
        );
        assert!(result.ip().is_none());
    }
}
