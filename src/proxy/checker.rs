//! Proxy checker module: one validation request routed through one endpoint

use crate::proxy::models::{Proxy, ProxyCheckResult};
use crate::Result;
use async_trait::async_trait;
use reqwest::{Client, Proxy as ReqwestProxy, StatusCode};
use std::time::{Duration, Instant};

/// Default timeout for proxy checks in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;

/// Default URL to test proxies against. Answers with the caller's IP.
pub const DEFAULT_TEST_URL: &str = "https://api.ipify.org";

/// Default user agent for validation requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Why a probe did not prove the endpoint usable
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProbeError {
    #[error("could not build client: {0}")]
    Client(String),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("timed out after {0}ms")]
    Timeout(u64),
    #[error("received non-200 response: {0}")]
    Status(u16),
    #[error("echoed address {actual:?} does not match {expected}")]
    BodyMismatch { expected: String, actual: String },
}

/// What a response must look like for the endpoint to count as working
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SuccessCriterion {
    /// Status 200 is enough
    Status,
    /// Status 200 and the body is the endpoint's own host, i.e. the target
    /// saw the request coming from the proxy
    #[default]
    EchoHost,
}

impl SuccessCriterion {
    /// Classify a response. `body` is only consulted for `EchoHost`.
    pub fn evaluate(
        &self,
        proxy: &Proxy,
        status: u16,
        body: Option<&str>,
    ) -> std::result::Result<(), ProbeError> {
        if status != StatusCode::OK.as_u16() {
            return Err(ProbeError::Status(status));
        }

        match self {
            SuccessCriterion::Status => Ok(()),
            SuccessCriterion::EchoHost => {
                let actual = body.unwrap_or_default().trim();
                if actual == proxy.host {
                    Ok(())
                } else {
                    Err(ProbeError::BodyMismatch {
                        expected: proxy.host.clone(),
                        actual: actual.to_string(),
                    })
                }
            }
        }
    }
}

/// Configuration for proxy checker
#[derive(Debug, Clone)]
pub struct CheckerConfig {
    /// Timeout for each proxy check, covering connect, response and body
    pub timeout: Duration,
    /// URL to test proxies against
    pub test_url: String,
    pub criterion: SuccessCriterion,
    pub user_agent: String,
}

impl Default for CheckerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            test_url: DEFAULT_TEST_URL.to_string(),
            criterion: SuccessCriterion::default(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CheckerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_test_url(mut self, url: String) -> Self {
        self.test_url = url;
        self
    }

    pub fn with_criterion(mut self, criterion: SuccessCriterion) -> Self {
        self.criterion = criterion;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// A single validation attempt against one endpoint.
///
/// Implementations never fail: every problem is reported as a failed
/// [`ProxyCheckResult`].
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, proxy: &Proxy) -> ProxyCheckResult;
}

/// Probe that issues a real GET through the endpoint with reqwest
#[derive(Debug, Clone, Default)]
pub struct ProxyChecker {
    config: CheckerConfig,
}

impl ProxyChecker {
    /// Create a new proxy checker with default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new proxy checker with custom configuration
    pub fn with_config(config: CheckerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CheckerConfig {
        &self.config
    }

    /// Check a single proxy
    pub async fn check_proxy(&self, proxy: &Proxy) -> ProxyCheckResult {
        log::debug!("Checking proxy {}", proxy);
        let start = Instant::now();

        let client = match self.create_client(proxy) {
            Ok(client) => client,
            Err(e) => {
                return ProxyCheckResult::failed(proxy.clone(), ProbeError::Client(e.to_string()))
            }
        };

        let criterion = self.config.criterion;
        let request = async {
            let response = client.get(&self.config.test_url).send().await?;
            let status = response.status();
            log::trace!("Received response with status code {} via {}", status, proxy);

            let body = if criterion == SuccessCriterion::EchoHost && status == StatusCode::OK {
                Some(response.text().await?)
            } else {
                None
            };
            Ok::<_, reqwest::Error>((status.as_u16(), body))
        };

        let timeout_ms = self.config.timeout.as_millis() as u64;
        let verdict = match tokio::time::timeout(self.config.timeout, request).await {
            Ok(Ok((status, body))) => criterion.evaluate(proxy, status, body.as_deref()),
            Ok(Err(e)) if e.is_timeout() => Err(ProbeError::Timeout(timeout_ms)),
            Ok(Err(e)) => Err(ProbeError::Transport(e.to_string())),
            Err(_) => Err(ProbeError::Timeout(timeout_ms)),
        };

        match verdict {
            Ok(()) => ProxyCheckResult::working(proxy.clone(), start.elapsed().as_millis() as u64),
            Err(e) => ProxyCheckResult::failed(proxy.clone(), e),
        }
    }

    /// Create a reqwest client whose every request goes through the proxy
    fn create_client(&self, proxy: &Proxy) -> Result<Client> {
        let reqwest_proxy = ReqwestProxy::all(proxy.url())?;

        let client = Client::builder()
            .proxy(reqwest_proxy)
            .timeout(self.config.timeout)
            .user_agent(&self.config.user_agent)
            .pool_max_idle_per_host(0)
            .build()?;

        Ok(client)
    }
}

#[async_trait]
impl Probe for ProxyChecker {
    async fn probe(&self, proxy: &Proxy) -> ProxyCheckResult {
        self.check_proxy(proxy).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyType;

    fn endpoint() -> Proxy {
        Proxy::new("203.0.113.7".to_string(), 8080, ProxyType::Http)
    }

    #[test]
    fn test_checker_config_default() {
        let config = CheckerConfig::default();
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        assert_eq!(config.test_url, DEFAULT_TEST_URL);
        assert_eq!(config.criterion, SuccessCriterion::EchoHost);
    }

    #[test]
    fn test_checker_config_builder() {
        let config = CheckerConfig::new()
            .with_timeout(Duration::from_secs(30))
            .with_test_url("http://example.com".to_string())
            .with_criterion(SuccessCriterion::Status)
            .with_user_agent("probe/1.0".to_string());

        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.test_url, "http://example.com");
        assert_eq!(config.criterion, SuccessCriterion::Status);
        assert_eq!(config.user_agent, "probe/1.0");
    }

    #[test]
    fn test_status_criterion() {
        let proxy = endpoint();
        assert!(SuccessCriterion::Status.evaluate(&proxy, 200, None).is_ok());
        assert_eq!(
            SuccessCriterion::Status.evaluate(&proxy, 503, None),
            Err(ProbeError::Status(503))
        );
        assert_eq!(
            SuccessCriterion::Status.evaluate(&proxy, 204, None),
            Err(ProbeError::Status(204))
        );
    }

    #[test]
    fn test_echo_host_criterion() {
        let proxy = endpoint();
        let echo = SuccessCriterion::EchoHost;
        assert!(echo.evaluate(&proxy, 200, Some("203.0.113.7")).is_ok());
        assert!(echo.evaluate(&proxy, 200, Some("203.0.113.7\n")).is_ok());
        assert!(matches!(
            echo.evaluate(&proxy, 200, Some("198.51.100.1")),
            Err(ProbeError::BodyMismatch { .. })
        ));
        assert!(matches!(
            echo.evaluate(&proxy, 200, None),
            Err(ProbeError::BodyMismatch { .. })
        ));
        assert_eq!(
            echo.evaluate(&proxy, 503, Some("203.0.113.7")),
            Err(ProbeError::Status(503))
        );
    }

    #[test]
    fn test_create_client() {
        let checker = ProxyChecker::new();
        for proxy_type in [
            ProxyType::Http,
            ProxyType::Https,
            ProxyType::Socks4,
            ProxyType::Socks5,
        ] {
            let proxy = Proxy::new("127.0.0.1".to_string(), 1080, proxy_type);
            assert!(checker.create_client(&proxy).is_ok(), "{}", proxy_type);
        }
    }
}
