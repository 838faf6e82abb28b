//! Proxy data models

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::proxy::checker::ProbeError;

/// Proxy type enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProxyType {
    #[default]
    Http,
    Https,
    Socks4,
    Socks5,
}

impl ProxyType {
    /// URL scheme used when building endpoint strings
    pub fn scheme(&self) -> &'static str {
        match self {
            ProxyType::Http => "http",
            ProxyType::Https => "https",
            ProxyType::Socks4 => "socks4",
            ProxyType::Socks5 => "socks5",
        }
    }
}

impl fmt::Display for ProxyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.scheme())
    }
}

/// A normalized proxy endpoint. Never mutated once built.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Proxy {
    pub host: String,
    pub port: u16,
    pub proxy_type: ProxyType,
}

impl Proxy {
    pub fn new(host: String, port: u16, proxy_type: ProxyType) -> Self {
        Self {
            host,
            port,
            proxy_type,
        }
    }

    /// Get the proxy URL string (`scheme://host:port`)
    pub fn url(&self) -> String {
        format!("{}://{}:{}", self.proxy_type, self.host, self.port)
    }
}

impl fmt::Display for Proxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url())
    }
}

/// One unit of pool work: an endpoint plus its `i/total` position for logs.
#[derive(Debug, Clone)]
pub struct ProxyTask {
    pub proxy: Proxy,
    pub index: usize,
    pub total: usize,
}

impl ProxyTask {
    pub fn new(proxy: Proxy, index: usize, total: usize) -> Self {
        Self {
            proxy,
            index,
            total,
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}", self.index, self.total)
    }
}

/// Result of proxy check operation
#[derive(Debug, Clone)]
pub enum ProxyCheckStatus {
    Working,
    Failed(ProbeError),
}

/// Detailed result of a proxy check
#[derive(Debug, Clone)]
pub struct ProxyCheckResult {
    pub proxy: Proxy,
    pub status: ProxyCheckStatus,
    pub response_time_ms: Option<u64>,
}

impl ProxyCheckResult {
    pub fn working(proxy: Proxy, response_time_ms: u64) -> Self {
        Self {
            proxy,
            status: ProxyCheckStatus::Working,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(proxy: Proxy, error: ProbeError) -> Self {
        Self {
            proxy,
            status: ProxyCheckStatus::Failed(error),
            response_time_ms: None,
        }
    }

    pub fn is_working(&self) -> bool {
        matches!(self.status, ProxyCheckStatus::Working)
    }

    pub fn error(&self) -> Option<&ProbeError> {
        match &self.status {
            ProxyCheckStatus::Failed(e) => Some(e),
            ProxyCheckStatus::Working => None,
        }
    }
}
