//! Proxy crawler module for fetching candidate lists
//!
//! Every source is a URL answering with newline-delimited candidates. All
//! sources of a class are fetched at once; a failing source is reported and
//! skipped without affecting its siblings.

use crate::proxy::models::ProxyType;
use crate::Result;
use futures::future::join_all;
use reqwest::Client;
use std::fs;
use std::path::Path;
use std::time::Duration;

/// Default timeout for HTTP requests in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default user agent for HTTP requests
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36";

const SOCKS5_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/yemixzy/proxy-list/main/proxies/socks5.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/socks5.txt",
    "https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/socks5.txt",
    "https://raw.githubusercontent.com/TheSpeedX/PROXY-List/master/socks5.txt",
    "https://api.openproxylist.xyz/socks5.txt",
    "https://raw.githubusercontent.com/mmpx12/proxy-list/master/socks5.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks5.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies_anonymous/socks5.txt",
    "https://raw.githubusercontent.com/roosterkid/openproxylist/main/SOCKS5_RAW.txt",
    "https://proxyspace.pro/socks5.txt",
    "https://api.proxyscrape.com/?request=displayproxies&proxytype=socks5",
    "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=socks5",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks5&timeout=10000&country=all&simplified=true",
    "https://www.proxy-list.download/api/v1/get?type=socks5",
    "https://raw.githubusercontent.com/officialputuid/KangProxy/KangProxy/socks5/socks5.txt",
    "https://alexa.lr2b.com/proxylist.txt",
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/protocols/socks5/data.txt",
];

const SOCKS4_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/socks4.txt",
    "https://raw.githubusercontent.com/yemixzy/proxy-list/main/proxies/socks4.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/socks4.txt",
    "https://api.proxyscrape.com/?request=displayproxies&proxytype=socks4",
    "https://api.proxyscrape.com/v2/?request=displayproxies&protocol=socks4",
    "https://api.proxyscrape.com/v2/?request=getproxies&protocol=socks4&timeout=10000&country=all&simplified=true",
    "https://raw.githubusercontent.com/TheSpeedX/SOCKS-List/master/socks4.txt",
    "https://proxyspace.pro/socks4.txt",
    "https://api.openproxylist.xyz/socks4.txt",
    "https://www.proxy-list.download/api/v1/get?type=socks4",
    "https://raw.githubusercontent.com/officialputuid/KangProxy/KangProxy/socks4/socks4.txt",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/socks4.txt",
    "https://raw.githubusercontent.com/rdavydov/proxy-list/main/proxies_anonymous/socks4.txt",
    "https://alexa.lr2b.com/proxylist.txt",
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/protocols/socks4/data.txt",
];

const HTTP_SOURCES: &[&str] = &[
    "https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/https.txt",
    "https://raw.githubusercontent.com/vakhov/fresh-proxy-list/refs/heads/master/http.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/http.txt",
    "https://raw.githubusercontent.com/ErcinDedeoglu/proxies/refs/heads/main/proxies/https.txt",
    "https://raw.githubusercontent.com/yemixzy/proxy-list/main/proxies/http.txt",
    "https://proxyspace.pro/http.txt",
    "https://proxyspace.pro/https.txt",
    "https://raw.githubusercontent.com/TheSpeedX/SOCKS-List/master/http.txt",
    "https://api.openproxylist.xyz/http.txt",
    "https://alexa.lr2b.com/proxylist.txt",
    "https://www.proxy-list.download/api/v1/get?type=http",
    "https://raw.githubusercontent.com/monosans/proxy-list/main/proxies/http.txt",
    "https://www.proxy-list.download/api/v1/get?type=https",
    "https://raw.githubusercontent.com/officialputuid/KangProxy/KangProxy/https/https.txt",
    "https://raw.githubusercontent.com/officialputuid/KangProxy/KangProxy/http/http.txt",
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/protocols/http/data.txt",
    "https://raw.githubusercontent.com/proxifly/free-proxy-list/refs/heads/main/proxies/protocols/https/data.txt",
];

/// A proxy class: the scheme every candidate is validated as, and the lists
/// it is gathered from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyClass {
    pub kind: ProxyType,
    pub source_urls: Vec<String>,
}

impl ProxyClass {
    pub fn new(kind: ProxyType, source_urls: Vec<String>) -> Self {
        Self { kind, source_urls }
    }

    /// Built-in public lists for a kind. HTTP and HTTPS share one list and
    /// both validate as plain `http` proxies.
    pub fn defaults(kind: ProxyType) -> Self {
        let (kind, urls) = match kind {
            ProxyType::Socks5 => (ProxyType::Socks5, SOCKS5_SOURCES),
            ProxyType::Socks4 => (ProxyType::Socks4, SOCKS4_SOURCES),
            ProxyType::Http | ProxyType::Https => (ProxyType::Http, HTTP_SOURCES),
        };
        Self::new(kind, urls.iter().map(|u| u.to_string()).collect())
    }

    pub fn with_extra_sources(mut self, urls: impl IntoIterator<Item = String>) -> Self {
        for url in urls {
            if !self.source_urls.contains(&url) {
                self.source_urls.push(url);
            }
        }
        self
    }

    /// Default output file name, e.g. `socks5.txt`
    pub fn output_file(&self) -> String {
        format!("{}.txt", self.kind)
    }
}

/// Result of crawling a single source
#[derive(Debug, Clone)]
pub struct CrawlResult {
    /// The source that was crawled
    pub source: String,
    /// Raw lines returned by the source
    pub lines: Vec<String>,
    /// Error message if crawling failed
    pub error: Option<String>,
}

impl CrawlResult {
    /// Create a successful crawl result
    pub fn success(source: String, lines: Vec<String>) -> Self {
        Self {
            source,
            lines,
            error: None,
        }
    }

    /// Create a failed crawl result
    pub fn failure(source: String, error: String) -> Self {
        Self {
            source,
            lines: Vec::new(),
            error: Some(error),
        }
    }

    /// Check if the crawl was successful
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

/// Configuration for proxy crawler
#[derive(Debug, Clone)]
pub struct CrawlerConfig {
    /// Timeout for HTTP requests
    pub timeout: Duration,
    /// User agent for HTTP requests
    pub user_agent: String,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

impl CrawlerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: String) -> Self {
        self.user_agent = user_agent;
        self
    }
}

/// Proxy crawler for fetching candidate lists from the web
pub struct ProxyCrawler {
    client: Client,
}

impl ProxyCrawler {
    /// Create a new proxy crawler with custom configuration
    pub fn with_config(config: CrawlerConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()?;

        Ok(Self { client })
    }

    /// Fetch the raw lines of a single source
    pub async fn crawl_url(&self, url: &str) -> Result<Vec<String>> {
        log::info!("Try to retrieve proxies from URL {}", url);

        let response = self.client.get(url).send().await?.error_for_status()?;
        let content = response.text().await?;
        let lines: Vec<String> = content.lines().map(str::to_string).collect();

        log::info!("{} proxies have been received from URL {}", lines.len(), url);
        Ok(lines)
    }

    /// Fetch every source concurrently, one task per URL
    pub async fn crawl_urls_with_results(&self, urls: &[String]) -> Vec<CrawlResult> {
        let fetches = urls.iter().map(|url| async move {
            match self.crawl_url(url).await {
                Ok(lines) => CrawlResult::success(url.clone(), lines),
                Err(e) => CrawlResult::failure(url.clone(), e.to_string()),
            }
        });

        join_all(fetches).await
    }

    /// Gather all raw candidate lines of a class. Failed sources are logged
    /// and contribute nothing.
    pub async fn collect(&self, class: &ProxyClass) -> Vec<String> {
        log::info!(
            "Fetching {} proxies from {} sources",
            class.kind,
            class.source_urls.len()
        );

        let mut all = Vec::new();
        for result in self.crawl_urls_with_results(&class.source_urls).await {
            match result.error {
                Some(error) => log::error!("Error crawling {}: {}", result.source, error),
                None if result.lines.is_empty() => {
                    log::warn!("No proxies received from URL {}", result.source)
                }
                None => all.extend(result.lines),
            }
        }

        log::info!("Total proxies collected: {}", all.len());
        all
    }

    /// Read a local list, one entry per line, skipping blanks and `#`
    /// comments
    pub fn read_list_file<P: AsRef<Path>>(path: P) -> Result<Vec<String>> {
        let content = fs::read_to_string(path)?;
        Ok(content
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with('#'))
            .map(str::to_string)
            .collect())
    }
}
