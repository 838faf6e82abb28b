//! Candidate normalization: raw list lines in, endpoints out

use crate::proxy::models::{Proxy, ProxyType};
use crate::Result;
use once_cell::sync::Lazy;
use regex::Regex;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::net::Ipv4Addr;
use std::path::Path;

/// Scheme prefix some sources tag their lines with
static SCHEME_PREFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)^(socks5h?|socks4a?|https?)://").expect("Invalid scheme prefix regex")
});

static IP_PORT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\d{1,3}(?:\.\d{1,3}){3}):(\d{1,5})$").expect("Invalid IP:PORT regex")
});

/// Outcome of normalizing a batch of raw lines
#[derive(Debug, Clone, Default)]
pub struct Normalized {
    pub proxies: Vec<Proxy>,
    /// Non-blank lines that did not look like `IP:PORT`
    pub malformed: usize,
}

/// Proxy parser for turning raw candidate lines into endpoints
pub struct ProxyParser;

impl ProxyParser {
    /// Normalize a single raw line into an endpoint of the batch's scheme.
    ///
    /// Accepts `IP:PORT` optionally prefixed with a known scheme
    /// (`socks5://`, `http://`, ...) and surrounded by whitespace or a
    /// trailing carriage return. The prefix is discarded; the endpoint always
    /// carries `proxy_type`.
    pub fn parse_line(line: &str, proxy_type: ProxyType) -> Option<Proxy> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let stripped = SCHEME_PREFIX.replace(line, "");
        let candidate = stripped.trim().trim_end_matches('/');

        let caps = IP_PORT.captures(candidate)?;
        let host: Ipv4Addr = caps[1].parse().ok()?;
        let port: u16 = caps[2].parse().ok()?;
        if port == 0 {
            return None;
        }

        Some(Proxy::new(host.to_string(), port, proxy_type))
    }

    /// Whether a line carries no candidate at all (blank or comment)
    fn is_filler(line: &str) -> bool {
        let line = line.trim();
        line.is_empty() || line.starts_with('#')
    }

    /// Normalize a sequence of raw lines, counting the malformed ones
    pub fn normalize<I, S>(lines: I, proxy_type: ProxyType) -> Normalized
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut normalized = Normalized::default();

        for line in lines {
            let line = line.as_ref();
            if Self::is_filler(line) {
                continue;
            }
            match Self::parse_line(line, proxy_type) {
                Some(proxy) => normalized.proxies.push(proxy),
                None => {
                    log::trace!("Skipping malformed candidate {:?}", line);
                    normalized.malformed += 1;
                }
            }
        }

        normalized
    }

    /// Write proxies one `scheme://host:port` per line, replacing any
    /// existing file.
    pub fn save_to_file<P: AsRef<Path>>(proxies: &[Proxy], path: P) -> Result<()> {
        let path = path.as_ref();
        log::info!("Writing {} proxies to file {}", proxies.len(), path.display());

        let mut writer = BufWriter::new(File::create(path)?);
        for proxy in proxies {
            writeln!(writer, "{}", proxy.url())?;
        }
        writer.flush()?;

        log::info!("Successfully wrote proxies to file {}", path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_parse_simple_format() {
        let proxy = ProxyParser::parse_line("192.168.1.1:8080", ProxyType::Http).unwrap();
        assert_eq!(proxy.host, "192.168.1.1");
        assert_eq!(proxy.port, 8080);
        assert_eq!(proxy.proxy_type, ProxyType::Http);
    }

    #[test]
    fn test_parse_strips_carriage_return() {
        let proxy = ProxyParser::parse_line("10.0.0.1:1080\r", ProxyType::Socks5).unwrap();
        assert_eq!(proxy.url(), "socks5://10.0.0.1:1080");
    }

    #[test]
    fn test_parse_strips_scheme_prefix() {
        let proxy = ProxyParser::parse_line("socks5://10.0.0.1:1080", ProxyType::Socks5).unwrap();
        assert_eq!(proxy.url(), "socks5://10.0.0.1:1080");

        let proxy = ProxyParser::parse_line("HTTP://10.0.0.2:3128/", ProxyType::Http).unwrap();
        assert_eq!(proxy.url(), "http://10.0.0.2:3128");
    }

    #[test]
    fn test_batch_scheme_wins_over_prefix() {
        let proxy = ProxyParser::parse_line("http://10.0.0.1:1080", ProxyType::Socks4).unwrap();
        assert_eq!(proxy.proxy_type, ProxyType::Socks4);
        assert_eq!(proxy.url(), "socks4://10.0.0.1:1080");
    }

    #[test]
    fn test_parse_invalid_format() {
        assert!(ProxyParser::parse_line("", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("invalid", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("192.168.1.1:abc", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("999.1.1.1:8080", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("1.1.1.1:0", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("1.1.1.1:70000", ProxyType::Http).is_none());
        assert!(ProxyParser::parse_line("user:pass@1.1.1.1:80", ProxyType::Http).is_none());
    }

    #[test]
    fn test_normalize_counts_malformed() {
        let lines = [
            "garbage",
            "1.2.3.4:80",
            "1.2.3:80",
            "socks5://5.6.7.8:1080\r",
            "not a proxy at all",
            "9.9.9.9:99999",
            "",
            "# comment",
            "10.0.0.1:3128",
            "10.0.0.1",
        ];
        let normalized = ProxyParser::normalize(lines, ProxyType::Http);
        assert_eq!(normalized.proxies.len(), 3);
        assert_eq!(normalized.malformed, 5);
        assert!(normalized
            .proxies
            .iter()
            .all(|p| p.proxy_type == ProxyType::Http));
    }

    #[test]
    fn test_save_to_file_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("socks5.txt");
        fs::write(&path, "stale content that is much longer than the output\n").unwrap();

        let proxies = vec![
            Proxy::new("1.1.1.1".to_string(), 1080, ProxyType::Socks5),
            Proxy::new("2.2.2.2".to_string(), 1081, ProxyType::Socks5),
        ];
        ProxyParser::save_to_file(&proxies, &path).unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "socks5://1.1.1.1:1080\nsocks5://2.2.2.2:1081\n");
    }
}
