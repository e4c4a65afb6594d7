//! Proxy list parser for files and piped input

use crate::proxy::models::ProxyAddress;
use crate::Result;
use anyhow::Context;
use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

/// Parser for proxy lists, one address per line
pub struct ProxyListParser;

impl ProxyListParser {
    /// Parse a single proxy line
    ///
    /// Blank lines and lines starting with `#` yield `None`. Lines without
    /// an `http://`, `https://` or `socks5://` prefix are treated as HTTP.
    pub fn parse_line(line: &str) -> Option<ProxyAddress> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }
        Some(ProxyAddress::normalize(line))
    }

    /// Parse proxies from a string (multiple lines)
    pub fn parse_string(content: &str) -> Vec<ProxyAddress> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Parse proxies from any buffered reader, such as locked stdin
    pub fn parse_reader<R: BufRead>(reader: R) -> Result<Vec<ProxyAddress>> {
        let mut proxies = Vec::new();
        for line in reader.lines() {
            let line = line.context("failed to read proxy list")?;
            if let Some(proxy) = Self::parse_line(&line) {
                proxies.push(proxy);
            }
        }
        Ok(proxies)
    }

    /// Parse proxies from a file
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyAddress>> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("failed to open {}", path.display()))?;
        Self::parse_reader(BufReader::new(file))
    }

    /// Drop repeated addresses, keeping the first occurrence
    pub fn dedup(proxies: Vec<ProxyAddress>) -> Vec<ProxyAddress> {
        let mut seen = HashSet::new();
        proxies
            .into_iter()
            .filter(|proxy| seen.insert(proxy.clone()))
            .collect()
    }
}
