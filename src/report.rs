//! Reporting of probe results: terminal table, JSON and the working list

use crate::proxy::ProbeResult;
use crate::Result;
use anyhow::Context;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

/// Width of the proxy column before truncation
const PROXY_COLUMN_WIDTH: usize = 50;

/// Working/total counts for a batch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Summary {
    pub working: usize,
    pub total: usize,
}

impl Summary {
    pub fn from_results(results: &[ProbeResult]) -> Self {
        Self {
            working: results.iter().filter(|r| r.is_working()).count(),
            total: results.len(),
        }
    }

    /// Share of working proxies, 0.0 for an empty batch
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        self.working as f64 / self.total as f64 * 100.0
    }
}

/// What happened when saving the working proxies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// No proxy worked, so no file was written
    NothingToSave,
    Saved { count: usize },
}

/// Render results as a fixed-width table followed by a summary line
pub fn render_table(results: &[ProbeResult]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<50} {:<10} {:<15} {:<10} {}",
        "PROXY", "STATUS", "IP", "TIME", "ERROR"
    );
    let _ = writeln!(out, "{}", "-".repeat(100));

    for result in results {
        let status = if result.is_working() { "WORKING" } else { "FAILED" };
        let error = result.error().map(ToString::to_string).unwrap_or_default();
        let _ = writeln!(
            out,
            "{:<50} {:<10} {:<15} {:<10} {}",
            truncate(result.proxy.as_str(), PROXY_COLUMN_WIDTH),
            status,
            result.ip().unwrap_or(""),
            format!("{:.2}s", result.elapsed.as_secs_f64()),
            error
        );
    }

    let summary = Summary::from_results(results);
    let _ = writeln!(
        out,
        "\nSummary: {}/{} proxies working ({:.1}%)",
        summary.working,
        summary.total,
        summary.percentage()
    );
    out
}

/// Render results as pretty-printed JSON
pub fn render_json(results: &[ProbeResult]) -> Result<String> {
    serde_json::to_string_pretty(results).context("failed to serialize results")
}

/// Write working proxies to `path`, one per line.
///
/// Nothing is written when no proxy worked. Any I/O failure is returned.
pub fn save_working<P: AsRef<Path>>(results: &[ProbeResult], path: P) -> Result<SaveOutcome> {
    let path = path.as_ref();
    let content: String = results
        .iter()
        .filter(|r| r.is_working())
        .map(|r| format!("{}\n", r.proxy))
        .collect();

    if content.is_empty() {
        return Ok(SaveOutcome::NothingToSave);
    }

    let count = content.lines().count();
    fs::write(path, content)
        .with_context(|| format!("failed to write working proxies to {}", path.display()))?;
    Ok(SaveOutcome::Saved { count })
}

/// Shorten `s` to at most `max_len` characters, ending in `...`
fn truncate(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        return s.to_string();
    }
    let keep = max_len.saturating_sub(3);
    let mut out: String = s.chars().take(keep).collect();
    out.push_str("...");
    out
}
