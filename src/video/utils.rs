use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

const SNIPPET_CHARS: usize = 40;

pub fn canonicalize_existing(path: &Path) -> Result<PathBuf> {
    if !path.exists() {
        anyhow::bail!("{} does not exist", path.display());
    }
    path.canonicalize()
        .with_context(|| format!("Failed to canonicalize path {}", path.display()))
}

/// Shorten text for log lines and error messages.
pub fn snippet(text: &str) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= SNIPPET_CHARS {
        return trimmed.to_string();
    }
    let mut short: String = trimmed.chars().take(SNIPPET_CHARS).collect();
    short.push_str("...");
    short
}

pub fn format_duration(seconds: f64) -> String {
    let total_ms = (seconds.max(0.0) * 1000.0).round() as u64;
    let minutes = total_ms / 60_000;
    let secs = (total_ms % 60_000) as f64 / 1000.0;
    if minutes > 0 {
        format!("{minutes}m {secs:05.2}s")
    } else {
        format!("{secs:.2}s")
    }
}
