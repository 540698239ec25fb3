//! Application version lookup for `--version`.
//!
//! Sources are tried in order until one yields a version:
//!
//! 1. A version declared in code, typically `env!("CARGO_PKG_VERSION")`
//! 2. A `version = "x.y.z"` line in a manifest file such as `Cargo.toml`
//! 3. The trimmed contents of a legacy version file (`VERSION.txt`)
//! 4. [`UNKNOWN_VERSION`]

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::debug;

pub const UNKNOWN_VERSION: &str = "Unknown";

const VERSION_LINE: &str = r#"(?m)^\s*version\s*=\s*["']([^"'\s]+)["']"#;

/// The first `version = "..."` value in `text`.
pub fn version_in_manifest(text: &str) -> Option<String> {
    let re = Regex::new(VERSION_LINE).ok()?;
    re.captures(text)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}

fn read(path: &Path) -> Option<String> {
    match std::fs::read_to_string(path) {
        Ok(text) => Some(text),
        Err(e) => {
            debug!(path = %path.display(), error = %e, "version source unreadable");
            None
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct VersionLookup {
    pub declared: Option<String>,
    pub manifest: Option<PathBuf>,
    pub version_file: Option<PathBuf>,
}

impl VersionLookup {
    /// Walk the sources in order. Never fails; the last resort is [`UNKNOWN_VERSION`].
    pub fn resolve(&self) -> String {
        if let Some(v) = self.declared.as_deref().map(str::trim)
            && !v.is_empty()
        {
            return v.to_string();
        }

        if let Some(path) = &self.manifest
            && let Some(v) = read(path).as_deref().and_then(version_in_manifest)
        {
            return v;
        }

        if let Some(path) = &self.version_file
            && let Some(text) = read(path)
        {
            let v = text.trim();
            if !v.is_empty() {
                return v.to_string();
            }
        }

        UNKNOWN_VERSION.to_string()
    }
}
