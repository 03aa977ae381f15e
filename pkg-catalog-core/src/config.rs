use crate::registry::{default_registry, ToolDescriptor};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BUCKET: &str = "jelly-prd-cdn-static";
pub const DEFAULT_PREFIX: &str = "packages";
pub const DEFAULT_CDN_BASE: &str = "https://files.project-jelly.io/packages";
pub const DEFAULT_OUTPUT_FILE: &str = "docs/data/packages.json";
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// Which of the discovered builds end up in the catalog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SelectionPolicy {
    /// Every build, most recent first.
    #[default]
    #[serde(rename = "all")]
    AllBuilds,
    /// Only the most recent build per tool (or per tool and OS version).
    #[serde(rename = "latest")]
    LatestOnly,
}

impl FromStr for SelectionPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "all" | "all-builds" | "all_builds" => Ok(SelectionPolicy::AllBuilds),
            "latest" | "latest-only" | "latest_only" => Ok(SelectionPolicy::LatestOnly),
            other => Err(format!(
                "unknown selection policy '{other}' (expected 'all' or 'latest')"
            )),
        }
    }
}

/// Everything one catalog run needs, resolved once at process entry.
#[derive(Debug, Clone)]
pub struct CatalogConfig {
    pub bucket: String,
    /// Key prefix inside the bucket, without leading or trailing `/`.
    pub prefix: String,
    /// Public base URL for download links, without trailing `/`.
    pub cdn_base: String,
    pub output_file: PathBuf,
    pub policy: SelectionPolicy,
    pub fetch_timeout: Duration,
    pub tools: Vec<ToolDescriptor>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            bucket: DEFAULT_BUCKET.to_string(),
            prefix: DEFAULT_PREFIX.to_string(),
            cdn_base: DEFAULT_CDN_BASE.to_string(),
            output_file: PathBuf::from(DEFAULT_OUTPUT_FILE),
            policy: SelectionPolicy::default(),
            fetch_timeout: DEFAULT_FETCH_TIMEOUT,
            tools: default_registry(),
        }
    }
}

impl CatalogConfig {
    /// Normalise the slash conventions of `prefix` and `cdn_base`.
    pub fn normalised(mut self) -> Self {
        self.prefix = self.prefix.trim_matches('/').to_string();
        self.cdn_base = self.cdn_base.trim_end_matches('/').to_string();
        self
    }

    pub fn trace_loaded(&self) {
        info!(
            bucket = %self.bucket,
            prefix = %self.prefix,
            cdn_base = %self.cdn_base,
            output_file = %self.output_file.display(),
            policy = ?self.policy,
            tools_count = self.tools.len(),
            "Loaded CatalogConfig"
        );
        debug!(?self, "CatalogConfig loaded (full debug)");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn policy_parses_both_spellings() {
        assert_eq!("latest".parse::<SelectionPolicy>(), Ok(SelectionPolicy::LatestOnly));
        assert_eq!("ALL-BUILDS".parse::<SelectionPolicy>(), Ok(SelectionPolicy::AllBuilds));
        assert!("newest".parse::<SelectionPolicy>().is_err());
    }

    #[test]
    fn normalised_strips_slashes() {
        let config = CatalogConfig {
            prefix: "/packages/".into(),
            cdn_base: "https://cdn.example.com/packages/".into(),
            ..CatalogConfig::default()
        }
        .normalised();
        assert_eq!(config.prefix, "packages");
        assert_eq!(config.cdn_base, "https://cdn.example.com/packages");
    }
}
