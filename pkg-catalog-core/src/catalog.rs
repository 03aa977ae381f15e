//! High-level pipeline: walks every registered tool and assembles the published catalog.
//!
//! For each [`ToolDescriptor`] in the configured registry the assembler runs the walker
//! ([`crate::walker::discover`]) and the reducer ([`crate::reducer::reduce_tool`]), then
//! merges the per-tool results into one [`Catalog`].
//!
//! # Responsibilities
//! - Tools that produce no build record are left out of the catalog and reported.
//! - If *every* tool comes back empty the run fails with [`CatalogError::NoToolsProduced`];
//!   an empty catalog would overwrite good data with nothing.
//! - The `tools` map keeps registry order no matter which tool finishes first.
//!
//! # Persistence
//! [`write_catalog`] replaces the output file atomically (temp file in the same directory,
//! then rename), so readers never see a half-written catalog.

use crate::config::CatalogConfig;
use crate::contract::ObjectStore;
use crate::error::CatalogError;
use crate::reducer::{reduce_tool, PackageEntry};
use crate::registry::ToolDescriptor;
use crate::walker::discover;
use chrono::{DateTime, Utc};
use futures::future::join_all;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tracing::{error, info, warn};

/// Identifier of a build, keyed the way the published JSON names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildId {
    /// Simple tools: `"version": "..."`.
    #[serde(rename = "version")]
    Version(String),
    /// OS-versioned tools: `"build": "..."`.
    #[serde(rename = "build")]
    Build(String),
}

impl BuildId {
    pub fn as_str(&self) -> &str {
        match self {
            BuildId::Version(id) | BuildId::Build(id) => id,
        }
    }
}

/// One reduced build.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    #[serde(flatten)]
    pub id: BuildId,
    pub download_url: String,
    pub packages: Vec<PackageEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub arch: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OsVersionBuilds {
    pub builds: Vec<BuildRecord>,
}

/// Per-tool entry of the catalog; the variant follows the tool's shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ToolResult {
    Simple {
        name: String,
        description: String,
        /// Most recent first.
        builds: Vec<BuildRecord>,
    },
    OsVersioned {
        name: String,
        description: String,
        /// Ascending by OS version; builds inside most recent first.
        os_versions: BTreeMap<String, OsVersionBuilds>,
    },
}

impl ToolResult {
    pub fn name(&self) -> &str {
        match self {
            ToolResult::Simple { name, .. } | ToolResult::OsVersioned { name, .. } => name,
        }
    }

    pub fn description(&self) -> &str {
        match self {
            ToolResult::Simple { description, .. }
            | ToolResult::OsVersioned { description, .. } => description,
        }
    }

    pub fn build_count(&self) -> usize {
        match self {
            ToolResult::Simple { builds, .. } => builds.len(),
            ToolResult::OsVersioned { os_versions, .. } => {
                os_versions.values().map(|os| os.builds.len()).sum()
            }
        }
    }
}

/// The single published artifact.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub generated_at: DateTime<Utc>,
    pub cdn_base: String,
    pub tools: IndexMap<String, ToolResult>,
}

/// Walk and reduce a single tool.
pub async fn build_tool<S>(
    store: &S,
    config: &CatalogConfig,
    tool: &ToolDescriptor,
) -> Option<ToolResult>
where
    S: ObjectStore + ?Sized,
{
    info!(tool = %tool.name, shape = %tool.shape, "[INDEX] Processing tool");
    let discovery = discover(store, config, tool).await;
    if discovery.is_empty() {
        return None;
    }
    reduce_tool(store, config, tool, &discovery).await
}

/// Run every tool pipeline and merge the results into a [`Catalog`].
pub async fn assemble<S>(store: &S, config: &CatalogConfig) -> Result<Catalog, CatalogError>
where
    S: ObjectStore + ?Sized,
{
    info!(tools = config.tools.len(), policy = ?config.policy, "[INDEX] Starting catalog assembly");

    // join_all yields results in input order, so the merge below follows the registry.
    let results = join_all(config.tools.iter().map(|tool| build_tool(store, config, tool))).await;

    let mut tools = IndexMap::new();
    let mut failed = Vec::new();
    for (tool, result) in config.tools.iter().zip(results) {
        match result {
            Some(result) => {
                info!(tool = %tool.name, builds = result.build_count(), "[INDEX] Tool added to catalog");
                tools.insert(tool.name.clone(), result);
            }
            None => failed.push(tool.name.clone()),
        }
    }

    if tools.is_empty() {
        error!(failed = ?failed, "[INDEX][ERROR] No tools produced output");
        return Err(CatalogError::NoToolsProduced { failed });
    }
    if !failed.is_empty() {
        warn!(skipped = %failed.join(", "), "[INDEX] Skipped tools with no data");
    }

    Ok(Catalog {
        generated_at: Utc::now(),
        cdn_base: config.cdn_base.clone(),
        tools,
    })
}

/// Pretty-printed JSON with a trailing newline.
pub fn to_json(catalog: &Catalog) -> Result<String, CatalogError> {
    let mut json = serde_json::to_string_pretty(catalog)?;
    json.push('\n');
    Ok(json)
}

/// Replace `path` with the catalog in one rename.
pub fn write_catalog(catalog: &Catalog, path: &Path) -> Result<(), CatalogError> {
    let io_err = |source| CatalogError::Io {
        path: path.to_path_buf(),
        source,
    };
    let json = to_json(catalog)?;

    let parent = match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir,
        _ => Path::new("."),
    };
    std::fs::create_dir_all(parent).map_err(io_err)?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent).map_err(io_err)?;
    tmp.write_all(json.as_bytes()).map_err(io_err)?;
    tmp.as_file().sync_all().map_err(io_err)?;
    tmp.persist(path).map_err(|e| io_err(e.error))?;

    info!(path = %path.display(), tools = catalog.tools.len(), "[INDEX] Wrote catalog");
    Ok(())
}

/// Load a previously published catalog.
pub async fn read_catalog(path: &Path) -> Result<Catalog, CatalogError> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| CatalogError::Io {
            path: path.to_path_buf(),
            source,
        })?;
    Ok(serde_json::from_str(&content)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: BuildId) -> BuildRecord {
        BuildRecord {
            id,
            download_url: "https://cdn/x".into(),
            packages: vec![],
            sha256: Some("abc".into()),
            file_size: None,
            arch: None,
        }
    }

    #[test]
    fn build_record_uses_shape_specific_key() {
        let simple = serde_json::to_value(record(BuildId::Version("v1".into()))).unwrap();
        assert_eq!(simple["version"], "v1");
        assert!(simple.get("build").is_none());
        assert!(simple.get("file_size").is_none());

        let os = serde_json::to_value(record(BuildId::Build("b1".into()))).unwrap();
        assert_eq!(os["build"], "b1");
        assert!(os.get("version").is_none());
    }

    #[test]
    fn catalog_json_reads_back() {
        let mut os_versions = BTreeMap::new();
        os_versions.insert(
            "9".to_string(),
            OsVersionBuilds {
                builds: vec![record(BuildId::Build("b1".into()))],
            },
        );
        let mut tools = IndexMap::new();
        tools.insert(
            "rpmtools".to_string(),
            ToolResult::OsVersioned {
                name: "rpmtools".into(),
                description: "RPM package bundler".into(),
                os_versions,
            },
        );
        tools.insert(
            "bintools".to_string(),
            ToolResult::Simple {
                name: "bintools".into(),
                description: "Go binary package manager".into(),
                builds: vec![record(BuildId::Version("v1".into()))],
            },
        );
        let catalog = Catalog {
            generated_at: Utc::now(),
            cdn_base: "https://cdn".into(),
            tools,
        };

        let json = to_json(&catalog).unwrap();
        assert!(json.ends_with("}\n"));
        let back: Catalog = serde_json::from_str(&json).unwrap();
        assert_eq!(back, catalog);
        assert_eq!(back.tools.keys().collect::<Vec<_>>(), vec!["rpmtools", "bintools"]);
    }

    #[test]
    fn write_catalog_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data").join("packages.json");
        let catalog = Catalog {
            generated_at: Utc::now(),
            cdn_base: "https://cdn".into(),
            tools: IndexMap::new(),
        };
        write_catalog(&catalog, &path).unwrap();
        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("\"cdn_base\": \"https://cdn\""));
        assert_eq!(std::fs::read_dir(path.parent().unwrap()).unwrap().count(), 1);
    }
}
