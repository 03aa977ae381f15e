//! Metadata reducer: turns selected build identifiers into [`BuildRecord`]s.
//!
//! Every build leaf in the bucket carries a `metadata.json` describing the packages bundled
//! in that artifact. The reducer fetches it, computes the public download URL and folds the
//! result into the tool's [`ToolResult`]. A build whose metadata cannot be fetched or parsed
//! is dropped with a warning; its siblings are unaffected.

use crate::catalog::{BuildId, BuildRecord, OsVersionBuilds, ToolResult};
use crate::config::CatalogConfig;
use crate::contract::{join_key, ObjectStore};
use crate::registry::ToolDescriptor;
use crate::walker::{tool_prefix, Discovery};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

pub const METADATA_FILE: &str = "metadata.json";

/// One package bundled in a build, passed through verbatim.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageEntry(pub Value);

impl PackageEntry {
    /// Display text of `key`: strings as-is, other JSON values in their JSON form.
    /// `None` when the key is missing, null, or the entry is not an object.
    pub fn field(&self, key: &str) -> Option<String> {
        match self.0.get(key)? {
            Value::Null => None,
            Value::String(text) => Some(text.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Contents of a build's `metadata.json`. Unknown fields are ignored, and a field of an
/// unexpected type is dropped on its own without rejecting the document.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct BuildMetadata {
    #[serde(default, deserialize_with = "lenient_packages")]
    pub packages: Vec<PackageEntry>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub sha256: Option<String>,
    #[serde(default, deserialize_with = "lenient_size")]
    pub file_size: Option<u64>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub arch: Option<String>,
}

fn lenient_packages<'de, D>(deserializer: D) -> Result<Vec<PackageEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Array(items) => items.into_iter().map(PackageEntry).collect(),
        Value::Null => Vec::new(),
        other => {
            debug!(value = %other, "Ignoring non-list `packages`");
            Vec::new()
        }
    })
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(text) => Some(text),
        Value::Null => None,
        other => {
            debug!(value = %other, "Ignoring non-string metadata field");
            None
        }
    })
}

fn lenient_size<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::Number(n) => n.as_u64(),
        Value::String(text) => text.trim().parse().ok(),
        _ => None,
    })
}

/// Where a build sits in the namespace.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BuildCoordinates<'a> {
    Simple { version: &'a str },
    OsVersioned { os_version: &'a str, build: &'a str },
}

/// Public download URL of a build artifact.
///
/// - simple: `{cdn}/{tool}/{version}/{tool}-{version}`
/// - os_versioned: `{cdn}/{tool}/{os}/{build}/{tool}-{os}-{build}`
pub fn build_download_url(cdn_base: &str, tool: &str, coordinates: BuildCoordinates<'_>) -> String {
    let cdn_base = cdn_base.trim_end_matches('/');
    match coordinates {
        BuildCoordinates::Simple { version } => {
            format!("{cdn_base}/{tool}/{version}/{tool}-{version}")
        }
        BuildCoordinates::OsVersioned { os_version, build } => {
            format!("{cdn_base}/{tool}/{os_version}/{build}/{tool}-{os_version}-{build}")
        }
    }
}

/// Bucket key of a build's metadata document.
pub fn metadata_key(
    config: &CatalogConfig,
    tool: &ToolDescriptor,
    coordinates: BuildCoordinates<'_>,
) -> String {
    let base = tool_prefix(config, tool);
    match coordinates {
        BuildCoordinates::Simple { version } => join_key([base.as_str(), version, METADATA_FILE]),
        BuildCoordinates::OsVersioned { os_version, build } => {
            join_key([base.as_str(), os_version, build, METADATA_FILE])
        }
    }
}

/// Fetch and parse the metadata document at `key`. Any failure yields `None` and a warning.
pub async fn fetch_metadata<S>(store: &S, key: &str) -> Option<BuildMetadata>
where
    S: ObjectStore + ?Sized,
{
    let bytes = match store.fetch(key).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!(key = %key, error = %e, "Failed to fetch metadata");
            return None;
        }
    };
    match serde_json::from_slice::<BuildMetadata>(&bytes) {
        Ok(metadata) => {
            debug!(key = %key, packages = metadata.packages.len(), "Parsed metadata");
            Some(metadata)
        }
        Err(e) => {
            warn!(key = %key, error = %e, "Invalid metadata JSON");
            None
        }
    }
}

/// Fold one build's metadata into its record. Optional fields are copied only when they
/// hold a non-empty (or non-zero) value.
pub fn reduce(id: BuildId, download_url: String, metadata: BuildMetadata) -> BuildRecord {
    BuildRecord {
        id,
        download_url,
        packages: metadata.packages,
        sha256: metadata.sha256.filter(|s| !s.is_empty()),
        file_size: metadata.file_size.filter(|size| *size > 0),
        arch: metadata.arch.filter(|s| !s.is_empty()),
    }
}

async fn reduce_build<S>(
    store: &S,
    config: &CatalogConfig,
    tool: &ToolDescriptor,
    coordinates: BuildCoordinates<'_>,
) -> Option<BuildRecord>
where
    S: ObjectStore + ?Sized,
{
    let key = metadata_key(config, tool, coordinates);
    let Some(metadata) = fetch_metadata(store, &key).await else {
        warn!(tool = %tool.name, ?coordinates, "No metadata for build, skipping");
        return None;
    };
    let id = match coordinates {
        BuildCoordinates::Simple { version } => BuildId::Version(version.to_string()),
        BuildCoordinates::OsVersioned { build, .. } => BuildId::Build(build.to_string()),
    };
    let url = build_download_url(&config.cdn_base, &tool.name, coordinates);
    Some(reduce(id, url, metadata))
}

/// Reduce everything the walker discovered for `tool`. Returns `None` when no build
/// produced a record.
pub async fn reduce_tool<S>(
    store: &S,
    config: &CatalogConfig,
    tool: &ToolDescriptor,
    discovery: &Discovery,
) -> Option<ToolResult>
where
    S: ObjectStore + ?Sized,
{
    match discovery {
        Discovery::Simple(versions) => {
            let mut builds = Vec::with_capacity(versions.len());
            for version in versions {
                let coordinates = BuildCoordinates::Simple {
                    version: version.as_str(),
                };
                if let Some(record) = reduce_build(store, config, tool, coordinates).await {
                    builds.push(record);
                }
            }
            if builds.is_empty() {
                return None;
            }
            info!(tool = %tool.name, builds = builds.len(), "Reduced tool");
            Some(ToolResult::Simple {
                name: tool.name.clone(),
                description: tool.description.clone(),
                builds,
            })
        }
        Discovery::OsVersioned(os_versions) => {
            let mut by_os = BTreeMap::new();
            for (os_version, build_ids) in os_versions {
                let mut builds = Vec::with_capacity(build_ids.len());
                for build in build_ids {
                    let coordinates = BuildCoordinates::OsVersioned {
                        os_version: os_version.as_str(),
                        build: build.as_str(),
                    };
                    if let Some(record) = reduce_build(store, config, tool, coordinates).await {
                        builds.push(record);
                    }
                }
                if builds.is_empty() {
                    info!(tool = %tool.name, os_version = %os_version, "No usable builds for OS version");
                    continue;
                }
                by_os.insert(os_version.clone(), OsVersionBuilds { builds });
            }
            if by_os.is_empty() {
                return None;
            }
            info!(tool = %tool.name, os_versions = by_os.len(), "Reduced tool");
            Some(ToolResult::OsVersioned {
                name: tool.name.clone(),
                description: tool.description.clone(),
                os_versions: by_os,
            })
        }
    }
}
