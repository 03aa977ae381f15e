//! Namespace walker: turns a tool's shape into the listing calls that enumerate its builds.
//!
//! Listing failures never propagate. A prefix that cannot be listed behaves like an empty
//! one and is reported with a warning, so one unreachable tool does not stop the others.

use crate::config::{CatalogConfig, SelectionPolicy};
use crate::contract::{join_key, ObjectStore};
use crate::registry::{ToolDescriptor, ToolShape};
use tracing::{info, warn};

/// Builds discovered for one tool, already filtered by the selection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Discovery {
    /// Build identifiers, most recent first.
    Simple(Vec<String>),
    /// `(os_version, builds)` pairs in ascending OS-version order; builds most recent first.
    /// OS versions without builds are already dropped.
    OsVersioned(Vec<(String, Vec<String>)>),
}

impl Discovery {
    pub fn is_empty(&self) -> bool {
        match self {
            Discovery::Simple(builds) => builds.is_empty(),
            Discovery::OsVersioned(os_versions) => os_versions.is_empty(),
        }
    }
}

/// Immediate children of `prefix`, or an empty list when listing fails.
pub async fn list_children<S>(store: &S, prefix: &str) -> Vec<String>
where
    S: ObjectStore + ?Sized,
{
    match store.list_children(prefix).await {
        Ok(children) => children,
        Err(e) => {
            warn!(prefix = %prefix, error = %e, "Listing failed, treating prefix as empty");
            Vec::new()
        }
    }
}

/// Sort build identifiers descending and apply the selection policy.
pub fn select_builds(mut builds: Vec<String>, policy: SelectionPolicy) -> Vec<String> {
    builds.sort_unstable_by(|a, b| b.cmp(a));
    builds.dedup();
    if policy == SelectionPolicy::LatestOnly {
        builds.truncate(1);
    }
    builds
}

/// Key prefix under which all of a tool's builds live.
pub fn tool_prefix(config: &CatalogConfig, tool: &ToolDescriptor) -> String {
    join_key([config.prefix.as_str(), tool.name.as_str()])
}

/// Enumerate the builds of `tool` according to its shape.
pub async fn discover<S>(store: &S, config: &CatalogConfig, tool: &ToolDescriptor) -> Discovery
where
    S: ObjectStore + ?Sized,
{
    match tool.shape {
        ToolShape::Simple => discover_simple(store, config, tool).await,
        ToolShape::OsVersioned => discover_os_versioned(store, config, tool).await,
    }
}

async fn discover_simple<S>(store: &S, config: &CatalogConfig, tool: &ToolDescriptor) -> Discovery
where
    S: ObjectStore + ?Sized,
{
    let base = tool_prefix(config, tool);
    info!(tool = %tool.name, prefix = %base, "Listing builds");

    let builds = select_builds(list_children(store, &base).await, config.policy);
    if builds.is_empty() {
        info!(tool = %tool.name, "No builds found, skipping tool");
    } else {
        info!(tool = %tool.name, count = builds.len(), builds = ?builds, "Selected builds");
    }
    Discovery::Simple(builds)
}

async fn discover_os_versioned<S>(
    store: &S,
    config: &CatalogConfig,
    tool: &ToolDescriptor,
) -> Discovery
where
    S: ObjectStore + ?Sized,
{
    let base = tool_prefix(config, tool);
    info!(tool = %tool.name, prefix = %base, "Listing OS versions");

    let mut os_versions = list_children(store, &base).await;
    if os_versions.is_empty() {
        info!(tool = %tool.name, "No OS versions found, skipping tool");
        return Discovery::OsVersioned(Vec::new());
    }
    os_versions.sort();
    os_versions.dedup();

    let mut discovered = Vec::with_capacity(os_versions.len());
    for os_version in os_versions {
        let os_base = join_key([base.as_str(), os_version.as_str()]);
        info!(tool = %tool.name, os_version = %os_version, prefix = %os_base, "Listing builds");

        let builds = select_builds(list_children(store, &os_base).await, config.policy);
        if builds.is_empty() {
            info!(tool = %tool.name, os_version = %os_version, "No builds for OS version, skipping");
            continue;
        }
        info!(
            tool = %tool.name,
            os_version = %os_version,
            count = builds.len(),
            builds = ?builds,
            "Selected builds"
        );
        discovered.push((os_version, builds));
    }
    Discovery::OsVersioned(discovered)
}
