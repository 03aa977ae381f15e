//! Markdown rendering of catalog entries and marker-delimited splicing into doc pages.

use crate::catalog::{BuildRecord, Catalog, ToolResult};
use crate::reducer::PackageEntry;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

pub const DEFAULT_START_MARKER: &str = "<!-- CONTENT_START -->";
pub const DEFAULT_END_MARKER: &str = "<!-- CONTENT_END -->";

const PLACEHOLDER: &str = "-";

/// Where the tool pages live and which markers delimit the generated section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocsConfig {
    pub dir: PathBuf,
    pub start_marker: String,
    pub end_marker: String,
}

impl Default for DocsConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("docs"),
            start_marker: DEFAULT_START_MARKER.to_string(),
            end_marker: DEFAULT_END_MARKER.to_string(),
        }
    }
}

impl DocsConfig {
    pub fn page_for(&self, tool: &str) -> PathBuf {
        self.dir.join(format!("{tool}.md"))
    }
}

fn cell(value: Option<String>) -> String {
    match value {
        Some(v) if !v.is_empty() => v,
        _ => PLACEHOLDER.to_string(),
    }
}

/// Package table of one build.
pub fn render_package_table(packages: &[PackageEntry]) -> String {
    if packages.is_empty() {
        return "_No packages in metadata_".to_string();
    }
    let mut lines = vec![
        "| Package | Version | Description |".to_string(),
        "|---------|---------|-------------|".to_string(),
    ];
    for pkg in packages {
        lines.push(format!(
            "| {} | {} | {} |",
            cell(pkg.field("name")),
            cell(pkg.field("version")),
            cell(pkg.field("description")),
        ));
    }
    lines.join("\n")
}

/// Last path segment of a download URL, i.e. the artifact file name.
fn artifact_name(url: &str) -> &str {
    url.rsplit('/').next().unwrap_or(url)
}

fn install_snippet(url: &str) -> Vec<String> {
    vec![
        "```bash".to_string(),
        format!("curl -LO \"{url}\""),
        format!("chmod +x {}", artifact_name(url)),
        "```".to_string(),
    ]
}

fn render_simple(builds: &[BuildRecord]) -> String {
    let Some(latest) = builds.first() else {
        return "_Version not available_".to_string();
    };

    let mut lines = vec![format!("**Build:** `{}`", latest.id.as_str()), String::new()];
    lines.extend(install_snippet(&latest.download_url));
    lines.extend([
        String::new(),
        "---".to_string(),
        String::new(),
        "## Packages".to_string(),
        String::new(),
        render_package_table(&latest.packages),
    ]);

    if builds.len() > 1 {
        lines.extend([
            String::new(),
            "## Previous builds".to_string(),
            String::new(),
            "| Build | Download |".to_string(),
            "|-------|----------|".to_string(),
        ]);
        for build in &builds[1..] {
            lines.push(format!(
                "| `{}` | [Download]({}) |",
                build.id.as_str(),
                build.download_url
            ));
        }
    }
    lines.join("\n")
}

fn render_os_versioned(os_versions: &[(&String, &BuildRecord)]) -> String {
    let Some((first_os, first_build)) = os_versions.first() else {
        return "_No packages available_".to_string();
    };

    let mut lines = vec![
        "| OS Version | Build | Download |".to_string(),
        "|------------|-------|----------|".to_string(),
    ];
    for (os_version, build) in os_versions {
        lines.push(format!(
            "| {} | `{}` | [Download]({}) |",
            os_version,
            build.id.as_str(),
            build.download_url
        ));
    }

    lines.push(String::new());
    lines.push(format!("Example for OS version {first_os}:"));
    lines.push(String::new());
    lines.extend(install_snippet(&first_build.download_url));
    lines.extend([
        String::new(),
        "---".to_string(),
        String::new(),
        "## Packages".to_string(),
    ]);

    for (os_version, build) in os_versions {
        lines.extend([
            String::new(),
            format!("### {os_version}"),
            String::new(),
            render_package_table(&build.packages),
        ]);
    }
    lines.join("\n")
}

/// Generated section of a tool's documentation page, built from its most recent build(s).
pub fn render_tool_page(tool: &ToolResult) -> String {
    match tool {
        ToolResult::Simple { builds, .. } => render_simple(builds),
        ToolResult::OsVersioned { os_versions, .. } => {
            // Newest OS version first, each with its most recent build.
            let latest: Vec<(&String, &BuildRecord)> = os_versions
                .iter()
                .rev()
                .filter_map(|(os, entry)| entry.builds.first().map(|b| (os, b)))
                .collect();
            render_os_versioned(&latest)
        }
    }
}

/// Replace the lines between the first `start` marker and the next `end` marker after it.
/// The start marker must end its line and the end marker must begin one; otherwise the
/// pair is not recognised and `None` is returned.
pub fn splice_section(document: &str, start: &str, end: &str, content: &str) -> Option<String> {
    let open = format!("{start}\n");
    let close = format!("\n{end}");
    let body_start = document.find(&open)? + open.len();
    // Search from the newline closing the start line so an empty section still matches.
    let newline = body_start - 1;
    let body_end = newline + document[newline..].find(&close)?;

    let mut spliced = String::with_capacity(document.len() + content.len());
    spliced.push_str(&document[..body_start]);
    spliced.push_str(content);
    spliced.push_str(&document[body_end..]);
    Some(spliced)
}

/// Splice `content` into the file at `path`. Missing files and missing markers are logged
/// and leave the file untouched; other read or write failures are returned.
pub async fn update_section_file(
    path: &Path,
    start: &str,
    end: &str,
    content: &str,
) -> std::io::Result<bool> {
    let document = match tokio::fs::read_to_string(path).await {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "[DOCS] File not found, skipping");
            return Ok(false);
        }
        Err(e) => return Err(e),
    };

    let Some(updated) = splice_section(&document, start, end, content) else {
        warn!(path = %path.display(), start_marker = %start, "[DOCS] Markers not found, skipping");
        return Ok(false);
    };
    if updated == document {
        info!(path = %path.display(), "[DOCS] Already up to date");
        return Ok(true);
    }
    tokio::fs::write(path, updated).await?;
    info!(path = %path.display(), "[DOCS] Updated");
    Ok(true)
}

/// Outcome of a documentation run.
#[derive(Debug, Default, PartialEq, Eq)]
pub struct DocsReport {
    pub updated: Vec<String>,
    pub skipped: Vec<String>,
}

/// Render every tool in the catalog into its page under `docs.dir`. A page that cannot be
/// read or written is skipped with a warning; the remaining pages are still processed.
pub async fn render_docs(catalog: &Catalog, docs: &DocsConfig) -> DocsReport {
    let mut report = DocsReport::default();
    for (name, tool) in &catalog.tools {
        let page = docs.page_for(name);
        let content = render_tool_page(tool);
        match update_section_file(&page, &docs.start_marker, &docs.end_marker, &content).await {
            Ok(true) => report.updated.push(name.clone()),
            Ok(false) => report.skipped.push(name.clone()),
            Err(e) => {
                warn!(path = %page.display(), error = %e, "[DOCS] Failed to update page, skipping");
                report.skipped.push(name.clone());
            }
        }
    }
    info!(updated = ?report.updated, skipped = ?report.skipped, "[DOCS] Done");
    report
}
