/// `load_config` module: resolves the run configuration from an optional YAML file, the
/// process environment, and built-in defaults into the core [`CatalogConfig`].
///
/// This is the only place the CLI reads the environment or parses user-supplied YAML.
///
/// # Precedence
/// CLI flag > environment variable > YAML file > built-in default. Command-line flags are
/// applied afterwards by the `cli` module; everything else is settled here. An environment
/// variable set to the empty string counts as unset.
///
/// # Environment
/// | Variable             | Default                                   |
/// |----------------------|-------------------------------------------|
/// | `S3_BUCKET`          | `jelly-prd-cdn-static`                    |
/// | `S3_PREFIX`          | `packages`                                |
/// | `CDN_BASE`           | `https://files.project-jelly.io/packages` |
/// | `OUTPUT_FILE`        | `docs/data/packages.json`                 |
/// | `CATALOG_POLICY`     | `all`                                     |
/// | `FETCH_TIMEOUT_SECS` | `30`                                      |
///
/// # Errors
/// All errors use `anyhow::Error` and name the offending file, key or variable.
use anyhow::{anyhow, Result};
use pkg_catalog_core::config::{CatalogConfig, SelectionPolicy};
use pkg_catalog_core::registry::{default_registry, ToolDescriptor};
use pkg_catalog_core::render::DocsConfig;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{error, info};

pub const ENV_BUCKET: &str = "S3_BUCKET";
pub const ENV_PREFIX: &str = "S3_PREFIX";
pub const ENV_CDN_BASE: &str = "CDN_BASE";
pub const ENV_OUTPUT_FILE: &str = "OUTPUT_FILE";
pub const ENV_POLICY: &str = "CATALOG_POLICY";
pub const ENV_FETCH_TIMEOUT: &str = "FETCH_TIMEOUT_SECS";

/// Which object store backend to talk to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreSection {
    #[default]
    AwsCli,
    Http {
        #[serde(default)]
        endpoint: Option<String>,
    },
    Local {
        root: PathBuf,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct DocsSection {
    dir: Option<PathBuf>,
    start_marker: Option<String>,
    end_marker: Option<String>,
}

/// YAML-side shape; every key is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
struct FileConfig {
    bucket: Option<String>,
    prefix: Option<String>,
    cdn_base: Option<String>,
    output_file: Option<PathBuf>,
    policy: Option<String>,
    fetch_timeout_secs: Option<u64>,
    store: StoreSection,
    tools: Option<Vec<ToolDescriptor>>,
    docs: DocsSection,
}

/// Fully resolved configuration handed to the commands.
#[derive(Debug, Clone)]
pub struct CliConfig {
    pub catalog: CatalogConfig,
    pub store: StoreSection,
    pub docs: DocsConfig,
}

fn env_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn read_file_config(path: &Path) -> Result<FileConfig> {
    info!(config_path = ?path, "Loading configuration from file");

    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to read config file");
            return Err(anyhow!("Failed to read config file {:?}: {}", path, e));
        }
    };

    if content.trim().is_empty() {
        info!(config_path = ?path, "Config file is empty, using environment and defaults");
        return Ok(FileConfig::default());
    }

    match serde_yaml::from_str::<Option<FileConfig>>(&content) {
        Ok(conf) => {
            info!(config_path = ?path, "Parsed config YAML successfully");
            Ok(conf.unwrap_or_default())
        }
        Err(e) => {
            error!(error = ?e, config_path = ?path, "Failed to parse config YAML");
            Err(anyhow!("Failed to parse config YAML {:?}: {e}", path))
        }
    }
}

fn parse_policy(value: &str, source: &str) -> Result<SelectionPolicy> {
    value
        .parse::<SelectionPolicy>()
        .map_err(|e| anyhow!("Invalid {source}: {e}"))
}

fn check_unique_tools(tools: &[ToolDescriptor]) -> Result<()> {
    let mut seen = HashSet::new();
    for tool in tools {
        if !seen.insert(tool.name.as_str()) {
            return Err(anyhow!("Duplicate tool '{}' in config `tools`", tool.name));
        }
    }
    Ok(())
}

/// Resolve the configuration from `path` (if any), the environment, and defaults.
pub fn load_config(path: Option<&Path>) -> Result<CliConfig> {
    let file = match path {
        Some(path) => read_file_config(path)?,
        None => {
            info!("No config file given, using environment and defaults");
            FileConfig::default()
        }
    };
    let defaults = CatalogConfig::default();

    let policy = match (env_var(ENV_POLICY), file.policy.as_deref()) {
        (Some(value), _) => parse_policy(&value, ENV_POLICY)?,
        (None, Some(value)) => parse_policy(value, "policy in config file")?,
        (None, None) => defaults.policy,
    };

    let fetch_timeout = match env_var(ENV_FETCH_TIMEOUT) {
        Some(value) => {
            let secs: u64 = value.trim().parse().map_err(|e| {
                anyhow!("Invalid {ENV_FETCH_TIMEOUT} '{value}': expected whole seconds ({e})")
            })?;
            Duration::from_secs(secs)
        }
        None => file
            .fetch_timeout_secs
            .map(Duration::from_secs)
            .unwrap_or(defaults.fetch_timeout),
    };

    let tools = match file.tools {
        Some(tools) => {
            check_unique_tools(&tools)?;
            tools
        }
        None => default_registry(),
    };

    let catalog = CatalogConfig {
        bucket: env_var(ENV_BUCKET)
            .or(file.bucket)
            .unwrap_or(defaults.bucket),
        prefix: env_var(ENV_PREFIX)
            .or(file.prefix)
            .unwrap_or(defaults.prefix),
        cdn_base: env_var(ENV_CDN_BASE)
            .or(file.cdn_base)
            .unwrap_or(defaults.cdn_base),
        output_file: env_var(ENV_OUTPUT_FILE)
            .map(PathBuf::from)
            .or(file.output_file)
            .unwrap_or(defaults.output_file),
        policy,
        fetch_timeout,
        tools,
    }
    .normalised();

    let docs_defaults = DocsConfig::default();
    let docs = DocsConfig {
        dir: file.docs.dir.unwrap_or(docs_defaults.dir),
        start_marker: file.docs.start_marker.unwrap_or(docs_defaults.start_marker),
        end_marker: file.docs.end_marker.unwrap_or(docs_defaults.end_marker),
    };

    catalog.trace_loaded();
    info!(store = ?file.store, docs_dir = %docs.dir.display(), "Configuration resolved");

    Ok(CliConfig {
        catalog,
        store: file.store,
        docs,
    })
}
