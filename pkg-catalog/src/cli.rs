///
/// This module implements the CLI interface for pkg-catalog: command parsing, configuration
/// overrides from flags, and the `index` / `docs` / `publish` entrypoints.
///
/// All catalog logic (walking, reducing, rendering) lives in the [`pkg-catalog-core`] crate;
/// this module only wires a configured object store into it and reports the outcome.
///
/// ## How To Use
/// - For command-line users: run the installed `pkg-catalog` binary with `--help`.
/// - For programmatic/integration use: call [`run`] with a constructed [`Cli`].
///
/// [`pkg-catalog-core`]: ../../pkg-catalog-core/
/// [`Cli`]: struct.Cli.html
/// [`run`]: fn.run.html
use crate::load_config::{load_config, CliConfig};
use crate::store::build_store;
use anyhow::Result;
use clap::{Parser, Subcommand};
use pkg_catalog_core::catalog::{assemble, read_catalog, write_catalog, Catalog};
use pkg_catalog_core::config::SelectionPolicy;
use pkg_catalog_core::render::{render_docs, DocsReport};
use std::path::{Path, PathBuf};

/// CLI for pkg-catalog: publish the package catalog and its documentation pages.
#[derive(Parser)]
#[clap(
    name = "pkg-catalog",
    version,
    about = "Aggregate per-build package metadata from the CDN bucket into a catalog and docs"
)]
pub struct Cli {
    /// Optional YAML config file
    #[clap(long, global = true)]
    pub config: Option<PathBuf>,

    #[clap(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Walk the bucket and write the catalog JSON
    Index {
        /// Build selection policy: `all` or `latest`
        #[clap(long)]
        policy: Option<SelectionPolicy>,
        /// Catalog output path
        #[clap(long)]
        output: Option<PathBuf>,
    },
    /// Render tool pages from an existing catalog
    Docs {
        /// Catalog to read (defaults to the configured output file)
        #[clap(long)]
        catalog: Option<PathBuf>,
        /// Directory holding the tool pages
        #[clap(long)]
        docs_dir: Option<PathBuf>,
    },
    /// `index` followed by `docs`
    Publish {
        #[clap(long)]
        policy: Option<SelectionPolicy>,
        #[clap(long)]
        output: Option<PathBuf>,
        #[clap(long)]
        docs_dir: Option<PathBuf>,
    },
}

fn apply_index_overrides(
    config: &mut CliConfig,
    policy: Option<SelectionPolicy>,
    output: Option<PathBuf>,
) {
    if let Some(policy) = policy {
        config.catalog.policy = policy;
    }
    if let Some(output) = output {
        config.catalog.output_file = output;
    }
}

async fn index(config: &CliConfig) -> Result<Catalog> {
    tracing::info!(command = "index", policy = ?config.catalog.policy, "Starting catalog assembly");
    let store = build_store(&config.store, &config.catalog)?;
    let catalog = match assemble(store.as_ref(), &config.catalog).await {
        Ok(catalog) => catalog,
        Err(e) => {
            tracing::error!(command = "index", error = %e, "Catalog assembly failed");
            return Err(e.into());
        }
    };
    write_catalog(&catalog, &config.catalog.output_file)?;
    println!(
        "Wrote {} with {} tool(s)",
        config.catalog.output_file.display(),
        catalog.tools.len()
    );
    for tool in catalog.tools.values() {
        println!("  {}: {} build(s)", tool.name(), tool.build_count());
    }
    Ok(catalog)
}

async fn docs(catalog: &Catalog, config: &CliConfig) -> DocsReport {
    tracing::info!(command = "docs", docs_dir = %config.docs.dir.display(), "Rendering tool pages");
    let report = render_docs(catalog, &config.docs).await;
    println!(
        "Updated {} page(s), skipped {}",
        report.updated.len(),
        report.skipped.len()
    );
    report
}

async fn load_catalog(path: &Path) -> Result<Catalog> {
    tracing::info!(path = %path.display(), "Reading catalog");
    Ok(read_catalog(path).await?)
}

/// Extracted async CLI logic entrypoint for integration tests and main()
pub async fn run(cli: Cli) -> Result<()> {
    tracing::info!("trace_initialised");

    let mut config = load_config(cli.config.as_deref())?;

    match cli.command {
        Commands::Index { policy, output } => {
            apply_index_overrides(&mut config, policy, output);
            index(&config).await?;
        }
        Commands::Docs { catalog, docs_dir } => {
            if let Some(dir) = docs_dir {
                config.docs.dir = dir;
            }
            let path = catalog.unwrap_or_else(|| config.catalog.output_file.clone());
            let catalog = load_catalog(&path).await?;
            docs(&catalog, &config).await;
        }
        Commands::Publish {
            policy,
            output,
            docs_dir,
        } => {
            apply_index_overrides(&mut config, policy, output);
            if let Some(dir) = docs_dir {
                config.docs.dir = dir;
            }
            let catalog = index(&config).await?;
            docs(&catalog, &config).await;
        }
    }

    tracing::info!("Command complete");
    Ok(())
}
