use thiserror::Error;

/// Hard failures of a catalog run. Listing and metadata problems never show up here;
/// they only shrink the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no tools produced output (failed: {})", failed.join(", "))]
    NoToolsProduced { failed: Vec<String> },

    #[error("I/O error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("catalog JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
