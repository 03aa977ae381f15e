//! # contract: interface to the remote object namespace
//!
//! The catalog pipeline only ever needs two operations from the bucket that holds the
//! published builds:
//! - list the immediate child prefixes under a prefix (non-recursive)
//! - fetch the bytes stored at a full key
//!
//! Both are expressed by the [`ObjectStore`] trait. Real backends (the `aws` CLI, plain
//! HTTP against the bucket endpoint, a local directory mirror) live in the CLI crate;
//! tests drive the pipeline through the generated `MockObjectStore`.
//!
//! Implementations report failures as [`StoreError`]. The pipeline never lets these
//! escape: the walker and reducer turn them into skipped subtrees plus a warning.

use async_trait::async_trait;
use mockall::automock;
use thiserror::Error;

/// Failure of a single list or fetch call against the object store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("call timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("command exited with {status}: {stderr}")]
    CommandFailed { status: String, stderr: String },

    #[error("unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("object not found")]
    NotFound,
}

/// Read-only access to a hierarchical object namespace.
///
/// Keys are slash-separated and never carry a leading or trailing `/`.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Names of the child prefixes directly under `prefix`, without the parent path
    /// and without a trailing `/`.
    async fn list_children(&self, prefix: &str) -> Result<Vec<String>, StoreError>;

    /// Raw bytes of the object stored at `key`.
    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError>;
}

/// Join key segments with `/`, dropping empty segments and stray slashes.
pub fn join_key<I, S>(parts: I) -> String
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    parts
        .into_iter()
        .filter_map(|p| {
            let trimmed = p.as_ref().trim_matches('/').to_string();
            (!trimmed.is_empty()).then_some(trimmed)
        })
        .collect::<Vec<_>>()
        .join("/")
}

#[cfg(test)]
mod tests {
    use super::join_key;

    #[test]
    fn join_key_skips_empty_prefix() {
        assert_eq!(join_key(["", "bintools"]), "bintools");
        assert_eq!(join_key(["packages", "rpmtools", "9"]), "packages/rpmtools/9");
        assert_eq!(join_key(["/packages/", "bintools/"]), "packages/bintools");
    }
}
