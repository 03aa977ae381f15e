use async_trait::async_trait;
use pkg_catalog_core::contract::{ObjectStore, StoreError};
use std::io::ErrorKind;
use std::path::PathBuf;
use std::time::Duration;

/// Object store over a local directory laid out like the bucket (`{root}/{key}`).
#[derive(Debug, Clone)]
pub struct LocalDirStore {
    root: PathBuf,
    timeout: Duration,
}

impl LocalDirStore {
    pub fn new(root: PathBuf, timeout: Duration) -> Self {
        Self { root, timeout }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        key.split('/')
            .filter(|segment| !segment.is_empty())
            .fold(self.root.clone(), |path, segment| path.join(segment))
    }

    async fn read_dirs(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let mut entries = tokio::fs::read_dir(self.path_for(prefix)).await?;
        let mut children = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                children.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        children.sort();
        Ok(children)
    }
}

#[async_trait]
impl ObjectStore for LocalDirStore {
    async fn list_children(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        tokio::time::timeout(self.timeout, self.read_dirs(prefix))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let read = tokio::time::timeout(self.timeout, tokio::fs::read(self.path_for(key)))
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))?;
        match read {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(StoreError::NotFound),
            Err(e) => Err(StoreError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn lists_only_directories_sorted() {
        let dir = tempdir().unwrap();
        let tool = dir.path().join("packages").join("bintools");
        std::fs::create_dir_all(tool.join("v2")).unwrap();
        std::fs::create_dir_all(tool.join("v1")).unwrap();
        std::fs::write(tool.join("README"), "x").unwrap();

        let store = LocalDirStore::new(dir.path().to_path_buf(), Duration::from_secs(5));
        assert_eq!(
            store.list_children("packages/bintools").await.unwrap(),
            vec!["v1", "v2"]
        );
        assert!(store.list_children("packages/missing").await.is_err());
    }

    #[tokio::test]
    async fn fetch_missing_key_is_not_found() {
        let dir = tempdir().unwrap();
        let store = LocalDirStore::new(dir.path().to_path_buf(), Duration::from_secs(5));
        assert!(matches!(
            store.fetch("packages/bintools/v1/metadata.json").await,
            Err(StoreError::NotFound)
        ));
    }
}
