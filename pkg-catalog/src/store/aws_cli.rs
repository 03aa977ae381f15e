use async_trait::async_trait;
use pkg_catalog_core::contract::{ObjectStore, StoreError};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Object store backed by the `aws` CLI.
#[derive(Debug, Clone)]
pub struct AwsCliStore {
    bucket: String,
    timeout: Duration,
    program: String,
}

impl AwsCliStore {
    pub fn new(bucket: impl Into<String>, timeout: Duration) -> Self {
        Self {
            bucket: bucket.into(),
            timeout,
            program: "aws".to_string(),
        }
    }

    /// Run a different executable in place of `aws`.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    fn s3_uri(&self, key: &str) -> String {
        format!("s3://{}/{}", self.bucket, key)
    }

    async fn run(&self, args: &[String]) -> Result<Vec<u8>, StoreError> {
        let mut command = Command::new(&self.program);
        command
            .args(args)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        let output = tokio::time::timeout(self.timeout, command.output())
            .await
            .map_err(|_| StoreError::Timeout(self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            tracing::debug!(program = %self.program, ?args, status = %output.status, stderr = %stderr, "aws CLI call failed");
            return Err(StoreError::CommandFailed {
                status: output.status.to_string(),
                stderr,
            });
        }
        Ok(output.stdout)
    }
}

/// Child prefix names from `aws s3 ls` output (`PRE name/` lines).
pub fn parse_ls_output(stdout: &str) -> Vec<String> {
    stdout
        .lines()
        .filter_map(|line| line.trim().strip_prefix("PRE "))
        .map(|name| name.trim().trim_end_matches('/').to_string())
        .filter(|name| !name.is_empty())
        .collect()
}

#[async_trait]
impl ObjectStore for AwsCliStore {
    async fn list_children(&self, prefix: &str) -> Result<Vec<String>, StoreError> {
        let uri = format!("{}/", self.s3_uri(prefix));
        let args = ["s3".to_string(), "ls".to_string(), uri];
        let stdout = self.run(&args).await?;
        Ok(parse_ls_output(&String::from_utf8_lossy(&stdout)))
    }

    async fn fetch(&self, key: &str) -> Result<Vec<u8>, StoreError> {
        let args = [
            "s3".to_string(),
            "cp".to_string(),
            self.s3_uri(key),
            "-".to_string(),
        ];
        self.run(&args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_prefix_lines_only() {
        let stdout = "                           PRE 20240201-0800/\n                           PRE 20240301-1200/\n2024-03-01 12:00:00       1234 index.html\n";
        assert_eq!(parse_ls_output(stdout), vec!["20240201-0800", "20240301-1200"]);
        assert!(parse_ls_output("").is_empty());
    }

    #[tokio::test]
    async fn failing_command_is_reported_not_panicked() {
        let store = AwsCliStore::new("bucket", Duration::from_secs(5)).with_program("false");
        match store.list_children("packages/bintools").await {
            Err(StoreError::CommandFailed { .. }) => {}
            other => panic!("expected CommandFailed, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn missing_program_is_an_io_error() {
        let store = AwsCliStore::new("bucket", Duration::from_secs(5))
            .with_program("pkg-catalog-no-such-binary");
        assert!(matches!(
            store.fetch("packages/bintools/v1/metadata.json").await,
            Err(StoreError::Io(_))
        ));
    }
}
