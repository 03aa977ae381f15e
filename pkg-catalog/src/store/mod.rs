#![doc = "Object store backends for the CLI: bridges the core `ObjectStore` trait to the `aws` CLI, plain HTTP, or a local mirror."]
//
//! # Object store backends
//!
//! The core pipeline only knows the [`ObjectStore`] trait. This module provides the concrete
//! clients the CLI wires in, chosen by the `store.type` section of the config file:
//!
//! - [`AwsCliStore`] (`aws_cli`, default): shells out to `aws s3 ls` / `aws s3 cp`, using
//!   whatever credentials the AWS CLI resolves.
//! - [`HttpBucketStore`] (`http`): anonymous ListObjectsV2 and GET against the bucket endpoint.
//! - [`LocalDirStore`] (`local`): a directory laid out like the bucket.
//!
//! Every call is bounded by the configured fetch timeout.

mod aws_cli;
mod http;
mod local;

pub use aws_cli::{parse_ls_output, AwsCliStore};
pub use http::{parse_list_objects, HttpBucketStore, ListPage};
pub use local::LocalDirStore;

use crate::load_config::StoreSection;
use pkg_catalog_core::config::CatalogConfig;
use pkg_catalog_core::contract::{ObjectStore, StoreError};

/// Construct the backend selected in the config.
pub fn build_store(
    section: &StoreSection,
    config: &CatalogConfig,
) -> Result<Box<dyn ObjectStore>, StoreError> {
    let store: Box<dyn ObjectStore> = match section {
        StoreSection::AwsCli => {
            tracing::info!(bucket = %config.bucket, "Using aws CLI object store");
            Box::new(AwsCliStore::new(&config.bucket, config.fetch_timeout))
        }
        StoreSection::Http { endpoint } => {
            let endpoint = endpoint
                .clone()
                .unwrap_or_else(|| format!("https://{}.s3.amazonaws.com", config.bucket));
            tracing::info!(endpoint = %endpoint, "Using HTTP object store");
            Box::new(HttpBucketStore::new(endpoint, config.fetch_timeout)?)
        }
        StoreSection::Local { root } => {
            tracing::info!(root = %root.display(), "Using local directory object store");
            Box::new(LocalDirStore::new(root.clone(), config.fetch_timeout))
        }
    };
    Ok(store)
}
